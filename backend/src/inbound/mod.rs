//! Inbound adapters that translate external requests into lifecycle
//! commands while keeping framework details at the edge.

pub mod http;
