//! OpenAPI document for the webhook and health endpoints.
//!
//! Served through Swagger UI in debug builds and exported by the
//! `openapi-dump` binary for external tooling.

use utoipa::OpenApi;

use crate::domain::{Error, ErrorCode};
use crate::inbound::http::payment_webhook::{
    LooseFlag, PaymentWebhookRequest, PaymentWebhookResponse,
};
use crate::inbound::http::telegram_webhook::{ChatDto, MessageDto, SenderDto, UpdateDto};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Subscription backend API",
        description = "Webhooks for the chat platform and payment provider, plus health checks."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::payment_webhook::payment_webhook,
        crate::inbound::http::telegram_webhook::telegram_webhook,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        LooseFlag,
        PaymentWebhookRequest,
        PaymentWebhookResponse,
        UpdateDto,
        MessageDto,
        SenderDto,
        ChatDto,
    )),
    tags(
        (name = "webhooks", description = "Inbound notifications"),
        (name = "health", description = "Liveness and readiness checks")
    )
)]
pub struct ApiDoc;
