//! Server construction and background task wiring.

mod background;
mod config;
mod state_builders;

pub use background::BackgroundTasks;
pub use config::{DEFAULT_JSON_LIMIT, ServerConfig};
pub use state_builders::{EngineParts, build_engine, build_http_state};

use std::sync::Arc;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[cfg(debug_assertions)]
use crate::ApiDoc;
use crate::domain::ports::SubscriptionCommands;
use crate::inbound::http::health::{HealthState, live, ready};
use crate::inbound::http::payment_webhook::payment_webhook;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::telegram_webhook::telegram_webhook;
use crate::middleware::RequestLog;

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    json_limit: usize,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        json_limit,
    } = deps;

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(web::JsonConfig::default().limit(json_limit))
        .wrap(RequestLog)
        .service(payment_webhook)
        .service(telegram_webhook)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Construct the Actix HTTP server and mark the service ready.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    commands: Arc<dyn SubscriptionCommands>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let http_state = build_http_state(&config, commands);
    let server_health_state = health_state.clone();
    let json_limit = config.json_limit;

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
            json_limit,
        })
    })
    .bind(config.bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}
