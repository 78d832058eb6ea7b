//! Payment provider webhook.
//!
//! ```text
//! POST /webhook/payment?secret=...
//! ```
//!
//! The provider retries on any non-2xx answer, so every authenticated,
//! well-formed notification is acknowledged with 200 whatever its outcome.
//! Only store failures answer 5xx.

use actix_web::{post, web};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use utoipa::{IntoParams, ToSchema};

use crate::domain::Error;
use crate::domain::lifecycle::PaymentEvent;
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

/// Resource names the provider uses for subscription cancellation pings.
const CANCELLATION_RESOURCES: [&str; 2] = ["cancellation", "subscription_cancelled"];

/// Query string carrying the shared secret.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct WebhookQuery {
    pub secret: Option<String>,
}

/// A boolean the provider may send as `true` or `"true"`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum LooseFlag {
    Bool(bool),
    Text(String),
}

impl LooseFlag {
    fn is_set(&self) -> bool {
        match self {
            Self::Bool(value) => *value,
            Self::Text(text) => matches!(text.trim(), "true" | "1"),
        }
    }
}

/// Sale or subscription notification as posted by the provider.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PaymentWebhookRequest {
    #[schema(example = "dana@example.com")]
    pub email: Option<String>,
    #[schema(example = "FO8TXN-GnqFg3hXoZMUxkA==")]
    pub sale_id: Option<String>,
    pub subscription_id: Option<String>,
    pub product_id: Option<String>,
    /// Preferred over `product_id` when both are present.
    pub product_permalink: Option<String>,
    pub cancelled: Option<LooseFlag>,
    pub resource_name: Option<String>,
}

/// Acknowledgement returned to the provider.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentWebhookResponse {
    #[schema(example = "ok")]
    pub status: String,
    #[schema(example = "activated")]
    pub outcome: String,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}

impl PaymentWebhookRequest {
    fn into_event(self) -> Result<PaymentEvent, Error> {
        let cancelled = self.cancelled.as_ref().is_some_and(LooseFlag::is_set)
            || self
                .resource_name
                .as_deref()
                .is_some_and(|name| CANCELLATION_RESOURCES.contains(&name.trim()));
        let email = non_blank(self.email).ok_or_else(|| Error::invalid_request("email is required"))?;
        let sale_id =
            non_blank(self.sale_id).ok_or_else(|| Error::invalid_request("sale_id is required"))?;
        Ok(PaymentEvent {
            email,
            sale_id,
            subscription_id: non_blank(self.subscription_id),
            product_id: non_blank(self.product_permalink).or_else(|| non_blank(self.product_id)),
            cancelled,
        })
    }
}

/// Receive a payment notification.
#[utoipa::path(
    post,
    path = "/webhook/payment",
    tags = ["webhooks"],
    params(WebhookQuery),
    request_body = PaymentWebhookRequest,
    responses(
        (status = 200, description = "Notification acknowledged", body = PaymentWebhookResponse),
        (status = 400, description = "Email or sale id missing", body = Error),
        (status = 401, description = "Shared secret missing or wrong", body = Error),
        (status = 503, description = "Subscription store unavailable", body = Error)
    )
)]
#[post("/webhook/payment")]
pub async fn payment_webhook(
    state: web::Data<HttpState>,
    query: web::Query<WebhookQuery>,
    payload: web::Json<PaymentWebhookRequest>,
) -> ApiResult<web::Json<PaymentWebhookResponse>> {
    if let Some(expected) = &state.payment_secret {
        let presented = query.secret.as_deref().unwrap_or_default();
        if !expected.matches(presented) {
            warn!("payment webhook rejected: bad secret");
            return Err(Error::unauthorized("webhook secret mismatch"));
        }
    }

    let event = payload.into_inner().into_event()?;
    let sale_id = event.sale_id.clone();
    let outcome = state.commands.apply_payment(event).await.map_err(|err| {
        error!(sale_id = %sale_id, error = %err, "payment notification failed");
        Error::from(err)
    })?;

    info!(sale_id = %sale_id, outcome = outcome.label(), "payment notification handled");
    Ok(web::Json(PaymentWebhookResponse {
        status: "ok".to_owned(),
        outcome: outcome.label().to_owned(),
    }))
}
