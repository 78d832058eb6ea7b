//! Chat platform update webhook.
//!
//! ```text
//! POST /webhook/telegram
//! ```
//!
//! Translates private-chat text messages into lifecycle commands. Telegram
//! redelivers any update not answered with 200, so every parsed update is
//! acknowledged even when handling it failed; the user gets an apology instead.

use actix_web::{HttpRequest, HttpResponse, post, web};
use serde::Deserialize;
use tracing::{debug, error, warn};
use utoipa::ToSchema;

use crate::domain::{Error, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

/// Header Telegram echoes back with the secret registered via `setWebhook`.
pub const TELEGRAM_SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

const UNKNOWN_USERNAME: &str = "N/A";

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateDto {
    pub update_id: i64,
    pub message: Option<MessageDto>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MessageDto {
    pub from: Option<SenderDto>,
    pub chat: ChatDto,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SenderDto {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatDto {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

/// What a private text message asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ChatCommand<'a> {
    Start,
    Help,
    Cancel,
    /// Any other slash command.
    Unknown,
    Text(&'a str),
}

fn parse_command(text: &str) -> ChatCommand<'_> {
    let trimmed = text.trim();
    let Some(command) = trimmed.strip_prefix('/') else {
        return ChatCommand::Text(trimmed);
    };
    let word = command.split_whitespace().next().unwrap_or_default();
    // Group-style `/start@SomeBot` addressing.
    let name = word.split('@').next().unwrap_or_default();
    match name.to_ascii_lowercase().as_str() {
        "start" => ChatCommand::Start,
        "help" => ChatCommand::Help,
        "cancel" => ChatCommand::Cancel,
        _ => ChatCommand::Unknown,
    }
}

/// Receive one Bot API update.
#[utoipa::path(
    post,
    path = "/webhook/telegram",
    tags = ["webhooks"],
    request_body(content = UpdateDto, description = "Bot API `Update`; unused fields are ignored"),
    responses(
        (status = 200, description = "Update consumed"),
        (status = 401, description = "Secret token header missing or wrong", body = Error)
    )
)]
#[post("/webhook/telegram")]
pub async fn telegram_webhook(
    request: HttpRequest,
    state: web::Data<HttpState>,
    update: web::Json<UpdateDto>,
) -> ApiResult<HttpResponse> {
    if let Some(expected) = &state.telegram_secret {
        let presented = request
            .headers()
            .get(TELEGRAM_SECRET_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        if !expected.matches(presented) {
            warn!("chat update rejected: bad secret token");
            return Err(Error::unauthorized("secret token mismatch"));
        }
    }

    let update = update.into_inner();
    let Some(message) = update.message else {
        debug!(update_id = update.update_id, "non-message update ignored");
        return Ok(HttpResponse::Ok().finish());
    };
    let (Some(sender), Some(text)) = (message.from, message.text) else {
        return Ok(HttpResponse::Ok().finish());
    };
    if message.chat.kind != "private" || sender.is_bot || message.chat.id != sender.id {
        debug!(update_id = update.update_id, chat_id = message.chat.id, "non-private message ignored");
        return Ok(HttpResponse::Ok().finish());
    }

    let user_id = UserId::new(sender.id);
    dispatch(&state, user_id, sender.username, &text).await;
    Ok(HttpResponse::Ok().finish())
}

async fn dispatch(state: &HttpState, user_id: UserId, username: Option<String>, text: &str) {
    let commands = &state.commands;
    let result = match parse_command(text) {
        ChatCommand::Start => {
            let username = username.unwrap_or_else(|| UNKNOWN_USERNAME.to_owned());
            commands.start_onboarding(user_id, username).await.map(drop)
        }
        ChatCommand::Help | ChatCommand::Unknown => {
            commands.send_help(user_id).await;
            Ok(())
        }
        ChatCommand::Cancel => {
            commands.acknowledge_cancel(user_id).await;
            Ok(())
        }
        ChatCommand::Text(body) => commands.confirm_disclaimer(user_id, body).await.map(drop),
    };
    if let Err(err) = result {
        error!(user_id = %user_id, error = %err, "chat command failed");
        commands.apologise(user_id).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use actix_web::App;
    use rstest::rstest;
    use serde_json::{Value, json};

    use super::*;
    use crate::domain::LifecycleStage;
    use crate::domain::lifecycle::{ConfirmationOutcome, LifecycleError, StartOutcome};
    use crate::domain::ports::{MockSubscriptionCommands, RecordStoreError};
    use crate::inbound::http::state::WebhookSecret;

    const SENDER: i64 = 5150;

    fn private_text(text: &str) -> Value {
        json!({
            "update_id": 1,
            "message": {
                "message_id": 10,
                "from": { "id": SENDER, "is_bot": false, "first_name": "Noa", "username": "noa" },
                "chat": { "id": SENDER, "type": "private" },
                "date": 1_780_000_000,
                "text": text,
            }
        })
    }

    async fn deliver(state: HttpState, body: Value, secret: Option<&str>) -> StatusCode {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(telegram_webhook),
        )
        .await;
        let mut request = actix_test::TestRequest::post().uri("/webhook/telegram").set_json(body);
        if let Some(secret) = secret {
            request = request.insert_header((TELEGRAM_SECRET_HEADER, secret));
        }
        actix_test::call_service(&app, request.to_request()).await.status()
    }

    #[rstest]
    #[case("/start", ChatCommand::Start)]
    #[case("/start@PeakVipBot", ChatCommand::Start)]
    #[case("  /START ref42", ChatCommand::Start)]
    #[case("/help", ChatCommand::Help)]
    #[case("/cancel", ChatCommand::Cancel)]
    #[case("/stats", ChatCommand::Unknown)]
    #[case(" dana@example.com מאשר ", ChatCommand::Text("dana@example.com מאשר"))]
    fn commands_are_recognised(#[case] text: &str, #[case] expected: ChatCommand<'static>) {
        assert_eq!(parse_command(text), expected);
    }

    #[rstest]
    #[actix_rt::test]
    async fn start_begins_onboarding_with_username() {
        let mut commands = MockSubscriptionCommands::new();
        commands
            .expect_start_onboarding()
            .withf(|user_id, username| *user_id == UserId::new(SENDER) && username == "noa")
            .times(1)
            .returning(|_, _| Ok(StartOutcome::DisclaimerSent));

        let status = deliver(HttpState::new(Arc::new(commands)), private_text("/start"), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[rstest]
    #[actix_rt::test]
    async fn free_text_goes_to_confirmation() {
        let mut commands = MockSubscriptionCommands::new();
        commands
            .expect_confirm_disclaimer()
            .withf(|user_id, text| *user_id == UserId::new(SENDER) && text.to_string() == "noa@example.com מאשר")
            .times(1)
            .returning(|_, _| {
                Ok(ConfirmationOutcome::NotAwaiting {
                    stage: LifecycleStage::PaidSubscriber,
                })
            });

        let status = deliver(
            HttpState::new(Arc::new(commands)),
            private_text("noa@example.com מאשר"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[rstest]
    #[case("/help")]
    #[case("/whatever")]
    #[actix_rt::test]
    async fn help_and_unknown_commands_send_help(#[case] text: &str) {
        let mut commands = MockSubscriptionCommands::new();
        commands.expect_send_help().times(1).return_const(());

        let status = deliver(HttpState::new(Arc::new(commands)), private_text(text), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[rstest]
    #[actix_rt::test]
    async fn cancel_is_acknowledged_without_state_change() {
        let mut commands = MockSubscriptionCommands::new();
        commands.expect_acknowledge_cancel().times(1).return_const(());
        commands.expect_start_onboarding().never();
        commands.expect_confirm_disclaimer().never();

        let status = deliver(HttpState::new(Arc::new(commands)), private_text("/cancel"), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[rstest]
    #[actix_rt::test]
    async fn store_failure_apologises_and_still_acknowledges() {
        let mut commands = MockSubscriptionCommands::new();
        commands.expect_start_onboarding().returning(|_, _| {
            Err(LifecycleError::Store(RecordStoreError::connection("down")))
        });
        commands.expect_apologise().times(1).return_const(());

        let status = deliver(HttpState::new(Arc::new(commands)), private_text("/start"), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[rstest]
    #[actix_rt::test]
    async fn group_messages_are_ignored() {
        let mut commands = MockSubscriptionCommands::new();
        commands.expect_start_onboarding().never();
        let mut body = private_text("/start");
        body["message"]["chat"] = json!({ "id": -100_42, "type": "supergroup" });

        let status = deliver(HttpState::new(Arc::new(commands)), body, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[rstest]
    #[actix_rt::test]
    async fn updates_without_message_are_acknowledged() {
        let commands = MockSubscriptionCommands::new();
        let body = json!({ "update_id": 2, "edited_message": { "text": "x" } });

        let status = deliver(HttpState::new(Arc::new(commands)), body, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[rstest]
    #[case(None, StatusCode::UNAUTHORIZED)]
    #[case(Some("nope"), StatusCode::UNAUTHORIZED)]
    #[case(Some("tg-secret"), StatusCode::OK)]
    #[actix_rt::test]
    async fn secret_token_header_is_enforced(
        #[case] presented: Option<&str>,
        #[case] expected: StatusCode,
    ) {
        let mut commands = MockSubscriptionCommands::new();
        commands.expect_send_help().return_const(());
        let state = HttpState::new(Arc::new(commands))
            .with_telegram_secret(Some(WebhookSecret::new("tg-secret")));

        let status = deliver(state, private_text("/help"), presented).await;
        assert_eq!(status, expected);
    }
}
