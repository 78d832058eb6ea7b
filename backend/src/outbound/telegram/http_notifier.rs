//! Reqwest-backed Telegram notifier.
//!
//! This adapter owns transport details only: Bot API method URLs, request
//! serialisation, timeout and HTTP error mapping, and envelope decoding. The
//! bot token is part of every URL, so URLs are stripped from transport errors
//! before they reach a log line.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use zeroize::Zeroizing;

use super::dto::{
    ApiResponseDto, ChatMemberDto, CreateInviteLinkDto, InviteLinkDto, SendMessageDto,
};
use crate::domain::UserId;
use crate::domain::ports::{InviteLink, InviteLinkRequest, NotificationError, NotificationPort};

/// Public Bot API endpoint.
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for [`TelegramNotifier`].
pub struct TelegramNotifierConfig {
    pub bot_token: Zeroizing<String>,
    /// Managed channel, either `@username` or the numeric `-100…` id.
    pub channel_id: String,
    pub api_base: Url,
    pub request_timeout: Duration,
}

impl TelegramNotifierConfig {
    /// Settings against the public Bot API with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the built-in API base fails to parse.
    pub fn new(
        bot_token: impl Into<String>,
        channel_id: impl Into<String>,
    ) -> Result<Self, url::ParseError> {
        Ok(Self {
            bot_token: Zeroizing::new(bot_token.into()),
            channel_id: channel_id.into(),
            api_base: Url::parse(DEFAULT_TELEGRAM_API_BASE)?,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }
}

/// Notification port adapter that calls the Telegram Bot API over HTTPS.
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    bot_token: Zeroizing<String>,
    channel_id: String,
}

impl TelegramNotifier {
    /// Build a notifier using a reqwest client with an explicit timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: TelegramNotifierConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            api_base: config.api_base.as_str().trim_end_matches('/').to_owned(),
            bot_token: config.bot_token,
            channel_id: config.channel_id,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{base}/bot{token}/{method}",
            base = self.api_base,
            token = self.bot_token.as_str()
        )
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<Option<T>, NotificationError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.method_url(method))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(map_transport_error)?;
        debug!(method, status = status.as_u16(), "bot api call finished");
        decode_envelope(method, status, bytes.as_ref())
    }
}

#[async_trait]
impl NotificationPort for TelegramNotifier {
    async fn send_message(&self, user_id: UserId, text: &str) -> Result<(), NotificationError> {
        let body = SendMessageDto {
            chat_id: user_id.get(),
            text,
            disable_web_page_preview: true,
        };
        self.call::<_, serde_json::Value>("sendMessage", &body)
            .await
            .map(drop)
    }

    async fn create_invite_link(
        &self,
        request: &InviteLinkRequest,
    ) -> Result<InviteLink, NotificationError> {
        let body = CreateInviteLinkDto {
            chat_id: &self.channel_id,
            name: &request.name,
            expire_date: request.expires_at.timestamp(),
            member_limit: request.member_limit,
        };
        let link: Option<InviteLinkDto> = self.call("createChatInviteLink", &body).await?;
        link.map(|dto| InviteLink {
            url: dto.invite_link,
        })
        .ok_or_else(|| NotificationError::rejected("createChatInviteLink returned no link"))
    }

    async fn ban_member(&self, user_id: UserId) -> Result<(), NotificationError> {
        let body = ChatMemberDto {
            chat_id: &self.channel_id,
            user_id: user_id.get(),
            only_if_banned: None,
        };
        self.call::<_, serde_json::Value>("banChatMember", &body)
            .await
            .map(drop)
    }

    async fn unban_member(&self, user_id: UserId) -> Result<(), NotificationError> {
        let body = ChatMemberDto {
            chat_id: &self.channel_id,
            user_id: user_id.get(),
            only_if_banned: Some(true),
        };
        self.call::<_, serde_json::Value>("unbanChatMember", &body)
            .await
            .map(drop)
    }
}

fn decode_envelope<T: DeserializeOwned>(
    method: &str,
    status: StatusCode,
    body: &[u8],
) -> Result<Option<T>, NotificationError> {
    match serde_json::from_slice::<ApiResponseDto<T>>(body) {
        Ok(envelope) => envelope.into_result().map_err(|description| {
            let message = format!("{method}: {description}");
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                NotificationError::transport(message)
            } else {
                NotificationError::rejected(message)
            }
        }),
        Err(_) if !status.is_success() => Err(map_status_error(method, status, body)),
        Err(error) => Err(NotificationError::transport(format!(
            "{method}: invalid Bot API payload: {error}"
        ))),
    }
}

fn map_transport_error(error: reqwest::Error) -> NotificationError {
    let timed_out = error.is_timeout();
    let error = error.without_url();
    if timed_out {
        NotificationError::transport(format!("timed out: {error}"))
    } else {
        NotificationError::transport(error.to_string())
    }
}

fn map_status_error(method: &str, status: StatusCode, body: &[u8]) -> NotificationError {
    let preview = body_preview(body);
    let message = if preview.is_empty() {
        format!("{method}: status {}", status.as_u16())
    } else {
        format!("{method}: status {}: {preview}", status.as_u16())
    };
    if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
        NotificationError::rejected(message)
    } else {
        NotificationError::transport(message)
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 120;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
