//! Request and response bodies for the Bot API methods the notifier calls.
//!
//! Every Bot API response shares the `{ ok, result, description }` envelope;
//! the adapter decodes the envelope first and only then looks at `result`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(super) struct SendMessageDto<'a> {
    pub(super) chat_id: i64,
    pub(super) text: &'a str,
    pub(super) disable_web_page_preview: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct CreateInviteLinkDto<'a> {
    pub(super) chat_id: &'a str,
    pub(super) name: &'a str,
    /// Unix timestamp in seconds.
    pub(super) expire_date: i64,
    pub(super) member_limit: u32,
}

#[derive(Debug, Serialize)]
pub(super) struct ChatMemberDto<'a> {
    pub(super) chat_id: &'a str,
    pub(super) user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) only_if_banned: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ApiResponseDto<T> {
    pub(super) ok: bool,
    pub(super) result: Option<T>,
    pub(super) description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct InviteLinkDto {
    pub(super) invite_link: String,
}

impl<T> ApiResponseDto<T> {
    /// Unwrap the envelope, returning the API's own description on failure.
    pub(super) fn into_result(self) -> Result<Option<T>, String> {
        if self.ok {
            Ok(self.result)
        } else {
            Err(self
                .description
                .unwrap_or_else(|| "request failed without description".to_owned()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn invite_request_uses_bot_api_field_names() {
        let dto = CreateInviteLinkDto {
            chat_id: "-1001234",
            name: "Trial_7_dana",
            expire_date: 1_775_000_000,
            member_limit: 1,
        };
        let value = serde_json::to_value(&dto).expect("serialise");
        assert_eq!(
            value,
            json!({
                "chat_id": "-1001234",
                "name": "Trial_7_dana",
                "expire_date": 1_775_000_000,
                "member_limit": 1,
            })
        );
    }

    #[rstest]
    fn ban_request_omits_unban_flag() {
        let dto = ChatMemberDto {
            chat_id: "@vip",
            user_id: 42,
            only_if_banned: None,
        };
        let value = serde_json::to_value(&dto).expect("serialise");
        assert_eq!(value, json!({ "chat_id": "@vip", "user_id": 42 }));
    }

    #[rstest]
    fn successful_envelope_yields_result() {
        let body = r#"{"ok":true,"result":{"invite_link":"https://t.me/+abc","name":"x"}}"#;
        let decoded: ApiResponseDto<InviteLinkDto> = serde_json::from_str(body).expect("decode");
        let link = decoded.into_result().expect("ok").expect("result");
        assert_eq!(link.invite_link, "https://t.me/+abc");
    }

    #[rstest]
    #[case(
        r#"{"ok":false,"error_code":403,"description":"Forbidden: bot was blocked by the user"}"#,
        "Forbidden: bot was blocked by the user"
    )]
    #[case(r#"{"ok":false}"#, "request failed without description")]
    fn failed_envelope_yields_description(#[case] body: &str, #[case] expected: &str) {
        let decoded: ApiResponseDto<serde_json::Value> =
            serde_json::from_str(body).expect("decode");
        assert_eq!(decoded.into_result().expect_err("failure"), expected);
    }
}
