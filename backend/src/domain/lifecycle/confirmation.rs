//! Parsing of disclaimer confirmation replies.
//!
//! A valid reply holds the confirmation keyword and exactly one email
//! address, in any order: `dana@example.com מאשר`.

use crate::domain::subscription::{EmailAddress, EmailValidationError};

/// Why a reply was not accepted as a confirmation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfirmationRejection {
    #[error("reply does not contain the confirmation keyword")]
    MissingKeyword,
    #[error("reply must contain exactly one email address")]
    MissingEmail,
    #[error("invalid email address: {0}")]
    InvalidEmail(#[from] EmailValidationError),
}

/// Extract the email address from a confirmation reply.
pub fn parse_confirmation(text: &str, keyword: &str) -> Result<EmailAddress, ConfirmationRejection> {
    let keyword = keyword.trim();
    if keyword.is_empty() || !text.contains(keyword) {
        return Err(ConfirmationRejection::MissingKeyword);
    }
    let remainder = text.replace(keyword, " ");
    let mut tokens = remainder.split_whitespace();
    let (Some(candidate), None) = (tokens.next(), tokens.next()) else {
        return Err(ConfirmationRejection::MissingEmail);
    };
    Ok(EmailAddress::parse(candidate)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const KEYWORD: &str = "מאשר";

    #[rstest]
    #[case("dana@example.com מאשר")]
    #[case("מאשר dana@example.com")]
    #[case("  Dana@Example.com   מאשר\n")]
    #[case("dana@example.comמאשר")]
    fn accepts_keyword_with_one_address(#[case] text: &str) {
        let email = parse_confirmation(text, KEYWORD).expect("valid confirmation");
        assert_eq!(email.as_str(), "dana@example.com");
    }

    #[rstest]
    #[case("dana@example.com", ConfirmationRejection::MissingKeyword)]
    #[case("מאשר", ConfirmationRejection::MissingEmail)]
    #[case("dana@example.com other@example.com מאשר", ConfirmationRejection::MissingEmail)]
    #[case(
        "dana-at-example מאשר",
        ConfirmationRejection::InvalidEmail(EmailValidationError::MissingAt)
    )]
    fn rejects_other_replies(#[case] text: &str, #[case] expected: ConfirmationRejection) {
        assert_eq!(parse_confirmation(text, KEYWORD), Err(expected));
    }
}
