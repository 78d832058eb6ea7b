//! Failures that abort a lifecycle operation.
//!
//! Only the record store can abort a handler. Chat platform and timer
//! failures are logged where they happen and the handler carries on.

use crate::domain::Error;
use crate::domain::ports::RecordStoreError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Store(#[from] RecordStoreError),
}

impl From<LifecycleError> for Error {
    fn from(value: LifecycleError) -> Self {
        match value {
            LifecycleError::Store(RecordStoreError::Connection { .. }) => {
                Error::service_unavailable("subscription store is unavailable")
            }
            LifecycleError::Store(_) => Error::internal("subscription store failure"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    #[rstest]
    #[case(RecordStoreError::connection("refused"), ErrorCode::ServiceUnavailable)]
    #[case(RecordStoreError::query("syntax"), ErrorCode::InternalError)]
    #[case(RecordStoreError::corrupt("bad status"), ErrorCode::InternalError)]
    fn store_errors_map_to_domain_codes(
        #[case] source: RecordStoreError,
        #[case] expected: ErrorCode,
    ) {
        let error: Error = LifecycleError::from(source).into();
        assert_eq!(error.code(), expected);
    }

    #[rstest]
    fn domain_message_hides_adapter_detail() {
        let error: Error = LifecycleError::from(RecordStoreError::connection("10.0.0.3:5432")).into();
        assert!(!error.message().contains("10.0.0.3"));
    }
}
