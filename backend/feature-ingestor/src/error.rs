use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Debug, Error)]
pub enum IngestError {
    /// Payload is not UTF-8 JSON object text
    #[error("Decode error: {0}")]
    Decode(String),

    /// Payload decoded but a required field is missing or unusable
    #[error("Validation error: {} - payload: {}", .reasons.join("; "), .payload)]
    Validation { reasons: Vec<String>, payload: String },

    /// Store refused connections and the retry policy gave up
    #[error("Storage connection error: {0}")]
    StorageConnection(String),

    /// Connected, but the statement failed
    #[error("Storage write error: {0}")]
    StorageWrite(String),

    /// Broker unreachable at startup
    #[error("Broker connection error: {0}")]
    BrokerConnection(String),

    /// Broker delivered an error instead of a message
    #[error("Broker receive error: {0}")]
    BrokerReceive(String),
}

impl IngestError {
    /// Errors the ingestion loop logs and skips past instead of stopping.
    pub fn is_per_message(&self) -> bool {
        matches!(
            self,
            IngestError::Decode(_)
                | IngestError::Validation { .. }
                | IngestError::StorageConnection(_)
                | IngestError::StorageWrite(_)
                | IngestError::BrokerReceive(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_lists_reasons_and_payload() {
        let err = IngestError::Validation {
            reasons: vec!["missing user_id".into(), "missing value".into()],
            payload: r#"{"event_type":"click"}"#.into(),
        };
        assert_eq!(
            err.to_string(),
            r#"Validation error: missing user_id; missing value - payload: {"event_type":"click"}"#
        );
    }

    #[test]
    fn test_classification() {
        assert!(IngestError::Decode("bad".into()).is_per_message());
        assert!(IngestError::StorageWrite("x".into()).is_per_message());
        assert!(!IngestError::BrokerConnection("x".into()).is_per_message());
    }
}
