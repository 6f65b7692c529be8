//! Payload decoding and validation
//!
//! Expected message value (UTF-8 JSON object):
//! ```json
//! {
//!   "user_id": "u1",
//!   "event_type": "click",
//!   "value": 3.5,
//!   "timestamp": "2024-01-01T00:00:00Z"
//! }
//! ```
//! `timestamp` may also be a JSON number. Extra keys are ignored.

use serde_json::{Map, Value};

use crate::error::{IngestError, Result};
use crate::models::{EventTimestamp, FeatureEvent};

const USER_ID: &str = "user_id";
const EVENT_TYPE: &str = "event_type";
const VALUE: &str = "value";
const TIMESTAMP: &str = "timestamp";

/// Decode and validate one payload into a `FeatureEvent`.
///
/// Returns `IngestError::Decode` when the bytes are not a JSON object and
/// `IngestError::Validation` when the object lacks a usable field.
pub fn decode(payload: Option<&[u8]>) -> Result<FeatureEvent> {
    let (text, object) = parse(payload)?;
    validate(&object, text)
}

/// Parse the raw bytes into a JSON object, keeping the source text for reporting.
pub fn parse(payload: Option<&[u8]>) -> Result<(&str, Map<String, Value>)> {
    let bytes = payload.ok_or_else(|| IngestError::Decode("message has no payload".to_string()))?;

    let text = std::str::from_utf8(bytes)
        .map_err(|e| IngestError::Decode(format!("payload is not valid UTF-8: {}", e)))?;

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(object)) => Ok((text, object)),
        Ok(other) => Err(IngestError::Decode(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(IngestError::Decode(format!("invalid JSON: {}", e))),
    }
}

/// Check every required field and collect all problems before failing.
pub fn validate(object: &Map<String, Value>, raw: &str) -> Result<FeatureEvent> {
    let mut reasons = Vec::new();

    let user_id = required_text(object, USER_ID, &mut reasons);
    let event_type = required_text(object, EVENT_TYPE, &mut reasons);
    let feature_value = required_number(object, VALUE, &mut reasons);
    let timestamp = required_timestamp(object, TIMESTAMP, &mut reasons);

    match (user_id, event_type, feature_value, timestamp) {
        (Some(user_id), Some(event_type), Some(feature_value), Some(timestamp))
            if reasons.is_empty() =>
        {
            Ok(FeatureEvent {
                user_id,
                event_type,
                feature_value,
                timestamp,
            })
        }
        _ => Err(IngestError::Validation {
            reasons,
            payload: raw.to_string(),
        }),
    }
}

fn present<'a>(object: &'a Map<String, Value>, key: &str, reasons: &mut Vec<String>) -> Option<&'a Value> {
    match object.get(key) {
        None => {
            reasons.push(format!("missing `{}`", key));
            None
        }
        Some(Value::Null) => {
            reasons.push(format!("`{}` is null", key));
            None
        }
        Some(value) => Some(value),
    }
}

fn required_text(object: &Map<String, Value>, key: &str, reasons: &mut Vec<String>) -> Option<String> {
    match present(object, key, reasons)? {
        Value::String(s) if s.trim().is_empty() => {
            reasons.push(format!("`{}` is empty", key));
            None
        }
        Value::String(s) => Some(s.clone()),
        other => {
            reasons.push(format!("`{}` must be a string, got {}", key, json_kind(other)));
            None
        }
    }
}

// Zero and negative values are valid; only absence and non-numbers are rejected.
fn required_number(object: &Map<String, Value>, key: &str, reasons: &mut Vec<String>) -> Option<f64> {
    match present(object, key, reasons)? {
        Value::Number(n) => match n.as_f64() {
            Some(v) if v.is_finite() => Some(v),
            _ => {
                reasons.push(format!("`{}` is not a finite number", key));
                None
            }
        },
        other => {
            reasons.push(format!("`{}` must be a number, got {}", key, json_kind(other)));
            None
        }
    }
}

fn required_timestamp(
    object: &Map<String, Value>,
    key: &str,
    reasons: &mut Vec<String>,
) -> Option<EventTimestamp> {
    match present(object, key, reasons)? {
        Value::String(s) if s.trim().is_empty() => {
            reasons.push(format!("`{}` is empty", key));
            None
        }
        Value::String(s) => Some(EventTimestamp::Text(s.clone())),
        Value::Number(n) if n.as_f64().map_or(false, f64::is_finite) => {
            Some(EventTimestamp::Numeric(n.clone()))
        }
        other => {
            reasons.push(format!(
                "`{}` must be a string or number, got {}",
                key,
                json_kind(other)
            ));
            None
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_str(s: &str) -> Result<FeatureEvent> {
        decode(Some(s.as_bytes()))
    }

    fn reasons(err: IngestError) -> Vec<String> {
        match err {
            IngestError::Validation { reasons, .. } => reasons,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_valid_message() {
        let event = decode_str(
            r#"{"user_id":"u1","event_type":"click","value":3.5,"timestamp":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        assert_eq!(event.user_id, "u1");
        assert_eq!(event.event_type, "click");
        assert_eq!(event.feature_value, 3.5);
        assert_eq!(
            event.timestamp,
            EventTimestamp::Text("2024-01-01T00:00:00Z".into())
        );
    }

    #[test]
    fn test_zero_value_is_not_absent() {
        let event = decode_str(
            r#"{"user_id":"u1","event_type":"click","value":0,"timestamp":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(event.feature_value, 0.0);
    }

    #[test]
    fn test_negative_value_accepted() {
        let event =
            decode_str(r#"{"user_id":"u1","event_type":"scroll","value":-2.25,"timestamp":"T1"}"#)
                .unwrap();
        assert_eq!(event.feature_value, -2.25);
    }

    #[test]
    fn test_numeric_timestamp_passes_through() {
        let event = decode_str(
            r#"{"user_id":"u1","event_type":"click","value":1,"timestamp":1704067200}"#,
        )
        .unwrap();
        assert_eq!(event.timestamp.to_string(), "1704067200");
    }

    #[test]
    fn test_extra_keys_ignored() {
        let event = decode_str(
            r#"{"user_id":"u1","event_type":"click","value":1,"timestamp":"T1","source":"web"}"#,
        )
        .unwrap();
        assert_eq!(event.user_id, "u1");
    }

    #[test]
    fn test_null_value_rejected() {
        let err = decode_str(r#"{"user_id":"u1","event_type":"click","value":null,"timestamp":"T1"}"#)
            .unwrap_err();
        assert_eq!(reasons(err), vec!["`value` is null".to_string()]);
    }

    #[test]
    fn test_missing_keys_all_reported() {
        let err = decode_str(r#"{"event_type":"click"}"#).unwrap_err();
        assert_eq!(
            reasons(err),
            vec![
                "missing `user_id`".to_string(),
                "missing `value`".to_string(),
                "missing `timestamp`".to_string(),
            ]
        );
    }

    #[test]
    fn test_empty_strings_rejected() {
        let err = decode_str(r#"{"user_id":"","event_type":" ","value":1,"timestamp":""}"#)
            .unwrap_err();
        assert_eq!(reasons(err).len(), 3);
    }

    #[test]
    fn test_string_value_rejected() {
        let err = decode_str(r#"{"user_id":"u1","event_type":"click","value":"3.5","timestamp":"T1"}"#)
            .unwrap_err();
        assert_eq!(
            reasons(err),
            vec!["`value` must be a number, got string".to_string()]
        );
    }

    #[test]
    fn test_validation_error_carries_payload() {
        let raw = r#"{"user_id":"u1"}"#;
        match decode_str(raw).unwrap_err() {
            IngestError::Validation { payload, .. } => assert_eq!(payload, raw),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_json_is_decode_error() {
        assert!(matches!(decode_str("{not json"), Err(IngestError::Decode(_))));
        assert!(matches!(decode_str("[1,2,3]"), Err(IngestError::Decode(_))));
        assert!(matches!(decode_str("42"), Err(IngestError::Decode(_))));
    }

    #[test]
    fn test_invalid_utf8_and_tombstone_are_decode_errors() {
        assert!(matches!(decode(Some(&[0xff, 0xfe])), Err(IngestError::Decode(_))));
        assert!(matches!(decode(None), Err(IngestError::Decode(_))));
    }
}
