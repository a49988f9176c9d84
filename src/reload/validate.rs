//! Envelope validation for inbound messages.

use serde_json::Value;

use crate::core::ValidationError;

pub const SESSION_ID_MIN: usize = 8;
pub const SESSION_ID_MAX: usize = 128;

const MESSAGE_TYPES: &[&str] = &[
    "connect",
    "connected",
    "update",
    "reload",
    "error",
    "ping",
    "pong",
    "ack",
];

/// Check `type`, `sessionId` and the presence of a payload object.
///
/// Returns the message type on success.
pub fn validate_message_value(value: &Value) -> Result<&'static str, ValidationError> {
    let Some(obj) = value.as_object() else {
        return Err(ValidationError::message("message must be a JSON object"));
    };

    let type_name = match obj.get("type") {
        None => return Err(ValidationError::message("missing `type`")),
        Some(Value::String(t)) => MESSAGE_TYPES
            .iter()
            .copied()
            .find(|known| known == t)
            .ok_or_else(|| ValidationError::message(format!("unknown message type `{t}`")))?,
        Some(_) => return Err(ValidationError::message("`type` must be a string")),
    };

    match obj.get("sessionId") {
        None => return Err(ValidationError::message("missing `sessionId`")),
        Some(Value::String(id)) => validate_session_id(id)?,
        Some(_) => return Err(ValidationError::message("`sessionId` must be a string")),
    }

    match obj.get("payload") {
        Some(Value::Object(_)) => Ok(type_name),
        Some(_) => Err(ValidationError::message(format!(
            "`payload` of {type_name} must be an object"
        ))),
        None => Err(ValidationError::message(format!(
            "missing `payload` for {type_name}"
        ))),
    }
}

pub fn validate_session_id(id: &str) -> Result<(), ValidationError> {
    let len = id.chars().count();
    if (SESSION_ID_MIN..=SESSION_ID_MAX).contains(&len) {
        Ok(())
    } else {
        Err(ValidationError::message(format!(
            "`sessionId` must be {SESSION_ID_MIN}-{SESSION_ID_MAX} characters, got {len}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn err(value: Value) -> String {
        validate_message_value(&value).unwrap_err().to_string()
    }

    #[test]
    fn test_valid_envelope() {
        let value = json!({"type": "ping", "sessionId": "abcdefgh", "payload": {}});
        assert_eq!(validate_message_value(&value).unwrap(), "ping");
    }

    #[test]
    fn test_missing_fields() {
        assert!(err(json!({"sessionId": "abcdefgh", "payload": {}})).contains("missing `type`"));
        assert!(err(json!({"type": "ping", "payload": {}})).contains("missing `sessionId`"));
        assert!(err(json!({"type": "ack", "sessionId": "abcdefgh"})).contains("missing `payload` for ack"));
        assert!(err(json!([1, 2])).contains("JSON object"));
    }

    #[test]
    fn test_unknown_type() {
        assert!(err(json!({"type": "patch", "sessionId": "abcdefgh", "payload": {}})).contains("unknown message type"));
    }

    #[test]
    fn test_session_id_length_bounds() {
        assert!(validate_session_id("1234567").is_err());
        assert!(validate_session_id("12345678").is_ok());
        assert!(validate_session_id(&"x".repeat(128)).is_ok());
        assert!(validate_session_id(&"x".repeat(129)).is_err());
    }

    #[test]
    fn test_payload_must_be_object() {
        assert!(err(json!({"type": "ping", "sessionId": "abcdefgh", "payload": 3})).contains("must be an object"));
    }
}
