//! Redaction of credentials in JSON payloads before they reach a log sink.
//!
//! Outbound and inbound provider payloads carry passwords, tokens and client
//! secrets. Nothing in this workspace logs a payload directly: it goes through
//! [`Redacted`], whose only constructor replaces every sensitive value with
//! [`REDACTED_PLACEHOLDER`].

use serde_json::{Map, Value};
use std::fmt;

pub const REDACTED_PLACEHOLDER: &str = "[REDACTED]";

/// Keys are compared case-insensitively with `_` and `-` removed, so
/// `refresh_token`, `RefreshToken` and `REFRESH_TOKEN` are the same key.
fn is_sensitive_key(key: &str) -> bool {
    let normalized: String = key
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect();

    normalized.contains("password")
        || normalized.contains("secret")
        || normalized.ends_with("token")
        || matches!(
            normalized.as_str(),
            "session" | "authorization" | "confirmationcode"
        )
}

/// `{"Name": "...", "Value": "..."}` attribute pairs hide the sensitive key in
/// a value.
fn is_sensitive_pair(map: &Map<String, Value>) -> bool {
    map.iter().any(|(k, v)| {
        k.eq_ignore_ascii_case("name") && v.as_str().is_some_and(is_sensitive_key)
    })
}

/// Return a copy of `value` with every sensitive field replaced, at any depth.
pub fn redact_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let pair = is_sensitive_pair(map);
            Value::Object(
                map.iter()
                    .map(|(k, v)| {
                        let redact = is_sensitive_key(k) || (pair && k.eq_ignore_ascii_case("value"));
                        let v = if redact {
                            Value::String(REDACTED_PLACEHOLDER.to_string())
                        } else {
                            redact_json(v)
                        };
                        (k.clone(), v)
                    })
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_json).collect()),
        other => other.clone(),
    }
}

/// A payload that is safe to log.
pub struct Redacted(Value);

impl Redacted {
    pub fn new(value: &Value) -> Self {
        Self(redact_json(value))
    }

    /// Redact a raw body. Bodies that are not JSON are summarised by length
    /// only, since their content cannot be inspected field by field.
    pub fn from_bytes(body: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => Self::new(&value),
            Err(_) => Self(Value::String(format!("<non-JSON body, {} bytes>", body.len()))),
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl fmt::Display for Redacted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Redacted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
