//! Errors surfaced by the API layer
//!
//! Views turn these into user-facing strings; the binary wraps them in
//! `anyhow` like every other failure.

use serde_json::Value;
use thiserror::Error;

/// Keys that carry a human-readable message rather than a field error
const MESSAGE_KEYS: &[&str] = &["msg", "message", "detail", "reason", "non_field_errors"];

#[derive(Error, Debug)]
pub enum ApiError {
    /// Connection, TLS or timeout failure before a response arrived
    #[error("network error: {0}")]
    Transport(String),

    /// The response body did not match the expected shape
    #[error("unexpected response: {0}")]
    Decode(String),

    /// Any non-success status other than the intercepted 401/429
    #[error("server answered {status}: {}", summarize(.body))]
    Status { status: u16, body: Value },

    /// Token refresh failed, or the replayed request was rejected again
    #[error("session expired, please log in again")]
    SessionExpired,

    /// The backend rate limited this client
    #[error("too many requests, retry in {}s", .wait_secs.unwrap_or(0))]
    Throttled { wait_secs: Option<u64> },

    /// Local file could not be read for upload
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Build a status error from a raw body, keeping non-JSON bodies as text
    pub fn from_body(status: u16, body: &[u8]) -> Self {
        let body = serde_json::from_slice(body).unwrap_or_else(|_| {
            let text = String::from_utf8_lossy(body).trim().to_string();
            if text.is_empty() {
                Value::Null
            } else {
                Value::String(text)
            }
        });
        Self::Status { status, body }
    }

    /// HTTP status, when the server answered at all
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::SessionExpired => Some(401),
            Self::Throttled { .. } => Some(429),
            _ => None,
        }
    }

    /// Message the server put in its error body, if any
    pub fn server_message(&self) -> Option<String> {
        match self {
            Self::Status { body, .. } => message_of(body),
            _ => None,
        }
    }

    /// Error attached to one form field, e.g. `email` or `password2`
    pub fn field_error(&self, field: &str) -> Option<String> {
        match self {
            Self::Status {
                body: Value::Object(map),
                ..
            } => map.get(field).and_then(first_text),
            _ => None,
        }
    }

    /// Every field error in the body, skipping message keys
    pub fn field_errors(&self) -> Vec<(String, String)> {
        let Self::Status {
            body: Value::Object(map),
            ..
        } = self
        else {
            return Vec::new();
        };

        let source = match map.get("errors") {
            Some(Value::Object(nested)) => nested,
            _ => map,
        };

        source
            .iter()
            .filter(|(key, _)| !MESSAGE_KEYS.contains(&key.as_str()))
            .filter(|(key, _)| !matches!(key.as_str(), "status" | "success" | "errors"))
            .filter_map(|(key, value)| first_text(value).map(|text| (key.clone(), text)))
            .collect()
    }

    /// What to show the user: server message first, then `fallback`
    ///
    /// Interceptor outcomes keep their own wording since the user is being
    /// moved to another screen anyway.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::SessionExpired | Self::Throttled { .. } => self.to_string(),
            _ => self
                .server_message()
                .unwrap_or_else(|| fallback.to_string()),
        }
    }
}

fn message_of(body: &Value) -> Option<String> {
    match body {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Array(_) => first_text(body),
        Value::Object(map) => MESSAGE_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(first_text)),
        _ => None,
    }
}

/// First string in a value that is either a string or a list of strings
fn first_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Array(items) => items.iter().find_map(first_text),
        _ => None,
    }
}

fn summarize(body: &Value) -> String {
    message_of(body).unwrap_or_else(|| match body {
        Value::Null => "empty body".to_string(),
        other => other.to_string(),
    })
}
