//! Wire types for the session service.
//!
//! Each connection carries exactly one request and one response, each a single
//! JSON document terminated by a newline.

use chrono::SecondsFormat;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Loosely typed command arguments.
pub type Args = Map<String, Value>;

/// A command sent by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub command: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub args: Args,
}

impl Request {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Args::new(),
        }
    }

    #[cfg(test)]
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Args, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Args>::deserialize(deserializer)?.unwrap_or_default())
}

/// Machine-readable failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed or undecodable request message
    InvalidRequest,
    /// Unknown command or handler-level failure
    CommandError,
    /// Unexpected failure while handling a connection
    InternalError,
    /// Client-side only: the service could not be reached
    ConnectionError,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::InvalidRequest => write!(f, "INVALID_REQUEST"),
            ErrorCode::CommandError => write!(f, "COMMAND_ERROR"),
            ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
            ErrorCode::ConnectionError => write!(f, "CONNECTION_ERROR"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

/// Response envelope. `error` is authoritative for failure; `data` is only
/// present on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<ErrorInfo>,
    pub timestamp: String,
}

impl Response {
    pub fn success(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: now_timestamp(),
        }
    }

    pub fn failure(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorInfo {
                code,
                message: message.into(),
            }),
            timestamp: now_timestamp(),
        }
    }

    #[cfg(test)]
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|e| e.code)
    }
}

fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
