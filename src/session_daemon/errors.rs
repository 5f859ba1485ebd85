//! Failures a command handler can report.
//!
//! Every variant is turned into a `COMMAND_ERROR` response by the router; the
//! message is the variant's `Display`.

use super::args::ArgumentError;
use crate::automation::ProviderError;

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error(transparent)]
    Argument(#[from] ArgumentError),

    #[error("Not connected to any application")]
    NotConnected,

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timed out after {timeout_ms}ms waiting for {what}")]
    WaitTimeout { what: String, timeout_ms: u64 },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl HandlerError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        HandlerError::Io {
            context: context.into(),
            source,
        }
    }
}

pub type HandlerResult = Result<serde_json::Value, HandlerError>;
