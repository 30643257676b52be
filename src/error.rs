//! Error types for hostbridge.

use std::time::Duration;

use thiserror::Error;

/// Main error type for all hostbridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// I/O error during filesystem or process operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// No handler registered for the invoked channel.
    #[error("No handler registered for '{0}'")]
    NoHandler(String),

    /// The host answered with `success: false`.
    #[error("{0}")]
    Remote(String),

    /// Arguments failed validation before the handler ran.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A handler reported a failure.
    #[error("{0}")]
    Handler(String),

    /// A handler task panicked.
    #[error("Handler panicked on '{0}'")]
    HandlerPanicked(String),

    /// The host or window side of the channel is gone.
    #[error("Channel closed")]
    ChannelClosed,

    /// Window id not present in the window table.
    #[error("Unknown window: {0}")]
    UnknownWindow(u64),

    /// Process id not present in the process table.
    #[error("Unknown process: {0}")]
    UnknownProcess(u64),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP response with a non-success status.
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Operation exceeded its deadline.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Storage backend failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Encryption or decryption failure.
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Invalid configuration value.
    #[error("Config error: {0}")]
    Config(String),

    /// Platform collaborator failure (dialog, clipboard, shell...).
    #[error("Platform error: {0}")]
    Platform(String),

    /// Logger initialisation failure.
    #[error("Logger error: {0}")]
    Logger(String),
}

impl BridgeError {
    /// Shorthand for a handler-reported failure.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }

    /// Shorthand for a validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Result type alias using BridgeError.
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_handler_display() {
        let e = BridgeError::NoHandler("fs:readFile".into());
        assert_eq!(e.to_string(), "No handler registered for 'fs:readFile'");
    }

    #[test]
    fn test_handler_error_is_bare_message() {
        assert_eq!(BridgeError::handler("boom").to_string(), "boom");
        assert_eq!(BridgeError::Remote("boom".into()).to_string(), "boom");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let e: BridgeError = io.into();
        assert!(e.to_string().starts_with("I/O error"));
    }
}
