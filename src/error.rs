//! Unified error types for the Yosemite client
//!
//! All errors flow through this module. Every code belongs to exactly one
//! [`ErrorKind`], which is what callers branch on when deciding whether an
//! operation may be retried.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for all client operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YxError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl YxError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Error class used for retry decisions
    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transport)
    }

    // Convenience constructors
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, msg)
    }

    pub fn invalid_name(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidName, msg)
    }

    pub fn invalid_key(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidKey, msg)
    }

    pub fn invalid_transaction(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidTransaction, msg)
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::EncodingError, msg)
    }

    pub fn required_keys_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RequiredKeysFailed, msg)
    }

    pub fn signing_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SigningFailed, msg)
    }

    pub fn node_rejected(code: ErrorCode, msg: impl Into<String>) -> Self {
        debug_assert_eq!(code.kind(), ErrorKind::NodeRejection);
        Self::new(code, msg)
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NetworkError, msg)
    }

    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseError, msg)
    }

    pub fn channel_closed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ChannelClosed, msg)
    }

    pub fn channel_state(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ChannelState, msg)
    }

    pub fn protocol_violation(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ProtocolViolation, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }
}

impl fmt::Display for YxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for YxError {}

/// Error classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input caught before any I/O. Never retried.
    Validation,
    /// Required-keys round trip or signing failed.
    Negotiation,
    /// Node accepted the request and reported a structured failure. Terminal.
    NodeRejection,
    /// HTTP/socket failure. The caller decides whether to retry.
    Transport,
    /// Event channel disconnect or protocol violation.
    Channel,
    Internal,
}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Input errors
    InvalidInput,
    InvalidName,
    InvalidAsset,
    InvalidKey,
    InvalidTransaction,
    EncodingError,

    // Negotiation errors
    RequiredKeysFailed,
    SigningFailed,
    KeyNotAvailable,

    // Node rejections
    DuplicateTransaction,
    TransactionExpired,
    MissingAuthority,
    InsufficientResources,
    TransactionRejected,

    // Transport errors
    NetworkError,
    Timeout,
    HttpStatus,
    ParseError,

    // Event channel errors
    ChannelClosed,
    ChannelState,
    ProtocolViolation,

    // Internal
    JsonError,
    Internal,
}

impl ErrorCode {
    pub fn kind(self) -> ErrorKind {
        match self {
            ErrorCode::InvalidInput
            | ErrorCode::InvalidName
            | ErrorCode::InvalidAsset
            | ErrorCode::InvalidKey
            | ErrorCode::InvalidTransaction
            | ErrorCode::EncodingError => ErrorKind::Validation,

            ErrorCode::RequiredKeysFailed
            | ErrorCode::SigningFailed
            | ErrorCode::KeyNotAvailable => ErrorKind::Negotiation,

            ErrorCode::DuplicateTransaction
            | ErrorCode::TransactionExpired
            | ErrorCode::MissingAuthority
            | ErrorCode::InsufficientResources
            | ErrorCode::TransactionRejected => ErrorKind::NodeRejection,

            ErrorCode::NetworkError
            | ErrorCode::Timeout
            | ErrorCode::HttpStatus
            | ErrorCode::ParseError => ErrorKind::Transport,

            ErrorCode::ChannelClosed
            | ErrorCode::ChannelState
            | ErrorCode::ProtocolViolation => ErrorKind::Channel,

            ErrorCode::JsonError | ErrorCode::Internal => ErrorKind::Internal,
        }
    }
}

/// Result type alias for client operations
pub type YxResult<T> = Result<T, YxError>;

// Conversions from common error types

impl From<serde_json::Error> for YxError {
    fn from(e: serde_json::Error) -> Self {
        YxError::new(ErrorCode::JsonError, e.to_string())
    }
}

impl From<hex::FromHexError> for YxError {
    fn from(e: hex::FromHexError) -> Self {
        YxError::new(ErrorCode::EncodingError, format!("Hex error: {}", e))
    }
}

impl From<std::io::Error> for YxError {
    fn from(e: std::io::Error) -> Self {
        YxError::new(ErrorCode::Internal, e.to_string())
    }
}

impl From<reqwest::Error> for YxError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            YxError::new(ErrorCode::Timeout, "Request timed out")
        } else if e.is_connect() {
            YxError::new(ErrorCode::NetworkError, "Connection failed")
        } else if e.is_decode() {
            YxError::new(ErrorCode::ParseError, e.to_string())
        } else {
            YxError::new(ErrorCode::NetworkError, e.to_string())
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for YxError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match e {
            WsError::ConnectionClosed | WsError::AlreadyClosed => {
                YxError::new(ErrorCode::ChannelClosed, e.to_string())
            }
            WsError::Protocol(_) => {
                YxError::new(ErrorCode::ProtocolViolation, e.to_string())
            }
            _ => YxError::new(ErrorCode::ChannelClosed, e.to_string()),
        }
    }
}

impl From<secp256k1::Error> for YxError {
    fn from(e: secp256k1::Error) -> Self {
        YxError::new(ErrorCode::InvalidKey, format!("Secp256k1 error: {}", e))
    }
}

impl From<url::ParseError> for YxError {
    fn from(e: url::ParseError) -> Self {
        YxError::new(ErrorCode::InvalidInput, format!("Invalid URL: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let err = YxError::node_rejected(ErrorCode::DuplicateTransaction, "Duplicate transaction")
            .with_details("tx_duplicate");

        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("duplicate_transaction"));
        assert!(json.contains("Duplicate transaction"));
    }

    #[test]
    fn test_every_rejection_code_is_terminal() {
        for code in [
            ErrorCode::DuplicateTransaction,
            ErrorCode::TransactionExpired,
            ErrorCode::MissingAuthority,
            ErrorCode::InsufficientResources,
            ErrorCode::TransactionRejected,
        ] {
            let err = YxError::new(code, "rejected");
            assert_eq!(err.kind(), ErrorKind::NodeRejection);
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn test_transport_is_retryable() {
        assert!(YxError::network("down").is_retryable());
        assert!(!YxError::invalid_name("x").is_retryable());
        assert_eq!(YxError::channel_closed("gone").kind(), ErrorKind::Channel);
    }

    #[test]
    fn test_display_includes_details() {
        let err = YxError::signing_failed("wallet refused").with_details("locked");
        assert_eq!(err.to_string(), "[SigningFailed] wallet refused (locked)");
    }
}
