//! Error types for the interactive SDK

use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use thiserror::Error;

/// Closed set of failure categories surfaced by the SDK
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// An authenticated REST call was made before `login`
    LoginRequired,
    /// A client code is mandatory for this user and none was supplied
    ClientCodeRequired,
    /// Connect failure, dropped socket, HTTP failure
    TransportFailure,
    /// Malformed inbound payload
    DecodeFailure,
    /// Caller passed arguments the SDK cannot act on
    Misuse,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::LoginRequired => "LoginRequired",
            ErrorKind::ClientCodeRequired => "ClientCodeRequired",
            ErrorKind::TransportFailure => "TransportFailure",
            ErrorKind::DecodeFailure => "DecodeFailure",
            ErrorKind::Misuse => "Misuse",
        };
        f.write_str(name)
    }
}

/// Main error type for the SDK
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}: {message}")]
pub struct SdkError {
    pub kind: ErrorKind,
    pub message: String,
    pub status_code: Option<u16>,
}

impl SdkError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
        }
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn login_required() -> Self {
        Self::new(ErrorKind::LoginRequired, "Login is Required").with_status(404)
    }

    pub fn client_code_required() -> Self {
        Self::new(ErrorKind::ClientCodeRequired, "ClientCode is Required").with_status(404)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TransportFailure, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DecodeFailure, message)
    }

    pub fn misuse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Misuse, message)
    }

    /// JSON body delivered to `error` subscribers when this error is
    /// reported through the event stream instead of a return value.
    pub fn to_event_payload(&self) -> Value {
        json!({
            "kind": self.kind,
            "message": self.message,
            "statusCode": self.status_code,
        })
    }
}

impl From<serde_json::Error> for SdkError {
    fn from(e: serde_json::Error) -> Self {
        SdkError::decode(format!("Invalid JSON: {}", e))
    }
}

impl From<reqwest::Error> for SdkError {
    fn from(e: reqwest::Error) -> Self {
        let err = SdkError::transport(e.to_string());
        match e.status() {
            Some(status) => err.with_status(status.as_u16()),
            None => err,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorSeverity {
    Low,      // Warnings, non-critical issues
    Medium,   // Recoverable errors
    High,     // Caller must act
}

impl ErrorSeverity {
    pub fn from_error(error: &SdkError) -> Self {
        match error.kind {
            ErrorKind::DecodeFailure => ErrorSeverity::Low,
            ErrorKind::TransportFailure => ErrorSeverity::Medium,
            ErrorKind::LoginRequired | ErrorKind::ClientCodeRequired | ErrorKind::Misuse => {
                ErrorSeverity::High
            }
        }
    }
}

/// Routes errors to the log at a level matching their severity
pub struct ErrorReporter;

impl ErrorReporter {
    pub fn report_error(error: &SdkError, operation: &str) {
        match ErrorSeverity::from_error(error) {
            ErrorSeverity::High => {
                tracing::error!(operation, status = ?error.status_code, "{}", error);
            }
            ErrorSeverity::Medium => {
                tracing::warn!(operation, status = ?error.status_code, "{}", error);
            }
            ErrorSeverity::Low => {
                tracing::debug!(operation, "{}", error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind() {
        let err = SdkError::decode("bad body");
        assert_eq!(err.to_string(), "DecodeFailure: bad body");
    }

    #[test]
    fn test_login_required_carries_status() {
        let err = SdkError::login_required();
        assert_eq!(err.kind, ErrorKind::LoginRequired);
        assert_eq!(err.status_code, Some(404));
    }

    #[test]
    fn test_event_payload_shape() {
        let payload = SdkError::misuse("empty token").to_event_payload();
        assert_eq!(payload["kind"], "Misuse");
        assert_eq!(payload["message"], "empty token");
        assert!(payload["statusCode"].is_null());
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(ErrorSeverity::from_error(&SdkError::decode("x")), ErrorSeverity::Low);
        assert_eq!(ErrorSeverity::from_error(&SdkError::transport("x")), ErrorSeverity::Medium);
        assert_eq!(ErrorSeverity::from_error(&SdkError::client_code_required()), ErrorSeverity::High);
    }
}
