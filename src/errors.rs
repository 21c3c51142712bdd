// ABOUTME: Unified error handling for the Meridian client
// ABOUTME: Error kinds, the tagged server error-detail union, and HTTP status classification
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Meridian Labs

//! # Client Error Handling
//!
//! Every fallible operation in this crate returns [`ClientError`]. Server
//! error bodies carry a `detail` field that is sometimes a plain string,
//! sometimes a list of validation objects, and sometimes an arbitrary
//! value; [`ErrorDetail`] resolves that union into a tagged variant at
//! the HTTP boundary so the rest of the crate never touches raw JSON.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Standard error kinds used throughout the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// No stored session; the caller must log in first
    #[serde(rename = "AUTH_REQUIRED")]
    AuthRequired,
    /// The session expired and could not be refreshed; stored tokens were cleared
    #[serde(rename = "AUTH_EXPIRED")]
    AuthExpired,
    /// The selected organization has no active subscription for this feature
    #[serde(rename = "SUBSCRIPTION_REQUIRED")]
    SubscriptionRequired,
    /// The authenticated user is not a member of the selected organization
    #[serde(rename = "MEMBERSHIP_DENIED")]
    MembershipDenied,
    /// The server rejected the request payload
    #[serde(rename = "VALIDATION")]
    Validation,
    /// The requested resource does not exist
    #[serde(rename = "NOT_FOUND")]
    NotFound,
    /// The organization exceeded its request quota
    #[serde(rename = "RATE_LIMITED")]
    RateLimited,
    /// The request could not be sent or the connection failed
    #[serde(rename = "TRANSPORT")]
    Transport,
    /// The response stream failed after it had started
    #[serde(rename = "STREAM")]
    Stream,
    /// A response body could not be decoded
    #[serde(rename = "PROTOCOL")]
    Protocol,
    /// Client configuration is missing or invalid
    #[serde(rename = "CONFIG")]
    Config,
    /// Persisted client state could not be read or written
    #[serde(rename = "STORAGE")]
    Storage,
    /// Another exchange is already streaming in this conversation
    #[serde(rename = "EXCHANGE_IN_PROGRESS")]
    ExchangeInProgress,
    /// The server returned an unclassified error status
    #[serde(rename = "API")]
    Api,
    /// An internal client invariant was violated
    #[serde(rename = "INTERNAL")]
    Internal,
}

impl ErrorKind {
    /// Get a user-facing description of this error kind
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::AuthRequired => "Authentication required",
            Self::AuthExpired => "Session expired, please log in again",
            Self::SubscriptionRequired => "No active subscription",
            Self::MembershipDenied => "Not a member of this organization",
            Self::Validation => "Invalid request",
            Self::NotFound => "Resource not found",
            Self::RateLimited => "Rate limit exceeded",
            Self::Transport => "Network error",
            Self::Stream => "Response stream failed",
            Self::Protocol => "Malformed server response",
            Self::Config => "Configuration error",
            Self::Storage => "Session storage error",
            Self::ExchangeInProgress => "A message is already streaming",
            Self::Api => "Server error",
            Self::Internal => "Internal client error",
        }
    }
}

/// The server's `detail` payload resolved into a tagged variant
///
/// FastAPI-style backends return `{"detail": ...}` where the value is a
/// string for most errors, a list of `{"msg": ...}` objects for request
/// validation failures, and occasionally something else entirely.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorDetail {
    /// No parseable detail was present
    None,
    /// A plain message string
    Message(String),
    /// Validation error messages, one per offending field
    Validation(Vec<String>),
    /// A detail value of an unexpected shape, preserved verbatim
    Unknown(serde_json::Value),
}

/// One entry of a FastAPI validation error list
#[derive(Debug, Deserialize)]
struct ValidationEntry {
    #[serde(default)]
    msg: Option<String>,
}

impl ErrorDetail {
    /// Resolve a raw error response body into a tagged detail variant
    #[must_use]
    pub fn parse(body: &str) -> Self {
        let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
            return Self::None;
        };
        let Some(detail) = value.get("detail") else {
            return Self::None;
        };

        match detail {
            serde_json::Value::String(message) => Self::Message(message.clone()),
            serde_json::Value::Array(entries) => {
                let messages: Vec<String> = entries
                    .iter()
                    .map(|entry| {
                        serde_json::from_value::<ValidationEntry>(entry.clone())
                            .ok()
                            .and_then(|parsed| parsed.msg)
                            .unwrap_or_else(|| entry.to_string())
                    })
                    .collect();
                Self::Validation(messages)
            }
            serde_json::Value::Null => Self::None,
            other => Self::Unknown(other.clone()),
        }
    }

    /// Render the detail for end-user display, if there is anything to show
    #[must_use]
    pub fn display_message(&self) -> Option<String> {
        match self {
            Self::None => None,
            Self::Message(message) => Some(message.clone()),
            Self::Validation(messages) => Some(messages.join(", ")),
            Self::Unknown(value) => Some(value.to_string()),
        }
    }
}

/// Unified error type for the client
#[derive(Debug, Error)]
pub struct ClientError {
    /// Error kind
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Server-provided detail, resolved at the HTTP boundary
    pub detail: ErrorDetail,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.description(), self.message)
    }
}

/// Result type alias for convenience
pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: ErrorDetail::None,
            source: None,
        }
    }

    /// Attach a resolved server detail
    #[must_use]
    pub fn with_detail(mut self, detail: ErrorDetail) -> Self {
        self.detail = detail;
        self
    }

    /// Attach a source error for chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// The message to show an end user: server detail when present,
    /// otherwise the client-side message
    #[must_use]
    pub fn display_message(&self) -> String {
        self.detail
            .display_message()
            .unwrap_or_else(|| self.message.clone())
    }

    /// No stored session
    #[must_use]
    pub fn auth_required() -> Self {
        Self::new(ErrorKind::AuthRequired, "no stored session, log in first")
    }

    /// Session expired (stored tokens have been cleared by the caller)
    #[must_use]
    pub fn auth_expired() -> Self {
        Self::new(ErrorKind::AuthExpired, "session expired")
    }

    /// Transport failure
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    /// Mid-stream failure
    pub fn stream(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Stream, message)
    }

    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    /// Persisted state error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    /// Internal invariant violation
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Another exchange is already streaming
    #[must_use]
    pub fn exchange_in_progress() -> Self {
        Self::new(
            ErrorKind::ExchangeInProgress,
            "wait for the current response to finish",
        )
    }

    /// Classify a non-2xx HTTP response into a client error
    ///
    /// The status code selects the kind; the body's `detail` union is
    /// resolved into [`ErrorDetail`] and attached for display.
    #[must_use]
    pub fn from_response(status: u16, body: &str) -> Self {
        let detail = ErrorDetail::parse(body);
        let error = match status {
            401 => Self::auth_expired(),
            402 => Self::new(
                ErrorKind::SubscriptionRequired,
                "the selected organization has no active subscription",
            ),
            403 => Self::new(
                ErrorKind::MembershipDenied,
                "you are not a member of the selected organization",
            ),
            404 => Self::new(ErrorKind::NotFound, "resource not found"),
            422 => Self::new(ErrorKind::Validation, "the server rejected the request"),
            429 => Self::new(ErrorKind::RateLimited, "rate limit exceeded, slow down"),
            _ => Self::new(ErrorKind::Api, format!("server error: {status}")),
        };
        error.with_detail(detail)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            return Self::new(ErrorKind::Protocol, "failed to decode server response")
                .with_source(error);
        }
        let message = if error.is_connect() {
            "could not connect to the Meridian backend".to_owned()
        } else if error.is_timeout() {
            "request timed out".to_owned()
        } else {
            error.to_string()
        };
        Self::transport(message).with_source(error)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(ErrorKind::Protocol, "failed to decode server response").with_source(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_parse_string() {
        let detail = ErrorDetail::parse(r#"{"detail": "No active subscription"}"#);
        assert_eq!(detail, ErrorDetail::Message("No active subscription".into()));
        assert_eq!(
            detail.display_message().as_deref(),
            Some("No active subscription")
        );
    }

    #[test]
    fn test_detail_parse_validation_list() {
        let body = r#"{"detail": [{"msg": "field required", "loc": ["body", "model"]}, {"msg": "value too long"}]}"#;
        let detail = ErrorDetail::parse(body);
        assert_eq!(
            detail,
            ErrorDetail::Validation(vec![
                "field required".to_owned(),
                "value too long".to_owned()
            ])
        );
        assert_eq!(
            detail.display_message().as_deref(),
            Some("field required, value too long")
        );
    }

    #[test]
    fn test_detail_parse_unknown_shape() {
        let detail = ErrorDetail::parse(r#"{"detail": {"code": 7}}"#);
        assert!(matches!(detail, ErrorDetail::Unknown(_)));
    }

    #[test]
    fn test_detail_parse_garbage_body() {
        assert_eq!(ErrorDetail::parse("<html>bad gateway</html>"), ErrorDetail::None);
        assert_eq!(ErrorDetail::parse(""), ErrorDetail::None);
    }

    #[test]
    fn test_from_response_classification() {
        assert_eq!(ClientError::from_response(401, "{}").kind, ErrorKind::AuthExpired);
        assert_eq!(
            ClientError::from_response(402, "{}").kind,
            ErrorKind::SubscriptionRequired
        );
        assert_eq!(
            ClientError::from_response(403, "{}").kind,
            ErrorKind::MembershipDenied
        );
        assert_eq!(ClientError::from_response(422, "{}").kind, ErrorKind::Validation);
        assert_eq!(ClientError::from_response(500, "{}").kind, ErrorKind::Api);
    }

    #[test]
    fn test_display_message_prefers_server_detail() {
        let error = ClientError::from_response(402, r#"{"detail": "Upgrade to Pro to continue"}"#);
        assert_eq!(error.display_message(), "Upgrade to Pro to continue");

        let bare = ClientError::from_response(500, "");
        assert_eq!(bare.display_message(), "server error: 500");
    }
}
