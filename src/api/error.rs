//! Unified error handling for the API gateway.
//!
//! Every failure leaving the network layer is normalized into [`ApiError`],
//! a closed set of error kinds callers can match on exhaustively. Raw
//! transport errors from reqwest never escape this module.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// The error envelope the backend returns for every failed request.
///
/// This shape is a hard contract: `{status: "error", message, status_code,
/// error, data?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub status: String,
    pub message: String,
    pub status_code: u16,
    #[serde(default)]
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Payload carried by every server-originated error kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorDetail {
    /// Human-readable message from the backend
    pub message: String,
    /// HTTP status code of the failed response
    pub status_code: u16,
    /// Machine-readable error code (e.g. `expired_access_token_error`)
    pub error_code: String,
    /// Optional structured payload (e.g. field-level validation errors)
    pub data: Option<serde_json::Value>,
}

impl std::fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.error_code, self.message)
    }
}

/// Closed error taxonomy for all backend calls.
///
/// `Transient` failures (429 and 5xx) are eligible for caller-initiated
/// retry; nothing here retries them automatically.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// 401 - credential expired or missing, triggers the refresh flow
    #[error("authentication required: {0}")]
    Authentication(ErrorDetail),

    /// 400/422 - rejected input, surfaced as field errors
    #[error("validation failed: {0}")]
    Validation(ErrorDetail),

    /// 403 - authenticated but not allowed
    #[error("permission denied: {0}")]
    Permission(ErrorDetail),

    /// 404 - no such resource
    #[error("not found: {0}")]
    NotFound(ErrorDetail),

    /// 408/429/5xx - worth retrying from the caller's side
    #[error("transient failure: {0}")]
    Transient(ErrorDetail),

    /// Network-level failure (timeout, connection refused, bad body)
    #[error("transport failure: {0}")]
    Transport(String),

    /// Anything the taxonomy does not recognize
    #[error("unexpected failure: {0}")]
    Unknown(ErrorDetail),
}

impl ApiError {
    /// Classify a non-2xx response body into an error kind.
    ///
    /// Malformed bodies still classify by status code; the envelope fields
    /// then fall back to generic values.
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        let envelope = serde_json::from_slice::<ErrorEnvelope>(body).ok();
        let detail = ErrorDetail {
            message: envelope
                .as_ref()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| {
                    let text = String::from_utf8_lossy(body).trim().to_string();
                    if text.is_empty() {
                        format!("Request failed with status {}", status)
                    } else {
                        text
                    }
                }),
            status_code: status.as_u16(),
            error_code: envelope
                .as_ref()
                .map(|e| e.error.clone())
                .filter(|code| !code.is_empty())
                .unwrap_or_else(|| "unknown_error".to_string()),
            data: envelope.and_then(|e| e.data),
        };

        match status {
            StatusCode::UNAUTHORIZED => Self::Authentication(detail),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Self::Validation(detail),
            StatusCode::FORBIDDEN => Self::Permission(detail),
            StatusCode::NOT_FOUND => Self::NotFound(detail),
            StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => Self::Transient(detail),
            _ if status.is_server_error() => Self::Transient(detail),
            _ => Self::Unknown(detail),
        }
    }

    /// Authentication error without a server response, used when the
    /// refresh flow gives up and the session is discarded.
    pub fn session_expired() -> Self {
        Self::Authentication(ErrorDetail {
            message: "Session expired, please log in again".to_string(),
            status_code: StatusCode::UNAUTHORIZED.as_u16(),
            error_code: "session_expired".to_string(),
            data: None,
        })
    }

    /// Whether this failure should enter the refresh-or-relogin flow.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    /// HTTP status code of the failure, if one was received.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Authentication(d)
            | Self::Validation(d)
            | Self::Permission(d)
            | Self::NotFound(d)
            | Self::Transient(d)
            | Self::Unknown(d) => Some(d.status_code),
            Self::Transport(_) => None,
        }
    }

    /// Human-readable message for display.
    pub fn message(&self) -> &str {
        match self {
            Self::Authentication(d)
            | Self::Validation(d)
            | Self::Permission(d)
            | Self::NotFound(d)
            | Self::Transient(d)
            | Self::Unknown(d) => &d.message,
            Self::Transport(message) => message,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Transport("Request timed out".to_string())
        } else if err.is_connect() {
            Self::Transport(format!("Failed to connect to server: {}", err))
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope_body(status_code: u16, error: &str, message: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "status": "error",
            "message": message,
            "status_code": status_code,
            "error": error,
        }))
        .unwrap()
    }

    #[test]
    fn test_401_classifies_as_authentication() {
        let body = envelope_body(401, "expired_access_token_error", "Access token has expired");
        let err = ApiError::from_response(StatusCode::UNAUTHORIZED, &body);
        assert!(err.is_authentication());
        assert_eq!(err.status_code(), Some(401));
        assert_eq!(err.message(), "Access token has expired");
    }

    #[test]
    fn test_status_taxonomy() {
        let cases = [
            (StatusCode::BAD_REQUEST, "Validation"),
            (StatusCode::UNPROCESSABLE_ENTITY, "Validation"),
            (StatusCode::FORBIDDEN, "Permission"),
            (StatusCode::NOT_FOUND, "NotFound"),
            (StatusCode::TOO_MANY_REQUESTS, "Transient"),
            (StatusCode::INTERNAL_SERVER_ERROR, "Transient"),
            (StatusCode::BAD_GATEWAY, "Transient"),
            (StatusCode::IM_A_TEAPOT, "Unknown"),
        ];
        for (status, expected) in cases {
            let err = ApiError::from_response(status, b"{}");
            let kind = match err {
                ApiError::Authentication(_) => "Authentication",
                ApiError::Validation(_) => "Validation",
                ApiError::Permission(_) => "Permission",
                ApiError::NotFound(_) => "NotFound",
                ApiError::Transient(_) => "Transient",
                ApiError::Transport(_) => "Transport",
                ApiError::Unknown(_) => "Unknown",
            };
            assert_eq!(kind, expected, "status {}", status);
        }
    }

    #[test]
    fn test_malformed_body_falls_back() {
        let err = ApiError::from_response(StatusCode::INTERNAL_SERVER_ERROR, b"<html>boom</html>");
        match err {
            ApiError::Transient(detail) => {
                assert_eq!(detail.error_code, "unknown_error");
                assert_eq!(detail.message, "<html>boom</html>");
            }
            other => panic!("Expected Transient, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_body_falls_back_to_status_text() {
        let err = ApiError::from_response(StatusCode::SERVICE_UNAVAILABLE, b"");
        assert!(err.message().contains("503"));
    }
}
