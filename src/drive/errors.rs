//! Drive API Error Types
//!
//! Structured error handling for drive API operations.
//! Maps HTTP status codes to specific error variants in both directions:
//! the client parses responses into them, the server renders them.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Drive API error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriveError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error ({0}): {1}")]
    Server(u16, String),

    #[error("Request timeout")]
    Timeout,

    #[error("Request error: {0}")]
    Request(String),

    #[error("Malformed response: {0}")]
    Decode(String),
}

impl DriveError {
    /// HTTP status the server answers with for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            DriveError::Unauthenticated => StatusCode::UNAUTHORIZED,
            DriveError::NotFound(_) => StatusCode::NOT_FOUND,
            DriveError::Forbidden(_) => StatusCode::FORBIDDEN,
            DriveError::BadRequest(_) => StatusCode::BAD_REQUEST,
            DriveError::Timeout => StatusCode::REQUEST_TIMEOUT,
            DriveError::Server(status, _) => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            DriveError::Network(_) | DriveError::Request(_) | DriveError::Decode(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether this is a transport-level failure rather than an answer from the server
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            DriveError::Network(_) | DriveError::Timeout | DriveError::Decode(_)
        )
    }

    /// Create a DriveError from an HTTP status code and response body
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = error_message(body);
        match status {
            400 | 422 => DriveError::BadRequest(message),
            401 => DriveError::Unauthenticated,
            403 => DriveError::Forbidden(message),
            404 => DriveError::NotFound(message),
            408 => DriveError::Timeout,
            500..=599 => DriveError::Server(status, message),
            _ => DriveError::Request(format!("HTTP {}: {}", status, message)),
        }
    }
}

impl From<reqwest::Error> for DriveError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DriveError::Timeout
        } else if err.is_decode() {
            DriveError::Decode(err.to_string())
        } else {
            DriveError::Network(err.to_string())
        }
    }
}

/// Pull `message` out of a JSON error body, falling back to the raw text
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| body.to_string())
}

impl IntoResponse for DriveError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({ "message": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_mapping() {
        assert_eq!(
            DriveError::from_status(404, r#"{"message":"Folder not found"}"#),
            DriveError::NotFound("Folder not found".to_string())
        );
        assert_eq!(
            DriveError::from_status(403, "nope"),
            DriveError::Forbidden("nope".to_string())
        );
        assert_eq!(DriveError::from_status(401, ""), DriveError::Unauthenticated);
        assert!(matches!(
            DriveError::from_status(503, "down"),
            DriveError::Server(503, _)
        ));
        assert!(matches!(
            DriveError::from_status(418, "teapot"),
            DriveError::Request(_)
        ));
    }

    #[test]
    fn test_status_code_round_trip() {
        for status in [400u16, 403, 404, 408, 502] {
            let err = DriveError::from_status(status, "");
            assert_eq!(err.status_code().as_u16(), status);
        }
    }

    #[test]
    fn test_transport_classification() {
        assert!(DriveError::Network("reset".into()).is_transport());
        assert!(DriveError::Timeout.is_transport());
        assert!(!DriveError::NotFound("x".into()).is_transport());
        assert!(!DriveError::Forbidden("x".into()).is_transport());
    }
}
