//! Client error types

use http::StatusCode;
use shared::{DB_UNAVAILABLE_ERROR, ErrorBody};
use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned a non-success status
    #[error("API error ({status}): {text}")]
    Api {
        status: StatusCode,
        /// Parsed error body, if the server sent a structured one
        body: Option<ErrorBody>,
        /// Raw response text
        text: String,
    },

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Classification of an API error for user display
#[derive(Debug, Clone)]
pub struct ConnectionErrorInfo {
    /// User-friendly message
    pub message: String,
    /// Whether the error was caused by the database being unavailable
    pub is_connection_error: bool,
    /// Display form of the underlying error, for logs
    pub original_message: String,
}

/// Classify an API error as a database connection error or not
///
/// An error counts as a connection error when the server answered 503
/// or the structured body carries the database-unavailable marker.
pub fn handle_database_connection_error(error: &ClientError) -> ConnectionErrorInfo {
    let original_message = error.to_string();

    let is_connection_error = match error {
        ClientError::Api { status, body, .. } => {
            *status == StatusCode::SERVICE_UNAVAILABLE
                || body
                    .as_ref()
                    .is_some_and(|b| b.error == DB_UNAVAILABLE_ERROR)
        }
        _ => false,
    };

    if is_connection_error {
        return ConnectionErrorInfo {
            message: "Database connection is currently unavailable. Please try again later."
                .to_string(),
            is_connection_error: true,
            original_message,
        };
    }

    let message = match error {
        ClientError::Api {
            body: Some(body), ..
        } => body.message.clone(),
        other => other.to_string(),
    };

    ConnectionErrorInfo {
        message,
        is_connection_error: false,
        original_message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(status: StatusCode, body: Option<ErrorBody>) -> ClientError {
        let text = body
            .as_ref()
            .map(|b| serde_json::to_string(b).unwrap())
            .unwrap_or_default();
        ClientError::Api { status, body, text }
    }

    #[test]
    fn test_503_is_connection_error() {
        let error = api_error(StatusCode::SERVICE_UNAVAILABLE, None);
        let info = handle_database_connection_error(&error);
        assert!(info.is_connection_error);
        assert_eq!(
            info.message,
            "Database connection is currently unavailable. Please try again later."
        );
    }

    #[test]
    fn test_marker_body_is_connection_error_regardless_of_status() {
        let error = api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            Some(ErrorBody::new(DB_UNAVAILABLE_ERROR, "try later")),
        );
        let info = handle_database_connection_error(&error);
        assert!(info.is_connection_error);
    }

    #[test]
    fn test_plain_500_is_not_connection_error() {
        let error = api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            Some(ErrorBody::new("Internal server error", "boom")),
        );
        let info = handle_database_connection_error(&error);
        assert!(!info.is_connection_error);
        assert_eq!(info.message, "boom");
        assert!(info.original_message.contains("500"));
    }

    #[test]
    fn test_other_api_error_uses_body_message() {
        let error = api_error(
            StatusCode::NOT_FOUND,
            Some(ErrorBody::new("Not found", "Movie not found")),
        );
        let info = handle_database_connection_error(&error);
        assert!(!info.is_connection_error);
        assert_eq!(info.message, "Movie not found");
    }

    #[test]
    fn test_non_api_error_uses_display() {
        let error = ClientError::InvalidResponse("truncated".to_string());
        let info = handle_database_connection_error(&error);
        assert!(!info.is_connection_error);
        assert_eq!(info.message, "Invalid response: truncated");
    }
}
