use std::io;

use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T, E = FeedError> = std::result::Result<T, E>;

/// Every failure a REST or push call can produce, normalized so callers
/// only deal with one shape. `Display` is the message shown to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Session missing or expired, please log in again")]
    Unauthorized,

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Push channel error: {0}")]
    Push(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl FeedError {
    /// Map a non-success HTTP status and its body into the taxonomy.
    pub fn from_status(status: StatusCode, body: &str, what: &str) -> Self {
        let message = body_message(body).unwrap_or_else(|| what.to_string());
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FeedError::Unauthorized,
            StatusCode::NOT_FOUND => FeedError::NotFound(message),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                FeedError::Validation(message)
            }
            status => FeedError::Server {
                status: status.as_u16(),
                message,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FeedError::NotFound(_))
    }
}

// Error bodies come back either as plain text or as a problem-details object.
fn body_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => ["message", "title", "error", "detail"]
            .iter()
            .find_map(|key| value.get(key).and_then(|v| v.as_str()))
            .map(str::to_string)
            .or_else(|| value.as_str().map(str::to_string)),
        Err(_) => Some(body.to_string()),
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FeedError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            FeedError::from_status(status, "", &err.to_string())
        } else {
            FeedError::Network(err.to_string())
        }
    }
}

impl From<reqwest_middleware::Error> for FeedError {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(err) => err.into(),
            reqwest_middleware::Error::Middleware(err) => FeedError::Network(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::Decode(err.to_string())
    }
}

impl From<io::Error> for FeedError {
    fn from(err: io::Error) -> Self {
        FeedError::Io(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for FeedError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        FeedError::Push(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            FeedError::from_status(StatusCode::UNAUTHORIZED, "", "GET /api/posts"),
            FeedError::Unauthorized
        );
        assert_eq!(
            FeedError::from_status(StatusCode::NOT_FOUND, "", "GET /api/posts/9"),
            FeedError::NotFound("GET /api/posts/9".to_string())
        );
        assert_eq!(
            FeedError::from_status(
                StatusCode::BAD_REQUEST,
                r#"{"title":"Title is required"}"#,
                "POST /api/posts"
            ),
            FeedError::Validation("Title is required".to_string())
        );
        assert_eq!(
            FeedError::from_status(StatusCode::BAD_GATEWAY, "upstream down", "GET /api/tags"),
            FeedError::Server {
                status: 502,
                message: "upstream down".to_string()
            }
        );
    }
}
