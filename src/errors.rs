use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("backend returned {status}: {message}")]
    Api { status: StatusCode, message: String },

    #[error("backend rejected the request: {0}")]
    Rejected(String),

    #[error("push channel error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("response text is empty")]
    EmptyResponse,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ClientError {
    /// Whether retrying the same call later can reasonably succeed.
    /// Polling and the push loop keep going regardless; this only
    /// shapes log levels and CLI exit messages.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Network(_) | ClientError::Transport(_) => true,
            ClientError::Api { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }

    /// Text suitable for an operator-facing banner.
    pub fn banner_text(&self) -> String {
        match self {
            ClientError::Api { message, .. } | ClientError::Rejected(message) => {
                format!("Error: {}", message)
            }
            ClientError::EmptyResponse => "Please enter a response".to_string(),
            other => other.to_string(),
        }
    }
}

/// Extract the operator-facing message from a backend error body.
///
/// FastAPI puts it under `detail`, the hand-written handlers under
/// `message`; anything else falls back to the HTTP reason phrase.
pub fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("detail")
                .or_else(|| v.get("message"))
                .and_then(|m| match m {
                    serde_json::Value::String(s) => Some(s.clone()),
                    serde_json::Value::Null => None,
                    other => Some(other.to_string()),
                })
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_detail() {
        let msg = error_message(
            StatusCode::BAD_REQUEST,
            r#"{"detail":"task not pending","message":"ignored"}"#,
        );
        assert_eq!(msg, "task not pending");
    }

    #[test]
    fn test_error_message_falls_back_to_message() {
        let msg = error_message(StatusCode::OK, r#"{"success":false,"message":"expired"}"#);
        assert_eq!(msg, "expired");
    }

    #[test]
    fn test_error_message_falls_back_to_reason_phrase() {
        let msg = error_message(StatusCode::BAD_GATEWAY, "<html>oops</html>");
        assert_eq!(msg, "Bad Gateway");
    }

    #[test]
    fn test_transient_classification() {
        let api_5xx = ClientError::Api {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: "down".into(),
        };
        let api_4xx = ClientError::Api {
            status: StatusCode::NOT_FOUND,
            message: "missing".into(),
        };
        assert!(api_5xx.is_transient());
        assert!(!api_4xx.is_transient());
        assert!(!ClientError::EmptyResponse.is_transient());
    }

    #[test]
    fn test_banner_text_for_rejection() {
        let err = ClientError::Rejected("Task not awaiting input".into());
        assert_eq!(err.banner_text(), "Error: Task not awaiting input");
    }
}
