use crate::locator::Locator;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not ready")]
    NotReady,

    #[error("Navigation error: {0}")]
    Navigation(String),

    #[error("Element '{name}' not found within {timeout_ms}ms ({locator})")]
    NotFound {
        name: String,
        locator: Locator,
        timeout_ms: u64,
    },

    #[error("No locator named '{name}' in the {domain} catalog")]
    UnknownLocator { domain: String, name: String },

    #[error("Stale element handle #{0}")]
    StaleElement(u64),

    #[error("WebDriver error: {0}")]
    WebDriver(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Failed to set up a browser session after {} attempt(s):\n{}\n{}", .attempts.len(), .attempts.join("\n"), .guidance)]
    Setup {
        attempts: Vec<String>,
        guidance: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl SessionError {
    /// True for element lookups that may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::StaleElement(_))
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{method} {url} returned HTTP {status}")]
    Status {
        method: String,
        url: String,
        status: u16,
    },

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl ApiError {
    /// Connection-level failures, as opposed to a server that answered.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Transport { .. } => true,
            ApiError::Status { status, .. } => *status >= 500,
            ApiError::Decode { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_error_lists_attempts() {
        let err = SessionError::Setup {
            attempts: vec!["PATH: not found".into(), "/usr/bin/chromedriver: missing".into()],
            guidance: "Install chromedriver".into(),
        };
        let text = err.to_string();
        assert!(text.contains("2 attempt(s)"));
        assert!(text.contains("PATH: not found"));
        assert!(text.ends_with("Install chromedriver"));
    }

    #[test]
    fn test_transient_classification() {
        let transport = ApiError::Transport {
            url: "http://x".into(),
            message: "connection refused".into(),
        };
        let server = ApiError::Status {
            method: "GET".into(),
            url: "http://x".into(),
            status: 503,
        };
        let client = ApiError::Status {
            method: "GET".into(),
            url: "http://x".into(),
            status: 404,
        };
        assert!(transport.is_transient());
        assert!(server.is_transient());
        assert!(!client.is_transient());
    }
}
