use crate::toast::Severity;
use thiserror::Error;

/// Main error type for page behaviors.
#[derive(Error, Debug)]
pub enum UiError {
    /// The server answered, but not with success.
    #[error("Request failed: {0}")]
    Request(String),

    /// Transport-level HTTP error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The host environment lacks a feature (fullscreen, observers, ...).
    #[error("Not supported: {0}")]
    Unsupported(String),

    /// A node was removed before the handler got to it.
    #[error("Element not found: {0}")]
    ElementMissing(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl UiError {
    /// Toast severity used when this error is surfaced to the user.
    pub fn severity(&self) -> Severity {
        match self {
            UiError::Unsupported(_) => Severity::Warning,
            _ => Severity::Danger,
        }
    }

    /// Whether the error should reach the user as a toast.
    ///
    /// Missing elements are a normal outcome of handlers racing each other
    /// against the same subtree and are only logged.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, UiError::ElementMissing(_))
    }

    /// Short message suitable for a toast.
    pub fn user_message(&self) -> String {
        match self {
            UiError::Request(msg) => msg.clone(),
            UiError::Http(_) | UiError::Json(_) => {
                "Network error. Please try again.".to_string()
            }
            UiError::Unsupported(what) => format!("{} is not supported by this browser", what),
            other => other.to_string(),
        }
    }
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, UiError>;
