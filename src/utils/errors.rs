use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What went wrong on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkErrorKind {
    /// Connection refused, DNS failure, reset, ...
    Transport,
    /// No response within the configured timeout
    Timeout,
    /// The service answered with a non-2xx status
    Status(u16),
    /// The body was not the JSON we expected
    Decode,
}

/// Every failure of a single HTTP exchange, normalized into one shape
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct NetworkError {
    pub kind: NetworkErrorKind,
    pub message: String,
}

impl NetworkError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: NetworkErrorKind::Transport,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: NetworkErrorKind::Timeout,
            message: message.into(),
        }
    }

    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self {
            kind: NetworkErrorKind::Status(code),
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            kind: NetworkErrorKind::Decode,
            message: message.into(),
        }
    }

    /// Map a reqwest failure onto our taxonomy
    pub fn from_reqwest(url: &str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(format!("Request to {} timed out", url))
        } else if err.is_decode() {
            Self::decode(format!("Invalid response from {}: {}", url, err))
        } else if let Some(status) = err.status() {
            Self::status(status.as_u16(), format!("{} returned {}", url, status))
        } else {
            Self::transport(format!(
                "Failed to reach {}. Is the analysis service running? ({})",
                url, err
            ))
        }
    }
}

/// Error for one analysis submission
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Rejected before any network call
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Another submission of the same view is still pending
    #[error("A request is already in progress")]
    Busy,
}

impl AnalysisError {
    pub fn validation(message: impl Into<String>) -> Self {
        AnalysisError::Validation(message.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AnalysisError::Validation(_))
    }
}

/// Failure of one slot inside a batch or comparison; siblings are unaffected
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{message}")]
pub struct ItemError {
    pub message: String,
    /// Excerpt of the input the service failed on, when it echoes one back
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ItemError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            text: None,
        }
    }
}
