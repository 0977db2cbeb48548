use std::fmt;

use thiserror::Error;

/// HTTP-level failure classes reported by the remote CI host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    Unauthorized,
    Forbidden,
    NotFound,
    Unknown(u16),
}

impl RemoteErrorKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "Error - 401. Unauthorized access to resource"),
            Self::Forbidden => write!(f, "Error - 403. Insufficient privileges to access resource"),
            Self::NotFound => write!(f, "Error - 404. Resource not found"),
            Self::Unknown(code) => write!(f, "Unknown error code: '{code}' returned by host"),
        }
    }
}

fn remote_hint(kind: &RemoteErrorKind) -> &'static str {
    match kind {
        RemoteErrorKind::Unauthorized | RemoteErrorKind::Forbidden => {
            "Check credentials and try again."
        }
        RemoteErrorKind::NotFound => "Check resource availability and try again.",
        RemoteErrorKind::Unknown(_) => "Wait for a couple of minutes and try again...",
    }
}

#[derive(Error, Debug)]
pub enum CITreeError {
    #[error("{kind} at: '{url}'. {}", remote_hint(.kind))]
    RemoteApi { kind: RemoteErrorKind, url: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Illegible data received from '{url}': {reason}")]
    IllegibleData { url: String, reason: String },

    #[error("Parent '{parent}' of job '{job}' could not be resolved")]
    UnresolvedParent { job: String, parent: String },

    #[error("Job hierarchy contains a cycle: {}", .chain.join(" -> "))]
    HierarchyCycle { chain: Vec<String> },

    #[error("No source of system '{system}' is able to perform: {operation}")]
    NoMatchingSource { system: String, operation: String },

    #[error(
        "Too many sources of system '{system}' are able to perform: {operation} ({}). \
         Pick one with --source",
        .candidates.join(", ")
    )]
    AmbiguousSource {
        system: String,
        operation: String,
        candidates: Vec<String>,
    },

    #[error("Invalid pattern '{pattern}' for filter '{filter}': {reason}")]
    InvalidPattern {
        filter: String,
        pattern: String,
        reason: String,
    },

    #[error("Invalid range expression '{value}' for filter '{filter}'")]
    InvalidRange { filter: String, value: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CITreeError {
    /// True for a remote 404, which the hierarchy walk treats as a dead end.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::RemoteApi {
                kind: RemoteErrorKind::NotFound,
                ..
            }
        )
    }
}

pub type Result<T> = std::result::Result<T, CITreeError>;
