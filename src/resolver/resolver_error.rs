// error types shared by the caches, the inventory client and the resolver
use reqwest::StatusCode;
use serde_json::Error as JsonError;

#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    /// The node, VM or scale set does not exist in the inventory.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("HTTP error ({0}): {1}")]
    HttpError(StatusCode, String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] JsonError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification used by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Upstream,
}

impl ResolveError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ResolveError::NotFound(what.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolveError::NotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::Upstream,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

pub type Result<T> = std::result::Result<T, ResolveError>;
