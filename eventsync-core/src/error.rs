//! Error types for eventsync.

use thiserror::Error;

/// Errors that can occur in eventsync operations.
#[derive(Error, Debug)]
pub enum EventsyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input error: {0}")]
    Input(String),

    #[error("Input file {file} is missing required column '{column}'")]
    MissingColumn { file: String, column: String },

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Provider temporarily unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Provider '{0}' not found in PATH")]
    ProviderNotInstalled(String),

    #[error("Provider request timed out after {0}s")]
    ProviderTimeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl EventsyncError {
    /// Whether the failed operation may succeed if retried later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EventsyncError::ProviderUnavailable(_) | EventsyncError::ProviderTimeout(_)
        )
    }
}

/// Result type alias for eventsync operations.
pub type EventsyncResult<T> = Result<T, EventsyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(EventsyncError::ProviderUnavailable("503".into()).is_transient());
        assert!(EventsyncError::ProviderTimeout(30).is_transient());
        assert!(!EventsyncError::Provider("400 Bad Request".into()).is_transient());
        assert!(!EventsyncError::Config("bad".into()).is_transient());
    }
}
