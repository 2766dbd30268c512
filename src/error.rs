//! Error types for config-mediator.
//!
//! All error types are `Clone` so that the outcome of a coalesced load can be
//! handed to every caller waiting on it.

/// Result type alias for config-mediator operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors surfaced by the mediator to application code.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// No configuration exists for the requested key, neither cached nor remote.
    #[error("No configuration found for {0}")]
    NotFound(String),

    /// The sync check or the remote fetch failed.
    #[error("Failed to sync configuration for {key}: {source}")]
    SyncError {
        /// The `env[@version]` key being loaded
        key: String,
        /// The underlying service failure
        #[source]
        source: ServiceError,
    },

    /// The repository rejected the fetched configuration.
    #[error("Failed to serialize configuration: {0}")]
    SerializationError(String),

    /// The repository could not be read or written.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// A typed view could not be built from the current configuration.
    #[error("Failed to deserialize configuration: {0}")]
    DeserializationError(String),

    /// Mediator settings could not be loaded.
    #[error("Failed to load settings: {0}")]
    SettingsError(String),

    /// The mediator was assembled incorrectly.
    #[error("Invalid mediator setup: {0}")]
    InvalidSetup(String),
}

impl ConfigError {
    /// Returns `true` for the not-found kind.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns `true` for the sync-failure kind.
    pub fn is_sync_error(&self) -> bool {
        matches!(self, Self::SyncError { .. })
    }
}

/// Failures reported by a [`RemoteConfigService`](crate::sources::RemoteConfigService).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// The request never produced a response (connection, timeout, DNS).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The backend answered with an error status.
    #[error("backend returned {status}: {message}")]
    Backend {
        /// HTTP-like status code
        status: u16,
        /// Reason given by the backend
        message: String,
    },

    /// The backend answered but the payload could not be understood.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

impl ServiceError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Backend { status, .. } => *status >= 500,
            Self::InvalidPayload(_) => false,
        }
    }
}

/// Failures reported by a [`LocalConfigRepository`](crate::repository::LocalConfigRepository).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    /// The configuration shape is not supported by the storage medium.
    #[error("unsupported configuration shape: {0}")]
    Serialization(String),

    /// The storage medium could not be accessed.
    #[error("storage unavailable: {0}")]
    Io(String),
}

impl From<RepositoryError> for ConfigError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Serialization(msg) => ConfigError::SerializationError(msg),
            RepositoryError::Io(msg) => ConfigError::StorageError(msg),
        }
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::SettingsError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_conversion() {
        let err: ConfigError = RepositoryError::Serialization("nested sets".to_string()).into();
        assert!(matches!(err, ConfigError::SerializationError(_)));

        let err: ConfigError = RepositoryError::Io("disk full".to_string()).into();
        assert!(matches!(err, ConfigError::StorageError(_)));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(ServiceError::Transport("reset".to_string()).is_retryable());
        assert!(
            ServiceError::Backend {
                status: 503,
                message: "unavailable".to_string()
            }
            .is_retryable()
        );
        assert!(
            !ServiceError::Backend {
                status: 403,
                message: "forbidden".to_string()
            }
            .is_retryable()
        );
        assert!(!ServiceError::InvalidPayload("not json".to_string()).is_retryable());
    }

    #[test]
    fn test_sync_error_display_includes_cause() {
        let err = ConfigError::SyncError {
            key: "prod".to_string(),
            source: ServiceError::Transport("connection refused".to_string()),
        };
        let message = err.to_string();
        assert!(message.contains("prod"));
        assert!(message.contains("connection refused"));
        assert!(err.is_sync_error());
        assert!(!err.is_not_found());
    }
}
