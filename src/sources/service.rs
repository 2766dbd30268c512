//! Remote configuration service trait.

use super::{ConfigData, ConfigMetadata};
use crate::error::ServiceError;
use crate::sync::SyncResult;
use async_trait::async_trait;

/// Result of a remote fetch: `Ok(None)` means the backend has no configuration
/// for the key.
pub type FetchResult = std::result::Result<Option<Box<dyn ConfigData>>, ServiceError>;

/// Trait for remote configuration backends.
///
/// Implement this trait to plug a backend (HTTP, GraphQL, a message bus) into a
/// [`ConfigMediator`](crate::core::ConfigMediator).
#[async_trait]
pub trait RemoteConfigService: Send + Sync {
    /// Fetch the full configuration for `env` (and optionally `version`).
    ///
    /// Return `Ok(None)` when the backend answered that nothing exists. Return
    /// an error only for failures where the answer is unknown.
    async fn fetch_config(&self, env: &str, version: Option<&str>) -> FetchResult;

    /// Check whether the locally cached revision is still current.
    ///
    /// This must be cheap and must not have the side effects of a full fetch.
    /// It should not retry internally.
    async fn check_for_updates(
        &self,
        local: &ConfigMetadata,
        env: &str,
        version: Option<&str>,
    ) -> SyncResult;

    /// Fetch only the remote revision metadata.
    ///
    /// Backends that cannot answer this cheaply keep the default, which reports
    /// no metadata.
    async fn fetch_metadata(
        &self,
        _env: &str,
        _version: Option<&str>,
    ) -> std::result::Result<Option<ConfigMetadata>, ServiceError> {
        Ok(None)
    }

    /// Get a human-readable name for this service (for logging/debugging).
    fn name(&self) -> String {
        "remote".to_string()
    }
}
