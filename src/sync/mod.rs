//! Staleness checks between the cached configuration and the backend.

mod ordering;
mod rate_limit;

pub use ordering::IdentifierOrderingStrategy;
pub use rate_limit::RateLimitedSyncStrategy;

use crate::error::ServiceError;
use crate::sources::{ConfigMetadata, RemoteConfigService};
use async_trait::async_trait;
use std::sync::Arc;

/// Outcome of a sync check. Produced fresh for every check, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncResult {
    /// The cached revision is current.
    UpToDate,
    /// The backend holds a newer revision.
    NeedsUpdate,
    /// The backend has no configuration for the key.
    NotFound,
    /// The check itself failed.
    Error(ServiceError),
}

impl SyncResult {
    /// Short label used in logs and metric attributes.
    pub fn label(&self) -> &'static str {
        match self {
            Self::UpToDate => "up_to_date",
            Self::NeedsUpdate => "needs_update",
            Self::NotFound => "not_found",
            Self::Error(_) => "error",
        }
    }
}

/// Policy deciding whether cached data is stale.
///
/// Strategies let callers put extra policy in front of the backend check,
/// such as rate limiting or custom identifier ordering.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use config_mediator::sources::{ConfigMetadata, RemoteConfigService};
/// use config_mediator::sync::{SyncResult, SyncStrategy};
///
/// /// Never refreshes once something is cached.
/// struct PinnedStrategy;
///
/// #[async_trait]
/// impl SyncStrategy for PinnedStrategy {
///     async fn check_for_updates(
///         &self,
///         _local: &ConfigMetadata,
///         _service: &dyn RemoteConfigService,
///         _env: &str,
///         _version: Option<&str>,
///     ) -> SyncResult {
///         SyncResult::UpToDate
///     }
/// }
/// ```
#[async_trait]
pub trait SyncStrategy: Send + Sync {
    /// Compare `local` against the backend reachable through `service`.
    async fn check_for_updates(
        &self,
        local: &ConfigMetadata,
        service: &dyn RemoteConfigService,
        env: &str,
        version: Option<&str>,
    ) -> SyncResult;
}

/// The default strategy: asks the service directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceSyncStrategy;

#[async_trait]
impl SyncStrategy for ServiceSyncStrategy {
    async fn check_for_updates(
        &self,
        local: &ConfigMetadata,
        service: &dyn RemoteConfigService,
        env: &str,
        version: Option<&str>,
    ) -> SyncResult {
        service.check_for_updates(local, env, version).await
    }
}

#[async_trait]
impl<T: SyncStrategy + ?Sized> SyncStrategy for Arc<T> {
    async fn check_for_updates(
        &self,
        local: &ConfigMetadata,
        service: &dyn RemoteConfigService,
        env: &str,
        version: Option<&str>,
    ) -> SyncResult {
        (**self)
            .check_for_updates(local, service, env, version)
            .await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::sources::FetchResult;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Service double that only answers metadata and sync checks.
    pub(crate) struct ScriptedService {
        pub(crate) sync_result: Mutex<SyncResult>,
        pub(crate) remote_metadata: Mutex<Result<Option<ConfigMetadata>, ServiceError>>,
        pub(crate) checks: AtomicUsize,
        pub(crate) metadata_calls: AtomicUsize,
    }

    impl ScriptedService {
        pub(crate) fn new(sync_result: SyncResult) -> Self {
            Self {
                sync_result: Mutex::new(sync_result),
                remote_metadata: Mutex::new(Ok(None)),
                checks: AtomicUsize::new(0),
                metadata_calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn with_remote_metadata(self, identifier: &str) -> Self {
            *self.remote_metadata.lock() = Ok(Some(ConfigMetadata::new(identifier)));
            self
        }

        pub(crate) fn checks(&self) -> usize {
            self.checks.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RemoteConfigService for ScriptedService {
        async fn fetch_config(&self, _env: &str, _version: Option<&str>) -> FetchResult {
            Ok(None)
        }

        async fn check_for_updates(
            &self,
            _local: &ConfigMetadata,
            _env: &str,
            _version: Option<&str>,
        ) -> SyncResult {
            self.checks.fetch_add(1, Ordering::SeqCst);
            self.sync_result.lock().clone()
        }

        async fn fetch_metadata(
            &self,
            _env: &str,
            _version: Option<&str>,
        ) -> Result<Option<ConfigMetadata>, ServiceError> {
            self.metadata_calls.fetch_add(1, Ordering::SeqCst);
            self.remote_metadata.lock().clone()
        }
    }
}
