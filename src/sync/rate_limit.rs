//! Rate limiting for sync checks.

use super::{SyncResult, SyncStrategy};
use crate::sources::{ConfigMetadata, RemoteConfigService};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

type CheckKey = (String, Option<String>);

/// Wraps another strategy and skips backend checks made too close together.
///
/// After a check for a key answers `UpToDate`, further checks for that key
/// within `min_interval` report `UpToDate` without contacting the backend.
/// Any other answer clears the key, so a load that learned of a newer revision
/// but failed to fetch it checks again next time.
///
/// # Examples
///
/// ```rust
/// use config_mediator::sync::{RateLimitedSyncStrategy, ServiceSyncStrategy};
/// use std::time::Duration;
///
/// let strategy = RateLimitedSyncStrategy::new(ServiceSyncStrategy, Duration::from_secs(30));
/// ```
pub struct RateLimitedSyncStrategy<S> {
    inner: S,
    min_interval: Duration,
    last_checked: Mutex<HashMap<CheckKey, Instant>>,
}

impl<S> RateLimitedSyncStrategy<S> {
    /// Wrap `inner`, allowing at most one backend check per key per `min_interval`.
    pub fn new(inner: S, min_interval: Duration) -> Self {
        Self {
            inner,
            min_interval,
            last_checked: Mutex::new(HashMap::new()),
        }
    }

    /// The configured minimum spacing between backend checks.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    fn recently_checked(&self, key: &CheckKey) -> bool {
        self.last_checked
            .lock()
            .get(key)
            .is_some_and(|at| at.elapsed() < self.min_interval)
    }
}

#[async_trait]
impl<S: SyncStrategy> SyncStrategy for RateLimitedSyncStrategy<S> {
    async fn check_for_updates(
        &self,
        local: &ConfigMetadata,
        service: &dyn RemoteConfigService,
        env: &str,
        version: Option<&str>,
    ) -> SyncResult {
        let key = (env.to_string(), version.map(str::to_string));
        if self.recently_checked(&key) {
            return SyncResult::UpToDate;
        }

        let result = self
            .inner
            .check_for_updates(local, service, env, version)
            .await;

        let mut last_checked = self.last_checked.lock();
        if result == SyncResult::UpToDate {
            last_checked.insert(key, Instant::now());
        } else {
            last_checked.remove(&key);
        }
        drop(last_checked);

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::sync::ServiceSyncStrategy;
    use crate::sync::test_support::ScriptedService;

    #[tokio::test(start_paused = true)]
    async fn test_skips_checks_within_interval() {
        let service = ScriptedService::new(SyncResult::UpToDate);
        let strategy = RateLimitedSyncStrategy::new(ServiceSyncStrategy, Duration::from_secs(30));
        let local = ConfigMetadata::new("v1");

        strategy.check_for_updates(&local, &service, "prod", None).await;
        *service.sync_result.lock() = SyncResult::NeedsUpdate;

        let second = strategy.check_for_updates(&local, &service, "prod", None).await;
        assert_eq!(second, SyncResult::UpToDate);
        assert_eq!(service.checks(), 1);

        tokio::time::advance(Duration::from_secs(31)).await;

        let third = strategy.check_for_updates(&local, &service, "prod", None).await;
        assert_eq!(third, SyncResult::NeedsUpdate);
        assert_eq!(service.checks(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_needs_update_is_not_remembered() {
        let service = ScriptedService::new(SyncResult::NeedsUpdate);
        let strategy = RateLimitedSyncStrategy::new(ServiceSyncStrategy, Duration::from_secs(30));
        let local = ConfigMetadata::new("v1");

        strategy.check_for_updates(&local, &service, "prod", None).await;
        let second = strategy.check_for_updates(&local, &service, "prod", None).await;

        assert_eq!(second, SyncResult::NeedsUpdate);
        assert_eq!(service.checks(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_limited_independently() {
        let service = ScriptedService::new(SyncResult::UpToDate);
        let strategy = RateLimitedSyncStrategy::new(ServiceSyncStrategy, Duration::from_secs(30));
        let local = ConfigMetadata::new("v1");

        strategy.check_for_updates(&local, &service, "prod", None).await;
        strategy
            .check_for_updates(&local, &service, "prod", Some("2"))
            .await;
        strategy.check_for_updates(&local, &service, "staging", None).await;

        assert_eq!(service.checks(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_are_not_remembered() {
        let service = ScriptedService::new(SyncResult::Error(ServiceError::Transport(
            "refused".to_string(),
        )));
        let strategy = RateLimitedSyncStrategy::new(ServiceSyncStrategy, Duration::from_secs(30));
        let local = ConfigMetadata::new("v1");

        strategy.check_for_updates(&local, &service, "prod", None).await;
        let second = strategy.check_for_updates(&local, &service, "prod", None).await;

        assert!(matches!(second, SyncResult::Error(_)));
        assert_eq!(service.checks(), 2);
    }
}
