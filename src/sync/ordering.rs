//! Sync checks that order identifiers instead of testing equality.

use super::{SyncResult, SyncStrategy};
use crate::sources::{ConfigMetadata, RemoteConfigService};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::Arc;

type Comparator = Arc<dyn Fn(&str, &str) -> Ordering + Send + Sync>;

/// Fetches the remote metadata and compares sync identifiers with an ordering.
///
/// The cache is stale only when the local identifier orders strictly before
/// the remote one, so a backend rolling back to an older identifier does not
/// force a refetch.
///
/// # Examples
///
/// ```rust
/// use config_mediator::sync::IdentifierOrderingStrategy;
///
/// // "1.10.0" is newer than "1.9.3"
/// let strategy = IdentifierOrderingStrategy::dotted_numeric();
/// ```
#[derive(Clone)]
pub struct IdentifierOrderingStrategy {
    compare: Comparator,
}

impl IdentifierOrderingStrategy {
    /// Compare identifiers lexically.
    pub fn new() -> Self {
        Self::with_comparator(|local, remote| local.cmp(remote))
    }

    /// Compare identifiers with a custom ordering of `(local, remote)`.
    pub fn with_comparator<F>(compare: F) -> Self
    where
        F: Fn(&str, &str) -> Ordering + Send + Sync + 'static,
    {
        Self {
            compare: Arc::new(compare),
        }
    }

    /// Compare dot-separated numeric segments (`1.10.0` > `1.9.3`).
    ///
    /// Segments that are not numbers fall back to lexical comparison.
    pub fn dotted_numeric() -> Self {
        Self::with_comparator(compare_dotted)
    }
}

impl Default for IdentifierOrderingStrategy {
    fn default() -> Self {
        Self::new()
    }
}

fn compare_dotted(local: &str, remote: &str) -> Ordering {
    let mut left = local.split('.');
    let mut right = remote.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (Some(a), Some(b)) => {
                let ordering = match (a.parse::<u64>(), b.parse::<u64>()) {
                    (Ok(a), Ok(b)) => a.cmp(&b),
                    _ => a.cmp(b),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

#[async_trait]
impl SyncStrategy for IdentifierOrderingStrategy {
    async fn check_for_updates(
        &self,
        local: &ConfigMetadata,
        service: &dyn RemoteConfigService,
        env: &str,
        version: Option<&str>,
    ) -> SyncResult {
        match service.fetch_metadata(env, version).await {
            Err(err) => SyncResult::Error(err),
            Ok(None) => SyncResult::NotFound,
            Ok(Some(remote)) => {
                match (self.compare)(&local.sync_identifier, &remote.sync_identifier) {
                    Ordering::Less => SyncResult::NeedsUpdate,
                    Ordering::Equal | Ordering::Greater => SyncResult::UpToDate,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::sync::test_support::ScriptedService;
    use std::sync::atomic::Ordering as AtomicOrdering;

    #[test]
    fn test_compare_dotted() {
        assert_eq!(compare_dotted("1.9.3", "1.10.0"), Ordering::Less);
        assert_eq!(compare_dotted("2.0", "2.0"), Ordering::Equal);
        assert_eq!(compare_dotted("2.0.1", "2.0"), Ordering::Greater);
        assert_eq!(compare_dotted("1.beta", "1.alpha"), Ordering::Greater);
    }

    #[tokio::test]
    async fn test_newer_remote_needs_update() {
        let service = ScriptedService::new(SyncResult::UpToDate).with_remote_metadata("1.10.0");
        let strategy = IdentifierOrderingStrategy::dotted_numeric();

        let result = strategy
            .check_for_updates(&ConfigMetadata::new("1.9.3"), &service, "prod", None)
            .await;

        assert_eq!(result, SyncResult::NeedsUpdate);
        // The plain check is bypassed entirely.
        assert_eq!(service.checks(), 0);
        assert_eq!(service.metadata_calls.load(AtomicOrdering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_older_remote_is_up_to_date() {
        let service = ScriptedService::new(SyncResult::NeedsUpdate).with_remote_metadata("b");
        let strategy = IdentifierOrderingStrategy::new();

        let result = strategy
            .check_for_updates(&ConfigMetadata::new("c"), &service, "prod", None)
            .await;

        assert_eq!(result, SyncResult::UpToDate);
    }

    #[tokio::test]
    async fn test_missing_remote_metadata_is_not_found() {
        let service = ScriptedService::new(SyncResult::UpToDate);
        let result = IdentifierOrderingStrategy::new()
            .check_for_updates(&ConfigMetadata::new("v1"), &service, "prod", None)
            .await;

        assert_eq!(result, SyncResult::NotFound);
    }

    #[tokio::test]
    async fn test_metadata_failure_is_error() {
        let service = ScriptedService::new(SyncResult::UpToDate);
        *service.remote_metadata.lock() = Err(ServiceError::Transport("timeout".to_string()));

        let result = IdentifierOrderingStrategy::new()
            .check_for_updates(&ConfigMetadata::new("v1"), &service, "prod", None)
            .await;

        assert!(matches!(result, SyncResult::Error(ServiceError::Transport(_))));
    }
}
