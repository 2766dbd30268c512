//! Builder for constructing ConfigMediator instances.

use super::inflight::InflightLoads;
use super::mediator::MediatorInner;
use super::{ConfigMediator, LoadMode, RetryPolicy, StaleFallback};
use crate::error::{ConfigError, Result};
use crate::notify::SubscriberRegistry;
use crate::repository::{InMemoryRepository, LocalConfigRepository};
use crate::settings::MediatorSettings;
use crate::sources::RemoteConfigService;
use crate::sync::{RateLimitedSyncStrategy, ServiceSyncStrategy, SyncStrategy};
use arc_swap::ArcSwapOption;
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "metrics")]
use crate::metrics::MediatorMetrics;

/// Builder for constructing a [`ConfigMediator`].
///
/// Only the remote service is required. Without a repository the mediator
/// caches in memory; without a sync strategy it asks the service directly.
///
/// # Examples
///
/// ```rust,no_run
/// use config_mediator::prelude::*;
/// use config_mediator::repository::FileRepository;
///
/// # async fn example(service: impl RemoteConfigService + 'static) -> Result<()> {
/// let mediator = ConfigMediator::builder()
///     .with_service(service)
///     .with_repository(FileRepository::new("/var/cache/app/config.json"))
///     .with_load_mode(LoadMode::Hybrid)
///     .with_logging(true)
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct ConfigMediatorBuilder {
    service: Option<Arc<dyn RemoteConfigService>>,
    repository: Option<Arc<dyn LocalConfigRepository>>,
    strategy: Option<Arc<dyn SyncStrategy>>,
    load_mode: LoadMode,
    logging_enabled: bool,
    stale_fallback: StaleFallback,
    retry: RetryPolicy,
    sync_interval: Option<Duration>,
    #[cfg(feature = "metrics")]
    metrics: Option<MediatorMetrics>,
}

impl ConfigMediatorBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            service: None,
            repository: None,
            strategy: None,
            load_mode: LoadMode::default(),
            logging_enabled: false,
            stale_fallback: StaleFallback::default(),
            retry: RetryPolicy::default(),
            sync_interval: None,
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Set the remote configuration service.
    pub fn with_service<S: RemoteConfigService + 'static>(self, service: S) -> Self {
        self.with_service_arc(Arc::new(service))
    }

    /// Set a shared remote configuration service.
    pub fn with_service_arc(mut self, service: Arc<dyn RemoteConfigService>) -> Self {
        self.service = Some(service);
        self
    }

    /// Set the local repository. Defaults to an [`InMemoryRepository`].
    pub fn with_repository<R: LocalConfigRepository + 'static>(self, repository: R) -> Self {
        self.with_repository_arc(Arc::new(repository))
    }

    /// Set a shared local repository.
    pub fn with_repository_arc(mut self, repository: Arc<dyn LocalConfigRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Set the staleness policy used in hybrid mode.
    pub fn with_sync_strategy<S: SyncStrategy + 'static>(mut self, strategy: S) -> Self {
        self.strategy = Some(Arc::new(strategy));
        self
    }

    /// Set the load mode. Defaults to [`LoadMode::Hybrid`].
    pub fn with_load_mode(mut self, load_mode: LoadMode) -> Self {
        self.load_mode = load_mode;
        self
    }

    /// Enable or disable tracing events. Disabled by default.
    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.logging_enabled = enabled;
        self
    }

    /// Set what happens when a fetch announced as newer returns nothing.
    pub fn with_stale_fallback(mut self, fallback: StaleFallback) -> Self {
        self.stale_fallback = fallback;
        self
    }

    /// Retry transient fetch failures.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Apply loaded [`MediatorSettings`].
    ///
    /// A sync interval wraps the strategy (whichever is set when `build` runs)
    /// in a [`RateLimitedSyncStrategy`].
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use config_mediator::prelude::*;
    /// use config_mediator::settings::MediatorSettings;
    /// # use config_mediator::sources::RemoteConfigService;
    /// # use std::sync::Arc;
    ///
    /// # async fn example(service: Arc<dyn RemoteConfigService>) -> Result<()> {
    /// let settings = MediatorSettings::builder()
    ///     .with_file("config/mediator.yaml")
    ///     .with_env_overrides("MEDIATOR", "__")
    ///     .load()?;
    ///
    /// let mediator = ConfigMediator::builder()
    ///     .with_service_arc(service)
    ///     .with_settings(&settings)
    ///     .build()
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_settings(mut self, settings: &MediatorSettings) -> Self {
        self.load_mode = settings.load_mode;
        self.logging_enabled = settings.logging_enabled;
        self.stale_fallback = settings.stale_fallback;
        self.retry = settings.retry.policy();
        self.sync_interval = settings.sync_interval();
        self
    }

    /// Record metrics through `meter`.
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, meter: opentelemetry::metrics::Meter) -> Self {
        self.metrics = Some(MediatorMetrics::new(meter));
        self
    }

    /// Build the mediator.
    ///
    /// If the repository already holds a configuration, it is materialized so
    /// that `dispatch` works before the first load.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSetup`] if no service was provided.
    pub async fn build(self) -> Result<ConfigMediator> {
        let service = self.service.ok_or_else(|| {
            ConfigError::InvalidSetup("a remote configuration service is required".to_string())
        })?;

        let repository = self
            .repository
            .unwrap_or_else(|| Arc::new(InMemoryRepository::new()));

        let strategy = self
            .strategy
            .unwrap_or_else(|| Arc::new(ServiceSyncStrategy));
        let strategy: Arc<dyn SyncStrategy> = match self.sync_interval {
            Some(interval) => Arc::new(RateLimitedSyncStrategy::new(strategy, interval)),
            None => strategy,
        };

        let mediator = ConfigMediator::from_inner(MediatorInner {
            service,
            repository,
            strategy,
            load_mode: self.load_mode,
            logging_enabled: self.logging_enabled,
            stale_fallback: self.stale_fallback,
            retry: self.retry,
            current: ArcSwapOption::empty(),
            inflight: InflightLoads::default(),
            subscribers: SubscriberRegistry::new(),
            state_lock: tokio::sync::Mutex::new(()),
            #[cfg(feature = "metrics")]
            metrics: self.metrics,
        });

        mediator.prime().await;
        Ok(mediator)
    }
}

impl Default for ConfigMediatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigMediator {
    /// Create a new builder for constructing a mediator.
    pub fn builder() -> ConfigMediatorBuilder {
        ConfigMediatorBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::RetrySettings;
    use crate::sync::SyncResult;
    use crate::sync::test_support::ScriptedService;

    #[tokio::test]
    async fn test_build_requires_service() {
        let result = ConfigMediatorBuilder::new().build().await;
        assert!(matches!(result, Err(ConfigError::InvalidSetup(_))));
    }

    #[tokio::test]
    async fn test_defaults() {
        let mediator = ConfigMediatorBuilder::new()
            .with_service(ScriptedService::new(SyncResult::UpToDate))
            .build()
            .await
            .unwrap();

        assert_eq!(mediator.load_mode(), LoadMode::Hybrid);
        assert!(!mediator.logging_enabled());
        assert!(mediator.snapshot().is_none());
    }

    #[test]
    fn test_with_settings_applies_every_field() {
        let settings = MediatorSettings {
            load_mode: LoadMode::LocalOnly,
            logging_enabled: true,
            stale_fallback: StaleFallback::NotFound,
            retry: RetrySettings {
                max_attempts: 3,
                backoff_ms: 10,
            },
            sync_interval_secs: Some(5),
        };

        let builder = ConfigMediatorBuilder::new().with_settings(&settings);

        assert_eq!(builder.load_mode, LoadMode::LocalOnly);
        assert!(builder.logging_enabled);
        assert_eq!(builder.stale_fallback, StaleFallback::NotFound);
        assert_eq!(builder.retry, RetryPolicy::new(3, Duration::from_millis(10)));
        assert_eq!(builder.sync_interval, Some(Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_sync_interval_rate_limits_checks() {
        use crate::repository::InMemoryRepository;
        use crate::sources::{ConfigMetadata, JsonConfigData};

        let service = Arc::new(ScriptedService::new(SyncResult::UpToDate));
        let cached = JsonConfigData::default().with_metadata(ConfigMetadata::new("v1"));

        let mediator = ConfigMediatorBuilder::new()
            .with_service_arc(Arc::clone(&service) as Arc<dyn RemoteConfigService>)
            .with_repository(InMemoryRepository::seeded(&cached))
            .with_settings(&MediatorSettings {
                sync_interval_secs: Some(60),
                ..MediatorSettings::default()
            })
            .build()
            .await
            .unwrap();

        mediator.load_configs("prod", None).await.unwrap();
        mediator.load_configs("prod", None).await.unwrap();
        assert_eq!(service.checks(), 1);
    }
}
