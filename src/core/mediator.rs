//! The mediator coordinating cache, sync checks, fetches, and dispatch.

use super::inflight::InflightLoads;
use super::{ConfigSnapshot, LoadKey, LoadMode, RetryPolicy, StaleFallback};
use crate::error::{ConfigError, Result};
use crate::notify::{SubscriberRegistry, SubscriptionHandle};
use crate::repository::LocalConfigRepository;
use crate::sources::{ConfigData, ConfigMap, ConfigMetadata, RemoteConfigService};
use crate::sync::{SyncResult, SyncStrategy};
use arc_swap::ArcSwapOption;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use std::sync::Arc;

#[cfg(feature = "metrics")]
use crate::metrics::MediatorMetrics;

/// Emit a tracing event only when the mediator was built with logging enabled.
macro_rules! log_event {
    ($inner:expr, $level:ident, $($arg:tt)+) => {
        if $inner.logging_enabled {
            tracing::$level!($($arg)+);
        }
    };
}

/// State shared between a mediator, its clones, and its in-flight loads.
pub(crate) struct MediatorInner {
    pub(crate) service: Arc<dyn RemoteConfigService>,
    pub(crate) repository: Arc<dyn LocalConfigRepository>,
    pub(crate) strategy: Arc<dyn SyncStrategy>,
    pub(crate) load_mode: LoadMode,
    pub(crate) logging_enabled: bool,
    pub(crate) stale_fallback: StaleFallback,
    pub(crate) retry: RetryPolicy,
    pub(crate) current: ArcSwapOption<ConfigSnapshot>,
    pub(crate) inflight: InflightLoads,
    pub(crate) subscribers: SubscriberRegistry,
    /// Held while the repository is written or read into `current`, so a
    /// snapshot never mixes the configs of one save with the metadata of another.
    pub(crate) state_lock: tokio::sync::Mutex<()>,
    #[cfg(feature = "metrics")]
    pub(crate) metrics: Option<MediatorMetrics>,
}

/// The main handle for loading configuration and dispatching typed views.
///
/// `load_configs` decides, according to the [`LoadMode`], whether to serve the
/// cached configuration, fetch a fresh one, or run a sync check first.
/// `dispatch` projects whatever the last successful load materialized; it never
/// performs I/O.
///
/// Cloning is cheap and clones share all state, including in-flight loads.
///
/// # Examples
///
/// ```rust,no_run
/// use config_mediator::prelude::*;
///
/// # async fn example(service: impl RemoteConfigService + 'static) -> Result<()> {
/// let mediator = ConfigMediator::builder()
///     .with_service(service)
///     .with_load_mode(LoadMode::Hybrid)
///     .build()
///     .await?;
///
/// mediator.load_configs("prod", None).await?;
///
/// let dark_mode = mediator.dispatch(|configs| {
///     configs
///         .get("flags")
///         .and_then(|flags| flags.get("darkMode"))
///         .and_then(|value| value.as_bool())
///         .unwrap_or(false)
/// })?;
/// # Ok(())
/// # }
/// ```
pub struct ConfigMediator {
    inner: Arc<MediatorInner>,
}

impl ConfigMediator {
    pub(crate) fn from_inner(inner: MediatorInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Materialize repository data left from an earlier run, if any.
    pub(crate) async fn prime(&self) {
        self.inner.ensure_materialized().await;
    }

    /// Load the configuration for `env` (and optionally `version`).
    ///
    /// Concurrent calls for the same key are coalesced: later callers join the
    /// load already in flight and receive the same outcome, so the service is
    /// asked at most once and the repository written at most once.
    ///
    /// If every caller waiting on a load is dropped, the load is abandoned and
    /// the next call starts afresh.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::NotFound`] if no configuration exists for the key
    /// - [`ConfigError::SyncError`] if the sync check or the fetch failed; in
    ///   hybrid mode, previously cached data stays available to `dispatch`
    /// - [`ConfigError::SerializationError`] or [`ConfigError::StorageError`]
    ///   if the repository rejected the fetched configuration
    pub async fn load_configs(&self, env: &str, version: Option<&str>) -> Result<()> {
        let key = LoadKey::new(env, version);
        let inner = Arc::clone(&self.inner);

        let load = self.inner.inflight.join_or_start(&key, |id| {
            let key = key.clone();
            async move {
                let result = inner.run_load(&key).await;
                inner.inflight.settle(&key, id);
                result
            }
            .boxed()
        });

        if load.joined() {
            log_event!(self.inner, debug, env, version, "joining load already in flight");
            #[cfg(feature = "metrics")]
            if let Some(metrics) = &self.inner.metrics {
                metrics.record_coalesced();
            }
        }

        load.wait().await
    }

    /// Apply `mapper` to the current configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if no load has succeeded and the
    /// repository held no data when the mediator was built.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use config_mediator::prelude::*;
    /// # fn example(mediator: &ConfigMediator) -> Result<()> {
    /// let keys = mediator.dispatch(|configs| configs.len())?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn dispatch<T, F>(&self, mapper: F) -> Result<T>
    where
        F: FnOnce(&ConfigMap) -> T,
    {
        let snapshot = self.current()?;
        Ok(mapper(&snapshot.configs))
    }

    /// Apply a fallible `mapper` to the current configuration.
    ///
    /// The mapper's error is returned exactly as the mapper produced it. The
    /// mediator's own not-found error is converted into the mapper's error
    /// type through `From`.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use config_mediator::prelude::*;
    /// #[derive(Debug)]
    /// enum FlagError {
    ///     Missing(&'static str),
    ///     Unavailable(ConfigError),
    /// }
    ///
    /// impl From<ConfigError> for FlagError {
    ///     fn from(err: ConfigError) -> Self {
    ///         FlagError::Unavailable(err)
    ///     }
    /// }
    ///
    /// # fn example(mediator: &ConfigMediator) -> std::result::Result<(), FlagError> {
    /// let timeout = mediator.try_dispatch(|configs| {
    ///     configs
    ///         .get("timeoutMs")
    ///         .and_then(|value| value.as_u64())
    ///         .ok_or(FlagError::Missing("timeoutMs"))
    /// })?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn try_dispatch<T, E, F>(&self, mapper: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&ConfigMap) -> std::result::Result<T, E>,
        E: From<ConfigError>,
    {
        let snapshot = self.current()?;
        mapper(&snapshot.configs)
    }

    /// Deserialize the whole current configuration into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] when nothing is loaded and
    /// [`ConfigError::DeserializationError`] when the shape does not match `T`.
    pub fn dispatch_as<T>(&self) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let snapshot = self.current()?;
        serde_json::from_value(serde_json::Value::Object(snapshot.configs.clone()))
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))
    }

    /// The snapshot `dispatch` currently projects from, if any.
    pub fn snapshot(&self) -> Option<Arc<ConfigSnapshot>> {
        self.inner.current.load_full()
    }

    /// Metadata of the currently materialized configuration.
    pub fn current_metadata(&self) -> Option<ConfigMetadata> {
        self.inner
            .current
            .load()
            .as_ref()
            .and_then(|snapshot| snapshot.metadata.clone())
    }

    /// Remove the cached configuration from the repository and from memory.
    ///
    /// Subsequent `dispatch` calls fail with [`ConfigError::NotFound`] until a
    /// load succeeds again.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::StorageError`] if the repository could not be
    /// cleared; the in-memory snapshot is kept in that case.
    pub async fn clear_cache(&self) -> Result<()> {
        let _state = self.inner.state_lock.lock().await;
        self.inner.repository.clear_cache().await?;
        self.inner.current.store(None);
        log_event!(self.inner, info, "configuration cache cleared");
        Ok(())
    }

    /// Subscribe to newly materialized configurations.
    ///
    /// The callback runs after every successful load whose result differs from
    /// the previous snapshot. Drop the returned handle to unsubscribe.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&ConfigSnapshot) + Send + Sync + 'static,
    {
        self.inner.subscribers.subscribe(callback)
    }

    /// The load mode fixed at construction.
    pub fn load_mode(&self) -> LoadMode {
        self.inner.load_mode
    }

    /// Whether this mediator emits tracing events.
    pub fn logging_enabled(&self) -> bool {
        self.inner.logging_enabled
    }

    fn current(&self) -> Result<Arc<ConfigSnapshot>> {
        self.inner
            .current
            .load_full()
            .ok_or_else(|| ConfigError::NotFound("current configuration".to_string()))
    }

    #[cfg(test)]
    pub(crate) fn inflight_count(&self) -> usize {
        self.inner.inflight.len()
    }
}

impl Clone for ConfigMediator {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl MediatorInner {
    async fn run_load(&self, key: &LoadKey) -> Result<()> {
        #[cfg(feature = "metrics")]
        let timer = self.metrics.as_ref().map(|metrics| metrics.start_load());

        log_event!(
            self,
            debug,
            env = %key.env,
            version = key.version(),
            mode = %self.load_mode,
            "loading configuration"
        );

        let result = match self.load_mode {
            LoadMode::LocalOnly => self.load_local(key).await,
            LoadMode::RemoteOnly => self.load_remote(key).await,
            LoadMode::Hybrid => self.load_hybrid(key).await,
        };

        #[cfg(feature = "metrics")]
        if let (Some(metrics), Some(timer)) = (&self.metrics, timer) {
            match &result {
                Ok(()) => metrics.record_load_success(timer),
                Err(_) => metrics.record_load_failure(timer),
            }
        }

        if let Err(err) = &result {
            log_event!(self, warn, env = %key.env, version = key.version(), error = %err, "configuration load failed");
        }

        result
    }

    async fn load_local(&self, key: &LoadKey) -> Result<()> {
        if !self.repository.has_data().await {
            log_event!(self, debug, env = %key.env, "no cached configuration in local-only mode");
            return Err(ConfigError::NotFound(key.to_string()));
        }

        self.materialize(Some(key)).await;
        Ok(())
    }

    async fn load_remote(&self, key: &LoadKey) -> Result<()> {
        match self.fetch(key).await? {
            Some(data) => self.persist(key, data.as_ref()).await,
            None => Err(ConfigError::NotFound(key.to_string())),
        }
    }

    async fn load_hybrid(&self, key: &LoadKey) -> Result<()> {
        if !self.repository.has_data().await {
            log_event!(self, debug, env = %key.env, "cache empty, fetching from {}", self.service.name());
            return self.load_remote(key).await;
        }

        let Some(local) = self.repository.get_metadata().await else {
            log_event!(self, debug, env = %key.env, "cached configuration has no metadata, refetching");
            return self.load_remote(key).await;
        };

        let sync = self
            .strategy
            .check_for_updates(&local, self.service.as_ref(), &key.env, key.version())
            .await;

        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.record_sync_check(&sync);
        }

        log_event!(
            self,
            debug,
            env = %key.env,
            local = %local.sync_identifier,
            result = sync.label(),
            "sync check finished"
        );

        match sync {
            SyncResult::UpToDate => {
                self.materialize(Some(key)).await;
                Ok(())
            }
            SyncResult::NeedsUpdate => {
                let fetched = match self.fetch(key).await {
                    Ok(fetched) => fetched,
                    Err(err) => {
                        self.ensure_materialized().await;
                        return Err(err);
                    }
                };

                match fetched {
                    Some(data) => self.persist(key, data.as_ref()).await,
                    None => self.fall_back_to_cache(key).await,
                }
            }
            SyncResult::NotFound => Err(ConfigError::NotFound(key.to_string())),
            SyncResult::Error(source) => {
                log_event!(self, warn, env = %key.env, error = %source, "sync check failed, cached configuration stays available");
                self.ensure_materialized().await;
                Err(ConfigError::SyncError {
                    key: key.to_string(),
                    source,
                })
            }
        }
    }

    async fn fall_back_to_cache(&self, key: &LoadKey) -> Result<()> {
        match self.stale_fallback {
            StaleFallback::UseCache => {
                log_event!(self, warn, env = %key.env, "newer configuration announced but fetch returned nothing, serving cached configuration");
                #[cfg(feature = "metrics")]
                if let Some(metrics) = &self.metrics {
                    metrics.record_stale_fallback();
                }
                self.materialize(Some(key)).await;
                Ok(())
            }
            StaleFallback::NotFound => {
                self.ensure_materialized().await;
                Err(ConfigError::NotFound(key.to_string()))
            }
        }
    }

    /// Fetch with the configured retry policy.
    async fn fetch(&self, key: &LoadKey) -> Result<Option<Box<dyn ConfigData>>> {
        let mut attempt = 1;
        loop {
            match self.service.fetch_config(&key.env, key.version()).await {
                Ok(data) => return Ok(data),
                Err(err) if err.is_retryable() && self.retry.allows_retry(attempt) => {
                    let delay = self.retry.delay_after(attempt);
                    log_event!(self, warn, env = %key.env, attempt, error = %err, "fetch failed, retrying in {:?}", delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(source) => {
                    return Err(ConfigError::SyncError {
                        key: key.to_string(),
                        source,
                    });
                }
            }
        }
    }

    async fn persist(&self, key: &LoadKey, data: &dyn ConfigData) -> Result<()> {
        let state = self.state_lock.lock().await;
        if let Err(err) = self.repository.save_config(data).await {
            drop(state);
            log_event!(self, error, env = %key.env, error = %err, "failed to persist fetched configuration");
            self.ensure_materialized().await;
            return Err(err.into());
        }

        log_event!(
            self,
            info,
            env = %key.env,
            version = key.version(),
            sync_identifier = data.extract_metadata().map(|m| m.sync_identifier),
            "fetched configuration persisted"
        );

        self.publish_cached(Some(key)).await;
        drop(state);
        Ok(())
    }

    /// Read the repository into a fresh snapshot and publish it.
    async fn materialize(&self, key: Option<&LoadKey>) {
        let _state = self.state_lock.lock().await;
        self.publish_cached(key).await;
    }

    /// Caller holds `state_lock`.
    async fn publish_cached(&self, key: Option<&LoadKey>) {
        let configs = self.repository.get_configs().await;
        let metadata = self.repository.get_metadata().await;
        let snapshot = Arc::new(ConfigSnapshot::new(key.cloned(), configs, metadata));

        let previous = self.current.swap(Some(Arc::clone(&snapshot)));
        let changed = previous.is_none_or(|previous| !previous.same_content(&snapshot));
        if changed {
            self.subscribers.notify_all(&snapshot);
        }
    }

    /// Publish repository data if nothing is materialized yet.
    async fn ensure_materialized(&self) {
        let _state = self.state_lock.lock().await;
        let empty = self.current.load().is_none();
        if empty && self.repository.has_data().await {
            self.publish_cached(None).await;
        }
    }
}
