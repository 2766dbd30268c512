//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use config_mediator::error::{RepositoryError, ServiceError};
use config_mediator::prelude::*;
use config_mediator::sources::FetchResult;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// What the mock backend answers to a fetch.
#[derive(Clone)]
pub enum FetchReply {
    Found(JsonConfigData),
    Missing,
    Fail(ServiceError),
}

/// A scripted remote service that counts every call.
pub struct MockService {
    replies: Mutex<HashMap<String, FetchReply>>,
    sync_result: Mutex<SyncResult>,
    delay: Mutex<Option<Duration>>,
    fetches: AtomicUsize,
    checks: AtomicUsize,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(HashMap::new()),
            sync_result: Mutex::new(SyncResult::UpToDate),
            delay: Mutex::new(None),
            fetches: AtomicUsize::new(0),
            checks: AtomicUsize::new(0),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn reply(&self, env: &str, reply: FetchReply) {
        self.replies.lock().insert(env.to_string(), reply);
    }

    pub fn serve(&self, env: &str, configs: Value, identifier: &str) {
        self.reply(env, FetchReply::Found(payload(configs, identifier)));
    }

    pub fn set_sync_result(&self, result: SyncResult) {
        *self.sync_result.lock() = result;
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteConfigService for MockService {
    async fn fetch_config(&self, env: &str, _version: Option<&str>) -> FetchResult {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self.replies.lock().get(env).cloned();
        match reply.unwrap_or(FetchReply::Missing) {
            FetchReply::Found(data) => Ok(Some(Box::new(data))),
            FetchReply::Missing => Ok(None),
            FetchReply::Fail(err) => Err(err),
        }
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
}

/// Repository whose saves always fail, wrapping an in-memory store for reads.
pub struct RejectingRepository {
    pub inner: InMemoryRepository,
    pub error: RepositoryError,
}

#[async_trait]
impl LocalConfigRepository for RejectingRepository {
    async fn has_data(&self) -> bool {
        self.inner.has_data().await
    }

    async fn get_metadata(&self) -> Option<ConfigMetadata> {
        self.inner.get_metadata().await
    }

    async fn get_configs(&self) -> ConfigMap {
        self.inner.get_configs().await
    }

    async fn save_config(&self, _data: &dyn ConfigData) -> std::result::Result<(), RepositoryError> {
        Err(self.error.clone())
    }

    async fn clear_cache(&self) -> std::result::Result<(), RepositoryError> {
        self.inner.clear_cache().await
    }
}

/// In-memory repository that yields to the scheduler inside every call, so
/// concurrent loads interleave between the reads and writes of one another.
#[derive(Clone, Default)]
pub struct YieldingRepository {
    pub inner: InMemoryRepository,
}

#[async_trait]
impl LocalConfigRepository for YieldingRepository {
    async fn has_data(&self) -> bool {
        tokio::task::yield_now().await;
        self.inner.has_data().await
    }

    async fn get_metadata(&self) -> Option<ConfigMetadata> {
        tokio::task::yield_now().await;
        self.inner.get_metadata().await
    }

    async fn get_configs(&self) -> ConfigMap {
        let configs = self.inner.get_configs().await;
        tokio::task::yield_now().await;
        configs
    }

    async fn save_config(&self, data: &dyn ConfigData) -> std::result::Result<(), RepositoryError> {
        tokio::task::yield_now().await;
        self.inner.save_config(data).await
    }

    async fn clear_cache(&self) -> std::result::Result<(), RepositoryError> {
        self.inner.clear_cache().await
    }
}

pub fn payload(configs: Value, identifier: &str) -> JsonConfigData {
    JsonConfigData::from_value(configs)
        .expect("test payloads are JSON objects")
        .with_metadata(ConfigMetadata::new(identifier))
}

pub fn transport_error() -> ServiceError {
    ServiceError::Transport("connection refused".to_string())
}
