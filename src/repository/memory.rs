//! In-memory repository.

use super::{CachedConfig, LocalConfigRepository};
use crate::error::RepositoryError;
use crate::sources::{ConfigData, ConfigMap, ConfigMetadata};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;

/// Repository that keeps the cached configuration in process memory.
///
/// Clones share the same storage, which makes it convenient to seed a cache
/// before handing the repository to a mediator.
///
/// # Examples
///
/// ```rust
/// use config_mediator::repository::{InMemoryRepository, LocalConfigRepository};
/// use config_mediator::sources::{ConfigMetadata, JsonConfigData};
/// use serde_json::json;
///
/// # async fn example() {
/// let repository = InMemoryRepository::new();
/// let data = JsonConfigData::from_value(json!({ "retries": 3 }))
///     .unwrap()
///     .with_metadata(ConfigMetadata::new("v1"));
/// repository.save_config(&data).await.unwrap();
///
/// assert!(repository.has_data().await);
/// # }
/// ```
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    cached: Arc<RwLock<Option<CachedConfig>>>,
}

impl InMemoryRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository already holding `data`.
    pub fn seeded(data: &dyn ConfigData) -> Self {
        Self {
            cached: Arc::new(RwLock::new(Some(CachedConfig::capture(data)))),
        }
    }

    /// A copy of the stored record.
    pub fn cached(&self) -> Option<CachedConfig> {
        self.cached.read().clone()
    }
}

#[async_trait]
impl LocalConfigRepository for InMemoryRepository {
    async fn has_data(&self) -> bool {
        self.cached.read().is_some()
    }

    async fn get_metadata(&self) -> Option<ConfigMetadata> {
        self.cached
            .read()
            .as_ref()
            .and_then(|cached| cached.metadata.clone())
    }

    async fn get_configs(&self) -> ConfigMap {
        self.cached
            .read()
            .as_ref()
            .map(|cached| cached.configs.clone())
            .unwrap_or_default()
    }

    async fn save_config(&self, data: &dyn ConfigData) -> Result<(), RepositoryError> {
        let record = CachedConfig::capture(data);
        *self.cached.write() = Some(record);
        Ok(())
    }

    async fn clear_cache(&self) -> Result<(), RepositoryError> {
        *self.cached.write() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::JsonConfigData;
    use serde_json::json;

    fn sample(identifier: &str) -> JsonConfigData {
        JsonConfigData::from_value(json!({ "flags": { "darkMode": true } }))
            .unwrap()
            .with_metadata(ConfigMetadata::new(identifier))
    }

    #[tokio::test]
    async fn test_empty_repository() {
        let repository = InMemoryRepository::new();
        assert!(!repository.has_data().await);
        assert!(repository.get_metadata().await.is_none());
        assert!(repository.get_configs().await.is_empty());
    }

    #[tokio::test]
    async fn test_save_replaces_both_parts() {
        let repository = InMemoryRepository::seeded(&sample("v1"));
        repository
            .save_config(&JsonConfigData::from_value(json!({ "retries": 3 })).unwrap())
            .await
            .unwrap();

        assert!(repository.get_metadata().await.is_none());
        assert_eq!(repository.get_configs().await["retries"], json!(3));
        assert!(!repository.get_configs().await.contains_key("flags"));
    }

    #[tokio::test]
    async fn test_clones_share_storage() {
        let repository = InMemoryRepository::new();
        let clone = repository.clone();

        clone.save_config(&sample("v7")).await.unwrap();
        assert_eq!(
            repository.get_metadata().await,
            Some(ConfigMetadata::new("v7"))
        );

        repository.clear_cache().await.unwrap();
        assert!(!clone.has_data().await);
    }
}
