//! Local persistence of the last-known configuration.

mod memory;

#[cfg(feature = "file-store")]
mod file;

pub use memory::InMemoryRepository;

#[cfg(feature = "file-store")]
pub use file::FileRepository;

use crate::error::RepositoryError;
use crate::sources::{ConfigData, ConfigMap, ConfigMetadata};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Trait for local configuration storage.
///
/// Implement this trait to persist the last-known configuration on a storage
/// medium (a file, a key-value store, a database row). The mediator is the
/// only writer.
#[async_trait]
pub trait LocalConfigRepository: Send + Sync {
    /// Whether a configuration is stored. Inaccessible storage reads as `false`.
    async fn has_data(&self) -> bool;

    /// Metadata of the stored configuration, if any.
    async fn get_metadata(&self) -> Option<ConfigMetadata>;

    /// The stored configuration values, or an empty map when nothing is stored.
    async fn get_configs(&self) -> ConfigMap;

    /// Replace the stored configuration.
    ///
    /// Must be atomic: on failure, both the values and the metadata keep their
    /// previous contents.
    async fn save_config(&self, data: &dyn ConfigData) -> Result<(), RepositoryError>;

    /// Remove everything this repository has stored.
    async fn clear_cache(&self) -> Result<(), RepositoryError>;
}

/// A persisted configuration together with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedConfig {
    /// Configuration values.
    pub configs: ConfigMap,
    /// Revision metadata, if the backend supplied any.
    #[serde(default)]
    pub metadata: Option<ConfigMetadata>,
    /// When the record was written.
    pub saved_at: DateTime<Utc>,
}

impl CachedConfig {
    /// Capture a payload as a cache record stamped with the current time.
    pub fn capture(data: &dyn ConfigData) -> Self {
        Self {
            configs: data.extract_configs(),
            metadata: data.extract_metadata(),
            saved_at: Utc::now(),
        }
    }
}
