//! JSON file repository.

use super::{CachedConfig, LocalConfigRepository};
use crate::error::RepositoryError;
use crate::sources::{ConfigData, ConfigMap, ConfigMetadata};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

static NEXT_TEMP: AtomicU64 = AtomicU64::new(0);

/// Repository that stores the cached configuration as a JSON document.
///
/// Saves go to a sibling temporary file that is then renamed over the target,
/// so a reader never sees a half-written document. Every save uses its own
/// temporary name, which lets concurrent writers (including other processes
/// sharing the path) race on the rename instead of on the file contents.
///
/// An unreadable or corrupt document is treated as an empty cache. Those
/// events are logged only when [`with_logging`](Self::with_logging) is on.
///
/// # Examples
///
/// ```rust,no_run
/// use config_mediator::repository::FileRepository;
///
/// let repository = FileRepository::new("/var/cache/my-app/config.json");
/// ```
#[derive(Debug, Clone)]
pub struct FileRepository {
    path: PathBuf,
    logging_enabled: bool,
}

impl FileRepository {
    /// Create a repository backed by the document at `path`.
    ///
    /// Parent directories are created on the first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            logging_enabled: false,
        }
    }

    /// Log unreadable or corrupt cache documents at `warn` level.
    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.logging_enabled = enabled;
        self
    }

    /// Location of the cache document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        let sequence = NEXT_TEMP.fetch_add(1, Ordering::Relaxed);
        name.push(format!(".{}.{}.tmp", std::process::id(), sequence));
        self.path.with_file_name(name)
    }

    async fn read_record(&self) -> Option<CachedConfig> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                if self.logging_enabled {
                    warn!(path = %self.path.display(), error = %e, "cache file unreadable");
                }
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(record) => Some(record),
            Err(e) => {
                if self.logging_enabled {
                    warn!(path = %self.path.display(), error = %e, "cache file corrupt, ignoring");
                }
                None
            }
        }
    }
}

#[async_trait]
impl LocalConfigRepository for FileRepository {
    async fn has_data(&self) -> bool {
        self.read_record().await.is_some()
    }

    async fn get_metadata(&self) -> Option<ConfigMetadata> {
        self.read_record().await.and_then(|record| record.metadata)
    }

    async fn get_configs(&self) -> ConfigMap {
        self.read_record()
            .await
            .map(|record| record.configs)
            .unwrap_or_default()
    }

    async fn save_config(&self, data: &dyn ConfigData) -> Result<(), RepositoryError> {
        let record = CachedConfig::capture(data);
        let bytes = serde_json::to_vec_pretty(&record)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| RepositoryError::Io(e.to_string()))?;
            }
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, &bytes)
            .await
            .map_err(|e| RepositoryError::Io(e.to_string()))?;

        if let Err(e) = tokio::fs::rename(&temp, &self.path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(RepositoryError::Io(e.to_string()));
        }

        Ok(())
    }

    async fn clear_cache(&self) -> Result<(), RepositoryError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RepositoryError::Io(e.to_string())),
        }
    }
}
