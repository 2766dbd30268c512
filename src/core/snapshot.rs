//! Materialized configuration state.

use crate::sources::{ConfigMap, ConfigMetadata};
use chrono::{DateTime, Utc};
use std::fmt;

/// Identifies one configuration: an environment plus an optional version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadKey {
    /// Environment name, such as `prod`.
    pub env: String,
    /// Optional configuration version.
    pub version: Option<String>,
}

impl LoadKey {
    /// Create a key.
    pub fn new(env: impl Into<String>, version: Option<&str>) -> Self {
        Self {
            env: env.into(),
            version: version.map(str::to_string),
        }
    }

    /// The version as a borrowed string.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

impl fmt::Display for LoadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}@{}", self.env, version),
            None => f.write_str(&self.env),
        }
    }
}

/// The configuration that `dispatch` currently projects from.
///
/// Snapshots are immutable and swapped atomically, so a reader holding one
/// never observes a partially applied load.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSnapshot {
    /// The load that produced this snapshot; `None` when it was read from the
    /// repository before any load completed.
    pub key: Option<LoadKey>,
    /// Configuration values.
    pub configs: ConfigMap,
    /// Revision metadata of the cached configuration.
    pub metadata: Option<ConfigMetadata>,
    /// When the snapshot was materialized.
    pub loaded_at: DateTime<Utc>,
}

impl ConfigSnapshot {
    pub(crate) fn new(
        key: Option<LoadKey>,
        configs: ConfigMap,
        metadata: Option<ConfigMetadata>,
    ) -> Self {
        Self {
            key,
            configs,
            metadata,
            loaded_at: Utc::now(),
        }
    }

    /// Whether two snapshots hold the same data, ignoring key and timestamp.
    pub(crate) fn same_content(&self, other: &ConfigSnapshot) -> bool {
        self.configs == other.configs && self.metadata == other.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        assert_eq!(LoadKey::new("prod", None).to_string(), "prod");
        assert_eq!(LoadKey::new("prod", Some("2.1")).to_string(), "prod@2.1");
    }

    #[test]
    fn test_same_content_ignores_key() {
        let a = ConfigSnapshot::new(None, ConfigMap::new(), Some(ConfigMetadata::new("v1")));
        let b = ConfigSnapshot::new(
            Some(LoadKey::new("prod", None)),
            ConfigMap::new(),
            Some(ConfigMetadata::new("v1")),
        );
        let c = ConfigSnapshot::new(None, ConfigMap::new(), Some(ConfigMetadata::new("v2")));

        assert!(a.same_content(&b));
        assert!(!a.same_content(&c));
    }
}
