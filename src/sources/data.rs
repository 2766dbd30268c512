//! Data contracts produced by a remote fetch.

use serde::{Deserialize, Serialize};

/// The dynamic configuration mapping handed to mappers.
pub type ConfigMap = serde_json::Map<String, serde_json::Value>;

/// Metadata describing which revision of a configuration is held.
///
/// The sync identifier is chosen by the backend (a version, a hash, an ETag,
/// a timestamp) and is only ever compared, never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMetadata {
    /// Opaque revision token.
    pub sync_identifier: String,
}

impl ConfigMetadata {
    /// Create metadata from a sync identifier.
    pub fn new(sync_identifier: impl Into<String>) -> Self {
        Self {
            sync_identifier: sync_identifier.into(),
        }
    }
}

/// A backend-specific configuration payload.
///
/// Implement this trait for whatever shape your backend returns. The mediator
/// only ever asks for the flattened mapping and the metadata; it never keeps
/// the payload itself.
pub trait ConfigData: Send + Sync {
    /// The configuration values carried by this payload.
    fn extract_configs(&self) -> ConfigMap;

    /// Revision metadata, if the backend supplied any.
    fn extract_metadata(&self) -> Option<ConfigMetadata>;
}

/// A plain JSON-backed [`ConfigData`].
///
/// # Examples
///
/// ```rust
/// use config_mediator::sources::{ConfigData, ConfigMetadata, JsonConfigData};
/// use serde_json::json;
///
/// let data = JsonConfigData::from_value(json!({ "flags": { "darkMode": true } }))
///     .unwrap()
///     .with_metadata(ConfigMetadata::new("v1"));
///
/// assert_eq!(data.extract_configs()["flags"]["darkMode"], json!(true));
/// assert_eq!(data.extract_metadata().unwrap().sync_identifier, "v1");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonConfigData {
    /// Configuration values.
    pub configs: ConfigMap,
    /// Revision metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ConfigMetadata>,
}

impl JsonConfigData {
    /// Wrap an existing mapping.
    pub fn new(configs: ConfigMap) -> Self {
        Self {
            configs,
            metadata: None,
        }
    }

    /// Build from a JSON value, which must be an object.
    ///
    /// Returns `None` for any non-object value.
    pub fn from_value(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Object(configs) => Some(Self::new(configs)),
            _ => None,
        }
    }

    /// Attach revision metadata.
    pub fn with_metadata(mut self, metadata: ConfigMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

impl ConfigData for JsonConfigData {
    fn extract_configs(&self) -> ConfigMap {
        self.configs.clone()
    }

    fn extract_metadata(&self) -> Option<ConfigMetadata> {
        self.metadata.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(JsonConfigData::from_value(json!([1, 2, 3])).is_none());
        assert!(JsonConfigData::from_value(json!("flags")).is_none());
        assert!(JsonConfigData::from_value(json!({})).is_some());
    }

    #[test]
    fn test_metadata_serializes_camel_case() {
        let metadata = ConfigMetadata::new("etag-42");
        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(value, json!({ "syncIdentifier": "etag-42" }));
    }

    #[test]
    fn test_metadata_is_optional_when_deserializing() {
        let data: JsonConfigData =
            serde_json::from_value(json!({ "configs": { "retries": 3 } })).unwrap();
        assert!(data.metadata.is_none());
        assert_eq!(data.extract_configs()["retries"], json!(3));
    }
}
