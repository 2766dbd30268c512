//! Remote configuration services and the payloads they produce.

mod data;
mod service;

#[cfg(feature = "remote")]
mod http;

pub use data::{ConfigData, ConfigMap, ConfigMetadata, JsonConfigData};
pub use service::{FetchResult, RemoteConfigService};

#[cfg(feature = "remote")]
pub use http::{HttpAuth, HttpConfigService, HttpConfigServiceBuilder};
