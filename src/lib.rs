//! # config-mediator
//!
//! Client-side configuration retrieval with a local cache, staleness checks,
//! and typed projections.
//!
//! ## Overview
//!
//! A [`ConfigMediator`](core::ConfigMediator) sits between an application, a
//! remote configuration backend, and a local cache:
//! - **Local only**: serve what the cache holds, never touch the network
//! - **Remote only**: always fetch and persist
//! - **Hybrid**: ask whether the cache is stale, fetch only when it is
//!
//! Concurrent loads for the same environment and version are coalesced into a
//! single backend round trip. Reads go through lock-free snapshots swapped with
//! `arc-swap`, so `dispatch` never blocks on a load in progress.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use config_mediator::prelude::*;
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! struct Flags {
//!     dark_mode: bool,
//! }
//!
//! # async fn example(service: impl RemoteConfigService + 'static) -> Result<()> {
//! let mediator = ConfigMediator::builder()
//!     .with_service(service)
//!     .build()
//!     .await?;
//!
//! mediator.load_configs("prod", None).await?;
//!
//! let flags: Option<Flags> = mediator.dispatch(|configs| {
//!     configs
//!         .get("flags")
//!         .cloned()
//!         .and_then(|value| serde_json::from_value(value).ok())
//! })?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `file-store` (default): [`FileRepository`](repository::FileRepository)
//! - `remote`: [`HttpConfigService`](sources::HttpConfigService) over `reqwest`
//! - `metrics`: OpenTelemetry instrumentation of loads and sync checks

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod notify;
pub mod repository;
pub mod settings;
pub mod sources;
pub mod sync;

#[cfg(feature = "metrics")]
pub mod metrics;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{
        ConfigMediator, ConfigMediatorBuilder, ConfigSnapshot, LoadMode, RetryPolicy,
        StaleFallback,
    };
    pub use crate::error::{ConfigError, Result};
    pub use crate::repository::{InMemoryRepository, LocalConfigRepository};
    pub use crate::sources::{
        ConfigData, ConfigMap, ConfigMetadata, JsonConfigData, RemoteConfigService,
    };
    pub use crate::sync::{SyncResult, SyncStrategy};
}
