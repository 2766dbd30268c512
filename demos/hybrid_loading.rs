//! Example demonstrating hybrid loading against a simulated backend.
//!
//! This example shows how to:
//! - Serve a cached configuration when the backend says it is current
//! - Pick up a new revision when the backend announces one
//! - Keep serving cached data while the backend is down
//! - Coalesce concurrent loads into one fetch
//!
//! Run with: cargo run --example hybrid_loading

use async_trait::async_trait;
use config_mediator::error::ServiceError;
use config_mediator::prelude::*;
use config_mediator::sources::FetchResult;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppConfig {
    flags: Flags,
    timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Flags {
    dark_mode: bool,
}

/// An in-process stand-in for a configuration server.
struct SimulatedBackend {
    revision: Mutex<(String, serde_json::Value)>,
    online: Mutex<bool>,
    fetches: AtomicUsize,
}

impl SimulatedBackend {
    fn publish(&self, identifier: &str, configs: serde_json::Value) {
        *self.revision.lock() = (identifier.to_string(), configs);
    }
}

#[async_trait]
impl RemoteConfigService for SimulatedBackend {
    async fn fetch_config(&self, _env: &str, _version: Option<&str>) -> FetchResult {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let (identifier, configs) = self.revision.lock().clone();
        Ok(JsonConfigData::from_value(configs).map(|data| {
            Box::new(data.with_metadata(ConfigMetadata::new(identifier))) as Box<dyn ConfigData>
        }))
    }

    async fn check_for_updates(
        &self,
        local: &ConfigMetadata,
        _env: &str,
        _version: Option<&str>,
    ) -> SyncResult {
        if !*self.online.lock() {
            return SyncResult::Error(ServiceError::Transport("backend offline".to_string()));
        }

        if self.revision.lock().0 == local.sync_identifier {
            SyncResult::UpToDate
        } else {
            SyncResult::NeedsUpdate
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("config_mediator=debug")
        .init();

    println!("=== Hybrid Loading Example ===\n");

    let backend = std::sync::Arc::new(SimulatedBackend {
        revision: Mutex::new((
            "v1".to_string(),
            json!({ "flags": { "darkMode": false }, "timeoutMs": 1000 }),
        )),
        online: Mutex::new(true),
        fetches: AtomicUsize::new(0),
    });

    let mediator = ConfigMediator::builder()
        .with_service_arc(backend.clone())
        .with_load_mode(LoadMode::Hybrid)
        .with_logging(true)
        .build()
        .await?;

    let _handle = mediator.subscribe(|snapshot| {
        let revision = snapshot
            .metadata
            .as_ref()
            .map(|m| m.sync_identifier.as_str())
            .unwrap_or("unknown");
        println!("[subscriber] now serving revision {}", revision);
    });

    println!("1. Cold start: four concurrent loads, empty cache");
    let (a, b, c, d) = tokio::join!(
        mediator.load_configs("prod", None),
        mediator.load_configs("prod", None),
        mediator.load_configs("prod", None),
        mediator.load_configs("prod", None),
    );
    a?;
    b?;
    c?;
    d?;
    println!("   fetches so far: {}\n", backend.fetches.load(Ordering::SeqCst));

    println!("2. Reload with nothing new published");
    mediator.load_configs("prod", None).await?;
    println!("   fetches so far: {}\n", backend.fetches.load(Ordering::SeqCst));

    println!("3. Backend publishes v2");
    backend.publish("v2", json!({ "flags": { "darkMode": true }, "timeoutMs": 2500 }));
    mediator.load_configs("prod", None).await?;
    let config: AppConfig = mediator.dispatch_as()?;
    println!("   {:?}\n", config);

    println!("4. Backend goes offline");
    *backend.online.lock() = false;
    match mediator.load_configs("prod", None).await {
        Ok(()) => println!("   unexpectedly succeeded"),
        Err(err) => println!("   load failed: {}", err),
    }
    let dark_mode = mediator.dispatch(|configs| configs["flags"]["darkMode"].as_bool())?;
    println!("   still serving cached darkMode = {:?}\n", dark_mode);

    println!("=== Example Complete ===");
    Ok(())
}
