//! Built-in metrics for mediator operations.
//!
//! Provides OpenTelemetry metrics tracking:
//! - Load attempts/success/failures
//! - Load duration
//! - Sync check outcomes
//! - Coalesced callers
//! - Stale fallbacks
//!
//! # Examples
//!
//! ```rust,no_run
//! use config_mediator::prelude::*;
//! use config_mediator::sources::RemoteConfigService;
//! use opentelemetry::global;
//! use std::sync::Arc;
//!
//! # async fn example(service: Arc<dyn RemoteConfigService>) -> Result<()> {
//! let meter = global::meter("my-app");
//!
//! let mediator = ConfigMediator::builder()
//!     .with_service_arc(service)
//!     .with_metrics(meter)
//!     .build()
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod mediator_metrics;

pub use mediator_metrics::MediatorMetrics;
