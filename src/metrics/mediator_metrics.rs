//! Mediator metrics tracking using OpenTelemetry.

use crate::sync::SyncResult;
use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Histogram, Meter};
use std::time::Instant;

/// Metrics collector for mediator operations.
///
/// Tracks load attempts, success/failure rates, latencies, sync check outcomes,
/// coalesced callers, and stale fallbacks using OpenTelemetry metrics.
///
/// # Examples
///
/// ```rust,no_run
/// use config_mediator::metrics::MediatorMetrics;
/// use opentelemetry::global;
///
/// let meter = global::meter("config-mediator");
/// let metrics = MediatorMetrics::new(meter);
///
/// let timer = metrics.start_load();
/// // ... perform load ...
/// metrics.record_load_success(timer);
/// ```
#[derive(Clone)]
pub struct MediatorMetrics {
    load_attempts: Counter<u64>,
    load_success: Counter<u64>,
    load_failures: Counter<u64>,
    load_duration: Histogram<f64>,
    sync_checks: Counter<u64>,
    coalesced_loads: Counter<u64>,
    stale_fallbacks: Counter<u64>,
}

impl MediatorMetrics {
    /// Create a new metrics collector with the provided meter.
    pub fn new(meter: Meter) -> Self {
        let load_attempts = meter
            .u64_counter("config_mediator.load.attempts")
            .with_description("Total number of load operations started")
            .build();

        let load_success = meter
            .u64_counter("config_mediator.load.success")
            .with_description("Number of successful loads")
            .build();

        let load_failures = meter
            .u64_counter("config_mediator.load.failures")
            .with_description("Number of failed loads")
            .build();

        let load_duration = meter
            .f64_histogram("config_mediator.load.duration")
            .with_description("Duration of load operations in seconds")
            .with_unit("s")
            .build();

        let sync_checks = meter
            .u64_counter("config_mediator.sync.checks")
            .with_description("Sync checks by outcome")
            .build();

        let coalesced_loads = meter
            .u64_counter("config_mediator.load.coalesced")
            .with_description("Callers that joined a load already in flight")
            .build();

        let stale_fallbacks = meter
            .u64_counter("config_mediator.load.stale_fallbacks")
            .with_description("Loads that fell back to cached data after an empty fetch")
            .build();

        Self {
            load_attempts,
            load_success,
            load_failures,
            load_duration,
            sync_checks,
            coalesced_loads,
            stale_fallbacks,
        }
    }

    /// Start a load operation timer.
    ///
    /// Returns an `Instant` that should be passed to `record_load_success` or
    /// `record_load_failure` when the operation completes.
    pub fn start_load(&self) -> Instant {
        self.load_attempts.add(1, &[]);
        Instant::now()
    }

    /// Record a successful load operation.
    pub fn record_load_success(&self, start: Instant) {
        let duration = start.elapsed().as_secs_f64();
        self.load_success.add(1, &[]);
        self.load_duration
            .record(duration, &[KeyValue::new("outcome", "success")]);
    }

    /// Record a failed load operation.
    pub fn record_load_failure(&self, start: Instant) {
        let duration = start.elapsed().as_secs_f64();
        self.load_failures.add(1, &[]);
        self.load_duration
            .record(duration, &[KeyValue::new("outcome", "failure")]);
    }

    /// Record the outcome of a sync check.
    pub fn record_sync_check(&self, result: &SyncResult) {
        self.sync_checks
            .add(1, &[KeyValue::new("result", result.label())]);
    }

    /// Record a caller joining an in-flight load.
    pub fn record_coalesced(&self) {
        self.coalesced_loads.add(1, &[]);
    }

    /// Record a load that kept serving cached data after an empty fetch.
    pub fn record_stale_fallback(&self) {
        self.stale_fallbacks.add(1, &[]);
    }
}
