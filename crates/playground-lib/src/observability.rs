//! Observability for the view-state controller
//!
//! Provides:
//! - Prometheus metrics (request latency, refresh outcomes, cached item counts)
//! - Structured logging with tracing

use crate::cache::CollectionKind;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge_vec, Encoder,
    HistogramVec, IntCounterVec, IntGaugeVec, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Histogram buckets for backend request latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 120.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ControllerMetricsInner> = OnceLock::new();

struct ControllerMetricsInner {
    request_latency_seconds: HistogramVec,
    refreshes_total: IntCounterVec,
    mutations_total: IntCounterVec,
    cached_items: IntGaugeVec,
}

impl ControllerMetricsInner {
    fn new() -> Self {
        Self {
            request_latency_seconds: register_histogram_vec!(
                "playground_request_latency_seconds",
                "Latency of backend API requests",
                &["operation"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register request_latency_seconds"),

            refreshes_total: register_int_counter_vec!(
                "playground_refreshes_total",
                "Collection refreshes by kind and result (applied, superseded, failed)",
                &["kind", "result"]
            )
            .expect("Failed to register refreshes_total"),

            mutations_total: register_int_counter_vec!(
                "playground_mutations_total",
                "Mutating requests by action and result",
                &["action", "result"]
            )
            .expect("Failed to register mutations_total"),

            cached_items: register_int_gauge_vec!(
                "playground_cached_items",
                "Number of items held in each collection cache",
                &["kind"]
            )
            .expect("Failed to register cached_items"),
        }
    }
}

/// Lightweight handle to the global controller metrics
///
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct ControllerMetrics {
    _private: (),
}

impl Default for ControllerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ControllerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ControllerMetricsInner {
        GLOBAL_METRICS.get_or_init(ControllerMetricsInner::new)
    }

    pub fn observe_request(&self, operation: &str, duration_secs: f64) {
        self.inner()
            .request_latency_seconds
            .with_label_values(&[operation])
            .observe(duration_secs);
    }

    pub fn inc_refresh(&self, kind: CollectionKind, result: &str) {
        self.inner()
            .refreshes_total
            .with_label_values(&[kind.as_str(), result])
            .inc();
    }

    pub fn refresh_count(&self, kind: CollectionKind, result: &str) -> u64 {
        self.inner()
            .refreshes_total
            .with_label_values(&[kind.as_str(), result])
            .get()
    }

    pub fn inc_mutation(&self, action: &str, result: &str) {
        self.inner()
            .mutations_total
            .with_label_values(&[action, result])
            .inc();
    }

    pub fn set_cached_items(&self, kind: CollectionKind, count: usize) {
        self.inner()
            .cached_items
            .with_label_values(&[kind.as_str()])
            .set(count as i64);
    }
}

/// Prometheus text exposition of every registered metric
pub fn gather_text() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Structured logger for controller events
#[derive(Clone)]
pub struct StructuredLogger {
    api_url: String,
}

impl StructuredLogger {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
        }
    }

    pub fn log_session_start(&self, version: &str) {
        info!(
            event = "session_started",
            api_url = %self.api_url,
            version = %version,
            "Playground controller session started"
        );
    }

    pub fn log_refresh_applied(&self, kind: CollectionKind, seq: u64, items: usize) {
        debug!(
            event = "refresh_applied",
            api_url = %self.api_url,
            kind = %kind,
            seq = seq,
            items = items,
            "Collection cache replaced"
        );
    }

    pub fn log_refresh_superseded(&self, kind: CollectionKind, seq: u64, applied_seq: u64) {
        debug!(
            event = "refresh_superseded",
            api_url = %self.api_url,
            kind = %kind,
            seq = seq,
            applied_seq = applied_seq,
            "Dropped response older than the applied snapshot"
        );
    }

    pub fn log_refresh_failed(&self, kind: CollectionKind, seq: u64, error_kind: &str, detail: &str) {
        warn!(
            event = "refresh_failed",
            api_url = %self.api_url,
            kind = %kind,
            seq = seq,
            error_kind = %error_kind,
            detail = %detail,
            "Collection refresh failed, keeping previous snapshot"
        );
    }

    pub fn log_mutation_sent(&self, action: &str) {
        info!(
            event = "mutation_sent",
            api_url = %self.api_url,
            action = %action,
            "Sending mutating request"
        );
    }

    pub fn log_mutation_completed(&self, action: &str, refreshes: usize) {
        info!(
            event = "mutation_completed",
            api_url = %self.api_url,
            action = %action,
            refreshes = refreshes,
            "Mutation succeeded"
        );
    }

    pub fn log_mutation_failed(&self, action: &str, error_kind: &str, detail: &str) {
        warn!(
            event = "mutation_failed",
            api_url = %self.api_url,
            action = %action,
            error_kind = %error_kind,
            detail = %detail,
            "Mutation failed"
        );
    }

    pub fn log_poller_started(&self, interval_secs: f64) {
        info!(
            event = "poller_started",
            api_url = %self.api_url,
            interval_secs = interval_secs,
            "Status polling started"
        );
    }

    pub fn log_poller_stopped(&self, polls: u64) {
        info!(
            event = "poller_stopped",
            api_url = %self.api_url,
            polls = polls,
            "Status polling stopped"
        );
    }
}
