// Path: crates/telemetry/src/prometheus.rs
//! A concrete implementation of the metrics sinks using the Prometheus crate.

use crate::sinks::*;
use once_cell::sync::OnceCell;
use prometheus::{
    register_gauge_vec, register_int_counter_vec, GaugeVec, IntCounterVec,
};

// --- Metric Statics ---
// We use OnceCell to hold the metric collectors. They will be initialized
// exactly once by the `install` function.

static SOURCE_ATTEMPTS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static SOURCE_SUCCESS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static SOURCE_ERRORS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static SOURCE_BYTES_EMITTED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static SAMPLING_DECISIONS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static CACHE_HITS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static CACHE_MISSES_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static CACHE_WRITE_ERRORS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static QUEUE_ENQUEUED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static QUEUE_DROPPED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static QUEUE_PROCESSED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static QUEUE_FAILURES_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static QUEUE_DEPTH: OnceCell<GaugeVec> = OnceCell::new();
static VERIFICATION_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

/// The Prometheus-backed implementation of every metrics sink.
#[derive(Debug, Clone, Copy)]
pub struct PrometheusSink;

/// Helper macro to reduce boilerplate for getting a metric from OnceCell.
/// This will panic if `install()` has not been called, which is intentional
/// as it indicates a critical application setup error.
macro_rules! get_metric {
    ($metric:ident) => {
        $metric
            .get()
            .expect("Prometheus sink not initialized. Call telemetry::prometheus::install() first.")
    };
}

impl SourceMetricsSink for PrometheusSink {
    fn inc_source_attempt(&self, source: &str) {
        get_metric!(SOURCE_ATTEMPTS_TOTAL)
            .with_label_values(&[source])
            .inc();
    }
    fn inc_source_success(&self, source: &str) {
        get_metric!(SOURCE_SUCCESS_TOTAL)
            .with_label_values(&[source])
            .inc();
    }
    fn inc_source_error(&self, source: &str, code: &str) {
        get_metric!(SOURCE_ERRORS_TOTAL)
            .with_label_values(&[source, code])
            .inc();
    }
    fn inc_sampling_decision(&self, sampled: bool) {
        let verdict = if sampled { "sampled" } else { "skipped" };
        get_metric!(SAMPLING_DECISIONS_TOTAL)
            .with_label_values(&[verdict])
            .inc();
    }
    fn inc_bytes_emitted(&self, source: &str, bytes: u64) {
        get_metric!(SOURCE_BYTES_EMITTED_TOTAL)
            .with_label_values(&[source])
            .inc_by(bytes);
    }
}

impl CacheMetricsSink for PrometheusSink {
    fn inc_cache_hit(&self, store: &str) {
        get_metric!(CACHE_HITS_TOTAL).with_label_values(&[store]).inc();
    }
    fn inc_cache_miss(&self, store: &str) {
        get_metric!(CACHE_MISSES_TOTAL)
            .with_label_values(&[store])
            .inc();
    }
    fn inc_cache_write_error(&self, store: &str) {
        get_metric!(CACHE_WRITE_ERRORS_TOTAL)
            .with_label_values(&[store])
            .inc();
    }
}

impl QueueMetricsSink for PrometheusSink {
    fn inc_enqueued(&self, queue: &str) {
        get_metric!(QUEUE_ENQUEUED_TOTAL)
            .with_label_values(&[queue])
            .inc();
    }
    fn inc_dropped(&self, queue: &str) {
        get_metric!(QUEUE_DROPPED_TOTAL)
            .with_label_values(&[queue])
            .inc();
    }
    fn inc_processed(&self, queue: &str) {
        get_metric!(QUEUE_PROCESSED_TOTAL)
            .with_label_values(&[queue])
            .inc();
    }
    fn inc_failed(&self, queue: &str) {
        get_metric!(QUEUE_FAILURES_TOTAL)
            .with_label_values(&[queue])
            .inc();
    }
    fn set_depth(&self, queue: &str, depth: u64) {
        get_metric!(QUEUE_DEPTH)
            .with_label_values(&[queue])
            .set(depth as f64);
    }
}

impl VerificationMetricsSink for PrometheusSink {
    fn inc_verification(&self, ok: bool) {
        let outcome = if ok { "pass" } else { "fail" };
        get_metric!(VERIFICATION_TOTAL)
            .with_label_values(&[outcome])
            .inc();
    }
}

impl MetricsSink for PrometheusSink {}

static PROM_SINK: PrometheusSink = PrometheusSink;

/// Registers every metric with the default Prometheus registry and makes
/// [`PrometheusSink`] the global sink. Idempotent registration failures
/// (double install) are ignored.
pub fn install() {
    let _ = SOURCE_ATTEMPTS_TOTAL.set(
        register_int_counter_vec!(
            "weave_source_attempts_total",
            "Total retrieval attempts per data source",
            &["source"]
        )
        .expect("register_int_counter_vec"),
    );
    let _ = SOURCE_SUCCESS_TOTAL.set(
        register_int_counter_vec!(
            "weave_source_success_total",
            "Total successful retrievals per data source",
            &["source"]
        )
        .expect("register_int_counter_vec"),
    );
    let _ = SOURCE_ERRORS_TOTAL.set(
        register_int_counter_vec!(
            "weave_source_errors_total",
            "Total failed retrievals per data source and error code",
            &["source", "code"]
        )
        .expect("register_int_counter_vec"),
    );
    let _ = SOURCE_BYTES_EMITTED_TOTAL.set(
        register_int_counter_vec!(
            "weave_source_bytes_emitted_total",
            "Total bytes streamed to consumers per data source",
            &["source"]
        )
        .expect("register_int_counter_vec"),
    );
    let _ = SAMPLING_DECISIONS_TOTAL.set(
        register_int_counter_vec!(
            "weave_sampling_decisions_total",
            "Total sampling decorator decisions by verdict",
            &["verdict"]
        )
        .expect("register_int_counter_vec"),
    );
    let _ = CACHE_HITS_TOTAL.set(
        register_int_counter_vec!(
            "weave_cache_hits_total",
            "Total read-through cache hits per store",
            &["store"]
        )
        .expect("register_int_counter_vec"),
    );
    let _ = CACHE_MISSES_TOTAL.set(
        register_int_counter_vec!(
            "weave_cache_misses_total",
            "Total read-through cache misses per store",
            &["store"]
        )
        .expect("register_int_counter_vec"),
    );
    let _ = CACHE_WRITE_ERRORS_TOTAL.set(
        register_int_counter_vec!(
            "weave_cache_write_errors_total",
            "Total swallowed cache-write failures per store",
            &["store"]
        )
        .expect("register_int_counter_vec"),
    );
    let _ = QUEUE_ENQUEUED_TOTAL.set(
        register_int_counter_vec!(
            "weave_queue_enqueued_total",
            "Total items accepted by worker queues",
            &["queue"]
        )
        .expect("register_int_counter_vec"),
    );
    let _ = QUEUE_DROPPED_TOTAL.set(
        register_int_counter_vec!(
            "weave_queue_dropped_total",
            "Total items dropped at full worker queues",
            &["queue"]
        )
        .expect("register_int_counter_vec"),
    );
    let _ = QUEUE_PROCESSED_TOTAL.set(
        register_int_counter_vec!(
            "weave_queue_processed_total",
            "Total items fully processed by worker queues",
            &["queue"]
        )
        .expect("register_int_counter_vec"),
    );
    let _ = QUEUE_FAILURES_TOTAL.set(
        register_int_counter_vec!(
            "weave_queue_failures_total",
            "Total item-level handler failures in worker queues",
            &["queue"]
        )
        .expect("register_int_counter_vec"),
    );
    let _ = QUEUE_DEPTH.set(
        register_gauge_vec!(
            "weave_queue_depth",
            "Currently queued items per worker queue",
            &["queue"]
        )
        .expect("register_gauge_vec"),
    );
    let _ = VERIFICATION_TOTAL.set(
        register_int_counter_vec!(
            "weave_verification_total",
            "Total data verification passes by outcome",
            &["outcome"]
        )
        .expect("register_int_counter_vec"),
    );

    let _ = crate::sinks::SINK.set(&PROM_SINK);
}
