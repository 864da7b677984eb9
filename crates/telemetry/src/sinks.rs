// Path: crates/telemetry/src/sinks.rs
//! Defines abstract traits for metrics reporting, decoupling core logic from the backend.

use once_cell::sync::OnceCell;

// --- Static Sink Access ---

/// A no-op sink for use in tests or when telemetry is disabled.
#[derive(Debug, Clone, Copy)]
pub struct NopSink;

/// A lazily-initialized static reference to the global `MetricsSink` implementation.
pub static SINK: OnceCell<&'static dyn MetricsSink> = OnceCell::new();
static NOP_SINK: NopSink = NopSink;

/// Returns a static reference to the configured data-source metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn source_metrics() -> &'static dyn SourceMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured cache metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn cache_metrics() -> &'static dyn CacheMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured worker-queue metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn queue_metrics() -> &'static dyn QueueMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured verification metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn verification_metrics() -> &'static dyn VerificationMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

// --- Trait Definitions ---

/// A sink for metrics related to data source attempts and outcomes.
pub trait SourceMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the counter of retrieval attempts, labeled by source.
    fn inc_source_attempt(&self, source: &str);
    /// Increments the counter of successful retrievals, labeled by source.
    fn inc_source_success(&self, source: &str);
    /// Increments the counter of failed retrievals, labeled by source and error code.
    fn inc_source_error(&self, source: &str, code: &str);
    /// Increments the counter of sampling decisions, labeled by verdict.
    fn inc_sampling_decision(&self, sampled: bool);
    /// Increments the counter of bytes streamed to clients, labeled by source.
    fn inc_bytes_emitted(&self, source: &str, bytes: u64);
}
impl SourceMetricsSink for NopSink {
    fn inc_source_attempt(&self, _source: &str) {}
    fn inc_source_success(&self, _source: &str) {}
    fn inc_source_error(&self, _source: &str, _code: &str) {}
    fn inc_sampling_decision(&self, _sampled: bool) {}
    fn inc_bytes_emitted(&self, _source: &str, _bytes: u64) {}
}

/// A sink for metrics related to read-through caches.
pub trait CacheMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the cache hit counter, labeled by store.
    fn inc_cache_hit(&self, store: &str);
    /// Increments the cache miss counter, labeled by store.
    fn inc_cache_miss(&self, store: &str);
    /// Increments the counter of swallowed cache-write failures, labeled by store.
    fn inc_cache_write_error(&self, store: &str);
}
impl CacheMetricsSink for NopSink {
    fn inc_cache_hit(&self, _store: &str) {}
    fn inc_cache_miss(&self, _store: &str) {}
    fn inc_cache_write_error(&self, _store: &str) {}
}

/// A sink for metrics related to bounded worker queues.
pub trait QueueMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the counter of accepted enqueues, labeled by queue.
    fn inc_enqueued(&self, queue: &str);
    /// Increments the counter of items dropped at a full queue, labeled by queue.
    fn inc_dropped(&self, queue: &str);
    /// Increments the counter of items fully processed, labeled by queue.
    fn inc_processed(&self, queue: &str);
    /// Increments the counter of item-level handler failures, labeled by queue.
    fn inc_failed(&self, queue: &str);
    /// Sets the gauge of currently queued items, labeled by queue.
    fn set_depth(&self, queue: &str, depth: u64);
}
impl QueueMetricsSink for NopSink {
    fn inc_enqueued(&self, _queue: &str) {}
    fn inc_dropped(&self, _queue: &str) {}
    fn inc_processed(&self, _queue: &str) {}
    fn inc_failed(&self, _queue: &str) {}
    fn set_depth(&self, _queue: &str, _depth: u64) {}
}

/// A sink for metrics related to data verification outcomes.
pub trait VerificationMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the counter of verification passes, labeled by outcome.
    fn inc_verification(&self, ok: bool);
}
impl VerificationMetricsSink for NopSink {
    fn inc_verification(&self, _ok: bool) {}
}

/// The full sink contract: one implementation covers every concern.
pub trait MetricsSink:
    SourceMetricsSink + CacheMetricsSink + QueueMetricsSink + VerificationMetricsSink
{
}
impl MetricsSink for NopSink {}
