// Path: crates/telemetry/src/lib.rs
#![forbid(unsafe_code)]

//! # Weave Gateway Telemetry
//!
//! This crate provides the observability infrastructure for the weave
//! gateway: structured logging initialization, a Prometheus metrics
//! endpoint, and abstract sinks for decoupling metric instrumentation from
//! the backend.

/// A lightweight HTTP server exposing `/metrics`, `/healthz`, and `/readyz`.
pub mod http;
/// The initialization routine for global structured logging.
pub mod init;
/// The concrete implementation of metrics sinks using the `prometheus` crate.
pub mod prometheus;
/// Abstract traits (`*MetricsSink`) that define the contract for metrics reporting.
pub mod sinks;

pub use init::init_tracing;
pub use sinks::{cache_metrics, queue_metrics, source_metrics, verification_metrics};
