// Path: crates/workers/src/lib.rs
#![forbid(unsafe_code)]

//! # Weave Gateway Workers
//!
//! The bounded-concurrency machinery that feeds the read-through caches:
//! a generic FIFO worker queue with max depth, optional
//! at-most-once-in-flight keys and graceful drain, the concrete importers
//! built on it (content attributes, transaction offsets, verification),
//! and the small concurrency utilities (FIFO semaphore, failure
//! simulator).

/// The data content attributes importer.
pub mod attributes;
/// The transaction offset importer.
pub mod offsets;
/// The generic bounded FIFO worker queue.
pub mod queue;
/// A FIFO counting semaphore with observable state.
pub mod semaphore;
/// The Bernoulli failure simulator for chaos injection.
pub mod sim;
/// The data verification worker.
pub mod verification;

pub use attributes::DataAttributesImporter;
pub use offsets::TxOffsetImporter;
pub use queue::{JobHandler, QueueJob, QueueOptions, WorkerQueue};
pub use semaphore::{Semaphore, SemaphorePermit};
pub use sim::{FailureSimulator, SimulatedFailure};
pub use verification::DataVerificationWorker;
