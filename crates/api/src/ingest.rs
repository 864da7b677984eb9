// Path: crates/api/src/ingest.rs

//! Enqueue-only surfaces of the background importers.
//!
//! Sources hand work to workers through these narrow interfaces, so the
//! back-reference from the retrieval path to the worker pool never names
//! a concrete queue type.

use weave_types::data::ContiguousDataAttributes;
use weave_types::id::TxId;

/// Accepts attribute records observed during retrieval.
pub trait AttributeImportSink: Send + Sync {
    /// Offers a record to the importer. Returns `false` when the queue
    /// dropped it (full and not prioritised).
    fn offer(&self, id: TxId, attributes: ContiguousDataAttributes, prioritized: bool) -> bool;
}

/// Accepts ids whose data should be verified against the chain.
pub trait VerificationSink: Send + Sync {
    /// Offers an id to the verification worker. Returns `false` when the
    /// queue dropped it.
    fn offer(&self, id: TxId, prioritized: bool) -> bool;
}
