// Path: crates/types/src/error/mod.rs
//! Core error types for the weave gateway.

use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// The retrieval error taxonomy surfaced at source boundaries.
///
/// The chain engine branches on these variants: `Cancelled` is re-raised
/// verbatim and never translated; every other variant makes the engine
/// record the failure and try the next source.
#[derive(Error, Debug, Clone)]
pub enum DataSourceError {
    /// The source does not have the requested object.
    #[error("Data not found")]
    NotFound,
    /// The bytes failed hash or merkle-path validation, or ended short.
    #[error("Data corrupt: {0}")]
    DataCorrupt(String),
    /// A policy decorator refused the request.
    #[error("Request filtered: {0}")]
    Filtered(String),
    /// The client cancelled the request.
    #[error("Request cancelled")]
    Cancelled,
    /// Every configured source failed to produce the object.
    #[error("No data source available")]
    NoSourceAvailable,
    /// A retriable upstream failure (timeout, 5xx, throttling).
    #[error("Transient upstream failure: {0}")]
    Transient(String),
    /// A non-retriable source failure.
    #[error("Source failure: {0}")]
    Fatal(String),
}

impl DataSourceError {
    /// True for the cancellation marker, which must propagate untouched.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl ErrorCode for DataSourceError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "DATA_NOT_FOUND",
            Self::DataCorrupt(_) => "DATA_CORRUPT",
            Self::Filtered(_) => "DATA_FILTERED",
            Self::Cancelled => "DATA_CANCELLED",
            Self::NoSourceAvailable => "DATA_NO_SOURCE",
            Self::Transient(_) => "DATA_TRANSIENT",
            Self::Fatal(_) => "DATA_FATAL",
        }
    }
}

/// Errors raised by the chain client and offset search.
#[derive(Error, Debug, Clone)]
pub enum ChainError {
    /// The requested entity does not exist on the chain.
    #[error("Not found on chain")]
    NotFound,
    /// A retriable upstream failure; retries were exhausted.
    #[error("Transient chain failure: {0}")]
    Transient(String),
    /// The upstream returned a non-success status.
    #[error("Chain node returned status {0}")]
    Status(u16),
    /// The response body could not be decoded.
    #[error("Chain response decode error: {0}")]
    Decode(String),
    /// A transport-level failure.
    #[error("Chain transport error: {0}")]
    Transport(String),
}

impl ErrorCode for ChainError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "CHAIN_NOT_FOUND",
            Self::Transient(_) => "CHAIN_TRANSIENT",
            Self::Status(_) => "CHAIN_BAD_STATUS",
            Self::Decode(_) => "CHAIN_DECODE_ERROR",
            Self::Transport(_) => "CHAIN_TRANSPORT_ERROR",
        }
    }
}

impl From<ChainError> for DataSourceError {
    fn from(e: ChainError) -> Self {
        match e {
            ChainError::NotFound => DataSourceError::NotFound,
            ChainError::Transient(msg) => DataSourceError::Transient(msg),
            other => DataSourceError::Fatal(other.to_string()),
        }
    }
}

/// Errors raised by KV-buffer backends.
#[derive(Error, Debug)]
pub enum KvError {
    /// A failure in the underlying backend (filesystem, redb, redis).
    #[error("KV backend error: {0}")]
    Backend(String),
    /// Serializing a value for storage failed.
    #[error("KV encode error: {0}")]
    Encode(String),
    /// Deserializing a stored value failed.
    #[error("KV decode error: {0}")]
    Decode(String),
    /// The store has been closed and refuses further operations.
    #[error("KV store closed")]
    Closed,
}

impl ErrorCode for KvError {
    fn code(&self) -> &'static str {
        match self {
            Self::Backend(_) => "KV_BACKEND_ERROR",
            Self::Encode(_) => "KV_ENCODE_ERROR",
            Self::Decode(_) => "KV_DECODE_ERROR",
            Self::Closed => "KV_CLOSED",
        }
    }
}

/// Errors raised by worker queues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// The queue is at `max_queue_size` and the item was dropped.
    #[error("Queue full")]
    Full,
    /// The queue has been stopped and refuses new work.
    #[error("Queue stopped")]
    Stopped,
    /// The item's key is already queued or in flight.
    #[error("Item already in flight")]
    Duplicate,
}

impl ErrorCode for QueueError {
    fn code(&self) -> &'static str {
        match self {
            Self::Full => "QUEUE_FULL",
            Self::Stopped => "QUEUE_STOPPED",
            Self::Duplicate => "QUEUE_DUPLICATE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_marker_is_distinguished() {
        assert!(DataSourceError::Cancelled.is_cancelled());
        assert!(!DataSourceError::NotFound.is_cancelled());
    }

    #[test]
    fn chain_errors_map_into_the_taxonomy() {
        assert!(matches!(
            DataSourceError::from(ChainError::NotFound),
            DataSourceError::NotFound
        ));
        assert!(matches!(
            DataSourceError::from(ChainError::Transient("t".into())),
            DataSourceError::Transient(_)
        ));
        assert!(matches!(
            DataSourceError::from(ChainError::Status(500)),
            DataSourceError::Fatal(_)
        ));
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(DataSourceError::NoSourceAvailable.code(), "DATA_NO_SOURCE");
        assert_eq!(QueueError::Full.code(), "QUEUE_FULL");
    }
}
