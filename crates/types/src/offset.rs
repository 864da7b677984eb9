// Path: crates/types/src/offset.rs

//! Transaction placement on the weave.

use crate::id::{DataRoot, TxId};
use serde::{Deserialize, Serialize};

/// The resolved placement of a transaction's data on the weave.
///
/// `offset` is the weave-absolute offset of the transaction's **last**
/// byte. A record with any field unset is treated as a miss; sources that
/// swallow upstream errors return [`TxDataOffset::unset`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxDataOffset {
    /// The transaction id, when resolved.
    pub id: Option<TxId>,
    /// The transaction's merkle data root.
    pub data_root: Option<DataRoot>,
    /// The transaction's total data size in bytes.
    pub data_size: Option<u64>,
    /// Weave-absolute end offset of the transaction's data.
    pub offset: Option<u64>,
}

impl TxDataOffset {
    /// The all-unset record used by fall-through sources.
    pub fn unset() -> Self {
        Self::default()
    }

    /// True when every field is present.
    pub fn is_valid(&self) -> bool {
        self.id.is_some()
            && self.data_root.is_some()
            && self.data_size.is_some()
            && self.offset.is_some()
    }

    /// Weave-absolute offset of the transaction's first byte.
    ///
    /// Defined only for valid records: `offset - data_size + 1`.
    pub fn start_offset(&self) -> Option<u64> {
        match (self.offset, self.data_size) {
            (Some(end), Some(size)) if size > 0 => Some(end - size + 1),
            _ => None,
        }
    }
}

/// The weave interval `[start, end]` owned by a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxBoundary {
    /// Weave-absolute offset of the first byte.
    pub start: u64,
    /// Weave-absolute offset of the last byte.
    pub end: u64,
}

impl TxBoundary {
    /// True when `offset` falls inside the interval.
    pub fn contains(&self, offset: u64) -> bool {
        self.start <= offset && offset <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validity_requires_all_fields() {
        let mut rec = TxDataOffset::unset();
        assert!(!rec.is_valid());
        rec.id = Some(TxId([1u8; 32]));
        rec.data_root = Some(DataRoot([2u8; 32]));
        rec.data_size = Some(10);
        assert!(!rec.is_valid());
        rec.offset = Some(99);
        assert!(rec.is_valid());
        assert_eq!(rec.start_offset(), Some(90));
    }

    #[test]
    fn boundary_containment_is_inclusive() {
        let b = TxBoundary { start: 90, end: 99 };
        assert!(b.contains(90));
        assert!(b.contains(99));
        assert!(!b.contains(89));
        assert!(!b.contains(100));
    }
}
