// Path: crates/chain/src/mapping.rs

//! The offset-to-block mapping.
//!
//! An immutable JSON file, regenerated offline against a chain gateway at
//! fixed weave-size increments, mapping sampled weave offsets to block
//! heights. It narrows the tx-by-offset binary search from the full chain
//! to the bracket between two sampled heights.

use serde::{Deserialize, Serialize};
use std::path::Path;
use weave_types::chain::stringy_u64;

/// One sampled point: everything at or after `offset` was written at or
/// after `block_height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OffsetInterval {
    /// Sampled weave-absolute offset.
    #[serde(deserialize_with = "stringy_u64")]
    pub offset: u64,
    /// Height of the block containing `offset`.
    pub block_height: u64,
}

/// The mapping file contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OffsetBlockMapping {
    /// Format version of the mapping file.
    pub version: u32,
    /// ISO-8601 generation timestamp, informational only.
    pub generated_at: String,
    /// Chain height when the mapping was generated.
    pub current_height: u64,
    /// Weave size when the mapping was generated.
    #[serde(deserialize_with = "stringy_u64")]
    pub current_weave_size: u64,
    /// Sampling increment between intervals, in bytes.
    #[serde(deserialize_with = "stringy_u64")]
    pub interval_bytes: u64,
    /// Sampled points, ascending in both columns.
    pub intervals: Vec<OffsetInterval>,
}

impl OffsetBlockMapping {
    /// Loads and validates the mapping at `path`.
    ///
    /// Any failure (missing file, parse error, invalid shape) is logged
    /// as a warning and yields `None`: callers must then search the full
    /// range `[0, current_height]`.
    pub fn load<P: AsRef<Path>>(path: P) -> Option<Self> {
        let path = path.as_ref();
        let raw = match std::fs::read(path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(target: "chain", path = %path.display(), error = %e, "offset mapping unreadable, using full-range search");
                return None;
            }
        };
        let mapping: OffsetBlockMapping = match serde_json::from_slice(&raw) {
            Ok(mapping) => mapping,
            Err(e) => {
                tracing::warn!(target: "chain", path = %path.display(), error = %e, "offset mapping unparsable, using full-range search");
                return None;
            }
        };
        if let Err(reason) = mapping.validate() {
            tracing::warn!(target: "chain", path = %path.display(), reason, "offset mapping invalid, using full-range search");
            return None;
        }
        Some(mapping)
    }

    /// Checks the mapping's shape: at least two intervals, offsets and
    /// block heights both strictly increasing.
    pub fn validate(&self) -> Result<(), String> {
        if self.intervals.len() < 2 {
            return Err(format!(
                "{} intervals, at least 2 required",
                self.intervals.len()
            ));
        }
        for pair in self.intervals.windows(2) {
            if pair[1].offset <= pair[0].offset {
                return Err(format!(
                    "offsets not strictly increasing at {}",
                    pair[1].offset
                ));
            }
            if pair[1].block_height <= pair[0].block_height {
                return Err(format!(
                    "block heights not strictly increasing at {}",
                    pair[1].block_height
                ));
            }
        }
        Ok(())
    }

    /// Returns the height bracket `[lo, hi]` guaranteed to contain the
    /// block owning `target_offset`.
    pub fn get_search_bounds(&self, target_offset: u64, current_height: u64) -> (u64, u64) {
        let intervals = &self.intervals;
        let first = &intervals[0];
        let last = &intervals[intervals.len() - 1];

        if target_offset < first.offset {
            return (0, first.block_height);
        }
        if target_offset >= last.offset {
            return (last.block_height, current_height);
        }
        // The adjacent pair with intervals[i].offset <= target < intervals[i+1].offset.
        let upper = intervals.partition_point(|iv| iv.offset <= target_offset);
        let lower = upper - 1;
        (
            intervals[lower].block_height,
            intervals[upper].block_height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIB: u64 = 1 << 40;

    fn mapping(intervals: Vec<(u64, u64)>) -> OffsetBlockMapping {
        OffsetBlockMapping {
            version: 1,
            generated_at: "2026-01-01T00:00:00Z".to_string(),
            current_height: 300_000,
            current_weave_size: 12 * TIB,
            interval_bytes: 5 * TIB,
            intervals: intervals
                .into_iter()
                .map(|(offset, block_height)| OffsetInterval {
                    offset,
                    block_height,
                })
                .collect(),
        }
    }

    #[test]
    fn brackets_at_and_between_sampled_points() {
        let m = mapping(vec![(0, 0), (5 * TIB, 100_000), (10 * TIB, 210_000)]);
        assert!(m.validate().is_ok());

        assert_eq!(m.get_search_bounds(3 * TIB, 300_000), (0, 100_000));
        // Exactly on a sampled point: the point is the lower bound.
        assert_eq!(m.get_search_bounds(5 * TIB, 300_000), (100_000, 210_000));
        // Past the last point: bounded by the live chain height.
        assert_eq!(m.get_search_bounds(12 * TIB, 300_000), (210_000, 300_000));
        // Below the first point.
        let m2 = mapping(vec![(TIB, 50_000), (2 * TIB, 80_000)]);
        assert_eq!(m2.get_search_bounds(10, 300_000), (0, 50_000));
    }

    #[test]
    fn rejects_short_or_unsorted_mappings() {
        assert!(mapping(vec![(0, 0)]).validate().is_err());
        assert!(mapping(vec![(0, 0), (0, 10)]).validate().is_err());
        assert!(mapping(vec![(5, 10), (4, 20)]).validate().is_err());
        // Equal adjacent heights carry no bracketing information.
        assert!(mapping(vec![(0, 10), (TIB, 10)]).validate().is_err());
        assert!(mapping(vec![(0, 20), (TIB, 10)]).validate().is_err());
    }

    #[test]
    fn load_rejects_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapping.json");

        assert!(OffsetBlockMapping::load(&path).is_none());

        std::fs::write(&path, b"{not json").unwrap();
        assert!(OffsetBlockMapping::load(&path).is_none());

        let valid = mapping(vec![(0, 0), (5 * TIB, 100_000)]);
        std::fs::write(&path, serde_json::to_vec(&valid).unwrap()).unwrap();
        let loaded = OffsetBlockMapping::load(&path).unwrap();
        assert_eq!(loaded.intervals.len(), 2);
    }
}
