//! Per-column version metadata and the dominance order.
//!
//! Every column write is stamped with a [`ColumnVersion`]. Two writes on the
//! same `(record, column)` are ordered by the strict lexicographic comparison
//! of `(col_version, db_version, node_id)`; the `seq` tag never participates
//! in dominance and exists only so diff output and batch compression have a
//! stable tie-breaker.

use serde::{Deserialize, Serialize};

/// Identifier of a replica within the replication group.
///
/// Chosen externally; must be globally unique across all peers.
pub type NodeId = u64;

/// Version stamp attached to one column of one record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnVersion {
    /// Per-column write counter; 1 on first write, +1 on each overwrite.
    pub col_version: u64,
    /// The authoring replica's clock at the moment the write was produced.
    pub db_version: u64,
    /// Site that authored the write (the originator, never the merger).
    pub node_id: NodeId,
    /// Clock tick at authoring time; diff ordering and compression only.
    pub seq: u64,
}

impl ColumnVersion {
    pub fn new(col_version: u64, db_version: u64, node_id: NodeId, seq: u64) -> Self {
        ColumnVersion {
            col_version,
            db_version,
            node_id,
            seq,
        }
    }

    /// Strict dominance: `(col_version, db_version, node_id)` lexicographic.
    ///
    /// Equal triples do not dominate each other, which is what makes merges
    /// idempotent: re-delivering a change never re-applies it.
    pub fn dominates(&self, other: &ColumnVersion) -> bool {
        (self.col_version, self.db_version, self.node_id)
            > (other.col_version, other.db_version, other.node_id)
    }

    /// Dominance against a possibly absent counterpart.
    ///
    /// Anything dominates the virtual zero version.
    pub fn dominates_opt(&self, other: Option<&ColumnVersion>) -> bool {
        other.map_or(true, |existing| self.dominates(existing))
    }

    /// The four-component order used by compression and diff dedup, where
    /// `seq` breaks ties left over from the dominance triple.
    pub fn dominates_with_seq(&self, other: &ColumnVersion) -> bool {
        (self.col_version, self.db_version, self.node_id, self.seq)
            > (other.col_version, other.db_version, other.node_id, other.seq)
    }
}

/// Pick the dominant of two optional versions.
pub(crate) fn dominant(
    a: Option<ColumnVersion>,
    b: Option<ColumnVersion>,
) -> Option<ColumnVersion> {
    match (a, b) {
        (Some(a), Some(b)) => {
            if b.dominates(&a) {
                Some(b)
            } else {
                Some(a)
            }
        }
        (Some(a), None) => Some(a),
        (None, b) => b,
    }
}
