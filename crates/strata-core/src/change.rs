//! The change record - the unit of replication.
//!
//! A [`Change`] is one atomic, transmissible fact: either a column write
//! (optionally clearing the stored value) or a whole-record deletion, stamped
//! with the version metadata of its originator. Changes are immutable once
//! authored and are safe to deliver out of order or more than once.
//!
//! On the wire a change is a flat record with optional `col_name` and `value`
//! fields; both are absent for a record deletion. In memory the operation is
//! a tagged enum instead, so the malformed value-without-column shape cannot
//! be constructed.

use crate::version::{ColumnVersion, NodeId};
use serde::{Deserialize, Serialize};

/// Reserved column name that marks a record-level deletion on the wire.
///
/// Peers speaking the flat wire format may spell a deletion either as an
/// absent `col_name` or as this sentinel; both decode to [`Op::Delete`].
pub const TOMBSTONE_COLUMN: &str = "__deleted__";

/// What a change does to its target record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Op<V> {
    /// Set one column to a value.
    Write { column: String, value: V },
    /// Advance one column's version while erasing its stored value.
    Clear { column: String },
    /// Delete the whole record (plant a tombstone).
    Delete,
}

impl<V> Op<V> {
    /// The column this operation targets, if any.
    pub fn column(&self) -> Option<&str> {
        match self {
            Op::Write { column, .. } | Op::Clear { column } => Some(column),
            Op::Delete => None,
        }
    }
}

/// One column write or record deletion, as exchanged between replicas.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    bound(serialize = "K: Serialize + Clone, V: Serialize + Clone"),
    bound(deserialize = "K: Deserialize<'de>, V: Deserialize<'de>"),
    from = "WireChange<K, V>",
    into = "WireChange<K, V>"
)]
pub struct Change<K, V> {
    /// The record this change targets.
    pub record_id: K,
    /// The operation carried by this change.
    pub op: Op<V>,
    /// Version stamp authored alongside the operation.
    pub version: ColumnVersion,
}

impl<K, V> Change<K, V> {
    /// A column write.
    pub fn write(
        record_id: K,
        column: impl Into<String>,
        value: V,
        version: ColumnVersion,
    ) -> Self {
        Change {
            record_id,
            op: Op::Write {
                column: column.into(),
                value,
            },
            version,
        }
    }

    /// A column clear: the version advances, the stored value is erased.
    pub fn clear(record_id: K, column: impl Into<String>, version: ColumnVersion) -> Self {
        Change {
            record_id,
            op: Op::Clear {
                column: column.into(),
            },
            version,
        }
    }

    /// A record-level deletion.
    pub fn delete(record_id: K, version: ColumnVersion) -> Self {
        Change {
            record_id,
            op: Op::Delete,
            version,
        }
    }

    /// The targeted column, or `None` for a deletion.
    pub fn column(&self) -> Option<&str> {
        self.op.column()
    }

    /// The written value, if this change carries one.
    pub fn value(&self) -> Option<&V> {
        match &self.op {
            Op::Write { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Whether this change deletes its record.
    pub fn is_delete(&self) -> bool {
        matches!(self.op, Op::Delete)
    }

    /// The authoring site.
    pub fn node_id(&self) -> NodeId {
        self.version.node_id
    }
}

/// The flat wire shape of a change; `col_name` and `value` are both absent
/// for a record deletion.
#[derive(Serialize, Deserialize)]
#[serde(bound(
    serialize = "K: Serialize, V: Serialize",
    deserialize = "K: Deserialize<'de>, V: Deserialize<'de>"
))]
struct WireChange<K, V> {
    record_id: K,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    col_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<V>,
    col_version: u64,
    db_version: u64,
    node_id: NodeId,
    seq: u64,
}

impl<K, V> From<Change<K, V>> for WireChange<K, V> {
    fn from(change: Change<K, V>) -> Self {
        let (col_name, value) = match change.op {
            Op::Write { column, value } => (Some(column), Some(value)),
            Op::Clear { column } => (Some(column), None),
            Op::Delete => (None, None),
        };
        WireChange {
            record_id: change.record_id,
            col_name,
            value,
            col_version: change.version.col_version,
            db_version: change.version.db_version,
            node_id: change.version.node_id,
            seq: change.version.seq,
        }
    }
}

impl<K, V> From<WireChange<K, V>> for Change<K, V> {
    fn from(wire: WireChange<K, V>) -> Self {
        let op = match (wire.col_name, wire.value) {
            (Some(column), _) if column == TOMBSTONE_COLUMN => Op::Delete,
            (Some(column), Some(value)) => Op::Write { column, value },
            (Some(column), None) => Op::Clear { column },
            // A value with no column has no defined target; normalize the
            // malformed record to a deletion.
            (None, _) => Op::Delete,
        };
        Change {
            record_id: wire.record_id,
            op,
            version: ColumnVersion::new(wire.col_version, wire.db_version, wire.node_id, wire.seq),
        }
    }
}
