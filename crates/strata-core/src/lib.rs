//! Strata Core - an embeddable last-write-wins map CRDT with per-column
//! versioning, tombstones, and hierarchical parent overlays.
//!
//! Each replica is identified by a numeric node id, keeps a logical clock,
//! and exchanges typed [`Change`] records with its peers. Merging is
//! last-write-wins under the strict dominance order `(col_version,
//! db_version, node_id)`, so replicas converge regardless of delivery order
//! or duplication.
//!
//! # Example
//!
//! ```rust
//! use strata_core::Replica;
//!
//! let mut node1: Replica<String, String> = Replica::new(1);
//! let mut node2: Replica<String, String> = Replica::new(2);
//!
//! let changes = node1.insert_or_update(
//!     "record".to_string(),
//!     [("tag".to_string(), "alpha".to_string())],
//! );
//! node2.merge_changes(changes);
//!
//! assert_eq!(node1.get_data(), node2.get_data());
//! ```
//!
//! # Modules
//!
//! - [`clock`] - the per-replica logical clock
//! - [`version`] - column version stamps and the dominance order
//! - [`change`] - the transmissible change record and its wire shape
//! - [`record`] - per-record field and version storage
//! - [`replica`] - the merge engine, diff engine, and parent overlay
//! - [`compress`] - static batch compression

pub mod change;
pub mod clock;
pub mod compress;
pub mod record;
pub mod replica;
pub mod version;

// Re-export main types for convenience
pub use change::{Change, Op, TOMBSTONE_COLUMN};
pub use clock::LogicalClock;
pub use compress::compress_changes;
pub use record::{Record, RecordTable};
pub use replica::Replica;
pub use version::{ColumnVersion, NodeId};
