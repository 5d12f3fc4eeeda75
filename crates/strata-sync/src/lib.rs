//! Strata Sync - offline synchronization helpers for strata replicas.
//!
//! The core exposes everything a transport needs (`get_changes_since`,
//! `merge_changes`, `get_clock`); this crate adds the small pieces callers
//! keep rewriting around it:
//!
//! - [`sync_nodes`] - pull one replica's recent changes into another and
//!   advance the caller's watermark
//! - [`Watermarks`] - per-peer watermark bookkeeping for scripting
//!   offline/online reconciliation across many peers
//! - [`wire`] - a JSON codec for change batches, matching the flat wire
//!   shape of the change record

pub mod session;
pub mod wire;

// Re-export main types for convenience
pub use session::{sync_nodes, Watermarks};
pub use wire::{decode_changes, encode_changes, SyncError};
