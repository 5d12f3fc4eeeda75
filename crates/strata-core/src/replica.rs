//! The replica: merge engine, diff engine, and parent overlay.
//!
//! A [`Replica`] owns a record table and a logical clock, and optionally
//! reads through a shared, immutable parent replica. Local mutations and
//! merges only ever touch the replica's own table; the parent is composed in
//! at read time, column by column, under the dominance order.
//!
//! Merging is total: a change that does not dominate what the replica
//! already knows is simply ignored, and the subset that did land is handed
//! back to the caller for re-broadcast.

use crate::change::{Change, Op};
use crate::clock::LogicalClock;
use crate::compress::compress_changes;
use crate::record::{Record, RecordTable};
use crate::version::{dominant, ColumnVersion, NodeId};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// One replica of the last-write-wins map.
///
/// Generic over the record key `K` and the cell value `V`. Replicas converge
/// under change exchange regardless of delivery order or duplication.
#[derive(Clone, Debug)]
pub struct Replica<K, V> {
    node_id: NodeId,
    clock: LogicalClock,
    table: RecordTable<K, V>,
    /// Shared read-only parent; never mutated through this replica.
    parent: Option<Arc<Replica<K, V>>>,
    /// Highest `db_version` installed at bootstrap. Diffs treat this as a
    /// floor so bootstrap data is never re-emitted.
    merge_db_version: u64,
}

impl<K, V> Replica<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// An empty replica.
    pub fn new(node_id: NodeId) -> Self {
        Replica {
            node_id,
            clock: LogicalClock::new(),
            table: RecordTable::new(),
            parent: None,
            merge_db_version: 0,
        }
    }

    /// Bootstrap a replica from a previously exported change set.
    ///
    /// The changes are installed through the merge engine (duplicates in the
    /// input collapse on their own), then the clock and the diff watermark
    /// are set to the highest `db_version` observed.
    pub fn with_changes(node_id: NodeId, initial_changes: Vec<Change<K, V>>) -> Self {
        let watermark = initial_changes
            .iter()
            .map(|change| change.version.db_version)
            .max()
            .unwrap_or(0);
        let mut replica = Replica::new(node_id);
        replica.merge_changes(initial_changes);
        replica.merge_db_version = watermark;
        replica
    }

    /// An overlay replica on top of a shared parent.
    ///
    /// The child's clock starts at the parent's current time; its table
    /// starts empty and only ever holds the child's own writes.
    pub fn with_parent(node_id: NodeId, parent: Arc<Replica<K, V>>) -> Self {
        let mut clock = LogicalClock::new();
        clock.observe(parent.get_clock());
        Replica {
            node_id,
            clock,
            table: RecordTable::new(),
            parent: Some(parent),
            merge_db_version: 0,
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// The replica's current `db_version`.
    pub fn get_clock(&self) -> u64 {
        self.clock.now()
    }

    pub fn parent(&self) -> Option<&Arc<Replica<K, V>>> {
        self.parent.as_ref()
    }

    /// Write (or overwrite) a set of columns on one record.
    ///
    /// Advances the clock once; every emitted change carries that tick as
    /// both `db_version` and `seq`. Emission order follows the order of
    /// `fields`, so callers needing determinism pre-order their input.
    ///
    /// Writes to a record that reads as deleted are dropped silently and
    /// produce no changes: once deleted, local writes must not resurrect.
    pub fn insert_or_update<I>(&mut self, record_id: K, fields: I) -> Vec<Change<K, V>>
    where
        I: IntoIterator<Item = (String, V)>,
    {
        if self
            .get_record(&record_id)
            .map_or(false, |record| record.is_tombstoned())
        {
            return Vec::new();
        }

        let db_version = self.clock.tick();
        let mut changes = Vec::new();
        for (column, value) in fields {
            let col_version = self
                .effective_column_version(&record_id, &column)
                .map_or(1, |existing| existing.col_version + 1);
            let version = ColumnVersion::new(col_version, db_version, self.node_id, db_version);
            self.table
                .get_or_insert(record_id.clone())
                .set_column(&column, Some(value.clone()), version);
            changes.push(Change::write(record_id.clone(), column, value, version));
        }
        changes
    }

    /// Delete a record, planting (or re-planting) its tombstone.
    ///
    /// Field values are erased; column versions are retained so late writes
    /// can still be arbitrated. Deleting an already-deleted record produces
    /// a fresh, dominating tombstone.
    pub fn delete_record(&mut self, record_id: &K) -> Vec<Change<K, V>> {
        let db_version = self.clock.tick();
        let col_version = self
            .effective_tombstone(record_id)
            .map_or(1, |existing| existing.col_version + 1);
        let version = ColumnVersion::new(col_version, db_version, self.node_id, db_version);
        self.table
            .get_or_insert(record_id.clone())
            .apply_tombstone(version);
        vec![Change::delete(record_id.clone(), version)]
    }

    /// Merge a batch of changes from a peer.
    ///
    /// Returns the subset that was actually accepted - the authoritative set
    /// the caller may re-broadcast. Never fails; non-dominant changes are a
    /// normal outcome, not an error.
    pub fn merge_changes(&mut self, batch: Vec<Change<K, V>>) -> Vec<Change<K, V>> {
        self.merge_batch(batch, false)
    }

    /// Merge changes that already flowed through this replica's parent
    /// chain, skipping the parent-aware tombstone check so inherited state
    /// is not double-counted.
    pub fn merge_inherited_changes(&mut self, batch: Vec<Change<K, V>>) -> Vec<Change<K, V>> {
        self.merge_batch(batch, true)
    }

    fn merge_batch(&mut self, batch: Vec<Change<K, V>>, ignore_parent: bool) -> Vec<Change<K, V>> {
        let mut accepted = Vec::with_capacity(batch.len());
        for change in batch {
            self.clock.observe(change.version.db_version);
            if self.apply_change(&change, ignore_parent) {
                accepted.push(change);
            }
        }
        accepted
    }

    fn apply_change(&mut self, change: &Change<K, V>, ignore_parent: bool) -> bool {
        let incoming = change.version;
        match &change.op {
            Op::Delete => {
                let current = self.tombstone_for_merge(&change.record_id, ignore_parent);
                if !incoming.dominates_opt(current.as_ref()) {
                    return false;
                }
                self.table
                    .get_or_insert(change.record_id.clone())
                    .apply_tombstone(incoming);
                true
            }
            Op::Write { column, value } => {
                self.apply_column(&change.record_id, column, Some(value), incoming, ignore_parent)
            }
            Op::Clear { column } => {
                self.apply_column(&change.record_id, column, None, incoming, ignore_parent)
            }
        }
    }

    fn apply_column(
        &mut self,
        record_id: &K,
        column: &str,
        value: Option<&V>,
        incoming: ColumnVersion,
        ignore_parent: bool,
    ) -> bool {
        let local_entry = self
            .table
            .get(record_id)
            .and_then(|record| record.column_version(column).copied());
        if !incoming.dominates_opt(local_entry.as_ref()) {
            return false;
        }
        // A write on a tombstoned record only lands if it beats the tombstone.
        if let Some(tombstone) = self.tombstone_for_merge(record_id, ignore_parent) {
            if !incoming.dominates(&tombstone) {
                return false;
            }
        }
        let record = self.table.get_or_insert(record_id.clone());
        record.tombstone = None;
        record.set_column(column, value.cloned(), incoming);
        true
    }

    fn tombstone_for_merge(&self, record_id: &K, ignore_parent: bool) -> Option<ColumnVersion> {
        if ignore_parent {
            self.table.get(record_id).and_then(|record| record.tombstone)
        } else {
            self.effective_tombstone(record_id)
        }
    }

    /// The dominant tombstone for a record across the whole parent chain.
    fn effective_tombstone(&self, record_id: &K) -> Option<ColumnVersion> {
        let local = self.table.get(record_id).and_then(|record| record.tombstone);
        let inherited = self
            .parent
            .as_ref()
            .and_then(|parent| parent.effective_tombstone(record_id));
        dominant(local, inherited)
    }

    /// The dominant version for a column across the whole parent chain.
    fn effective_column_version(&self, record_id: &K, column: &str) -> Option<ColumnVersion> {
        let local = self
            .table
            .get(record_id)
            .and_then(|record| record.column_version(column).copied());
        let inherited = self
            .parent
            .as_ref()
            .and_then(|parent| parent.effective_column_version(record_id, column));
        dominant(local, inherited)
    }

    /// The effective view of one record: the parent chain unioned with this
    /// replica, resolved column by column under the dominance order.
    pub fn get_record(&self, record_id: &K) -> Option<Record<V>> {
        let mut base = self
            .parent
            .as_ref()
            .and_then(|parent| parent.get_record(record_id));
        if let Some(local) = self.table.get(record_id) {
            match &mut base {
                Some(record) => overlay_record(record, local),
                None => base = Some(local.clone()),
            }
        }
        if self.parent.is_some() {
            if let Some(record) = &mut base {
                settle_tombstone(record);
            }
        }
        base
    }

    /// The effective record table: this replica unioned with its parent
    /// chain. Tombstoned records are present with empty fields.
    pub fn get_data(&self) -> HashMap<K, Record<V>> {
        let mut data = match &self.parent {
            Some(parent) => parent.get_data(),
            None => HashMap::new(),
        };
        for (record_id, record) in self.table.iter() {
            match data.entry(record_id.clone()) {
                Entry::Occupied(mut entry) => overlay_record(entry.get_mut(), record),
                Entry::Vacant(entry) => {
                    entry.insert(record.clone());
                }
            }
        }
        if self.parent.is_some() {
            for record in data.values_mut() {
                settle_tombstone(record);
            }
        }
        data
    }

    /// All changes authored strictly after `threshold` (exclusive), through
    /// the parent chain.
    ///
    /// Parent changes come first, local changes after; entries produced by
    /// both tiers collapse to the dominant one per `(record, column)`. The
    /// bootstrap watermark acts as an additional floor.
    pub fn get_changes_since(&self, threshold: u64) -> Vec<Change<K, V>> {
        let floor = threshold.max(self.merge_db_version);
        let mut changes = match &self.parent {
            Some(parent) => parent.get_changes_since(threshold),
            None => Vec::new(),
        };
        for (record_id, record) in self.table.iter() {
            for (column, version) in &record.column_versions {
                if version.db_version <= floor {
                    continue;
                }
                let change = match record.fields.get(column) {
                    Some(value) => Change::write(
                        record_id.clone(),
                        column.clone(),
                        value.clone(),
                        *version,
                    ),
                    None => Change::clear(record_id.clone(), column.clone(), *version),
                };
                changes.push(change);
            }
            if let Some(tombstone) = record.tombstone {
                if tombstone.db_version > floor {
                    changes.push(Change::delete(record_id.clone(), tombstone));
                }
            }
        }
        if self.parent.is_some() {
            // Both tiers may have produced an entry for the same target;
            // keep the dominant one.
            compress_changes(&mut changes);
        }
        changes
    }
}

/// Fold an upper tier's record into the effective view, column by column.
fn overlay_record<V: Clone>(base: &mut Record<V>, upper: &Record<V>) {
    if let Some(upper_tombstone) = upper.tombstone {
        if upper_tombstone.dominates_opt(base.tombstone.as_ref()) {
            base.tombstone = Some(upper_tombstone);
        }
    }
    for (column, version) in &upper.column_versions {
        let wins = base
            .column_versions
            .get(column)
            .map_or(true, |existing| version.dominates(existing));
        if !wins {
            continue;
        }
        base.column_versions.insert(column.clone(), *version);
        match upper.fields.get(column) {
            Some(value) => {
                base.fields.insert(column.clone(), value.clone());
            }
            None => {
                base.fields.remove(column);
            }
        }
    }
}

/// Resolve a composed record against its tombstone: fields survive only if
/// their version dominates it, and a surviving field lifts the tombstone.
fn settle_tombstone<V>(record: &mut Record<V>) {
    if let Some(tombstone_version) = record.tombstone {
        let column_versions = &record.column_versions;
        record.fields.retain(|column, _| {
            column_versions
                .get(column)
                .map_or(false, |version| version.dominates(&tombstone_version))
        });
        if !record.fields.is_empty() {
            record.tombstone = None;
        }
    }
}
