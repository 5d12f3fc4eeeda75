//! Batch compression: collapse a change set to its minimal equivalent form.
//!
//! Applying the compressed batch to any replica converges to the same state
//! as applying the original, because a dominated change would have been
//! rejected (or immediately overwritten) by the dominant one anyway.
//!
//! Compression is a pure transform: no clock interaction, no replica state.
//! Record-level deletions and column entries for the same record are kept as
//! independent groups; their interaction is resolved at merge time.

use crate::change::Change;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Reduce `changes` to the dominant entry per `(record, column)` group,
/// with record-level deletions forming their own group per record.
///
/// Dominance here is the four-component order `(col_version, db_version,
/// node_id, seq)`; the output keeps a stable ordering by `seq`.
pub fn compress_changes<K, V>(changes: &mut Vec<Change<K, V>>)
where
    K: Eq + Hash + Clone,
{
    if changes.len() <= 1 {
        return;
    }

    // Deletions group under column `None`.
    let mut winners: HashMap<(K, Option<String>), usize> = HashMap::new();
    for (index, change) in changes.iter().enumerate() {
        let key = (
            change.record_id.clone(),
            change.column().map(str::to_string),
        );
        match winners.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(index);
            }
            Entry::Occupied(mut entry) => {
                let best = &changes[*entry.get()];
                if change.version.dominates_with_seq(&best.version) {
                    entry.insert(index);
                }
            }
        }
    }

    let keep: HashSet<usize> = winners.into_values().collect();
    let mut kept: Vec<Change<K, V>> = std::mem::take(changes)
        .into_iter()
        .enumerate()
        .filter_map(|(index, change)| keep.contains(&index).then_some(change))
        .collect();
    kept.sort_by_key(|change| change.version.seq);
    *changes = kept;
}
