//! Watermark bookkeeping for scripted synchronization.
//!
//! A watermark remembers the highest `db_version` already pulled from a
//! peer, so repeated sync rounds only carry the tail of the peer's history.

use std::collections::HashMap;
use std::hash::Hash;
use strata_core::{NodeId, Replica};

/// Pull `source`'s changes newer than `*watermark` into `destination`, then
/// advance the watermark to `source`'s current clock.
///
/// Calling this in both directions (with one watermark per direction)
/// reconciles two replicas that diverged offline.
pub fn sync_nodes<K, V>(
    source: &Replica<K, V>,
    destination: &mut Replica<K, V>,
    watermark: &mut u64,
) where
    K: Eq + Hash + Clone,
    V: Clone,
{
    let changes = source.get_changes_since(*watermark);
    destination.merge_changes(changes);
    *watermark = source.get_clock();
}

/// Per-peer watermark table for multi-peer sync scripting.
///
/// Keyed by the peer's node id; unseen peers start at watermark 0, so the
/// first pull transfers the peer's full history.
#[derive(Clone, Debug, Default)]
pub struct Watermarks {
    seen: HashMap<NodeId, u64>,
}

impl Watermarks {
    pub fn new() -> Self {
        Watermarks {
            seen: HashMap::new(),
        }
    }

    /// The watermark currently held for a peer.
    pub fn get(&self, peer: NodeId) -> u64 {
        self.seen.get(&peer).copied().unwrap_or(0)
    }

    /// Pull changes from `source` into `destination` using (and advancing)
    /// the watermark tracked for `source`'s node id.
    pub fn pull<K, V>(&mut self, source: &Replica<K, V>, destination: &mut Replica<K, V>)
    where
        K: Eq + Hash + Clone,
        V: Clone,
    {
        let mut watermark = self.get(source.node_id());
        sync_nodes(source, destination, &mut watermark);
        self.seen.insert(source.node_id(), watermark);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(entries: &[(&str, &str)]) -> Vec<(String, String)> {
        entries
            .iter()
            .map(|(column, value)| (column.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn test_sync_nodes_advances_watermark() {
        let mut source: Replica<String, String> = Replica::new(1);
        let mut destination: Replica<String, String> = Replica::new(2);
        source.insert_or_update("r1".to_string(), fields(&[("tag", "alpha")]));

        let mut watermark = 0;
        sync_nodes(&source, &mut destination, &mut watermark);

        assert_eq!(watermark, source.get_clock());
        assert!(destination.get_record(&"r1".to_string()).is_some());
    }

    #[test]
    fn test_second_pull_carries_only_the_tail() {
        let mut source: Replica<String, String> = Replica::new(1);
        let mut destination: Replica<String, String> = Replica::new(2);
        source.insert_or_update("r1".to_string(), fields(&[("tag", "alpha")]));

        let mut watermark = 0;
        sync_nodes(&source, &mut destination, &mut watermark);

        source.insert_or_update("r2".to_string(), fields(&[("tag", "beta")]));
        let tail = source.get_changes_since(watermark);
        assert_eq!(tail.len(), 1);

        sync_nodes(&source, &mut destination, &mut watermark);
        assert_eq!(destination.get_data(), source.get_data());
    }

    #[test]
    fn test_watermarks_track_peers_independently() {
        let mut peer1: Replica<String, String> = Replica::new(1);
        let mut peer2: Replica<String, String> = Replica::new(2);
        let mut local: Replica<String, String> = Replica::new(3);

        peer1.insert_or_update("a".to_string(), fields(&[("tag", "one")]));
        peer2.insert_or_update("b".to_string(), fields(&[("tag", "two")]));
        peer2.insert_or_update("c".to_string(), fields(&[("tag", "three")]));

        let mut watermarks = Watermarks::new();
        watermarks.pull(&peer1, &mut local);
        watermarks.pull(&peer2, &mut local);

        assert_eq!(watermarks.get(1), peer1.get_clock());
        assert_eq!(watermarks.get(2), peer2.get_clock());
        assert_eq!(local.get_data().len(), 3);
    }
}
