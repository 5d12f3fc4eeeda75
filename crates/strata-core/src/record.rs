//! Record storage: per-record field maps and version metadata.
//!
//! A [`Record`] keeps its live field values next to the version stamp of
//! every column ever written, plus an optional tombstone. Version entries
//! outlive their values: a deleted record keeps its column versions so late
//! writes can still be arbitrated against them.

use crate::version::ColumnVersion;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;

/// One replicated record: live fields, per-column versions, and an optional
/// tombstone.
///
/// Invariants maintained by the merge engine:
/// - a tombstoned record has empty `fields`;
/// - every column present in `fields` has an entry in `column_versions`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record<V> {
    /// Live column values.
    pub fields: HashMap<String, V>,
    /// Version stamp of every column ever written, including cleared and
    /// pre-deletion columns.
    pub column_versions: HashMap<String, ColumnVersion>,
    /// Set while the record is logically deleted.
    pub tombstone: Option<ColumnVersion>,
}

impl<V> Record<V> {
    pub fn new() -> Self {
        Record {
            fields: HashMap::new(),
            column_versions: HashMap::new(),
            tombstone: None,
        }
    }

    /// Whether the record is logically deleted.
    pub fn is_tombstoned(&self) -> bool {
        self.tombstone.is_some()
    }

    /// Version stamp of one column, if it was ever written.
    pub fn column_version(&self, column: &str) -> Option<&ColumnVersion> {
        self.column_versions.get(column)
    }

    /// Apply a column write or clear together with its version stamp.
    pub(crate) fn set_column(&mut self, column: &str, value: Option<V>, version: ColumnVersion) {
        match value {
            Some(value) => {
                self.fields.insert(column.to_string(), value);
            }
            None => {
                self.fields.remove(column);
            }
        }
        self.column_versions.insert(column.to_string(), version);
    }

    /// Plant a tombstone: fields are erased, column versions are retained so
    /// later writes can still be compared against them.
    pub(crate) fn apply_tombstone(&mut self, version: ColumnVersion) {
        self.fields.clear();
        self.tombstone = Some(version);
    }
}

impl<V> Default for Record<V> {
    fn default() -> Self {
        Record::new()
    }
}

/// The replica-local mapping from record key to record.
///
/// All operations are infallible; iteration order is unspecified.
#[derive(Clone, Debug)]
pub struct RecordTable<K, V> {
    records: HashMap<K, Record<V>>,
}

impl<K, V> RecordTable<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        RecordTable {
            records: HashMap::new(),
        }
    }

    pub fn get(&self, key: &K) -> Option<&Record<V>> {
        self.records.get(key)
    }

    /// Materialize a record on first observation.
    pub fn get_or_insert(&mut self, key: K) -> &mut Record<V> {
        self.records.entry(key).or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &Record<V>)> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<K, V> Default for RecordTable<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        RecordTable::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_column_tracks_versions() {
        let mut record: Record<String> = Record::new();
        let v1 = ColumnVersion::new(1, 1, 1, 1);
        record.set_column("tag", Some("alpha".to_string()), v1);

        assert_eq!(record.fields.get("tag").map(String::as_str), Some("alpha"));
        assert_eq!(record.column_version("tag"), Some(&v1));
    }

    #[test]
    fn test_clear_erases_value_but_keeps_version() {
        let mut record: Record<String> = Record::new();
        record.set_column("tag", Some("alpha".to_string()), ColumnVersion::new(1, 1, 1, 1));

        let v2 = ColumnVersion::new(2, 2, 1, 2);
        record.set_column("tag", None, v2);
        assert!(record.fields.is_empty());
        assert_eq!(record.column_version("tag"), Some(&v2));
    }

    #[test]
    fn test_tombstone_retains_column_versions() {
        let mut record: Record<String> = Record::new();
        let v1 = ColumnVersion::new(1, 1, 1, 1);
        record.set_column("tag", Some("alpha".to_string()), v1);

        record.apply_tombstone(ColumnVersion::new(1, 2, 1, 2));
        assert!(record.is_tombstoned());
        assert!(record.fields.is_empty());
        assert_eq!(record.column_version("tag"), Some(&v1));
    }

    #[test]
    fn test_table_materializes_on_first_observation() {
        let mut table: RecordTable<String, String> = RecordTable::new();
        assert!(table.get(&"r1".to_string()).is_none());
        assert!(table.is_empty());

        table.get_or_insert("r1".to_string());
        assert!(table.get(&"r1".to_string()).is_some());
        assert_eq!(table.len(), 1);
    }
}
