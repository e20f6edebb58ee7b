//! The job-data map carried by jobs and triggers.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

/// An ordered, string-keyed map of JSON values attached to a job or trigger.
///
/// The map tracks a dirty flag so trigger updates can skip rewriting the
/// serialized blob when nothing changed, and a set of transient keys that
/// are stripped before serialization.
#[derive(Debug, Clone, Default)]
pub struct JobDataMap {
    entries: BTreeMap<String, Value>,
    transient_keys: BTreeSet<String>,
    dirty: bool,
}

impl JobDataMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, marking the map dirty.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
        self.dirty = true;
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Remove an entry, marking the map dirty if it was present.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    /// Mark a key as transient; transient entries are never persisted.
    pub fn mark_transient(&mut self, key: impl Into<String>) {
        self.transient_keys.insert(key.into());
    }

    /// Entries that survive serialization, with transient keys stripped.
    pub(crate) fn persistent_entries(&self) -> BTreeMap<String, Value> {
        self.entries
            .iter()
            .filter(|(k, _)| !self.transient_keys.contains(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag, typically after the map has been persisted.
    pub fn clear_dirty_flag(&mut self) {
        self.dirty = false;
    }
}

impl From<BTreeMap<String, Value>> for JobDataMap {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Self {
            entries,
            transient_keys: BTreeSet::new(),
            dirty: false,
        }
    }
}

impl PartialEq for JobDataMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_sets_dirty() {
        let mut map = JobDataMap::new();
        assert!(!map.is_dirty());
        map.put("color", "blue");
        assert!(map.is_dirty());
        map.clear_dirty_flag();
        assert!(!map.is_dirty());
    }

    #[test]
    fn test_remove_missing_keeps_clean() {
        let mut map = JobDataMap::new();
        assert!(map.remove("absent").is_none());
        assert!(!map.is_dirty());
    }

    #[test]
    fn test_transient_entries_stripped() {
        let mut map = JobDataMap::new();
        map.put("keep", "yes");
        map.put("drop", "no");
        map.mark_transient("drop");

        let persisted = map.persistent_entries();
        assert_eq!(persisted.len(), 1);
        assert!(persisted.contains_key("keep"));
    }

    #[test]
    fn test_equality_ignores_flags() {
        let mut a = JobDataMap::new();
        a.put("k", "v");
        let mut b = JobDataMap::new();
        b.put("k", "v");
        b.clear_dirty_flag();
        assert_eq!(a, b);
    }
}
