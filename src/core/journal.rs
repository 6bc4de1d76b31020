//! Journaled Map
//!
//! A `BTreeMap` that can roll back everything written since a snapshot was
//! started. Writes made while a snapshot is open record the key's previous
//! value; rolling back replays those records newest first. Cost is
//! proportional to the entries touched, never to the size of the map.

use std::collections::BTreeMap;
use std::ops::Deref;

/// Ordered map with snapshot/rollback. Reads go through `Deref`.
#[derive(Clone, Debug)]
pub struct JournaledMap<K, V> {
    entries: BTreeMap<K, V>,
    /// Previous values of touched keys, `None` while no snapshot is open.
    undo: Option<Vec<(K, Option<V>)>>,
}

impl<K, V> Default for JournaledMap<K, V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            undo: None,
        }
    }
}

impl<K: Ord + Clone, V: Clone> JournaledMap<K, V> {
    /// Empty map with no open snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start recording writes. An open snapshot is kept as is.
    pub fn start_snapshot(&mut self) {
        if self.undo.is_none() {
            self.undo = Some(Vec::new());
        }
    }

    /// Close the snapshot. `keep == false` undoes every write it recorded.
    pub fn end_snapshot(&mut self, keep: bool) {
        let Some(undo) = self.undo.take() else {
            return;
        };
        if keep {
            return;
        }
        for (key, previous) in undo.into_iter().rev() {
            match previous {
                Some(value) => self.entries.insert(key, value),
                None => self.entries.remove(&key),
            };
        }
    }

    /// Whether a snapshot is open.
    pub fn in_snapshot(&self) -> bool {
        self.undo.is_some()
    }

    fn record(&mut self, key: &K) {
        if let Some(undo) = self.undo.as_mut() {
            undo.push((key.clone(), self.entries.get(key).cloned()));
        }
    }

    /// Insert, returning the previous value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.record(&key);
        self.entries.insert(key, value)
    }

    /// Remove, returning the value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        if !self.entries.contains_key(key) {
            return None;
        }
        self.record(key);
        self.entries.remove(key)
    }

    /// Mutable access to an existing entry.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        if !self.entries.contains_key(key) {
            return None;
        }
        self.record(key);
        self.entries.get_mut(key)
    }

    /// Mutable access, inserting `V::default()` first if absent.
    pub fn entry_or_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.record(&key);
        self.entries.entry(key).or_default()
    }
}

impl<K, V> Deref for JournaledMap<K, V> {
    type Target = BTreeMap<K, V>;

    fn deref(&self) -> &BTreeMap<K, V> {
        &self.entries
    }
}

impl<K: Ord, V: PartialEq> PartialEq for JournaledMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K: Ord, V: Eq> Eq for JournaledMap<K, V> {}

// =============================================================================
// TESTS
// =============================================================================
