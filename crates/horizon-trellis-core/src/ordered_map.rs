//! Insertion-ordered string map.
//!
//! `OrderedMap` pairs a key → value map with an ordered key list so that
//! iteration is deterministic. The key list always equals the set of
//! currently present keys, in first-insertion order, unless explicitly
//! re-sorted with [`OrderedMap::sort_keys`]. All mutation goes through
//! [`insert`](OrderedMap::insert) / [`remove`](OrderedMap::remove), which
//! keeps the two structures in lockstep.

use std::collections::HashMap;

use crate::variant::Variant;

/// A string-keyed map that preserves key insertion order.
#[derive(Debug, Clone)]
pub struct OrderedMap<V> {
    keys: Vec<String>,
    map: HashMap<String, V>,
}

// Manual impl: the derive would demand `V: Default` even though an empty
// map needs no values.
impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> OrderedMap<V> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            map: HashMap::new(),
        }
    }

    /// Insert or overwrite a value.
    ///
    /// A new key is appended to the key order; updating an existing key
    /// keeps its original position. Returns the previous value, if any.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        let old = self.map.insert(key.clone(), value);
        if old.is_none() {
            self.keys.push(key);
        }
        old
    }

    /// Remove a key and its value.
    ///
    /// Returns the removed value, or `None` if the key was absent.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let removed = self.map.remove(key);
        if removed.is_some() {
            self.keys.retain(|k| k != key);
        }
        removed
    }

    /// Get a value by key.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.map.get(key)
    }

    /// Get a mutable value by key.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.map.get_mut(key)
    }

    /// Check whether a key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The keys in their current iteration order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Iterate `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.keys
            .iter()
            .filter_map(|k| self.map.get(k).map(|v| (k.as_str(), v)))
    }

    /// Invoke `f(value, key)` for each entry in key order.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&V, &str),
    {
        for key in &self.keys {
            if let Some(value) = self.map.get(key) {
                f(value, key);
            }
        }
    }

    /// Case-insensitively sort the key order in place.
    ///
    /// Values are untouched; only iteration order changes.
    pub fn sort_keys(&mut self) {
        self.keys
            .sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()));
    }

    /// Values in current key order.
    pub fn values_in_order(&self) -> Vec<&V> {
        self.keys.iter().filter_map(|k| self.map.get(k)).collect()
    }
}

impl<V: Clone> OrderedMap<V> {
    /// Values cloned into a plain vector, in current key order.
    pub fn to_vec(&self) -> Vec<V> {
        self.keys
            .iter()
            .filter_map(|k| self.map.get(k).cloned())
            .collect()
    }
}

impl OrderedMap<Variant> {
    /// Build a fresh map holding only the named, non-null entries of
    /// `source`, in the order the names were given.
    ///
    /// Names missing from `source` or bound to `Variant::Null` are skipped.
    pub fn collect_from(source: &OrderedMap<Variant>, names: &[&str]) -> OrderedMap<Variant> {
        let mut out = OrderedMap::new();
        for name in names {
            if let Some(value) = source.get(name) {
                if value.is_some() {
                    out.insert(*name, value.clone());
                }
            }
        }
        out
    }
}

impl<V> FromIterator<(String, V)> for OrderedMap<V> {
    fn from_iter<T: IntoIterator<Item = (String, V)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}
