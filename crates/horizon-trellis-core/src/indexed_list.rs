//! Ordered sequence with a derived key → item index.
//!
//! `IndexedList` keeps an ordered sequence of slots (each slot may hold an
//! item or be null) alongside a map from a per-item key to the item's
//! position. The sequence order is authoritative; the index is a cache
//! maintained on every mutating operation.
//!
//! Two maintenance paths exist, and their difference is contractual:
//!
//! - [`push`](IndexedList::push) and [`splice`](IndexedList::splice) update
//!   the index incrementally and **preserve** null slots.
//! - [`pop`](IndexedList::pop), [`shift`](IndexedList::shift) and
//!   [`unshift`](IndexedList::unshift) take the conservative path: perform
//!   the native operation, then rebuild the index from scratch — and the
//!   rebuild **drops** null slots from the underlying sequence.
//!
//! Downstream code depends on both behaviors, so the asymmetry is pinned by
//! tests rather than smoothed over. Items whose derived key is `None` stay
//! in the sequence but are absent from the index.

use std::collections::HashMap;
use std::sync::Arc;

use crate::variant::Variant;

/// Derives the index key for an item.
type KeyFn<T> = Arc<dyn Fn(&T) -> Option<String> + Send + Sync>;

/// Items that can surface a named field as an index key.
///
/// Implemented for [`Variant`] (map lookup) so variant-shaped records can be
/// indexed by a field name; downstream crates implement it for their own
/// item types.
pub trait FieldKeyed {
    /// The key value of `field`, rendered as a string, or `None` when the
    /// field is absent or not key-shaped.
    fn field_key(&self, field: &str) -> Option<String>;
}

impl FieldKeyed for Variant {
    fn field_key(&self, field: &str) -> Option<String> {
        self.get(field).and_then(Variant::as_key)
    }
}

impl<T: FieldKeyed> FieldKeyed for Arc<T> {
    fn field_key(&self, field: &str) -> Option<String> {
        (**self).field_key(field)
    }
}

/// An ordered sequence of nullable slots plus a derived key index.
pub struct IndexedList<T> {
    slots: Vec<Option<T>>,
    index: HashMap<String, usize>,
    key_fn: KeyFn<T>,
}

impl<T> IndexedList<T> {
    /// Create an empty list whose keys are derived by `key_fn`.
    pub fn new<F>(key_fn: F) -> Self
    where
        F: Fn(&T) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
            key_fn: Arc::new(key_fn),
        }
    }

    /// Number of slots, including null slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the list has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The item at `index`, or `None` for out-of-range or null slots.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(|slot| slot.as_ref())
    }

    /// Look an item up by its derived key.
    pub fn get_by_key(&self, key: &str) -> Option<&T> {
        self.index
            .get(key)
            .and_then(|&i| self.slots.get(i))
            .and_then(|slot| slot.as_ref())
    }

    /// Whether the index currently contains `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Iterate the non-null items in sequence order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(|slot| slot.as_ref())
    }

    /// Append an item, indexing it incrementally.
    pub fn push(&mut self, item: T) {
        let key = (self.key_fn)(&item);
        let position = self.slots.len();
        self.slots.push(Some(item));
        if let Some(key) = key {
            self.index.insert(key, position);
        }
    }

    /// Append a null slot. Preserved by `push`/`splice`, dropped by the
    /// rebuild path.
    pub fn push_null(&mut self) {
        self.slots.push(None);
    }

    /// Remove `delete_count` slots starting at `start` and insert
    /// `replacements` in their place. Returns the removed slots.
    ///
    /// The index is maintained incrementally: entries for removed items are
    /// deleted, entries for inserted items added, and positions after the
    /// splice point re-aligned. Null slots are preserved.
    pub fn splice(
        &mut self,
        start: usize,
        delete_count: usize,
        replacements: Vec<T>,
    ) -> Vec<Option<T>> {
        let start = start.min(self.slots.len());
        let end = (start + delete_count).min(self.slots.len());

        let removed: Vec<Option<T>> = self
            .slots
            .splice(start..end, replacements.into_iter().map(Some))
            .collect();

        for slot in removed.iter().flatten() {
            if let Some(key) = (self.key_fn)(slot) {
                self.index.remove(&key);
            }
        }
        // Positions at and after the splice point shifted; re-align them.
        for (position, slot) in self.slots.iter().enumerate().skip(start) {
            if let Some(item) = slot {
                if let Some(key) = (self.key_fn)(item) {
                    self.index.insert(key, position);
                }
            }
        }

        removed
    }

    /// Remove and return the last slot, then rebuild the index.
    ///
    /// Returns `None` when the list is empty; a popped null slot also
    /// yields `None`. The rebuild drops any remaining null slots.
    pub fn pop(&mut self) -> Option<T> {
        let popped = self.slots.pop()?;
        self.rebuild_index();
        popped
    }

    /// Remove and return the first slot, then rebuild the index.
    ///
    /// Returns `None` when the list is empty; a shifted null slot also
    /// yields `None`. The rebuild drops any remaining null slots.
    pub fn shift(&mut self) -> Option<T> {
        if self.slots.is_empty() {
            return None;
        }
        let shifted = self.slots.remove(0);
        self.rebuild_index();
        shifted
    }

    /// Prepend an item, then rebuild the index (dropping null slots).
    pub fn unshift(&mut self, item: T) {
        self.slots.insert(0, Some(item));
        self.rebuild_index();
    }

    /// Full index rebuild: null slots are spliced out of the sequence and
    /// every surviving item re-indexed.
    fn rebuild_index(&mut self) {
        self.slots.retain(|slot| slot.is_some());
        self.index.clear();
        for (position, slot) in self.slots.iter().enumerate() {
            if let Some(item) = slot {
                if let Some(key) = (self.key_fn)(item) {
                    self.index.insert(key, position);
                }
            }
        }
    }
}

impl<T: Clone> IndexedList<T> {
    /// A new list holding clones of the slots in `range`, with a freshly
    /// built index.
    pub fn slice(&self, range: std::ops::Range<usize>) -> IndexedList<T> {
        let start = range.start.min(self.slots.len());
        let end = range.end.min(self.slots.len());
        self.derive(self.slots[start..end].to_vec())
    }

    /// A new list holding the items for which `predicate` is true (null
    /// slots are not offered to the predicate and are not carried over).
    pub fn filter_items<F>(&self, mut predicate: F) -> IndexedList<T>
    where
        F: FnMut(&T) -> bool,
    {
        let kept: Vec<Option<T>> = self
            .slots
            .iter()
            .filter_map(|slot| slot.as_ref())
            .filter(|item| predicate(item))
            .cloned()
            .map(Some)
            .collect();
        self.derive(kept)
    }

    /// A new list holding this list's slots followed by `other`'s, with a
    /// freshly built index using this list's key function.
    pub fn concat(&self, other: &IndexedList<T>) -> IndexedList<T> {
        let mut slots = self.slots.clone();
        slots.extend(other.slots.iter().cloned());
        self.derive(slots)
    }

    /// Items cloned into a plain vector, null slots skipped.
    pub fn to_vec(&self) -> Vec<T> {
        self.slots.iter().filter_map(|s| s.clone()).collect()
    }

    fn derive(&self, slots: Vec<Option<T>>) -> IndexedList<T> {
        let mut list = IndexedList {
            slots,
            index: HashMap::new(),
            key_fn: self.key_fn.clone(),
        };
        for (position, slot) in list.slots.iter().enumerate() {
            if let Some(item) = slot {
                if let Some(key) = (list.key_fn)(item) {
                    list.index.insert(key, position);
                }
            }
        }
        list
    }
}

impl<T: FieldKeyed> IndexedList<T> {
    /// Create an empty list keyed by the named field of each item.
    pub fn keyed_by_field(field: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(move |item: &T| item.field_key(&field))
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for IndexedList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexedList")
            .field("slots", &self.slots)
            .field("indexed_keys", &self.index.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        key: &'static str,
        value: i32,
    }

    fn keyed() -> IndexedList<Item> {
        IndexedList::new(|item: &Item| Some(item.key.to_string()))
    }

    #[test]
    fn test_push_indexes_items() {
        let mut list = keyed();
        let a = Item { key: "a", value: 1 };
        let b = Item { key: "b", value: 2 };
        list.push(a.clone());
        list.push(b.clone());

        assert_eq!(list.len(), 2);
        assert_eq!(list.get_by_key("a"), Some(&a));
        assert_eq!(list.get_by_key("b"), Some(&b));
    }

    #[test]
    fn test_splice_removes_index_entries() {
        let mut list = keyed();
        let a = Item { key: "a", value: 1 };
        let b = Item { key: "b", value: 2 };
        list.push(a);
        list.push(b.clone());

        let removed = list.splice(0, 1, vec![]);
        assert_eq!(removed.len(), 1);
        assert_eq!(list.get_by_key("a"), None);
        assert_eq!(list.get_by_key("b"), Some(&b));
        // b moved to position 0 and the index followed.
        assert_eq!(list.get(0), Some(&b));
    }

    #[test]
    fn test_splice_inserts_and_realigns() {
        let mut list = keyed();
        list.push(Item { key: "a", value: 1 });
        list.push(Item { key: "c", value: 3 });

        list.splice(1, 0, vec![Item { key: "b", value: 2 }]);
        assert_eq!(list.len(), 3);
        assert_eq!(list.get_by_key("b").map(|i| i.value), Some(2));
        assert_eq!(list.get_by_key("c").map(|i| i.value), Some(3));
        assert_eq!(list.get(1).map(|i| i.key), Some("b"));
    }

    #[test]
    fn test_splice_preserves_null_slots() {
        let mut list = keyed();
        list.push(Item { key: "a", value: 1 });
        list.push_null();
        list.push(Item { key: "b", value: 2 });

        list.splice(0, 1, vec![]);
        // The null slot survives the incremental path.
        assert_eq!(list.len(), 2);
        assert!(list.get(0).is_none());
        assert_eq!(list.get(1).map(|i| i.key), Some("b"));
    }

    #[test]
    fn test_shift_rebuild_drops_null_slots() {
        let mut list = keyed();
        list.push(Item { key: "a", value: 1 });
        list.push_null();
        list.push(Item { key: "b", value: 2 });

        let shifted = list.shift();
        assert_eq!(shifted.map(|i| i.key), Some("a"));
        // A naive shift would leave two slots; the rebuild also drops the
        // null, leaving one.
        assert_eq!(list.len(), 1);
        assert_eq!(list.get(0).map(|i| i.key), Some("b"));
        assert_eq!(list.get_by_key("b").map(|i| i.value), Some(2));
        assert!(!list.contains_key("a"));
    }

    #[test]
    fn test_pop_rebuild_drops_null_slots() {
        let mut list = keyed();
        list.push_null();
        list.push(Item { key: "a", value: 1 });
        list.push(Item { key: "b", value: 2 });

        let popped = list.pop();
        assert_eq!(popped.map(|i| i.key), Some("b"));
        assert_eq!(list.len(), 1);
        assert_eq!(list.get(0).map(|i| i.key), Some("a"));
    }

    #[test]
    fn test_unshift_reindexes() {
        let mut list = keyed();
        list.push(Item { key: "b", value: 2 });
        list.unshift(Item { key: "a", value: 1 });

        assert_eq!(list.get(0).map(|i| i.key), Some("a"));
        assert_eq!(list.get_by_key("b").map(|i| i.value), Some(2));
    }

    #[test]
    fn test_keyless_items_stay_out_of_index() {
        let mut list: IndexedList<Item> =
            IndexedList::new(|item: &Item| (item.value > 0).then(|| item.key.to_string()));
        list.push(Item { key: "a", value: 1 });
        list.push(Item {
            key: "hidden",
            value: -1,
        });

        assert_eq!(list.len(), 2);
        assert!(list.get_by_key("hidden").is_none());
        assert_eq!(list.get(1).map(|i| i.key), Some("hidden"));
    }

    #[test]
    fn test_slice_filter_concat_return_fresh_lists() {
        let mut list = keyed();
        list.push(Item { key: "a", value: 1 });
        list.push(Item { key: "b", value: 2 });
        list.push(Item { key: "c", value: 3 });

        let sliced = list.slice(1..3);
        assert_eq!(sliced.len(), 2);
        assert_eq!(sliced.get_by_key("b").map(|i| i.value), Some(2));
        assert!(sliced.get_by_key("a").is_none());

        let filtered = list.filter_items(|i| i.value >= 2);
        assert_eq!(filtered.len(), 2);
        assert!(filtered.contains_key("c"));

        let joined = sliced.concat(&filtered);
        assert_eq!(joined.len(), 4);
        // Later duplicates win the index slot; order is authoritative.
        assert_eq!(joined.get(0).map(|i| i.key), Some("b"));
    }

    #[test]
    fn test_variant_field_keys() {
        let mut list: IndexedList<Variant> = IndexedList::keyed_by_field("id");
        let mut map = std::collections::BTreeMap::new();
        map.insert("id".to_string(), Variant::from(7));
        map.insert("name".to_string(), Variant::from("seven"));
        list.push(Variant::Map(map));

        assert_eq!(
            list.get_by_key("7").and_then(|v| v.get("name")).and_then(Variant::as_text),
            Some("seven")
        );
    }
}
