//! Ordered slot arena
//!
//! Registration-ordered storage that tolerates removal while it is being
//! walked. Entries live in a [`SlotMap`]; a separate list records the order of
//! their keys. Removing an entry frees its slot immediately and leaves the
//! stale key in the order list, where readers skip it (the generational key no
//! longer resolves). Stale keys are compacted away once the outermost
//! traversal finishes.

use slotmap::{Key, SlotMap};
use smallvec::SmallVec;

pub(crate) struct OrderedSlots<K: Key, V> {
    slots: SlotMap<K, V>,
    order: SmallVec<[K; 4]>,
    /// Nesting depth of traversals in progress
    passes: usize,
}

impl<K: Key, V> OrderedSlots<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            slots: SlotMap::with_key(),
            order: SmallVec::new(),
            passes: 0,
        }
    }

    pub(crate) fn insert(&mut self, value: V) -> K {
        let key = self.slots.insert(value);
        self.order.push(key);
        key
    }

    pub(crate) fn remove(&mut self, key: K) -> Option<V> {
        let removed = self.slots.remove(key);
        if removed.is_some() && self.passes == 0 {
            self.compact();
        }
        removed
    }

    pub(crate) fn get_mut(&mut self, key: K) -> Option<&mut V> {
        self.slots.get_mut(key)
    }

    /// First live key, in registration order, whose value matches
    pub(crate) fn find(&self, mut predicate: impl FnMut(&V) -> bool) -> Option<K> {
        self.order
            .iter()
            .copied()
            .find(|key| self.slots.get(*key).is_some_and(&mut predicate))
    }

    /// Key recorded at `index` of the order list, live or stale
    pub(crate) fn key_at(&self, index: usize) -> Option<K> {
        self.order.get(index).copied()
    }

    /// Next live entry at or after `*cursor`, advancing the cursor past it
    pub(crate) fn next_live(&self, cursor: &mut usize) -> Option<(K, &V)> {
        while let Some(key) = self.key_at(*cursor) {
            *cursor += 1;
            if let Some(value) = self.slots.get(key) {
                return Some((key, value));
            }
        }
        None
    }

    /// Number of live entries
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the order list is empty, stale keys included
    pub(crate) fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub(crate) fn begin_pass(&mut self) {
        self.passes += 1;
    }

    /// Finish a traversal, compacting if it was the outermost one
    pub(crate) fn end_pass(&mut self) {
        self.passes = self.passes.saturating_sub(1);
        if self.passes == 0 {
            self.compact();
        }
    }

    fn compact(&mut self) {
        if self.order.len() == self.slots.len() {
            return;
        }
        let slots = &self.slots;
        self.order.retain(|key| slots.contains_key(*key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::DefaultKey;

    fn live(slots: &OrderedSlots<DefaultKey, &'static str>) -> Vec<&'static str> {
        let mut cursor = 0;
        let mut values = Vec::new();
        while let Some((_, value)) = slots.next_live(&mut cursor) {
            values.push(*value);
        }
        values
    }

    #[test]
    fn test_keeps_registration_order() {
        let mut slots = OrderedSlots::new();
        slots.insert("a");
        let b = slots.insert("b");
        slots.insert("c");

        slots.remove(b);
        slots.insert("d");

        assert_eq!(live(&slots), vec!["a", "c", "d"]);
        assert_eq!(slots.len(), 3);
    }

    #[test]
    fn test_removal_during_pass_is_deferred() {
        let mut slots = OrderedSlots::new();
        let a = slots.insert("a");
        slots.insert("b");

        slots.begin_pass();
        slots.remove(a);
        assert_eq!(slots.key_at(0), Some(a));
        assert_eq!(live(&slots), vec!["b"]);

        slots.end_pass();
        assert_ne!(slots.key_at(0), Some(a));
        assert_eq!(live(&slots), vec!["b"]);
    }

    #[test]
    fn test_nested_passes_compact_once() {
        let mut slots = OrderedSlots::new();
        let a = slots.insert("a");
        slots.insert("b");

        slots.begin_pass();
        slots.begin_pass();
        slots.remove(a);
        slots.end_pass();
        assert_eq!(slots.key_at(0), Some(a));
        slots.end_pass();
        assert_eq!(live(&slots), vec!["b"]);
        assert_eq!(slots.key_at(1), None);
    }

    #[test]
    fn test_stale_keys_count_until_compaction() {
        let mut slots: OrderedSlots<DefaultKey, &str> = OrderedSlots::new();
        let a = slots.insert("a");

        slots.begin_pass();
        assert_eq!(slots.remove(a), Some("a"));
        assert!(!slots.is_empty());
        assert_eq!(slots.len(), 0);

        slots.end_pass();
        assert!(slots.is_empty());
    }

    #[test]
    fn test_find() {
        let mut slots: OrderedSlots<DefaultKey, &str> = OrderedSlots::new();
        slots.insert("a");
        let b = slots.insert("b");
        assert_eq!(slots.find(|v| *v == "b"), Some(b));

        slots.remove(b);
        assert_eq!(slots.find(|v| *v == "b"), None);
    }
}
