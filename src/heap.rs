//! Indexed binary min-heap.
//!
//! [IndexedHeap] keeps a position index next to the heap array so that
//! membership tests are O(1) and the key of an already stored entry can be
//! raised or lowered in O(log n). Identity is deliberately separate from
//! ordering: two entries with different priorities can still denote the same
//! element, which is what allows a key update to find and reposition it.

use std::cmp::Ordering;
use std::hash::Hash;

use fxhash::FxHashMap;

use crate::error::HeapError;

/// Identity of a heap entry, independent of its ordering.
///
/// The heap rejects two live entries with the same key and addresses entries
/// by key in [find](IndexedHeap::find) and the key-update operations.
pub trait Keyed {
    type Key: Copy + Eq + Hash;

    fn key(&self) -> Self::Key;
}

macro_rules! self_keyed {
    ($($int:ty)*) => {
        $(impl Keyed for $int {
            type Key = $int;

            fn key(&self) -> $int {
                *self
            }
        })*
    };
}

self_keyed!(i32 i64 u32 u64 usize);

/// Array-based binary min-heap with an identity index.
///
/// Entries are ordered by `T`'s [Ord] by default; a different total order
/// (e.g. a reversed one turning this into a max-heap) can be supplied through
/// [with_comparator](IndexedHeap::with_comparator).
pub struct IndexedHeap<T: Keyed> {
    entries: Vec<T>,
    slots: FxHashMap<T::Key, usize>,
    cmp: fn(&T, &T) -> Ordering,
}

impl<T: Keyed + Ord> IndexedHeap<T> {
    pub fn new() -> IndexedHeap<T> {
        IndexedHeap::with_comparator(T::cmp)
    }
}

impl<T: Keyed + Ord> Default for IndexedHeap<T> {
    fn default() -> IndexedHeap<T> {
        IndexedHeap::new()
    }
}

impl<T: Keyed> IndexedHeap<T> {
    /// Creates an empty heap ordered by `cmp`, which must be a total order
    /// over the entries.
    pub fn with_comparator(cmp: fn(&T, &T) -> Ordering) -> IndexedHeap<T> {
        IndexedHeap {
            entries: Vec::new(),
            slots: FxHashMap::default(),
            cmp,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Empties the heap and its position index.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.slots.clear();
    }

    /// Adds a new entry. Fails with [HeapError::DuplicateKey] when an entry
    /// with the same key is already stored, leaving the heap untouched.
    pub fn push(&mut self, entry: T) -> Result<(), HeapError> {
        if self.slots.contains_key(&entry.key()) {
            return Err(HeapError::DuplicateKey);
        }
        let slot = self.entries.len();
        self.slots.insert(entry.key(), slot);
        self.entries.push(entry);
        self.sift_up(slot);
        Ok(())
    }

    /// The minimum entry, without removing it.
    pub fn peek(&self) -> Result<&T, HeapError> {
        self.entries.first().ok_or(HeapError::Empty)
    }

    /// Removes and returns the minimum entry.
    pub fn pop(&mut self) -> Result<T, HeapError> {
        if self.entries.is_empty() {
            return Err(HeapError::Empty);
        }
        let min = self.entries.swap_remove(0);
        self.slots.remove(&min.key());
        if !self.entries.is_empty() {
            self.slots.insert(self.entries[0].key(), 0);
            self.sift_down(0);
        }
        Ok(min)
    }

    /// O(1) membership test by identity.
    pub fn contains(&self, key: &T::Key) -> bool {
        self.slots.contains_key(key)
    }

    /// The stored entry for `key`.
    pub fn find(&self, key: &T::Key) -> Result<&T, HeapError> {
        let slot = *self.slots.get(key).ok_or(HeapError::NotFound)?;
        Ok(&self.entries[slot])
    }

    /// Replaces the stored entry with the same key by one that orders
    /// strictly lower and restores heap order by sifting up only.
    pub fn decrease_key(&mut self, entry: T) -> Result<(), HeapError> {
        let slot = *self.slots.get(&entry.key()).ok_or(HeapError::NotFound)?;
        if (self.cmp)(&entry, &self.entries[slot]) != Ordering::Less {
            return Err(HeapError::InvalidKeyChange);
        }
        self.entries[slot] = entry;
        self.sift_up(slot);
        Ok(())
    }

    /// Replaces the stored entry with the same key by one that orders
    /// strictly higher and restores heap order by sifting down only.
    pub fn increase_key(&mut self, entry: T) -> Result<(), HeapError> {
        let slot = *self.slots.get(&entry.key()).ok_or(HeapError::NotFound)?;
        if (self.cmp)(&entry, &self.entries[slot]) != Ordering::Greater {
            return Err(HeapError::InvalidKeyChange);
        }
        self.entries[slot] = entry;
        self.sift_down(slot);
        Ok(())
    }

    /// Replaces the stored entry with the same key, detecting the sift
    /// direction from the comparison. Only an unchanged ordering position is
    /// rejected.
    pub fn update_key(&mut self, entry: T) -> Result<(), HeapError> {
        let slot = *self.slots.get(&entry.key()).ok_or(HeapError::NotFound)?;
        match (self.cmp)(&entry, &self.entries[slot]) {
            Ordering::Equal => Err(HeapError::InvalidKeyChange),
            Ordering::Less => {
                self.entries[slot] = entry;
                self.sift_up(slot);
                Ok(())
            }
            Ordering::Greater => {
                self.entries[slot] = entry;
                self.sift_down(slot);
                Ok(())
            }
        }
    }

    fn sift_up(&mut self, mut slot: usize) {
        while slot > 0 {
            let parent = (slot - 1) / 2;
            if (self.cmp)(&self.entries[parent], &self.entries[slot]) != Ordering::Greater {
                break;
            }
            self.swap_slots(parent, slot);
            slot = parent;
        }
    }

    fn sift_down(&mut self, mut slot: usize) {
        loop {
            let mut smallest = slot;
            let left = 2 * slot + 1;
            let right = left + 1;
            if left < self.entries.len()
                && (self.cmp)(&self.entries[left], &self.entries[smallest]) == Ordering::Less
            {
                smallest = left;
            }
            if right < self.entries.len()
                && (self.cmp)(&self.entries[right], &self.entries[smallest]) == Ordering::Less
            {
                smallest = right;
            }
            if smallest == slot {
                break;
            }
            self.swap_slots(slot, smallest);
            slot = smallest;
        }
    }

    /// Swaps two entries and repoints both index slots in the same motion;
    /// the array and the index are never observable in disagreement.
    fn swap_slots(&mut self, a: usize, b: usize) {
        self.entries.swap(a, b);
        self.slots.insert(self.entries[a].key(), a);
        self.slots.insert(self.entries[b].key(), b);
    }
}

#[cfg(test)]
impl<T: Keyed> IndexedHeap<T> {
    fn assert_invariants(&self) {
        assert_eq!(self.entries.len(), self.slots.len());
        for slot in 1..self.entries.len() {
            let parent = (slot - 1) / 2;
            assert_ne!(
                (self.cmp)(&self.entries[parent], &self.entries[slot]),
                Ordering::Greater,
                "heap order violated between slots {parent} and {slot}"
            );
        }
        for (slot, entry) in self.entries.iter().enumerate() {
            assert_eq!(self.slots.get(&entry.key()), Some(&slot));
        }
    }
}
