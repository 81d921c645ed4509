//! Table Module
//!
//! Insertion-ordered associative container mapping `Value` keys to `Value`
//! values.
//!
//! ## Layout
//! ```text
//!  buckets[hash % allocated] ──► entry index ──next──► entry index ──► None
//!
//!  index:   0        1        2        ...
//!  keys:   [k0]     [k1]     [k2]            (dense, first-insertion order)
//!  values: [v0]     [v1]     [v2]
//!  hashes: [h0]     [h1]     [h2]            (cached key hashes)
//!  next:   [None]   [Some 0] [None]          (chain links)
//! ```
//!
//! - Lookups hash the key, walk one bucket chain and compare with
//!   `Value::equal`: O(1) amortised.
//! - Iteration walks the dense arrays, so it always yields first-insertion order.
//! - Capacity grows to `2 + 2 * allocated` when full; the bucket array is
//!   rebuilt at the new size.
//! - Removal compacts the dense arrays (preserving the order of the remaining
//!   entries) and rebuilds the chains: O(n).

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{debug, error};

use crate::error::{MelonError, Result};
use crate::value::Value;

/// Insertion-ordered hash table of values
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Keys in first-insertion order
    keys: Vec<Value>,
    /// Values, parallel to `keys`
    values: Vec<Value>,
    /// Cached `Value::hash_value` of each key
    hashes: Vec<u64>,
    /// Next entry in the same bucket chain
    next: Vec<Option<usize>>,
    /// Head entry of each bucket chain (length == `allocated`)
    buckets: Vec<Option<usize>>,
    /// Number of entries room has been reserved for
    allocated: usize,
}

impl Table {
    /// Create an empty table (nothing is allocated until the first insert)
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Number of entries the table can hold before it grows again
    pub fn capacity(&self) -> usize {
        self.allocated
    }

    /// Set a key/value pair
    ///
    /// Both `key` and `value` are consumed. If an equal key already exists its
    /// value is replaced in place (the old value is dropped) and the original
    /// key stays canonical, so the entry keeps its position. Otherwise the
    /// pair is appended.
    ///
    /// On error the table is left exactly as it was.
    pub fn set(&mut self, key: Value, value: Value) -> Result<()> {
        let hash = key.hash_value()?;

        if let Some(index) = self.find(&key, hash)? {
            self.values[index] = value;
            return Ok(());
        }

        self.reserve_one()?;

        let index = self.keys.len();
        let bucket = self.bucket_of(hash);

        self.keys.push(key);
        self.values.push(value);
        self.hashes.push(hash);
        self.next.push(self.buckets[bucket]);
        self.buckets[bucket] = Some(index);

        Ok(())
    }

    /// Get the value associated with `key`
    ///
    /// The lookup key is consumed. The returned reference is a view into the
    /// table; the table keeps ownership.
    pub fn get(&self, key: Value) -> Result<&Value> {
        let index = self.index_of(&key)?;
        Ok(&self.values[index])
    }

    /// Mutable variant of `get`
    pub fn get_mut(&mut self, key: Value) -> Result<&mut Value> {
        let index = self.index_of(&key)?;
        Ok(&mut self.values[index])
    }

    /// Check whether an equal key is present
    pub fn contains_key(&self, key: &Value) -> Result<bool> {
        let hash = key.hash_value()?;
        Ok(self.find(key, hash)?.is_some())
    }

    /// Remove the entry associated with `key`
    ///
    /// Later entries shift down one position; their relative order is kept.
    /// Returns the stored key and value, which are released when dropped.
    pub fn remove(&mut self, key: Value) -> Result<(Value, Value)> {
        let index = self.index_of(&key)?;

        let removed_key = self.keys.remove(index);
        let removed_value = self.values.remove(index);
        self.hashes.remove(index);
        self.next.remove(index);

        self.rebuild_chains();

        Ok((removed_key, removed_value))
    }

    /// Get the entry at `index` (in first-insertion order)
    ///
    /// Pure read: nothing is consumed or released.
    pub fn at(&self, index: usize) -> Result<(&Value, &Value)> {
        if index >= self.keys.len() {
            return Err(MelonError::NotFound(format!(
                "index {} out of bounds (length {})",
                index,
                self.keys.len()
            )));
        }
        Ok((&self.keys[index], &self.values[index]))
    }

    /// Iterate entries in first-insertion order
    pub fn iter(&self) -> TableIter<'_> {
        TableIter {
            keys: self.keys.iter(),
            values: self.values.iter(),
        }
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn index_of(&self, key: &Value) -> Result<usize> {
        let hash = key.hash_value()?;
        self.find(key, hash)?
            .ok_or_else(|| MelonError::NotFound(format!("key {:?}", key)))
    }

    /// Walk the bucket chain for `hash` looking for an equal key
    fn find(&self, key: &Value, hash: u64) -> Result<Option<usize>> {
        if self.buckets.is_empty() {
            return Ok(None);
        }

        let mut cursor = self.buckets[self.bucket_of(hash)];
        while let Some(index) = cursor {
            if self.hashes[index] == hash && self.keys[index].equal(key)? {
                return Ok(Some(index));
            }
            cursor = self.next[index];
        }

        Ok(None)
    }

    fn bucket_of(&self, hash: u64) -> usize {
        (hash % self.buckets.len() as u64) as usize
    }

    /// Make room for one more entry, growing to `2 + 2 * allocated` if full
    fn reserve_one(&mut self) -> Result<()> {
        if self.keys.len() < self.allocated {
            return Ok(());
        }

        let allocated = 2 + 2 * self.allocated;
        let additional = allocated - self.keys.len();

        // Reserving only changes capacity, so a failure part way through
        // leaves every observable entry intact.
        let reserved = self
            .keys
            .try_reserve_exact(additional)
            .and_then(|_| self.values.try_reserve_exact(additional))
            .and_then(|_| self.hashes.try_reserve_exact(additional))
            .and_then(|_| self.next.try_reserve_exact(additional));

        let mut buckets = Vec::new();
        let reserved = reserved.and_then(|_| buckets.try_reserve_exact(allocated));

        if let Err(e) = reserved {
            error!(allocated, "Allocation failed while growing table: {}", e);
            return Err(MelonError::AllocationFailed(format!(
                "table growth to {} entries: {}",
                allocated, e
            )));
        }

        debug!(from = self.allocated, to = allocated, "Growing table");

        buckets.resize(allocated, None);
        self.buckets = buckets;
        self.allocated = allocated;
        self.rebuild_chains();

        Ok(())
    }

    /// Re-link every entry into its bucket (after growth or compaction)
    fn rebuild_chains(&mut self) {
        for head in self.buckets.iter_mut() {
            *head = None;
        }

        if self.buckets.is_empty() {
            return;
        }

        for index in 0..self.keys.len() {
            let bucket = self.bucket_of(self.hashes[index]);
            self.next[index] = self.buckets[bucket];
            self.buckets[bucket] = Some(index);
        }
    }
}

// =============================================================================
// Iteration
// =============================================================================

/// Iterator over table entries in first-insertion order
pub struct TableIter<'a> {
    keys: std::slice::Iter<'a, Value>,
    values: std::slice::Iter<'a, Value>,
}

impl<'a> Iterator for TableIter<'a> {
    type Item = (&'a Value, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        Some((self.keys.next()?, self.values.next()?))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.keys.size_hint()
    }
}

impl ExactSizeIterator for TableIter<'_> {}

impl<'a> IntoIterator for &'a Table {
    type Item = (&'a Value, &'a Value);
    type IntoIter = TableIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// =============================================================================
// Serde Export
// =============================================================================

impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
