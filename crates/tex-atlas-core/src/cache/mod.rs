//! Bounded least-recently-used cache with explicit eviction notification.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::mem;

use tracing::trace;

pub mod upload;

pub use upload::{CacheStats, ImageKey, TextureReleaser, UploadCache};

/// Why an entry left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvictReason {
    /// Dropped to bring the cache back under its maximum.
    Capacity,
    /// Value displaced by `add` on an existing key.
    Replaced,
    /// Explicit `remove`.
    Removed,
    /// `clear`.
    Cleared,
}

/// Receives every value that leaves a [`RecencyCache`].
///
/// Called synchronously from inside the cache operation that removed the
/// entry. The cache never frees anything a value refers to; this is the
/// caller's hook to do so.
pub trait EvictionHandler<K, V> {
    fn evicted(&mut self, key: K, value: V, reason: EvictReason);
}

impl<K, V, F> EvictionHandler<K, V> for F
where
    F: FnMut(K, V, EvictReason),
{
    fn evicted(&mut self, key: K, value: V, reason: EvictReason) {
        self(key, value, reason)
    }
}

fn drop_evicted<K, V>(_key: K, _value: V, _reason: EvictReason) {}

struct Slot<K, V> {
    key: K,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

/// A key-value map holding at most `max` entries.
///
/// Entries are kept in recency order. `add` and `get` move an entry to the
/// most-recently-used end; `contains` and `peek` leave the order alone. When
/// the cache grows past `max`, entries are evicted from the
/// least-recently-used end and handed to the [`EvictionHandler`].
pub struct RecencyCache<K, V, H = fn(K, V, EvictReason)> {
    map: HashMap<K, usize>,
    slots: Vec<Option<Slot<K, V>>>,
    vacant: Vec<usize>,
    // Least recently used.
    head: Option<usize>,
    // Most recently used.
    tail: Option<usize>,
    max: usize,
    handler: H,
}

impl<K: Hash + Eq + Clone, V> RecencyCache<K, V> {
    /// Cache that simply drops evicted values.
    pub fn new(max: usize) -> Self {
        Self::with_handler(max, drop_evicted::<K, V> as fn(K, V, EvictReason))
    }
}

impl<K, V, H> RecencyCache<K, V, H>
where
    K: Hash + Eq + Clone,
    H: EvictionHandler<K, V>,
{
    pub fn with_handler(max: usize, handler: H) -> Self {
        Self {
            map: HashMap::new(),
            slots: Vec::new(),
            vacant: Vec::new(),
            head: None,
            tail: None,
            max,
            handler,
        }
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// Change the capacity, evicting least-recently-used entries down to `max`.
    pub fn set_max(&mut self, max: usize) {
        if max == self.max {
            return;
        }
        self.max = max;
        self.trim();
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Alias of [`len`](Self::len).
    pub fn count(&self) -> usize {
        self.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// `len / max`, or 0 when `max` is 0.
    pub fn percentage(&self) -> f32 {
        if self.max == 0 {
            0.0
        } else {
            self.len() as f32 / self.max as f32
        }
    }

    /// Insert or overwrite `key` as the most recently used entry.
    ///
    /// A displaced value is handed to the handler with [`EvictReason::Replaced`].
    pub fn add(&mut self, key: K, value: V) {
        if let Some(&idx) = self.map.get(&key) {
            if let Some(slot) = self.slots[idx].as_mut() {
                let old = mem::replace(&mut slot.value, value);
                self.unlink(idx);
                self.link_back(idx);
                self.handler.evicted(key, old, EvictReason::Replaced);
                return;
            }
        }
        let slot = Slot {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        };
        let idx = match self.vacant.pop() {
            Some(idx) => {
                self.slots[idx] = Some(slot);
                idx
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        };
        self.map.insert(key, idx);
        self.link_back(idx);
        self.trim();
    }

    /// Look up `key`, promoting it to most recently used.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.map.get(key)?;
        self.unlink(idx);
        self.link_back(idx);
        self.slots[idx].as_ref().map(|s| &s.value)
    }

    /// Look up `key` without touching the recency order.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.map.get(key)?;
        self.slots[idx].as_ref().map(|s| &s.value)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Remove `key`, notifying the handler. Returns false if it was absent.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(idx) = self.map.remove(key) else {
            return false;
        };
        let Some(slot) = self.take_slot(idx) else {
            return false;
        };
        self.handler.evicted(slot.key, slot.value, EvictReason::Removed);
        true
    }

    /// Remove every entry, least recently used first.
    pub fn clear(&mut self) {
        while self.pop_front(EvictReason::Cleared) {}
        self.slots.clear();
        self.vacant.clear();
    }

    /// Entries from least to most recently used.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: &self.slots,
            cursor: self.head,
            remaining: self.len(),
        }
    }

    /// Snapshot of the keys, least recently used first.
    pub fn keys(&self) -> Vec<K> {
        self.iter().map(|(k, _)| k.clone()).collect()
    }

    /// Snapshot of the values, least recently used first.
    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.iter().map(|(_, v)| v.clone()).collect()
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    fn trim(&mut self) {
        while self.map.len() > self.max {
            if !self.pop_front(EvictReason::Capacity) {
                break;
            }
        }
    }

    fn pop_front(&mut self, reason: EvictReason) -> bool {
        let Some(idx) = self.head else {
            return false;
        };
        let Some(slot) = self.take_slot(idx) else {
            return false;
        };
        self.map.remove(&slot.key);
        trace!(?reason, remaining = self.map.len(), "cache entry evicted");
        self.handler.evicted(slot.key, slot.value, reason);
        true
    }

    // Unlinks and frees the slot; the caller owns the map entry.
    fn take_slot(&mut self, idx: usize) -> Option<Slot<K, V>> {
        self.unlink(idx);
        let slot = self.slots[idx].take()?;
        self.vacant.push(idx);
        Some(slot)
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = match self.slots[idx].as_mut() {
            Some(slot) => (slot.prev.take(), slot.next.take()),
            None => return,
        };
        match prev {
            Some(p) => {
                if let Some(s) = self.slots[p].as_mut() {
                    s.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(s) = self.slots[n].as_mut() {
                    s.prev = prev;
                }
            }
            None => self.tail = prev,
        }
    }

    fn link_back(&mut self, idx: usize) {
        let old_tail = self.tail;
        if let Some(slot) = self.slots[idx].as_mut() {
            slot.prev = old_tail;
            slot.next = None;
        }
        match old_tail {
            Some(t) => {
                if let Some(s) = self.slots[t].as_mut() {
                    s.next = Some(idx);
                }
            }
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
    }
}

impl<K, V, H> fmt::Debug for RecencyCache<K, V, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecencyCache")
            .field("len", &self.map.len())
            .field("max", &self.max)
            .finish()
    }
}

/// Iterator over cache entries from least to most recently used.
pub struct Iter<'a, K, V> {
    slots: &'a [Option<Slot<K, V>>],
    cursor: Option<usize>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cursor?;
        let slot = self.slots[idx].as_ref()?;
        self.cursor = slot.next;
        self.remaining = self.remaining.saturating_sub(1);
        Some((&slot.key, &slot.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_links<K: Hash + Eq + Clone, V, H: EvictionHandler<K, V>>(c: &RecencyCache<K, V, H>) {
        let mut forward = Vec::new();
        let mut cursor = c.head;
        let mut prev = None;
        while let Some(idx) = cursor {
            let slot = c.slots[idx].as_ref().expect("linked slot must be occupied");
            assert_eq!(slot.prev, prev);
            forward.push(idx);
            prev = Some(idx);
            cursor = slot.next;
        }
        assert_eq!(c.tail, prev);
        assert_eq!(forward.len(), c.map.len());
        for idx in forward {
            let key = &c.slots[idx].as_ref().unwrap().key;
            assert_eq!(c.map.get(key), Some(&idx));
        }
    }

    #[test]
    fn links_survive_churn() {
        let mut c = RecencyCache::new(4);
        for i in 0..20u32 {
            c.add(i % 7, i);
            if i % 3 == 0 {
                c.get(&(i % 5));
            }
            if i % 4 == 0 {
                c.remove(&(i % 6));
            }
            assert_links(&c);
            assert!(c.len() <= c.max());
        }
    }

    #[test]
    fn vacant_slots_are_reused() {
        let mut c = RecencyCache::new(2);
        for i in 0..100u32 {
            c.add(i, ());
        }
        assert_eq!(c.len(), 2);
        assert!(c.slots.len() <= 3, "slots grew to {}", c.slots.len());
        assert_links(&c);
    }

    #[test]
    fn clear_resets_storage() {
        let mut c = RecencyCache::new(3);
        c.add("a", 1);
        c.add("b", 2);
        c.clear();
        assert!(c.slots.is_empty());
        assert!(c.head.is_none() && c.tail.is_none());
        c.add("c", 3);
        assert_links(&c);
        assert_eq!(c.keys(), vec!["c"]);
    }
}
