//! Bucket Module
//!
//! One shard of the cache: a lock-guarded map paired with an insertion-order
//! queue and a running byte count.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use crate::cache::queue::{KeyQueue, NodeId};
use crate::cache::CacheEntry;

/// Entries and bytes reclaimed by a cleanup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reclaimed {
    pub entries: usize,
    pub bytes: u64,
}

impl Reclaimed {
    pub fn merge(&mut self, other: Reclaimed) {
        self.entries += other.entries;
        self.bytes += other.bytes;
    }
}

#[derive(Debug)]
struct Stored {
    entry: CacheEntry,
    node: NodeId,
}

#[derive(Debug, Default)]
struct State {
    items: HashMap<Arc<str>, Stored>,
    order: KeyQueue<Arc<str>>,
    size: u64,
}

impl State {
    /// Removes `key` from the map, charging its bytes back. The queue node is
    /// left to the caller.
    fn take(&mut self, key: &str) -> Option<Stored> {
        let stored = self.items.remove(key)?;
        self.size -= stored.entry.size();
        Some(stored)
    }
}

// == Bucket ==
/// A single shard. Every method holds the shard lock for its whole duration.
#[derive(Debug, Default)]
pub struct Bucket {
    state: RwLock<State>,
}

impl Bucket {
    pub fn new() -> Self {
        Self::default()
    }

    // == Get ==
    /// Returns a clone of the entry stored under `key`, live or not.
    ///
    /// Reads never touch the eviction queue: eviction is FIFO, not LRU.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.state.read().items.get(key).map(|s| s.entry.clone())
    }

    // == Set ==
    /// Inserts or replaces the entry under its key and appends the key to the
    /// queue tail. A replaced entry's queue node is unlinked first so each key
    /// has a single node.
    ///
    /// Returns the size of the replaced entry, if any.
    pub fn set(&self, entry: CacheEntry) -> Option<u64> {
        let mut state = self.state.write();
        let replaced = state.take(&entry.key).map(|old| {
            state.order.remove(old.node);
            old.entry.size()
        });

        let key = Arc::clone(&entry.key);
        let node = state.order.push(Arc::clone(&key));
        state.size += entry.size();
        state.items.insert(key, Stored { entry, node });
        replaced
    }

    // == Delete ==
    /// Removes `key` from the map and the queue. Returns the freed size.
    pub fn delete(&self, key: &str) -> Option<u64> {
        let mut state = self.state.write();
        let stored = state.take(key)?;
        state.order.remove(stored.node);
        Some(stored.entry.size())
    }

    // == Invalidate ==
    /// Marks the entry under `key` invalid without unlinking it. Its bytes
    /// stay charged until a sweep or eviction reclaims them.
    ///
    /// Returns true if a valid entry was invalidated.
    pub fn invalidate(&self, key: &str) -> bool {
        let mut state = self.state.write();
        match state.items.get_mut(key) {
            Some(stored) if stored.entry.valid => {
                stored.entry.invalidate();
                true
            }
            _ => false,
        }
    }

    /// Restarts the lifetime of a live entry. Returns false if the entry is
    /// gone or no longer live at `now`.
    pub fn refresh(&self, key: &str, now: Instant) -> bool {
        let mut state = self.state.write();
        match state.items.get_mut(key) {
            Some(stored) if stored.entry.is_live(now) => {
                stored.entry.refresh(now);
                true
            }
            _ => false,
        }
    }

    /// Removes `key` only if its entry is expired or invalid at `now`.
    /// Re-checks under the write lock so a concurrent overwrite survives.
    pub fn remove_if_dead(&self, key: &str, now: Instant) -> Option<u64> {
        let mut state = self.state.write();
        if state.items.get(key)?.entry.is_live(now) {
            return None;
        }
        let stored = state.take(key)?;
        state.order.remove(stored.node);
        Some(stored.entry.size())
    }

    // == Delete Oldest ==
    /// Pops the oldest key and drops its entry.
    ///
    /// `None` means the queue was empty; otherwise the reclaimed size, which
    /// is 0 when the popped key had no entry.
    pub fn delete_oldest(&self) -> Option<u64> {
        let mut state = self.state.write();
        let key = state.order.pop_oldest()?;
        Some(state.take(&key).map_or(0, |s| s.entry.size()))
    }

    // == Sweep ==
    /// Walks the queue once, dropping every entry that is expired or invalid
    /// at `now`.
    pub fn sweep(&self, now: Instant) -> Reclaimed {
        let mut guard = self.state.write();
        let State { items, order, size } = &mut *guard;
        let mut reclaimed = Reclaimed::default();

        order.retain(|key| {
            let live = items.get(key).is_some_and(|s| s.entry.is_live(now));
            if !live {
                if let Some(stored) = items.remove(key) {
                    let bytes = stored.entry.size();
                    *size -= bytes;
                    reclaimed.entries += 1;
                    reclaimed.bytes += bytes;
                }
            }
            live
        });

        reclaimed
    }

    // == Size ==
    /// Bytes held by this shard, including invalidated entries.
    pub fn size(&self) -> u64 {
        self.state.read().size
    }

    /// Number of entries held, including invalidated ones.
    pub fn len(&self) -> usize {
        self.state.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().items.is_empty()
    }

    /// Keys in eviction order, oldest first.
    pub fn keys(&self) -> Vec<String> {
        self.state
            .read()
            .order
            .iter()
            .map(|k| k.to_string())
            .collect()
    }
}
