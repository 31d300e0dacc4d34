//! Cache Store Module
//!
//! The sharded cache: routes keys to buckets, enforces the byte budget with
//! FIFO eviction across shards and owns the background sweep task.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::bucket::{Bucket, Reclaimed};
use crate::cache::clock::{Clock, SystemClock};
use crate::cache::codec::{Codec, JsonCodec};
use crate::cache::hash::{shard_index, KeyHasher, XxHasher};
use crate::cache::stats::{CacheStats, Counters};
use crate::cache::CacheEntry;
use crate::config::{CacheConfig, DeletePolicy};
use crate::error::Result;
use crate::tasks::{spawn_sweep_task, spawn_sweep_thread, Sweep, SweepHandle};

/// State shared between the cache and its sweep task.
pub(crate) struct Shards {
    buckets: Box<[Bucket]>,
    counters: Counters,
    clock: Arc<dyn Clock>,
}

impl Sweep for Shards {
    /// Sweeps every bucket in turn, one lock at a time.
    fn sweep(&self) -> Reclaimed {
        let now = self.clock.now();
        let mut total = Reclaimed::default();
        for bucket in self.buckets.iter() {
            let reclaimed = bucket.sweep(now);
            self.counters.sub_size(reclaimed.bytes);
            total.merge(reclaimed);
        }
        total
    }
}

// == Cache ==
/// Sharded, size-bounded cache with TTL expiry.
///
/// Values go through the codec `C`; the byte budget is charged with key length
/// plus encoded payload length. Eviction order is insertion order per shard.
pub struct Cache<C: Codec = JsonCodec> {
    config: CacheConfig,
    shards: Arc<Shards>,
    codec: C,
    hasher: Box<dyn KeyHasher>,
    evict_cursor: AtomicUsize,
    sweeper: Mutex<Option<SweepHandle>>,
}

impl Cache<JsonCodec> {
    // == Constructor ==
    /// Creates a cache with the JSON codec, xxHash sharding and the system
    /// clock.
    ///
    /// The background sweep starts whenever `config.sweep_interval` is set,
    /// see [`Cache::start_sweeper`].
    pub fn new(config: CacheConfig) -> Self {
        Self::with_parts(config, JsonCodec, XxHasher, SystemClock)
    }
}

impl<C: Codec> Cache<C> {
    /// Creates a cache with injected codec, hasher and clock.
    pub fn with_parts<H, K>(config: CacheConfig, codec: C, hasher: H, clock: K) -> Self
    where
        H: KeyHasher,
        K: Clock,
    {
        let config = config.normalized();
        let buckets = (0..config.buckets).map(|_| Bucket::new()).collect();

        let cache = Self {
            shards: Arc::new(Shards {
                buckets,
                counters: Counters::new(),
                clock: Arc::new(clock),
            }),
            config,
            codec,
            hasher: Box::new(hasher),
            evict_cursor: AtomicUsize::new(0),
            sweeper: Mutex::new(None),
        };

        if cache.config.sweep_interval.is_some() {
            cache.start_sweeper();
        }
        cache
    }

    // == Get ==
    /// Looks up `key` and decodes its payload.
    ///
    /// Absent, expired and invalidated keys count as misses and return
    /// `Ok(None)`; expired entries are dropped on the spot. A payload that
    /// does not decode as `T` is a [`CacheError::Decode`](crate::error::CacheError::Decode).
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let bucket = self.bucket_for(key);
        let now = self.shards.clock.now();

        let entry = match bucket.get(key) {
            Some(entry) if entry.is_live(now) => entry,
            Some(entry) => {
                if entry.is_expired(now) {
                    if let Some(bytes) = bucket.remove_if_dead(key, now) {
                        self.shards.counters.sub_size(bytes);
                    }
                }
                self.shards.counters.record_miss();
                return Ok(None);
            }
            None => {
                self.shards.counters.record_miss();
                return Ok(None);
            }
        };

        self.shards.counters.record_hit();
        if self.config.sliding_expiration {
            bucket.refresh(key, now);
        }
        self.codec.decode(&entry.payload).map(Some)
    }

    /// Like [`Cache::get`], writing into `out` on a hit and leaving it
    /// untouched otherwise.
    pub fn get_into<T: DeserializeOwned>(&self, key: &str, out: &mut T) -> Result<bool> {
        match self.get(key)? {
            Some(value) => {
                *out = value;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // == Set ==
    /// Stores `value` under `key` with the configured default TTL.
    ///
    /// When the budget is exceeded the oldest entries are evicted round-robin
    /// across shards. An entry that cannot fit even in an empty cache is
    /// dropped silently; only [`Cache::overflow_count`] records it.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.set_with_ttl(key, value, self.config.default_ttl)
    }

    /// Stores `value` under `key` with an explicit TTL.
    pub fn set_with_ttl<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<()> {
        let payload = self.codec.encode(value)?;
        let entry = CacheEntry::new(key, payload, ttl, self.shards.clock.now());
        let size = entry.size();
        let bucket = self.bucket_for(key);
        let counters = &self.shards.counters;

        if size > self.config.max_size {
            counters.record_overflow();
            // The write is lost either way; do not leave the old value readable
            if let Some(bytes) = bucket.delete(key) {
                counters.sub_size(bytes);
            }
            debug!(key, size, max_size = self.config.max_size, "Entry exceeds cache budget, dropped");
            return Ok(());
        }

        if counters.size() + size > self.config.max_size {
            counters.record_overflow();
            if !self.evict_for(size) {
                debug!(key, size, "No room after eviction pass, entry dropped");
                return Ok(());
            }
        }

        let replaced = bucket.set(entry);
        counters.add_size(size);
        if let Some(bytes) = replaced {
            counters.sub_size(bytes);
        }

        // Concurrent writers can pass the check above together
        if counters.size() > self.config.max_size {
            self.evict_for(0);
        }
        Ok(())
    }

    // == Delete ==
    /// Removes `key` according to the configured [`DeletePolicy`].
    ///
    /// Returns true if a valid entry was removed or invalidated. Absent keys
    /// are a no-op.
    pub fn delete(&self, key: &str) -> bool {
        let bucket = self.bucket_for(key);
        match self.config.delete_policy {
            DeletePolicy::Eager => match bucket.delete(key) {
                Some(bytes) => {
                    self.shards.counters.sub_size(bytes);
                    true
                }
                None => false,
            },
            DeletePolicy::Lazy => bucket.invalidate(key),
        }
    }

    // == Sweep ==
    /// Runs one sweep pass over every shard, dropping expired and
    /// invalidated entries.
    pub fn sweep(&self) -> Reclaimed {
        self.shards.sweep()
    }

    // == Sweeper Lifecycle ==
    /// Starts the background sweep if it is configured and not already
    /// running. Inside a tokio runtime it is a task on that runtime; outside
    /// one it gets a dedicated thread. Returns true if a sweeper was started.
    pub fn start_sweeper(&self) -> bool {
        let Some(interval) = self.config.sweep_interval else {
            return false;
        };

        let mut slot = self.sweeper.lock();
        if slot.as_ref().is_some_and(|h| !h.is_finished()) {
            return false;
        }

        let shards = Arc::clone(&self.shards);
        let started = if tokio::runtime::Handle::try_current().is_ok() {
            Ok(spawn_sweep_task(shards, interval))
        } else {
            debug!("No tokio runtime, sweeping on a dedicated thread");
            spawn_sweep_thread(shards, interval)
        };

        match started {
            Ok(handle) => {
                *slot = Some(handle);
                true
            }
            Err(e) => {
                warn!("Failed to start background sweep: {}", e);
                false
            }
        }
    }

    /// Returns true while the background sweep task is running.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Stops the background sweep and waits for it to exit. Dropping the
    /// cache stops it as well, without waiting.
    pub async fn shutdown(&self) {
        let handle = self.sweeper.lock().take();
        if let Some(handle) = handle {
            handle.shutdown().await;
        }
    }

    /// Blocking counterpart of [`Cache::shutdown`] for callers without an
    /// async context.
    pub fn stop_sweeper(&self) {
        let handle = self.sweeper.lock().take();
        if let Some(handle) = handle {
            handle.stop();
        }
    }

    /// Remaining lifetime of the live entry under `key`. Does not count as a
    /// lookup.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = self.shards.clock.now();
        self.bucket_for(key)
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.ttl_remaining(now))
    }

    // == Accessors ==
    pub fn hits(&self) -> u64 {
        self.shards.counters.hits()
    }

    pub fn misses(&self) -> u64 {
        self.shards.counters.misses()
    }

    /// Aggregate bytes charged, including invalidated entries not yet
    /// reclaimed.
    pub fn size(&self) -> u64 {
        self.shards.counters.size()
    }

    pub fn overflow_count(&self) -> u64 {
        self.shards.counters.overflows()
    }

    /// Entries held across all shards, including ones awaiting reclamation.
    pub fn len(&self) -> usize {
        self.shards.buckets.iter().map(Bucket::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.buckets.iter().all(Bucket::is_empty)
    }

    /// Returns a snapshot of the counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits(),
            misses: self.misses(),
            overflows: self.overflow_count(),
            size: self.size(),
            entries: self.len(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn bucket_for(&self, key: &str) -> &Bucket {
        let index = shard_index(self.hasher.hash(key), self.shards.buckets.len());
        &self.shards.buckets[index]
    }

    /// Evicts oldest entries round-robin until `needed` more bytes fit.
    /// Gives up once a full pass finds every bucket empty.
    fn evict_for(&self, needed: u64) -> bool {
        let counters = &self.shards.counters;
        let buckets = &self.shards.buckets;
        let mut empty_in_a_row = 0;
        let mut evicted = 0usize;

        while counters.size() + needed > self.config.max_size {
            if empty_in_a_row >= buckets.len() {
                return false;
            }
            let index = self.evict_cursor.fetch_add(1, Ordering::Relaxed) % buckets.len();
            match buckets[index].delete_oldest() {
                Some(bytes) => {
                    counters.sub_size(bytes);
                    empty_in_a_row = 0;
                    evicted += 1;
                }
                None => empty_in_a_row += 1,
            }
        }

        debug!(evicted, needed, "Evicted entries to fit new entry");
        true
    }
}
