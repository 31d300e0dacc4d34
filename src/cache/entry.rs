//! Cache Entry Module
//!
//! Defines the envelope stored for each key: encoded payload plus TTL metadata.

use std::sync::Arc;
use std::time::{Duration, Instant};

// == Cache Entry ==
/// A single cache entry with its payload and expiry metadata.
///
/// Key and payload are reference counted so a bucket can hand out clones
/// without copying bytes.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The key this entry is stored under
    pub key: Arc<str>,
    /// Codec output
    pub payload: Arc<[u8]>,
    /// Lifetime measured from `created_at`
    pub ttl: Duration,
    /// Creation time, refreshed on hit under sliding expiration
    pub created_at: Instant,
    /// Cleared by lazy deletion
    pub valid: bool,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a valid entry stamped with `now`.
    pub fn new(key: impl Into<Arc<str>>, payload: Vec<u8>, ttl: Duration, now: Instant) -> Self {
        Self {
            key: key.into(),
            payload: payload.into(),
            ttl,
            created_at: now,
            valid: true,
        }
    }

    // == Size ==
    /// Bytes charged against the cache budget: key length plus payload length.
    pub fn size(&self) -> u64 {
        (self.key.len() + self.payload.len()) as u64
    }

    // == Is Expired ==
    /// An entry is expired once strictly more than `ttl` has elapsed since
    /// `created_at`.
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) > self.ttl
    }

    /// Valid and not expired.
    pub fn is_live(&self, now: Instant) -> bool {
        self.valid && !self.is_expired(now)
    }

    // == Time To Live ==
    /// Remaining lifetime, zero once expired.
    pub fn ttl_remaining(&self, now: Instant) -> Duration {
        self.ttl
            .saturating_sub(now.saturating_duration_since(self.created_at))
    }

    /// Restarts the entry's lifetime at `now`.
    pub fn refresh(&mut self, now: Instant) {
        self.created_at = now;
    }

    /// Marks the entry for lazy reclamation.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }
}
