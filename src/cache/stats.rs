//! Cache Statistics Module
//!
//! Atomic counters shared by all shards, and the snapshot reported to callers.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use serde::Serialize;

// == Counters ==
/// Process-wide counters of one cache instance.
///
/// Updated outside bucket locks, so they are consistent only at rest. The
/// byte count is signed so a subtraction that lands before its matching
/// addition cannot wrap.
#[derive(Debug, Default)]
pub struct Counters {
    size: AtomicI64,
    hits: AtomicU64,
    misses: AtomicU64,
    overflows: AtomicU64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_overflow(&self) {
        self.overflows.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_size(&self, bytes: u64) {
        self.size.fetch_add(bytes as i64, Ordering::AcqRel);
    }

    pub fn sub_size(&self, bytes: u64) {
        self.size.fetch_sub(bytes as i64, Ordering::AcqRel);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn overflows(&self) -> u64 {
        self.overflows.load(Ordering::Relaxed)
    }

    /// Aggregate bytes, clamped at zero.
    pub fn size(&self) -> u64 {
        self.size.load(Ordering::Acquire).max(0) as u64
    }
}

// == Cache Stats ==
/// Point-in-time view of a cache's counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Successful lookups
    pub hits: u64,
    /// Lookups of absent, expired or invalidated keys
    pub misses: u64,
    /// Writes that needed eviction to make room
    pub overflows: u64,
    /// Aggregate bytes charged
    pub size: u64,
    /// Entries held across all shards
    pub entries: usize,
}

impl CacheStats {
    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_new() {
        let counters = Counters::new();
        assert_eq!(counters.hits(), 0);
        assert_eq!(counters.misses(), 0);
        assert_eq!(counters.overflows(), 0);
        assert_eq!(counters.size(), 0);
    }

    #[test]
    fn test_counters_record() {
        let counters = Counters::new();
        counters.record_hit();
        counters.record_hit();
        counters.record_miss();
        counters.record_overflow();

        assert_eq!(counters.hits(), 2);
        assert_eq!(counters.misses(), 1);
        assert_eq!(counters.overflows(), 1);
    }

    #[test]
    fn test_size_clamps_transient_underflow() {
        let counters = Counters::new();
        counters.sub_size(10);
        assert_eq!(counters.size(), 0);

        counters.add_size(25);
        assert_eq!(counters.size(), 15);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..CacheStats::default()
        };
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_counters_from_many_threads() {
        let counters = std::sync::Arc::new(Counters::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counters = counters.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        counters.record_hit();
                        counters.add_size(2);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counters.hits(), 8000);
        assert_eq!(counters.size(), 16000);
    }
}
