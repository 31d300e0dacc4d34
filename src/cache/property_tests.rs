//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the cache's behavioral guarantees over random
//! operation sequences.

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use crate::cache::{Cache, CacheEntry, JsonCodec, KeyHasher, KeyQueue, SystemClock};
use crate::config::{CacheConfig, DeletePolicy};

// == Test Configuration ==
const TEST_MAX_SIZE: u64 = 4096;

/// Routes every key to shard 0 so eviction order is a single FIFO.
struct SingleShard;

impl KeyHasher for SingleShard {
    fn hash(&self, _key: &str) -> u64 {
        0
    }
}

fn test_cache(max_size: u64) -> Cache {
    Cache::new(CacheConfig::new(max_size).without_sweeper())
}

// == Strategies ==
/// Generates valid cache keys
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,32}".prop_map(|s| s)
}

/// Generates cache values
fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,128}".prop_map(|s| s)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Delete { key: String },
    Sweep,
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        4 => (valid_key_strategy(), valid_value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        3 => valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        2 => valid_key_strategy().prop_map(|key| CacheOp::Delete { key }),
        1 => Just(CacheOp::Sweep),
    ]
}

#[derive(Debug, Clone)]
enum QueueOp {
    Push(u16),
    PopOldest,
    PopNewest,
    Delete(u16),
}

fn queue_op_strategy() -> impl Strategy<Value = QueueOp> {
    prop_oneof![
        3 => (0u16..32).prop_map(QueueOp::Push),
        1 => Just(QueueOp::PopOldest),
        1 => Just(QueueOp::PopNewest),
        1 => (0u16..32).prop_map(QueueOp::Delete),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Hits + misses always equals the number of lookups.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..80)) {
        let cache = test_cache(TEST_MAX_SIZE);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => cache.set(&key, &value).unwrap(),
                CacheOp::Get { key } => match cache.get::<String>(&key).unwrap() {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Delete { key } => {
                    cache.delete(&key);
                }
                CacheOp::Sweep => {
                    cache.sweep();
                }
            }
        }

        prop_assert_eq!(cache.hits(), expected_hits, "Hits mismatch");
        prop_assert_eq!(cache.misses(), expected_misses, "Misses mismatch");
    }

    // Storing then immediately reading returns the stored value.
    #[test]
    fn prop_roundtrip_storage(key in valid_key_strategy(), value in valid_value_strategy()) {
        let cache = test_cache(TEST_MAX_SIZE);

        cache.set(&key, &value).unwrap();

        let retrieved: Option<String> = cache.get(&key).unwrap();
        prop_assert_eq!(retrieved, Some(value), "Round-trip value mismatch");
    }

    // After any set, the aggregate size stays within budget and matches the
    // sum of live entry sizes.
    #[test]
    fn prop_size_bound(
        ops in prop::collection::vec(cache_op_strategy(), 1..120),
        max_size in 64u64..1024
    ) {
        let cache = test_cache(max_size);
        let mut written: HashSet<String> = HashSet::new();

        for op in ops {
            if let CacheOp::Set { key, value } = op {
                cache.set(&key, &value).unwrap();
                prop_assert!(
                    cache.size() <= max_size,
                    "Cache size {} exceeds max {}",
                    cache.size(),
                    max_size
                );
                written.insert(key);
            }
        }

        let live: u64 = written
            .iter()
            .filter_map(|k| cache.get::<String>(k).unwrap().map(|v| (k.len() + v.len() + 2) as u64))
            .sum();
        prop_assert_eq!(cache.size(), live);
    }

    // Deleting twice has the same observable effect as deleting once.
    #[test]
    fn prop_delete_idempotent(
        key in valid_key_strategy(),
        value in valid_value_strategy(),
        lazy in any::<bool>()
    ) {
        let policy = if lazy { DeletePolicy::Lazy } else { DeletePolicy::Eager };
        let cache = Cache::new(
            CacheConfig::new(TEST_MAX_SIZE).without_sweeper().with_delete_policy(policy),
        );
        cache.set(&key, &value).unwrap();

        prop_assert!(cache.delete(&key));
        let size_after_first = cache.size();
        prop_assert!(!cache.delete(&key));

        prop_assert_eq!(cache.size(), size_after_first);
        prop_assert!(cache.get::<String>(&key).unwrap().is_none());
    }

    // Overwriting returns the newest value and keeps a single entry.
    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        value1 in valid_value_strategy(),
        value2 in valid_value_strategy()
    ) {
        let cache = test_cache(TEST_MAX_SIZE);

        cache.set(&key, &value1).unwrap();
        cache.set(&key, &value2).unwrap();

        prop_assert_eq!(cache.get::<String>(&key).unwrap(), Some(value2.clone()));
        prop_assert_eq!(cache.len(), 1);
        prop_assert_eq!(cache.size(), (key.len() + value2.len() + 2) as u64);
    }

    // With one shard, overflow evicts in exact insertion order.
    #[test]
    fn prop_fifo_eviction_order(
        keys in prop::collection::hash_set("[a-z]{4}", 4..20),
        extra in "[A-Z]{4}"
    ) {
        let keys: Vec<String> = keys.into_iter().collect();
        // Each entry: 4-byte key + 1-byte payload
        let capacity = keys.len() as u64 * 5;
        let cache = Cache::with_parts(
            CacheConfig::new(capacity).without_sweeper(),
            JsonCodec,
            SingleShard,
            SystemClock,
        );

        for key in &keys {
            cache.set(key, &0u8).unwrap();
        }
        prop_assert_eq!(cache.overflow_count(), 0);

        cache.set(&extra, &1u8).unwrap();

        prop_assert_eq!(cache.overflow_count(), 1);
        prop_assert!(cache.get::<u8>(&keys[0]).unwrap().is_none(), "Oldest key should be evicted");
        for key in keys.iter().skip(1) {
            prop_assert!(cache.get::<u8>(key).unwrap().is_some(), "Key '{}' should remain", key);
        }
        prop_assert_eq!(cache.get::<u8>(&extra).unwrap(), Some(1));
    }

    // The arena queue behaves like a VecDeque with linear removal.
    #[test]
    fn prop_queue_matches_model(ops in prop::collection::vec(queue_op_strategy(), 1..100)) {
        let mut queue = KeyQueue::new();
        let mut model: std::collections::VecDeque<u16> = std::collections::VecDeque::new();

        for op in ops {
            match op {
                QueueOp::Push(k) => {
                    queue.push(k);
                    model.push_back(k);
                }
                QueueOp::PopOldest => prop_assert_eq!(queue.pop_oldest(), model.pop_front()),
                QueueOp::PopNewest => prop_assert_eq!(queue.pop_newest(), model.pop_back()),
                QueueOp::Delete(k) => {
                    let expected = match model.iter().position(|x| *x == k) {
                        Some(index) => {
                            model.remove(index);
                            true
                        }
                        None => false,
                    };
                    prop_assert_eq!(queue.delete(&k), expected);
                }
            }
            prop_assert_eq!(queue.len(), model.len());
        }

        let order: Vec<u16> = queue.iter().copied().collect();
        let expected: Vec<u16> = model.into_iter().collect();
        prop_assert_eq!(order, expected);
    }

    // Entry size is key bytes plus payload bytes.
    #[test]
    fn prop_entry_size(key in valid_key_strategy(), payload in prop::collection::vec(any::<u8>(), 0..256)) {
        let expected = (key.len() + payload.len()) as u64;
        let entry = CacheEntry::new(key.as_str(), payload, std::time::Duration::from_secs(1), std::time::Instant::now());
        prop_assert_eq!(entry.size(), expected);
    }
}

// == Concurrency ==
// Fewer cases: each case spawns threads
proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    // Writers on disjoint keys always read back their own values, and the
    // budget holds once they are done.
    #[test]
    fn prop_concurrent_writers(
        threads in 2usize..8,
        per_thread in 10usize..100,
        max_size in 512u64..8192
    ) {
        let cache = Arc::new(test_cache(max_size));

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    let mut corrupted = Vec::new();
                    for i in 0..per_thread {
                        let key = format!("t{}-k{}", t, i);
                        let value = format!("value-{}-{}", t, i);
                        cache.set(&key, &value).unwrap();
                        if let Some(read) = cache.get::<String>(&key).unwrap() {
                            if read != value {
                                corrupted.push(key);
                            }
                        }
                    }
                    corrupted
                })
            })
            .collect();

        for handle in handles {
            let corrupted = handle.join().expect("writer thread panicked");
            prop_assert!(corrupted.is_empty(), "Corrupted reads: {:?}", corrupted);
        }

        prop_assert!(
            cache.size() <= max_size,
            "Cache size {} exceeds max {} at rest",
            cache.size(),
            max_size
        );
    }
}

// == Additional Unit Tests for Edge Cases ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_scenario_1024_bytes_16_buckets() {
        let cache = Cache::new(CacheConfig::new(1024).with_buckets(16).without_sweeper());

        for i in 0..2000 {
            cache.set(&format!("key{:05}", i), &(i % 10)).unwrap();
        }

        assert!(cache.overflow_count() > 0);
        assert!(cache.size() <= 1024);
    }

    #[test]
    fn test_counter_consistency_single_thread() {
        let cache = test_cache(TEST_MAX_SIZE);
        cache.set("present", "yes").unwrap();

        let before = cache.hits() + cache.misses();
        for i in 0..50 {
            let key = if i % 2 == 0 { "present" } else { "absent" };
            let _ = cache.get::<String>(key).unwrap();
        }

        assert_eq!(cache.hits() + cache.misses() - before, 50);
        assert_eq!(cache.hits(), 25);
    }
}
