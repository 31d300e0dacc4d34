//! Key Hashing Module
//!
//! Maps keys to 64-bit hashes for shard selection.

use xxhash_rust::xxh64::xxh64;

// == Key Hasher Trait ==
/// Deterministic, uniformly distributed 64-bit string hash.
pub trait KeyHasher: Send + Sync + 'static {
    fn hash(&self, key: &str) -> u64;
}

// == xxHash ==
/// Default hasher: xxHash64 with seed 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct XxHasher;

impl KeyHasher for XxHasher {
    fn hash(&self, key: &str) -> u64 {
        xxh64(key.as_bytes(), 0)
    }
}

/// Reduces a hash to a shard index.
pub fn shard_index(hash: u64, shards: usize) -> usize {
    (hash % shards as u64) as usize
}
