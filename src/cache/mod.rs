//! Cache Module
//!
//! Sharded in-memory caching with size-bounded FIFO eviction and TTL expiry.

mod bucket;
mod clock;
mod codec;
mod entry;
mod hash;
mod queue;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use bucket::{Bucket, Reclaimed};
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{Codec, JsonCodec};
pub use entry::CacheEntry;
pub use hash::{shard_index, KeyHasher, XxHasher};
pub use queue::{KeyQueue, NodeId};
pub use stats::{CacheStats, Counters};
pub use store::Cache;
