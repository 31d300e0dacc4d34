//! Shardcache - A sharded in-memory cache
//!
//! Size-bounded key/value storage split across independently locked shards,
//! with FIFO eviction, TTL expiry and a background sweep task.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{Cache, CacheStats};
pub use config::{CacheConfig, Config, DeletePolicy};
pub use error::CacheError;
