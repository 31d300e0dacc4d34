//! Configuration Module
//!
//! Cache and server parameters, loaded from environment variables or built
//! in code.

use std::env;
use std::time::Duration;

/// Default number of shards.
pub const DEFAULT_BUCKETS: usize = 16;

/// Default entry time-to-live.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Default interval between background sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Default aggregate byte budget (64 MiB).
pub const DEFAULT_MAX_SIZE: u64 = 64 * 1024 * 1024;

// == Delete Policy ==
/// How `Cache::delete` reclaims an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletePolicy {
    /// Unlink from the map and the eviction queue immediately.
    #[default]
    Eager,
    /// Mark the entry invalid; the next sweep or eviction reclaims it.
    Lazy,
}

impl DeletePolicy {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "eager" => Some(Self::Eager),
            "lazy" => Some(Self::Lazy),
            _ => None,
        }
    }
}

// == Cache Config ==
/// Cache parameters. Immutable once handed to `Cache::new`.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Aggregate byte budget across all shards
    pub max_size: u64,
    /// Shard count
    pub buckets: usize,
    /// Time-to-live applied by `Cache::set`
    pub default_ttl: Duration,
    /// Background sweep period, `None` disables the sweeper
    pub sweep_interval: Option<Duration>,
    /// Refresh an entry's creation time on every hit
    pub sliding_expiration: bool,
    /// Eager or lazy deletion
    pub delete_policy: DeletePolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            buckets: DEFAULT_BUCKETS,
            default_ttl: DEFAULT_TTL,
            sweep_interval: Some(DEFAULT_SWEEP_INTERVAL),
            sliding_expiration: false,
            delete_policy: DeletePolicy::Eager,
        }
    }
}

impl CacheConfig {
    /// Creates a config with the given byte budget and defaults elsewhere.
    pub fn new(max_size: u64) -> Self {
        Self {
            max_size,
            ..Self::default()
        }
    }

    /// Loads cache parameters from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_SIZE` - Byte budget (default: 64 MiB)
    /// - `CACHE_BUCKETS` - Shard count (default: 16)
    /// - `CACHE_DEFAULT_TTL` - Entry TTL in seconds (default: 300)
    /// - `CACHE_SWEEP_INTERVAL` - Sweep period in seconds, 0 disables (default: 300)
    /// - `CACHE_SLIDING_EXPIRATION` - `true` to refresh entries on read (default: false)
    /// - `CACHE_DELETE_POLICY` - `eager` or `lazy` (default: eager)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_size: env_parse("CACHE_MAX_SIZE").unwrap_or(defaults.max_size),
            buckets: env_parse("CACHE_BUCKETS").unwrap_or(defaults.buckets),
            default_ttl: env_parse("CACHE_DEFAULT_TTL")
                .map(Duration::from_secs)
                .unwrap_or(defaults.default_ttl),
            sweep_interval: match env_parse::<u64>("CACHE_SWEEP_INTERVAL") {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => defaults.sweep_interval,
            },
            sliding_expiration: env_parse("CACHE_SLIDING_EXPIRATION")
                .unwrap_or(defaults.sliding_expiration),
            delete_policy: env::var("CACHE_DELETE_POLICY")
                .ok()
                .and_then(|v| DeletePolicy::parse(&v))
                .unwrap_or(defaults.delete_policy),
        }
        .normalized()
    }

    pub fn with_buckets(mut self, buckets: usize) -> Self {
        self.buckets = buckets;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    pub fn without_sweeper(mut self) -> Self {
        self.sweep_interval = None;
        self
    }

    pub fn with_sliding_expiration(mut self, enabled: bool) -> Self {
        self.sliding_expiration = enabled;
        self
    }

    pub fn with_delete_policy(mut self, policy: DeletePolicy) -> Self {
        self.delete_policy = policy;
        self
    }

    /// Replaces zero values with their defaults.
    pub(crate) fn normalized(mut self) -> Self {
        if self.buckets == 0 {
            self.buckets = DEFAULT_BUCKETS;
        }
        if self.default_ttl.is_zero() {
            self.default_ttl = DEFAULT_TTL;
        }
        if self.sweep_interval.is_some_and(|i| i.is_zero()) {
            self.sweep_interval = Some(DEFAULT_SWEEP_INTERVAL);
        }
        self
    }
}

// == Server Config ==
/// Demo server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache parameters
    pub cache: CacheConfig,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Loads the cache parameters plus `SERVER_PORT` (default: 3000).
    pub fn from_env() -> Self {
        Self {
            cache: CacheConfig::from_env(),
            server_port: env_parse("SERVER_PORT").unwrap_or(3000),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            server_port: 3000,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
