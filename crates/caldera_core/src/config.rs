//! Cache configuration.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the hot-object cache.
///
/// # Example
///
/// ```
/// use caldera_core::CacheConfig;
///
/// let config = CacheConfig::default()
///     .with_max_items(100)
///     .with_max_bytes(50 * 1024 * 1024);
/// assert_eq!(*config.max_items(), 100);
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
pub struct CacheConfig {
    /// Root directory for cached blobs and sidecars
    #[serde(default = "default_cache_dir")]
    cache_dir: PathBuf,

    /// Maximum number of cached entries before eviction kicks in
    #[serde(default = "default_max_items")]
    max_items: usize,

    /// Maximum total cached bytes before eviction kicks in
    #[serde(default = "default_max_bytes")]
    max_bytes: u64,

    /// Floor (log2) for snapped thumbnail widths
    #[serde(default = "default_min_thumb_log")]
    min_thumb_log: u32,

    /// Number of leading hash characters used as the shard subdirectory
    #[serde(default = "default_shard_prefix_len")]
    shard_prefix_len: usize,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./data/hot_cache")
}

fn default_max_items() -> usize {
    1000
}

fn default_max_bytes() -> u64 {
    2048 * 1024 * 1024 // 2048 MiB
}

fn default_min_thumb_log() -> u32 {
    5 // 2^5 = 32px
}

fn default_shard_prefix_len() -> usize {
    2
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            max_items: default_max_items(),
            max_bytes: default_max_bytes(),
            min_thumb_log: default_min_thumb_log(),
            shard_prefix_len: default_shard_prefix_len(),
        }
    }
}

impl CacheConfig {
    /// Build a configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    ///
    /// Recognized variables: `CALDERA_CACHE_DIR`, `CALDERA_CACHE_MAX_ITEMS`,
    /// `CALDERA_CACHE_MAX_BYTES`, `CALDERA_CACHE_MIN_THUMB_LOG`,
    /// `CALDERA_CACHE_SHARD_PREFIX_LEN`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("CALDERA_CACHE_DIR") {
            config.cache_dir = PathBuf::from(dir);
        }
        if let Some(max_items) = read_env_parsed("CALDERA_CACHE_MAX_ITEMS") {
            config.max_items = max_items;
        }
        if let Some(max_bytes) = read_env_parsed("CALDERA_CACHE_MAX_BYTES") {
            config.max_bytes = max_bytes;
        }
        if let Some(min_thumb_log) = read_env_parsed("CALDERA_CACHE_MIN_THUMB_LOG") {
            config.min_thumb_log = min_thumb_log;
        }
        if let Some(shard_prefix_len) = read_env_parsed("CALDERA_CACHE_SHARD_PREFIX_LEN") {
            config.shard_prefix_len = shard_prefix_len;
        }

        config
    }
}

fn read_env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(name, raw, "Ignoring unparseable environment override");
            None
        }
    }
}
