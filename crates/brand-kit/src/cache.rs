// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! In-memory response cache with per-entry time-to-live
//!
//! Entries expire lazily: a read that finds a stale entry removes it and
//! reports a miss. There is no background sweep and no size bound, hosts that
//! run for a long time can call [`ResponseCache::purge_expired`] themselves.

use std::{
    collections::hash_map::DefaultHasher,
    fmt,
    hash::{Hash, Hasher},
    time::{Duration, Instant},
};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::types::Language;

/// Default time-to-live for cached responses (30 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// Deterministic cache key derived from the logical request parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Create a cache key from a raw string
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key for a brand identity extraction
    ///
    /// The screenshot, when present, is part of the fingerprint.
    pub fn brand(language: Language, screenshot: Option<&str>, content: &str) -> Self {
        let (image_flag, fingerprint) = match screenshot {
            Some(image) => ("with_image", fingerprint(&format!("{content}\n{image}"))),
            None => ("text_only", fingerprint(content)),
        };
        Self(format!(
            "brand_{}_{}_{}",
            language.code(),
            image_flag,
            fingerprint
        ))
    }

    /// Key for a design audit
    ///
    /// Brand colors stand in for the whole brand identity.
    pub fn design(language: Language, image_base64: &str, primary_colors: &[String]) -> Self {
        Self(format!(
            "design_{}_{}_{}",
            language.code(),
            fingerprint(image_base64),
            primary_colors.join("_")
        ))
    }

    /// Get the string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Short, bounded-length fingerprint of an arbitrarily long input
///
/// The whole input is hashed, so inputs sharing a long common prefix (such as
/// base64 image headers) still get distinct keys.
pub fn fingerprint(input: &str) -> String {
    let mut hasher = DefaultHasher::new();
    input.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Cached value with its creation time and time-to-live
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The cached value
    pub value: V,
    /// When this entry was stored
    pub created_at: Instant,
    /// How long this entry stays fresh
    pub ttl: Duration,
    /// How many times this entry has been read
    pub access_count: u64,
}

impl<V> CacheEntry<V> {
    /// Create a new cache entry
    pub fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            ttl,
            access_count: 0,
        }
    }

    /// Check if this entry is still fresh
    pub fn is_valid(&self) -> bool {
        self.created_at.elapsed() < self.ttl
    }
}

/// Key/value store with per-entry TTL and lazy expiry-on-read
#[derive(Debug)]
pub struct ResponseCache<V> {
    entries: DashMap<CacheKey, CacheEntry<V>>,
    default_ttl: Duration,
    stats: DashMap<&'static str, u64>,
}

impl<V: Clone> Default for ResponseCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> ResponseCache<V> {
    /// Create a new cache with the default TTL
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Create a new cache with a custom default TTL
    pub fn with_ttl(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
            stats: DashMap::new(),
        }
    }

    /// Get a fresh cached value
    ///
    /// A stale entry is removed by the read that finds it.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        if let Some(mut cached) = self.entries.get_mut(key) {
            if cached.is_valid() {
                cached.access_count += 1;
                self.increment_stat("cache_hits");
                trace!(key = %key, access_count = cached.access_count, "cache hit");
                return Some(cached.value.clone());
            }

            drop(cached);
            // A concurrent writer may have refreshed the entry since the check
            if self
                .entries
                .remove_if(key, |_, entry| !entry.is_valid())
                .is_some()
            {
                self.increment_stat("cache_expired");
                debug!(key = %key, "expired cache entry removed");
            }
        }

        self.increment_stat("cache_misses");
        None
    }

    /// Store a value with the default TTL
    pub fn insert(&self, key: CacheKey, value: V) {
        self.set(key, value, self.default_ttl);
    }

    /// Store a value with an explicit TTL
    pub fn set(&self, key: CacheKey, value: V, ttl: Duration) {
        trace!(key = %key, ttl_ms = ttl.as_millis(), "storing response in cache");
        self.entries.insert(key, CacheEntry::new(value, ttl));
        self.increment_stat("cache_stores");
    }

    /// Remove an entry regardless of freshness
    pub fn remove(&self, key: &CacheKey) -> Option<V> {
        self.entries.remove(key).map(|(_, entry)| entry.value)
    }

    /// Number of stored entries, including stale ones not yet read
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear all entries and statistics
    pub fn clear(&self) {
        self.entries.clear();
        self.stats.clear();
        debug!("cleared response cache and statistics");
    }

    /// Remove every stale entry (maintenance operation)
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_valid());
        let removed = before.saturating_sub(self.entries.len());

        if removed > 0 {
            *self.stats.entry("cache_expired").or_insert(0) += removed as u64;
            debug!("purged {} expired cache entries", removed);
        }

        removed
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let cache_hits = self.get_stat("cache_hits");
        let cache_misses = self.get_stat("cache_misses");
        let total_requests = cache_hits + cache_misses;
        #[allow(clippy::cast_precision_loss)]
        let hit_rate = if total_requests > 0 {
            cache_hits as f64 / total_requests as f64
        } else {
            0.0
        };

        CacheStats {
            entry_count: self.entries.len(),
            cache_hits,
            cache_misses,
            cache_stores: self.get_stat("cache_stores"),
            cache_expired: self.get_stat("cache_expired"),
            hit_rate,
            default_ttl_seconds: self.default_ttl.as_secs(),
        }
    }

    fn increment_stat(&self, key: &'static str) {
        *self.stats.entry(key).or_insert(0) += 1;
    }

    fn get_stat(&self, key: &str) -> u64 {
        self.stats.get(key).map_or(0, |v| *v)
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of stored entries
    pub entry_count: usize,
    /// Cache hit count
    pub cache_hits: u64,
    /// Cache miss count
    pub cache_misses: u64,
    /// Number of values stored
    pub cache_stores: u64,
    /// Number of entries removed because they expired
    pub cache_expired: u64,
    /// Cache hit rate (0.0 to 1.0)
    pub hit_rate: f64,
    /// Default TTL in seconds
    pub default_ttl_seconds: u64,
}
