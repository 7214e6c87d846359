//! Key normalization for loosely spelled payload field names.
//!
//! Automation tools forward field names exactly as a user typed them into a
//! form, so the same logical field shows up as `"MVRVZ (BTC)"`,
//! `"mvrvz_btc"` or `"  mvrvz--btc  "`. [`normalize_key`] folds all of those
//! into one comparable form.

use std::collections::HashMap;

use parking_lot::RwLock;

/// Default upper bound on the number of memoized keys.
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// Canonicalizes a raw field name.
///
/// Lowercases ASCII letters, replaces every run of characters that are not
/// ASCII alphanumerics with a single `_`, and strips leading and trailing
/// separators. Non-ASCII letters count as separators.
///
/// The result is idempotent: `normalize_key(&normalize_key(x)) == normalize_key(x)`.
#[must_use]
pub fn normalize_key(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_separator = false;

    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push('_');
            }
            pending_separator = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    out
}

/// Key normalizer with an optional, bounded memoization cache.
///
/// The cache is purely an optimization: every entry is a pure function of
/// its key and entries are never invalidated, so concurrent readers always
/// observe correct values. Once the cache holds `capacity` entries new keys
/// are normalized without being remembered.
#[derive(Debug)]
pub struct KeyNormalizer {
    cache: Option<RwLock<HashMap<String, String>>>,
    capacity: usize,
}

impl KeyNormalizer {
    /// Creates a normalizer with a cache of [`DEFAULT_CACHE_CAPACITY`] entries.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Creates a normalizer that caches at most `capacity` keys.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache: Some(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    /// Creates a normalizer without any cache.
    #[must_use]
    pub const fn uncached() -> Self {
        Self {
            cache: None,
            capacity: 0,
        }
    }

    /// Normalizes `raw`, consulting the cache when one is configured.
    #[must_use]
    pub fn normalize(&self, raw: &str) -> String {
        let Some(cache) = &self.cache else {
            return normalize_key(raw);
        };

        if let Some(hit) = cache.read().get(raw) {
            return hit.clone();
        }

        let normalized = normalize_key(raw);
        let mut guard = cache.write();
        if guard.len() < self.capacity {
            guard.insert(raw.to_string(), normalized.clone());
        }
        normalized
    }

    /// Number of memoized keys.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache.as_ref().map_or(0, |cache| cache.read().len())
    }
}

impl Default for KeyNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
