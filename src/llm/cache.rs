//! In-memory LRU caches of generation results, keyed by diff fingerprint.

use std::collections::BTreeMap;
use std::hash::Hash;

use indexmap::IndexMap;
use sha2::{Digest, Sha256};

use crate::commit::Suggestion;
use crate::privacy::SanitizedDiff;

/// Entries kept in the single-file cache.
pub const SINGLE_CACHE_CAPACITY: usize = 100;
/// Entries kept in the batch cache.
pub const BATCH_CACHE_CAPACITY: usize = 50;

/// Characters of content that contribute to a fingerprint.
const FINGERPRINT_CONTENT_CHARS: usize = 500;

/// Strict least-recently-used map. Reads refresh recency.
#[derive(Debug, Clone)]
pub struct LruCache<K, V> {
    entries: IndexMap<K, V>,
    capacity: usize,
}

impl<K: Hash + Eq, V: Clone> LruCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Look up a value and mark it most recently used.
    pub fn get(&mut self, key: &K) -> Option<V> {
        let idx = self.entries.get_index_of(key)?;
        let last = self.entries.len() - 1;
        self.entries.move_index(idx, last);
        self.entries.get_index(last).map(|(_, v)| v.clone())
    }

    /// Insert or replace a value, evicting the least recently used entry when full.
    pub fn insert(&mut self, key: K, value: V) {
        self.entries.shift_remove(&key);
        self.entries.insert(key, value);
        while self.entries.len() > self.capacity {
            self.entries.shift_remove_index(0);
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Fingerprint of one sanitized diff: path, line counts and a content prefix.
pub fn fingerprint(diff: &SanitizedDiff) -> String {
    let prefix: String = diff.content.chars().take(FINGERPRINT_CONTENT_CHARS).collect();
    let mut hasher = Sha256::new();
    hasher.update(diff.path.as_bytes());
    hasher.update(b"|");
    hasher.update(diff.additions.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(diff.deletions.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(prefix.as_bytes());
    hex::encode(hasher.finalize())
}

/// Fingerprint of a set of diffs, independent of their order.
pub fn batch_fingerprint(diffs: &[SanitizedDiff]) -> String {
    let mut parts: Vec<String> = diffs.iter().map(fingerprint).collect();
    parts.sort();
    hex::encode(Sha256::digest(parts.join(",").as_bytes()))
}

/// The two caches a generation client owns.
#[derive(Debug, Clone)]
pub struct ResultCache {
    pub single: LruCache<String, Vec<Suggestion>>,
    pub batch: LruCache<String, BTreeMap<String, Vec<Suggestion>>>,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self {
            single: LruCache::new(SINGLE_CACHE_CAPACITY),
            batch: LruCache::new(BATCH_CACHE_CAPACITY),
        }
    }
}

impl ResultCache {
    pub fn clear(&mut self) {
        self.single.clear();
        self.batch.clear();
    }
}
