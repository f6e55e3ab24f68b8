//! In-memory query cache keyed by dataset name.
//!
//! Entries remember when they were fetched and whether they have been
//! invalidated. Reads never block on a refetch: a stale entry is still
//! returned, flagged `is_stale`, until fresh data replaces it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Cache entry with data and fetch timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    data: serde_json::Value,
    /// Unix timestamp in milliseconds
    timestamp: u64,
    invalidated: bool,
}

/// Cache read result with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheResult {
    pub data: Option<serde_json::Value>,
    pub is_stale: bool,
    pub last_updated: Option<u64>,
}

#[derive(Debug, Default)]
pub struct QueryCache {
    entries: HashMap<String, CacheEntry>,
    /// Optional time to live in milliseconds.
    ttl_ms: Option<u64>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl_ms: u64) -> Self {
        Self {
            entries: HashMap::new(),
            ttl_ms: Some(ttl_ms),
        }
    }

    pub fn insert(&mut self, key: &str, data: serde_json::Value, now_ms: u64) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                data,
                timestamp: now_ms,
                invalidated: false,
            },
        );
    }

    pub fn get(&self, key: &str, now_ms: u64) -> CacheResult {
        match self.entries.get(key) {
            None => CacheResult {
                data: None,
                is_stale: true,
                last_updated: None,
            },
            Some(entry) => {
                let expired = self
                    .ttl_ms
                    .is_some_and(|ttl| now_ms.saturating_sub(entry.timestamp) > ttl);
                CacheResult {
                    data: Some(entry.data.clone()),
                    is_stale: entry.invalidated || expired,
                    last_updated: Some(entry.timestamp),
                }
            }
        }
    }

    /// Mark every entry whose key starts with `prefix` as stale.
    /// Returns how many entries were touched.
    pub fn invalidate(&mut self, prefix: &str) -> usize {
        let mut touched = 0;
        for (key, entry) in self.entries.iter_mut() {
            if key.starts_with(prefix) {
                entry.invalidated = true;
                touched += 1;
            }
        }
        touched
    }

    /// Keys that need a refetch, sorted for stable output.
    pub fn stale_keys(&self, now_ms: u64) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .keys()
            .filter(|k| self.get(k, now_ms).is_stale)
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
