// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

//! Process-wide result cache for pipeline stages.
//!
//! One mapping from string key to JSON value, with a fixed TTL. Entries are
//! checked and discarded on lookup only; there is no background sweep and no
//! capacity bound. The cache exists to dedupe identical (stage, input) work
//! within the TTL window, not to provide cross-process persistence.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

/// Derive a stable cache key from a stage name and a serializable payload.
///
/// Identical (stage, payload) pairs always produce the same key; distinct
/// payloads collide only with SHA-256 probability.
pub fn cache_key<T: Serialize>(stage: &str, payload: &T) -> String {
    let serialized = serde_json::to_string(payload).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    format!("{stage}:{}", hex::encode(hasher.finalize()))
}

#[derive(Clone)]
pub struct ResultCache {
    inner: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: Duration,
}

struct CacheEntry {
    value: serde_json::Value,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Look up a live entry. Expired entries are removed before reporting a
    /// miss; a stored value that no longer deserializes as `T` is a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut guard = self.inner.write().await;
        let now = Utc::now();

        let entry = guard.get(key)?;
        if entry.is_expired(now) {
            guard.remove(key);
            return None;
        }

        match serde_json::from_value(entry.value.clone()) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::debug!(key, %error, "cached value did not match requested type");
                None
            }
        }
    }

    /// Store a value, overwriting any previous entry and restarting its TTL.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(key, %error, "failed to serialize cache value; skipping store");
                return;
            }
        };

        let entry = CacheEntry {
            value,
            expires_at: Utc::now() + ttl_as_chrono(self.ttl),
        };

        self.inner.write().await.insert(key.to_string(), entry);
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

fn ttl_as_chrono(ttl: Duration) -> ChronoDuration {
    ChronoDuration::from_std(ttl).unwrap_or_else(|_| {
        const MAX_SECS: u64 = i64::MAX as u64;
        ChronoDuration::seconds(ttl.as_secs().min(MAX_SECS) as i64)
    })
}
