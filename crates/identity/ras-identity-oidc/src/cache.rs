//! Metadata cache used for discovery documents and key sets.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Cache key of the discovery document.
pub const METADATA_CACHE_KEY: &str = "openid_metadata";

/// Options handed to the cache on every write.
///
/// The core never interprets these; they belong to the cache implementation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheOptions {
    /// How long an entry stays readable, `None` meaning until evicted.
    #[serde(default, with = "optional_seconds")]
    pub expires_in: Option<Duration>,
    /// Implementation specific options, passed through untouched.
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
        self.expires_in = Some(expires_in);
        self
    }
}

/// Key-value store shared by every authentication attempt.
///
/// Implementations are responsible for their own concurrency control.
#[async_trait]
pub trait MetadataCache: Send + Sync {
    /// Read a value, `None` when absent or expired
    async fn read(&self, key: &str) -> Option<Value>;

    /// Write a value, replacing whatever was there
    async fn write(&self, key: &str, value: Value, options: &CacheOptions);
}

struct CacheEntry {
    value: Value,
    expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() > at)
    }
}

/// In-memory implementation of [`MetadataCache`]
#[derive(Default)]
pub struct InMemoryCache {
    entries: DashMap<String, CacheEntry>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl MetadataCache for InMemoryCache {
    async fn read(&self, key: &str) -> Option<Value> {
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove_if(key, |_, entry| entry.is_expired());
        }

        None
    }

    async fn write(&self, key: &str, value: Value, options: &CacheOptions) {
        let expires_at = options
            .expires_in
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
            .map(|ttl| Utc::now() + ttl);

        self.entries
            .insert(key.to_string(), CacheEntry { value, expires_at });
    }
}

mod optional_seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_in_memory_cache_round_trip() {
        let cache = InMemoryCache::new();
        assert!(cache.read(METADATA_CACHE_KEY).await.is_none());

        cache
            .write(METADATA_CACHE_KEY, json!({"issuer": "http://test.int"}), &CacheOptions::new())
            .await;

        let value = cache.read(METADATA_CACHE_KEY).await.unwrap();
        assert_eq!(value["issuer"], "http://test.int");
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_reads_as_absent() {
        let cache = InMemoryCache::new();
        let options = CacheOptions::new().with_expires_in(Duration::from_millis(10));

        cache.write("jwks_abc", json!({"keys": []}), &options).await;
        assert!(cache.read("jwks_abc").await.is_some());

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(cache.read("jwks_abc").await.is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_options_deserialize_seconds() {
        let options: CacheOptions =
            serde_json::from_str(r#"{"expires_in": 3600, "extra": {"namespace": "oidc"}}"#)
                .unwrap();
        assert_eq!(options.expires_in, Some(Duration::from_secs(3600)));
        assert_eq!(options.extra.get("namespace").map(String::as_str), Some("oidc"));

        let defaults: CacheOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(defaults, CacheOptions::default());
    }
}
