//! Cache façade over an in-process store.
//!
//! One `CacheService` is constructed at process start and injected through
//! `AppState`; nothing here is global, so tests get a fresh instance each.
//! Entries are JSON payloads wrapped with a SHA-256 checksum and their own
//! expiry instant, so different report kinds keep different TTLs inside a
//! single store. Corrupted, tampered, or expired entries read as misses.

use chrono::{DateTime, Duration, Utc};
use moka::future::Cache;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::ReportQueryParams;

/// TTL for full health reports.
pub const REPORT_TTL_SECS: i64 = 3600;
/// TTL for the raw prospect analysis reused by the filter layer.
pub const PROSPECT_TTL_SECS: i64 = 1800;

/// Report kinds with independently keyed cache entries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReportKind {
    DatabaseHealth,
    ProspectHealth,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::DatabaseHealth => "database_health",
            ReportKind::ProspectHealth => "prospect_health",
        }
    }
}

/// Builds the report cache key. Callers must reproduce this format exactly
/// to hit existing entries:
/// `{report_kind}:{token_prefix}:{filter_type|all}:{start|''}:{end|''}`.
pub fn report_key(kind: ReportKind, token_prefix: &str, params: &ReportQueryParams) -> String {
    format!(
        "{}:{}:{}:{}:{}",
        kind.as_str(),
        token_prefix,
        params.filter_type.as_deref().unwrap_or("all"),
        params.start_date.as_deref().unwrap_or(""),
        params.end_date.as_deref().unwrap_or(""),
    )
}

/// Key for the raw prospect analysis: `prospects:{token_prefix}`.
pub fn prospects_key(token_prefix: &str) -> String {
    format!("prospects:{}", token_prefix)
}

/// Cached payload with integrity checksum and per-entry expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    data: String,
    checksum: String,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn new(data: String, ttl_seconds: i64) -> Self {
        let checksum = Self::compute_checksum(&data);
        Self {
            data,
            checksum,
            expires_at: Utc::now() + Duration::seconds(ttl_seconds),
        }
    }

    fn compute_checksum(data: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn is_valid(&self) -> bool {
        Self::compute_checksum(&self.data) == self.checksum
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Process-wide cache service, cloneable (moka caches share state).
#[derive(Clone)]
pub struct CacheService {
    store: Cache<String, String>,
}

impl CacheService {
    pub fn new() -> Self {
        // Store-level TTL bounds memory; per-entry expiry is enforced on
        // read and may be shorter
        let store = Cache::builder()
            .time_to_live(std::time::Duration::from_secs(REPORT_TTL_SECS as u64))
            .max_capacity(10_000)
            .build();
        Self { store }
    }

    /// Retrieves and deserializes a cached value. Returns `None` on a miss,
    /// an expired entry, a checksum mismatch, or a deserialization failure.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let serialized = self.store.get(key).await?;
        let entry: CacheEntry = serde_json::from_str(&serialized).ok()?;

        if !entry.is_valid() {
            tracing::warn!("Cache validation failed for key {}: checksum mismatch", key);
            self.store.invalidate(key).await;
            return None;
        }
        if entry.is_expired(Utc::now()) {
            self.store.invalidate(key).await;
            return None;
        }

        match serde_json::from_str(&entry.data) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Cached payload for key {} failed to decode: {}", key, e);
                None
            }
        }
    }

    /// Serializes and stores a value with the given TTL. Returns false when
    /// the value cannot be serialized; callers treat that as cache-disabled.
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl_seconds: i64) -> bool {
        let data = match serde_json::to_string(value) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("Failed to serialize cache value for key {}: {}", key, e);
                return false;
            }
        };
        let entry = CacheEntry::new(data, ttl_seconds);
        match serde_json::to_string(&entry) {
            Ok(serialized) => {
                self.store.insert(key.to_string(), serialized).await;
                true
            }
            Err(e) => {
                tracing::warn!("Failed to serialize cache entry for key {}: {}", key, e);
                false
            }
        }
    }

    pub async fn delete(&self, key: &str) -> bool {
        let existed = self.store.get(key).await.is_some();
        self.store.invalidate(key).await;
        existed
    }
}

impl Default for CacheService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_key_format() {
        let params = ReportQueryParams {
            filter_type: Some("30_days".to_string()),
            start_date: None,
            end_date: None,
        };
        assert_eq!(
            report_key(ReportKind::DatabaseHealth, "tokenprefix", &params),
            "database_health:tokenprefix:30_days::"
        );

        let unfiltered = ReportQueryParams::default();
        assert_eq!(
            report_key(ReportKind::ProspectHealth, "tokenprefix", &unfiltered),
            "prospect_health:tokenprefix:all::"
        );
    }

    #[test]
    fn test_prospects_key_format() {
        assert_eq!(prospects_key("abc123"), "prospects:abc123");
    }

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let cache = CacheService::new();
        let value = vec!["a".to_string(), "b".to_string()];

        assert!(cache.set_json("key", &value, 60).await);
        let fetched: Option<Vec<String>> = cache.get_json("key").await;
        assert_eq!(fetched, Some(value));
    }

    #[tokio::test]
    async fn test_expired_entry_is_miss() {
        let cache = CacheService::new();
        assert!(cache.set_json("key", &42u32, -1).await);
        let fetched: Option<u32> = cache.get_json("key").await;
        assert_eq!(fetched, None);
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = CacheService::new();
        cache.set_json("key", &1u32, 60).await;
        assert!(cache.delete("key").await);
        assert!(!cache.delete("key").await);
        let fetched: Option<u32> = cache.get_json("key").await;
        assert_eq!(fetched, None);
    }

    #[test]
    fn test_tampered_entry_rejected() {
        let entry = CacheEntry::new(r#"{"original":"data"}"#.to_string(), 60);
        assert!(entry.is_valid());

        let mut tampered = entry;
        tampered.data = r#"{"tampered":"data"}"#.to_string();
        assert!(!tampered.is_valid());
    }
}
