//! Suggestion cache with TTL expiry, prefix aliases and quota eviction.
//!
//! A key holds either a [`CacheRecord`] or an alias: a bare string naming the
//! canonical key whose record it stands for. Aliases are always written in
//! the same batch as their canonical record and always point at a record, so
//! a read follows at most one hop.
//!
//! Two mechanisms remove entries:
//!
//! - an expiry alarm per canonical key removes it at its `expires` time,
//!   orphaning its aliases (a dangling alias reads as a miss);
//! - after every write, if the store exceeds half the quota, the oldest half
//!   of all entries by expiry is evicted. Aliases rank as younger than any
//!   record so they outlive their target rather than the other way round.

use crate::alarm::Alarms;
use crate::store::KvStore;
use crate::types::{CacheRecord, CookedData};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A stored cache value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CacheValue {
    /// Redirect to the canonical key holding the record.
    Alias(String),
    /// A cooked result.
    Record(CacheRecord),
}

/// Entry counts and size of the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Result records.
    pub records: usize,
    /// Prefix aliases.
    pub aliases: usize,
    /// Values of unexpected shape.
    pub unknown: usize,
    /// Bytes in use.
    pub bytes_in_use: u64,
    /// Configured quota in bytes.
    pub quota_bytes: u64,
}

/// Outcome of re-arming a persisted cache at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Entries removed because they had already expired or dangled.
    pub purged: usize,
    /// Expiry alarms armed for surviving records.
    pub armed: usize,
}

/// Cache over a [`KvStore`].
pub struct SuggestCache {
    store: Arc<dyn KvStore>,
    alarms: Alarms,
    quota_bytes: u64,
}

impl std::fmt::Debug for SuggestCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuggestCache")
            .field("quota_bytes", &self.quota_bytes)
            .field("pending_alarms", &self.alarms.pending())
            .finish_non_exhaustive()
    }
}

/// Position of a stored value in eviction order; lower goes first.
fn eviction_rank(value: &Value) -> i64 {
    match value {
        Value::String(_) => i64::MAX,
        Value::Object(map) => map
            .get("expires")
            .and_then(Value::as_i64)
            .unwrap_or(i64::MIN),
        _ => i64::MIN,
    }
}

impl SuggestCache {
    /// Wrap `store`, evicting once it exceeds half of `quota_bytes`.
    pub fn new(store: Arc<dyn KvStore>, quota_bytes: u64) -> Self {
        Self {
            store,
            alarms: Alarms::new(),
            quota_bytes,
        }
    }

    /// The configured quota.
    pub const fn quota_bytes(&self) -> u64 {
        self.quota_bytes
    }

    /// Whether an expiry alarm is pending for `key`.
    pub fn has_expiry_alarm(&self, key: &str) -> bool {
        self.alarms.is_pending(key)
    }

    async fn read_value(&self, key: &str) -> Option<CacheValue> {
        let raw = match self.store.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(category = e.category(), "Cache read failed for {}: {}", key, e);
                return None;
            },
        };
        match serde_json::from_value(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Ignoring cache value of unexpected shape at {}: {}", key, e);
                None
            },
        }
    }

    /// Read `key`, following an alias one hop.
    ///
    /// Missing keys, dangling aliases, alias-to-alias chains and malformed
    /// values all read as a miss.
    pub async fn get(&self, key: &str) -> Option<CacheRecord> {
        match self.read_value(key).await? {
            CacheValue::Record(record) => Some(record),
            CacheValue::Alias(target) => match self.read_value(&target).await {
                Some(CacheValue::Record(record)) => {
                    debug!("Cache alias {} -> {}", key, target);
                    Some(record)
                },
                _ => {
                    debug!("Dangling cache alias {} -> {}", key, target);
                    None
                },
            },
        }
    }

    /// Upsert a batch in one store write, then enforce the quota.
    ///
    /// Returns the number of entries evicted by the quota check.
    pub async fn put(&self, entries: BTreeMap<String, CacheValue>) -> Result<usize> {
        let mut batch = BTreeMap::new();
        for (key, value) in entries {
            batch.insert(key, serde_json::to_value(value)?);
        }
        self.store.set(batch).await?;
        self.enforce_quota().await
    }

    /// Write a fetched result under `canonical`, alias every partial key to
    /// it, and arm its expiry alarm.
    pub async fn store_result(
        &self,
        canonical: &str,
        data: CookedData,
        expires: DateTime<Utc>,
        partial_keys: &[String],
    ) -> Result<CacheRecord> {
        let record = CacheRecord::new(data, expires.timestamp_millis());

        let mut batch = BTreeMap::new();
        for partial in partial_keys.iter().filter(|k| k.as_str() != canonical) {
            batch.insert(partial.clone(), CacheValue::Alias(canonical.to_string()));
        }
        let aliases = batch.len();
        batch.insert(canonical.to_string(), CacheValue::Record(record.clone()));

        self.put(batch).await?;
        self.arm_expiry(canonical, expires);
        debug!("Cached {} with {} aliases", canonical, aliases);
        Ok(record)
    }

    fn arm_expiry(&self, key: &str, at: DateTime<Utc>) {
        let store = Arc::clone(&self.store);
        self.alarms.schedule(key, at, move |name| async move {
            match store.remove(std::slice::from_ref(&name)).await {
                Ok(()) => debug!("Expired cache entry {}", name),
                Err(e) => warn!("Failed to expire cache entry {}: {}", name, e),
            }
        });
    }

    /// Remove keys and their pending expiry alarms.
    pub async fn remove(&self, keys: &[String]) -> Result<()> {
        for key in keys {
            self.alarms.cancel(key);
        }
        self.store.remove(keys).await
    }

    /// Remove everything.
    pub async fn remove_all(&self) -> Result<()> {
        self.alarms.cancel_all();
        self.store.clear().await
    }

    /// Bytes currently in use.
    pub async fn size_in_bytes(&self) -> Result<u64> {
        self.store.bytes_in_use().await
    }

    /// Evict the oldest half when the store exceeds half the quota.
    pub async fn enforce_quota(&self) -> Result<usize> {
        let size = self.size_in_bytes().await?;
        if size > self.quota_bytes / 2 {
            self.evict_oldest_half().await
        } else {
            Ok(0)
        }
    }

    /// Remove the oldest half of all entries ranked by expiry.
    pub async fn evict_oldest_half(&self) -> Result<usize> {
        let all = self.store.get_all().await?;
        let total = all.len();
        let mut ranked: Vec<(i64, String)> = all
            .iter()
            .map(|(key, value)| (eviction_rank(value), key.clone()))
            .collect();
        ranked.sort_by_key(|(rank, _)| *rank);

        let victims: Vec<String> = ranked
            .into_iter()
            .take(total / 2)
            .map(|(_, key)| key)
            .collect();
        let evicted = victims.len();
        if evicted > 0 {
            self.remove(&victims).await?;
            info!("Evicted {} of {} cache entries over quota", evicted, total);
        }
        Ok(evicted)
    }

    /// Remove records expired at `now` and aliases left dangling.
    pub async fn purge_expired_at(&self, now: DateTime<Utc>) -> Result<usize> {
        let now_ms = now.timestamp_millis();
        let all = self.store.get_all().await?;

        let mut live_records = BTreeSet::new();
        let mut doomed = Vec::new();
        let mut aliases = Vec::new();
        for (key, raw) in &all {
            match serde_json::from_value::<CacheValue>(raw.clone()) {
                Ok(CacheValue::Record(record)) if record.is_fresh(now_ms) => {
                    live_records.insert(key.clone());
                },
                Ok(CacheValue::Alias(target)) => aliases.push((key.clone(), target)),
                Ok(CacheValue::Record(_)) | Err(_) => doomed.push(key.clone()),
            }
        }
        doomed.extend(
            aliases
                .into_iter()
                .filter(|(_, target)| !live_records.contains(target))
                .map(|(key, _)| key),
        );

        if !doomed.is_empty() {
            self.remove(&doomed).await?;
            info!("Purged {} expired cache entries", doomed.len());
        }
        Ok(doomed.len())
    }

    /// Remove records that have expired by now.
    pub async fn purge_expired(&self) -> Result<usize> {
        self.purge_expired_at(Utc::now()).await
    }

    /// Purge stale entries of a persisted cache and re-arm expiry alarms for
    /// the surviving records.
    pub async fn restore(&self) -> Result<RestoreReport> {
        let purged = self.purge_expired().await?;
        let mut armed = 0;
        for (key, raw) in self.store.get_all().await? {
            if let Ok(CacheValue::Record(record)) = serde_json::from_value::<CacheValue>(raw) {
                if let Some(at) = DateTime::<Utc>::from_timestamp_millis(record.expires) {
                    self.arm_expiry(&key, at);
                    armed += 1;
                }
            }
        }
        debug!("Restored cache: {} purged, {} alarms armed", purged, armed);
        Ok(RestoreReport { purged, armed })
    }

    /// Count entries by kind.
    pub async fn stats(&self) -> Result<CacheStats> {
        let all = self.store.get_all().await?;
        let mut stats = CacheStats {
            records: 0,
            aliases: 0,
            unknown: 0,
            bytes_in_use: self.size_in_bytes().await?,
            quota_bytes: self.quota_bytes,
        };
        for raw in all.into_values() {
            match serde_json::from_value::<CacheValue>(raw) {
                Ok(CacheValue::Record(_)) => stats.records += 1,
                Ok(CacheValue::Alias(_)) => stats.aliases += 1,
                Err(_) => stats.unknown += 1,
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::{BestMatch, Suggestion};
    use serde_json::json;

    fn cooked(name: &str) -> CookedData {
        CookedData {
            suggestions: vec![Suggestion {
                content: format!("https://anidb.net/{name}"),
                description: format!("<url>{name}</url>"),
            }],
            site_link: format!("Search for {name}"),
            best: Some(BestMatch {
                title: name.to_string(),
                text: "Character".to_string(),
                note: "9.1".to_string(),
                image: String::new(),
            }),
        }
    }

    fn cache_with_quota(quota: u64) -> (SuggestCache, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let cache = SuggestCache::new(store.clone(), quota);
        (cache, store)
    }

    fn in_a_week() -> DateTime<Utc> {
        Utc::now() + chrono::Duration::days(7)
    }

    #[tokio::test]
    async fn test_alias_chain_resolves_one_hop() {
        let (cache, _) = cache_with_quota(5_242_880);
        let partials: Vec<String> = ["o", "on", "oni", "oniz", "onizu"]
            .iter()
            .map(|p| format!("input:{p}"))
            .collect();

        let stored = cache
            .store_result("input:onizuka", cooked("Onizuka"), in_a_week(), &partials)
            .await
            .unwrap();

        for key in &partials {
            assert_eq!(cache.get(key).await.as_ref(), Some(&stored), "{key}");
        }
        assert_eq!(cache.get("input:onizuka").await, Some(stored));
        assert!(cache.has_expiry_alarm("input:onizuka"));
    }

    #[tokio::test]
    async fn test_dangling_alias_is_a_miss() {
        let (cache, _) = cache_with_quota(5_242_880);
        cache
            .put(BTreeMap::from([(
                "input:o".to_string(),
                CacheValue::Alias("input:gone".to_string()),
            )]))
            .await
            .unwrap();
        assert!(cache.get("input:o").await.is_none());
    }

    #[tokio::test]
    async fn test_alias_to_alias_is_not_followed() {
        let (cache, _) = cache_with_quota(5_242_880);
        cache
            .store_result("input:bebop", cooked("Bebop"), in_a_week(), &[])
            .await
            .unwrap();
        cache
            .put(BTreeMap::from([
                ("input:b".to_string(), CacheValue::Alias("input:be".to_string())),
                ("input:be".to_string(), CacheValue::Alias("input:bebop".to_string())),
            ]))
            .await
            .unwrap();

        assert!(cache.get("input:be").await.is_some());
        assert!(cache.get("input:b").await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_value_is_a_miss() {
        let (cache, store) = cache_with_quota(5_242_880);
        store
            .set(BTreeMap::from([("input:x".to_string(), json!({"weird": true}))]))
            .await
            .unwrap();
        assert!(cache.get("input:x").await.is_none());
        assert_eq!(cache.stats().await.unwrap().unknown, 1);
    }

    #[tokio::test]
    async fn test_quota_evicts_oldest_half() {
        let (cache, store) = cache_with_quota(8_000);
        let base = Utc::now() + chrono::Duration::days(1);

        let mut inserted = Vec::new();
        let evicted = loop {
            let i = inserted.len();
            let key = format!("input:query{i:03}");
            let expires = base + chrono::Duration::seconds(i64::try_from(i).unwrap());
            let record = CacheRecord::new(cooked(&key), expires.timestamp_millis());
            let count_before = store.get_all().await.unwrap().len();
            let evicted = cache
                .put(BTreeMap::from([(key.clone(), CacheValue::Record(record))]))
                .await
                .unwrap();
            inserted.push(key);
            if evicted > 0 {
                break (count_before + 1, evicted);
            }
            assert!(inserted.len() < 1_000, "quota never exceeded");
        };

        let (count_at_write, removed) = evicted;
        assert_eq!(removed, count_at_write / 2);

        let remaining = store.get_all().await.unwrap();
        assert_eq!(remaining.len(), count_at_write - count_at_write / 2);
        let newest = &inserted[inserted.len() - remaining.len()..];
        for key in newest {
            assert!(remaining.contains_key(key), "{key} should survive");
        }
        assert!(cache.size_in_bytes().await.unwrap() < cache.quota_bytes());
    }

    #[tokio::test]
    async fn test_eviction_keeps_aliases_after_records() {
        let (cache, store) = cache_with_quota(u64::MAX);
        let soon = Utc::now() + chrono::Duration::hours(1);
        cache
            .store_result("input:aa", cooked("aa"), soon, &["input:a".to_string()])
            .await
            .unwrap();
        cache
            .store_result("input:bb", cooked("bb"), soon + chrono::Duration::hours(1), &[])
            .await
            .unwrap();

        // 3 entries: the two records are older than the alias
        assert_eq!(cache.evict_oldest_half().await.unwrap(), 1);
        let remaining = store.get_all().await.unwrap();
        assert!(remaining.contains_key("input:a"));
        assert!(remaining.contains_key("input:bb"));
        assert!(!cache.has_expiry_alarm("input:aa"));
        assert!(cache.get("input:a").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_alarm_removes_record() {
        let (cache, store) = cache_with_quota(5_242_880);
        let at = Utc::now() + chrono::Duration::seconds(30);
        cache
            .store_result("input:bebop", cooked("Bebop"), at, &["input:b".to_string()])
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_secs(31)).await;
        // let the alarm task finish its removal
        tokio::task::yield_now().await;

        assert!(store.get("input:bebop").await.unwrap().is_none());
        assert!(cache.get("input:b").await.is_none());
    }

    #[tokio::test]
    async fn test_purge_and_restore() {
        let (cache, store) = cache_with_quota(5_242_880);
        let past = Utc::now() - chrono::Duration::seconds(5);
        let stale = CacheRecord::new(cooked("old"), past.timestamp_millis());
        cache
            .put(BTreeMap::from([
                ("input:old".to_string(), CacheValue::Record(stale)),
                ("input:o".to_string(), CacheValue::Alias("input:old".to_string())),
            ]))
            .await
            .unwrap();
        cache
            .store_result("input:new", cooked("new"), in_a_week(), &["input:n".to_string()])
            .await
            .unwrap();

        let report = cache.restore().await.unwrap();
        assert_eq!(report.purged, 2);
        assert_eq!(report.armed, 1);

        let remaining = store.get_all().await.unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(cache.get("input:n").await.is_some());
    }

    #[tokio::test]
    async fn test_remove_all() {
        let (cache, _) = cache_with_quota(5_242_880);
        cache
            .store_result("input:x", cooked("x"), in_a_week(), &[])
            .await
            .unwrap();
        cache.remove_all().await.unwrap();

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.records, 0);
        assert_eq!(stats.bytes_in_use, 0);
        assert!(!cache.has_expiry_alarm("input:x"));
    }
}
