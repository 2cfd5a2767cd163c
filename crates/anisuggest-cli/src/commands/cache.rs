//! Cache maintenance command implementation

use anisuggest_core::{Config, FileStore, SuggestCache};
use anyhow::Result;
use colored::Colorize;
use std::io::{self, Write};
use std::sync::Arc;

use crate::cli::CacheCommands;

/// High-level outcome produced by [`execute_cache`]. Useful for assertions in tests.
#[derive(Debug, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Stats were printed.
    Reported,
    /// Every entry was removed.
    Cleared { removed: usize },
    /// Stale entries were removed.
    Purged { removed: usize },
}

#[allow(clippy::cast_precision_loss)]
fn percent(used: u64, quota: u64) -> f64 {
    if quota == 0 {
        0.0
    } else {
        used as f64 * 100.0 / quota as f64
    }
}

/// Core cache implementation with an injectable writer to enable deterministic tests.
///
/// # Errors
///
/// Returns an error if the store cannot be read or written, or output fails.
pub async fn execute_cache<W: Write>(
    cache: &SuggestCache,
    action: CacheCommands,
    mut writer: W,
) -> Result<CacheOutcome> {
    match action {
        CacheCommands::Stats { json } => {
            let stats = cache.stats().await?;
            if json {
                serde_json::to_writer_pretty(&mut writer, &stats)?;
                writeln!(writer)?;
            } else {
                writeln!(writer, "{}", "Cache".bold())?;
                writeln!(writer, "  Records: {}", stats.records)?;
                writeln!(writer, "  Aliases: {}", stats.aliases)?;
                if stats.unknown > 0 {
                    writeln!(writer, "  Unknown: {}", stats.unknown.to_string().yellow())?;
                }
                writeln!(
                    writer,
                    "  Size:    {} / {} bytes ({:.1}%)",
                    stats.bytes_in_use,
                    stats.quota_bytes,
                    percent(stats.bytes_in_use, stats.quota_bytes)
                )?;
            }
            Ok(CacheOutcome::Reported)
        },
        CacheCommands::Clear => {
            let stats = cache.stats().await?;
            let removed = stats.records + stats.aliases + stats.unknown;
            if removed == 0 {
                writeln!(writer, "{} Cache is already empty", "ℹ".blue())?;
            } else {
                cache.remove_all().await?;
                writeln!(writer, "{} Removed {removed} entries", "✓".green())?;
            }
            Ok(CacheOutcome::Cleared { removed })
        },
        CacheCommands::Purge => {
            let removed = cache.purge_expired().await?;
            writeln!(writer, "{} Purged {removed} stale entries", "✓".green())?;
            Ok(CacheOutcome::Purged { removed })
        },
    }
}

/// Run a cache subcommand against the configured cache file.
///
/// # Errors
///
/// Returns an error if the cache file cannot be opened or the action fails.
pub async fn execute(config: &Config, action: CacheCommands) -> Result<()> {
    let store = FileStore::open(config.cache.store_path()?).await?;
    let cache = SuggestCache::new(Arc::new(store), config.cache.quota_bytes);
    execute_cache(&cache, action, io::stdout().lock()).await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anisuggest_core::{CacheRecord, CacheValue, KvStore, MemoryStore};
    use serde_json::json;
    use std::collections::BTreeMap;

    async fn seeded() -> (Arc<MemoryStore>, SuggestCache) {
        let store = Arc::new(MemoryStore::new());
        let cache = SuggestCache::new(store.clone(), 1_000_000);
        let mut entries = BTreeMap::new();
        entries.insert(
            "input:anime:oni".to_string(),
            CacheValue::Record(CacheRecord {
                suggestions: Vec::new(),
                site_link: "<dim>Search</dim>".into(),
                best: None,
                expires: i64::MAX,
            }),
        );
        entries.insert(
            "input:anime:o".to_string(),
            CacheValue::Alias("input:anime:oni".into()),
        );
        entries.insert("input:anime:x".to_string(), CacheValue::Alias("input:anime:gone".into()));
        cache.put(entries).await.unwrap();
        (store, cache)
    }

    #[tokio::test]
    async fn test_stats_json() {
        let (_store, cache) = seeded().await;
        let mut out = Vec::new();
        let outcome = execute_cache(&cache, CacheCommands::Stats { json: true }, &mut out)
            .await
            .unwrap();
        assert_eq!(outcome, CacheOutcome::Reported);
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["records"], 1);
        assert_eq!(value["aliases"], 2);
        assert_eq!(value["quota_bytes"], 1_000_000);
    }

    #[tokio::test]
    async fn test_stats_text_counts_unknown_values() {
        colored::control::set_override(false);
        let (store, cache) = seeded().await;
        let mut odd = BTreeMap::new();
        odd.insert("input:anime:weird".to_string(), json!(42));
        store.set(odd).await.unwrap();

        let mut out = Vec::new();
        execute_cache(&cache, CacheCommands::Stats { json: false }, &mut out)
            .await
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Records: 1"));
        assert!(text.contains("Unknown: 1"));
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let (store, cache) = seeded().await;
        let outcome = execute_cache(&cache, CacheCommands::Clear, Vec::new()).await.unwrap();
        assert_eq!(outcome, CacheOutcome::Cleared { removed: 3 });
        assert!(store.get_all().await.unwrap().is_empty());

        let again = execute_cache(&cache, CacheCommands::Clear, Vec::new()).await.unwrap();
        assert_eq!(again, CacheOutcome::Cleared { removed: 0 });
    }

    #[tokio::test]
    async fn test_purge_drops_dangling_alias() {
        let (store, cache) = seeded().await;
        let outcome = execute_cache(&cache, CacheCommands::Purge, Vec::new()).await.unwrap();
        assert_eq!(outcome, CacheOutcome::Purged { removed: 1 });
        let left = store.get_all().await.unwrap();
        assert!(left.contains_key("input:anime:o"));
        assert!(!left.contains_key("input:anime:x"));
    }

    #[test]
    fn test_percent_of_zero_quota() {
        assert!(percent(10, 0).abs() < f64::EPSILON);
        assert!((percent(50, 200) - 25.0).abs() < f64::EPSILON);
    }
}
