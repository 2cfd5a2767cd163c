//! Submitting the input

use anisuggest_core::{Config, Fetcher, MemoryStore, SuggestCache, Suggester};
use anyhow::Result;
use std::sync::Arc;

/// Print the URL that submitting `text` would navigate to.
///
/// Nothing is fetched, so a throwaway in-memory cache is enough.
///
/// # Errors
///
/// Returns an error if the configuration is invalid.
pub fn execute(config: &Config, text: &str) -> Result<()> {
    let cache = SuggestCache::new(Arc::new(MemoryStore::new()), config.cache.quota_bytes);
    let backend = Arc::new(Fetcher::from_config(config)?);
    let suggester = Suggester::new(config, cache, backend)?;
    println!("{}", suggester.on_input_entered(text));
    Ok(())
}
