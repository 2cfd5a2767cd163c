//! The suggestion coordinator.
//!
//! [`Suggester`] reacts to the events of an input surface. On every input
//! change it normalizes the text, reads the cache and, on a miss, an expired
//! entry or a forced refresh, schedules a fetch through the
//! [`RequestScheduler`]. Fetched records are ranked, cached under the
//! canonical key together with aliases for the prefixes typed on the way, and
//! emitted.
//!
//! Each input change opens a session identified by a monotonic token. Only
//! the latest session may emit: a result that settles after newer input has
//! arrived is cached but returned as `None`.

use crate::cache::SuggestCache;
use crate::config::{Config, SiteConfig};
use crate::fetcher::{Fetcher, SearchBackend};
use crate::history::PartialInputHistory;
use crate::normalize::{Query, QueryParser};
use crate::rank::{self, RankContext};
use crate::scheduler::{RequestScheduler, RequestState};
use crate::store::FileStore;
use crate::types::{BestMatch, CookedData, Suggestion};
use crate::Result;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};
use url::Url;

/// Receives the best match of every emitted result set that has an image.
///
/// Stands in for a notification surface; rendering is the implementor's
/// concern.
pub trait Presenter: Send + Sync {
    /// Show supplementary media for `best`.
    fn present_best(&self, best: &BestMatch);
}

/// Presenter that shows nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn present_best(&self, _best: &BestMatch) {}
}

/// Where an emitted result set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Nothing to search for; only the default description applies.
    Idle,
    /// Served from a fresh cache entry.
    Cache,
    /// Fetched from the search endpoint.
    Network,
    /// The fetch failed; only the site-search line applies.
    Unavailable,
}

/// What the input surface should show after one input change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestOutcome {
    /// Session this outcome belongs to.
    pub token: u64,
    /// Source of the suggestions.
    pub origin: Origin,
    /// Default suggestion line.
    pub default_description: String,
    /// Ranked suggestions.
    pub suggestions: Vec<Suggestion>,
    /// Top-ranked record.
    pub best: Option<BestMatch>,
}

/// Coordinates normalization, caching, scheduling and ranking.
pub struct Suggester {
    parser: QueryParser,
    cache: SuggestCache,
    backend: Arc<dyn SearchBackend>,
    scheduler: RequestScheduler,
    presenter: Arc<dyn Presenter>,
    site: SiteConfig,
    site_url: Url,
    max_age: TimeDelta,
    session: AtomicU64,
    history: Mutex<PartialInputHistory>,
    description: Mutex<String>,
}

impl std::fmt::Debug for Suggester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Suggester")
            .field("site_url", &self.site_url.as_str())
            .field("session", &self.session.load(Ordering::SeqCst))
            .field("cache", &self.cache)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Suggester {
    /// Build a suggester over an existing cache and search backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured site URL or category registry is
    /// invalid.
    pub fn new(
        config: &Config,
        cache: SuggestCache,
        backend: Arc<dyn SearchBackend>,
    ) -> Result<Self> {
        let parser =
            QueryParser::new(config.categories.clone(), config.cache.key_prefix.clone())?;
        let site_url = config.site.site_url()?;
        let description = format!("Open <url>{site_url}</url>");
        Ok(Self {
            parser,
            cache,
            backend,
            scheduler: RequestScheduler::new(config.request.debounce()),
            presenter: Arc::new(NullPresenter),
            site: config.site.clone(),
            site_url,
            max_age: config.cache.max_age(),
            session: AtomicU64::new(0),
            history: Mutex::new(PartialInputHistory::new()),
            description: Mutex::new(description),
        })
    }

    /// Build a suggester with the durable file cache and the HTTP fetcher
    /// described by `config`, re-arming expiry of persisted entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the cache file
    /// cannot be opened.
    pub async fn open(config: &Config) -> Result<Self> {
        config.validate()?;
        let store = FileStore::open(config.cache.store_path()?).await?;
        let cache = SuggestCache::new(Arc::new(store), config.cache.quota_bytes);
        let report = cache.restore().await?;
        debug!("Cache restored: {:?}", report);
        let backend = Arc::new(Fetcher::from_config(config)?);
        Self::new(config, cache, backend)
    }

    /// Replace the presenter.
    #[must_use]
    pub fn with_presenter(mut self, presenter: Arc<dyn Presenter>) -> Self {
        self.presenter = presenter;
        self
    }

    /// The result cache.
    pub const fn cache(&self) -> &SuggestCache {
        &self.cache
    }

    /// The query parser.
    pub const fn parser(&self) -> &QueryParser {
        &self.parser
    }

    /// State of the latest request.
    pub fn request_state(&self) -> RequestState {
        self.scheduler.state()
    }

    /// Token of the latest session.
    pub fn current_token(&self) -> u64 {
        self.session.load(Ordering::SeqCst)
    }

    fn is_current(&self, token: u64) -> bool {
        self.current_token() == token
    }

    /// Description shown before any input: `Open <url>{site}</url>`.
    pub fn default_description(&self) -> String {
        format!("Open <url>{}</url>", self.site_url)
    }

    /// Description currently shown as the default suggestion.
    pub fn current_description(&self) -> String {
        lock(&self.description).clone()
    }

    fn set_description(&self, description: &str) {
        description.clone_into(&mut lock(&self.description));
    }

    /// Handle one input change.
    ///
    /// Returns `None` when newer input superseded this change before it
    /// settled.
    pub async fn on_input_changed(&self, raw: &str) -> Option<SuggestOutcome> {
        let token = self.session.fetch_add(1, Ordering::SeqCst) + 1;
        self.scheduler.abort();

        let query = self.parser.parse(raw);
        let partials = {
            let mut history = lock(&self.history);
            history.observe(&query.text);
            history.partials().to_vec()
        };

        if query.is_empty() {
            let description = self.default_description();
            self.set_description(&description);
            return Some(SuggestOutcome {
                token,
                origin: Origin::Idle,
                default_description: description,
                suggestions: Vec::new(),
                best: None,
            });
        }

        let site_link = rank::site_search_line(&query.text);
        self.set_description(&site_link);

        let cached = if query.force_refresh {
            debug!("Forced refresh of {}", query.cache_key);
            None
        } else {
            let now_ms = Utc::now().timestamp_millis();
            self.cache
                .get(&query.cache_key)
                .await
                .filter(|record| record.is_fresh(now_ms))
        };

        if !self.is_current(token) {
            return None;
        }
        if let Some(record) = cached {
            debug!("Cache hit for {}", query.cache_key);
            return Some(self.emit(token, Origin::Cache, record.into_data()));
        }

        debug!("Cache miss for {}", query.cache_key);
        self.fetch_and_store(token, &query, &site_link, &partials).await
    }

    async fn fetch_and_store(
        &self,
        token: u64,
        query: &Query,
        site_link: &str,
        partials: &[String],
    ) -> Option<SuggestOutcome> {
        let backend = Arc::clone(&self.backend);
        let category = query.category.clone();
        let text = query.text.clone();
        let fetched = self
            .scheduler
            .run(|| async move { backend.search(&category, &text).await })
            .await;

        let Some(items) = fetched else {
            return self.is_current(token).then(|| SuggestOutcome {
                token,
                origin: Origin::Unavailable,
                default_description: site_link.to_string(),
                suggestions: Vec::new(),
                best: None,
            });
        };

        let cooked = rank::cook(
            &RankContext {
                category: &query.category,
                text: &query.text,
                site_link,
                site_url: &self.site_url,
            },
            items,
        );

        let partial_keys: Vec<String> = partials
            .iter()
            .map(|partial| self.parser.cache_key(partial, &query.category_key))
            .collect();
        let expires = Utc::now()
            .checked_add_signed(self.max_age)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        if let Err(e) = self
            .cache
            .store_result(&query.cache_key, cooked.clone(), expires, &partial_keys)
            .await
        {
            warn!(category = e.category(), "Failed to cache {}: {}", query.cache_key, e);
        }

        if !self.is_current(token) {
            debug!("Dropping stale result for {}", query.cache_key);
            return None;
        }
        lock(&self.history).complete();
        info!(
            "{} suggestions for {:?} in {}",
            cooked.suggestions.len(),
            query.text,
            query.category
        );
        Some(self.emit(token, Origin::Network, cooked))
    }

    fn emit(&self, token: u64, origin: Origin, data: CookedData) -> SuggestOutcome {
        self.set_description(&data.site_link);
        if let Some(best) = data.best.as_ref().filter(|best| !best.image.is_empty()) {
            self.presenter.present_best(best);
        }
        SuggestOutcome {
            token,
            origin,
            default_description: data.site_link,
            suggestions: data.suggestions,
            best: data.best,
        }
    }

    /// Handle dismissal of the input surface: abort any pending request and
    /// close the current session.
    pub fn on_input_cancelled(&self) {
        self.session.fetch_add(1, Ordering::SeqCst);
        if self.scheduler.abort() {
            debug!("Input cancelled with a request pending");
        }
    }

    /// Navigation target for submitted text.
    ///
    /// Text starting with `http:` or `https:` is opened as is; other
    /// non-empty text opens the site search page; empty text opens the site
    /// root.
    pub fn on_input_entered(&self, raw: &str) -> String {
        let raw = raw.trim();
        if raw.starts_with("http:") || raw.starts_with("https:") {
            return raw.to_string();
        }
        let query = self.parser.parse(raw);
        if query.is_empty() {
            return self.site_url.to_string();
        }
        match self.site.search_page(&query.text) {
            Ok(url) => url.into(),
            Err(e) => {
                warn!("Falling back to site root: {}", e);
                self.site_url.to_string()
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::RawItem;
    use async_trait::async_trait;

    struct Empty;

    #[async_trait]
    impl SearchBackend for Empty {
        async fn search(&self, _category: &str, _text: &str) -> Result<Vec<RawItem>> {
            Ok(Vec::new())
        }
    }

    fn suggester() -> Suggester {
        let config = Config::default();
        let cache = SuggestCache::new(Arc::new(MemoryStore::new()), config.cache.quota_bytes);
        Suggester::new(&config, cache, Arc::new(Empty)).unwrap()
    }

    #[test]
    fn test_default_description() {
        let s = suggester();
        assert_eq!(s.default_description(), "Open <url>https://anidb.net/</url>");
        assert_eq!(s.current_description(), s.default_description());
    }

    #[test]
    fn test_on_input_entered() {
        let s = suggester();
        assert_eq!(s.on_input_entered("https://example.com/x"), "https://example.com/x");
        assert_eq!(s.on_input_entered("http:whatever"), "http:whatever");
        assert_eq!(
            s.on_input_entered("cowboy bebop/c!"),
            "https://anidb.net/perl-bin/animedb.pl?show=search&do.search=search&adb.search=cowboy+bebop"
        );
        assert_eq!(s.on_input_entered("   "), "https://anidb.net/");
        assert_eq!(s.on_input_entered("?!"), "https://anidb.net/");
    }

    #[tokio::test]
    async fn test_empty_input_shows_default() {
        let s = suggester();
        let outcome = s.on_input_changed("  ").await.unwrap();
        assert_eq!(outcome.origin, Origin::Idle);
        assert_eq!(outcome.default_description, s.default_description());
        assert!(outcome.suggestions.is_empty());
        assert_eq!(s.request_state(), RequestState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_site_link_becomes_default() {
        let s = suggester();
        let outcome = s.on_input_changed("zzz").await.unwrap();
        assert_eq!(outcome.origin, Origin::Network);
        assert_eq!(
            s.current_description(),
            "<dim>Search for <match>zzz</match> on site.</dim>"
        );
    }
}
