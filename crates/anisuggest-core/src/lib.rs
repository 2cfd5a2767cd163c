//! # anisuggest-core
//!
//! Incremental, typo-tolerant search suggestions for a remote catalog
//! endpoint, with a local result cache keyed by normalized query text.
//!
//! ## Architecture
//!
//! One input change flows through the crate like this:
//!
//! ```text
//! raw text -> QueryParser -> SuggestCache (read) -> [miss] -> RequestScheduler
//!          -> SearchBackend -> rank::cook -> SuggestCache (write) -> SuggestOutcome
//! ```
//!
//! - **Normalization**: category selector and force marker parsing, sanitizing
//! - **Caching**: TTL expiry, prefix aliases, quota-driven eviction
//! - **Scheduling**: debounced, cancellable dispatch of one request at a time
//! - **Ranking**: weighting, ordering and markup of endpoint records
//! - **Coordination**: [`Suggester`] wires the above to input surface events
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use anisuggest_core::{Config, Suggester};
//!
//! # async fn run() -> anisuggest_core::Result<()> {
//! let config = Config::load()?;
//! let suggester = Suggester::open(&config).await?;
//!
//! if let Some(outcome) = suggester.on_input_changed("onizuka/c").await {
//!     for suggestion in &outcome.suggestions {
//!         println!("{} -> {}", suggestion.description, suggestion.content);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Nothing in the suggestion path fails loudly: network, payload and store
//! failures are logged and degrade to "no suggestions". [`Error`] surfaces
//! from construction, configuration and cache maintenance:
//!
//! ```rust
//! use anisuggest_core::{Config, Error};
//!
//! let mut config = Config::default();
//! config.cache.quota_bytes = 0;
//! match config.validate() {
//!     Err(Error::Config(msg)) => eprintln!("Config error: {}", msg),
//!     Err(e) if e.is_recoverable() => eprintln!("Recoverable error: {}", e),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

/// One-shot named timers for cache expiry
pub mod alarm;
/// Suggestion cache with aliases, expiry and eviction
pub mod cache;
/// Category selector registry
pub mod category;
/// Configuration loading and validation
pub mod config;
/// Error types and result aliases
pub mod error;
/// Markup escaping
pub mod escape;
/// HTTP client for the search endpoint
pub mod fetcher;
/// Partial input history
pub mod history;
/// Query normalization
pub mod normalize;
/// Ranking and formatting of endpoint records
pub mod rank;
/// Debounced request scheduling
pub mod scheduler;
/// Key/value stores backing the cache
pub mod store;
/// Input event coordination
pub mod suggest;
/// Core data types
pub mod types;

// Re-export commonly used types
pub use alarm::Alarms;
pub use cache::{CacheStats, CacheValue, RestoreReport, SuggestCache};
pub use category::{CategoryRegistry, WILDCARD_CATEGORY};
pub use config::{CacheConfig, Config, HeaderSetting, RequestConfig, SiteConfig};
pub use error::{Error, Result};
pub use escape::{escape, reescape, unescape};
pub use fetcher::{Fetcher, SearchBackend};
pub use history::PartialInputHistory;
pub use normalize::{Query, QueryParser};
pub use scheduler::{RequestScheduler, RequestState};
pub use store::{FileStore, KvStore, MemoryStore};
pub use suggest::{NullPresenter, Origin, Presenter, SuggestOutcome, Suggester};
pub use types::*;
