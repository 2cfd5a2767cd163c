//! One-shot named timers on the tokio runtime.
//!
//! Each alarm is identified by a name (the cache key it expires). Scheduling
//! a name that already has a pending alarm replaces it.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tracing::debug;

type Timers = HashMap<String, (u64, JoinHandle<()>)>;

/// Named one-shot timers.
#[derive(Debug, Default)]
pub struct Alarms {
    timers: Arc<Mutex<Timers>>,
    next_id: AtomicU64,
}

fn lock(timers: &Mutex<Timers>) -> MutexGuard<'_, Timers> {
    timers.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Alarms {
    /// Create an empty alarm set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `on_fire(name)` at `at`, replacing any pending alarm with the same name.
    ///
    /// A time in the past fires on the next runtime tick. Must be called from
    /// within a tokio runtime.
    pub fn schedule<F, Fut>(&self, name: &str, at: DateTime<Utc>, on_fire: F)
    where
        F: FnOnce(String) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let delay = (at - Utc::now()).to_std().unwrap_or_default();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let timers = Arc::clone(&self.timers);
        let owned = name.to_string();

        // Held until the handle is registered so an immediately firing task
        // cannot miss its own entry.
        let mut map = lock(&self.timers);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut map = lock(&timers);
                if map.get(&owned).is_some_and(|(current, _)| *current == id) {
                    map.remove(&owned);
                }
            }
            debug!("Alarm fired: {}", owned);
            on_fire(owned).await;
        });

        if let Some((_, previous)) = map.insert(name.to_string(), (id, handle)) {
            previous.abort();
        }
    }

    /// Cancel a pending alarm. Returns whether one was pending.
    pub fn cancel(&self, name: &str) -> bool {
        lock(&self.timers)
            .remove(name)
            .map(|(_, handle)| handle.abort())
            .is_some()
    }

    /// Cancel every pending alarm.
    pub fn cancel_all(&self) {
        for (_, (_, handle)) in lock(&self.timers).drain() {
            handle.abort();
        }
    }

    /// Whether an alarm with this name is pending.
    pub fn is_pending(&self, name: &str) -> bool {
        lock(&self.timers).contains_key(name)
    }

    /// Number of pending alarms.
    pub fn pending(&self) -> usize {
        lock(&self.timers).len()
    }
}

impl Drop for Alarms {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
