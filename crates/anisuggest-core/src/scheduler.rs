//! Debounced, cancellable dispatch of one request at a time.
//!
//! Every call to [`RequestScheduler::run`] aborts whatever the previous call
//! left scheduled or in flight, waits out the debounce delay and only then
//! runs its operation. Rapid keystrokes therefore coalesce into one request
//! for the text that settled last.
//!
//! ```text
//! Idle -> Scheduled -> InFlight -> Completed
//!             \            \
//!              +------------+---> Aborted
//! ```

use crate::Result;
use futures::future::{AbortHandle, Abortable};
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// Lifecycle of the latest request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Nothing has been scheduled yet.
    Idle,
    /// Waiting out the debounce delay.
    Scheduled,
    /// Operation running.
    InFlight,
    /// Operation settled, successfully or not.
    Completed,
    /// Aborted before settling.
    Aborted,
}

#[derive(Debug)]
struct Inner {
    generation: u64,
    abort: Option<AbortHandle>,
    state: RequestState,
}

/// Debouncing scheduler allowing at most one live request.
#[derive(Debug)]
pub struct RequestScheduler {
    debounce: Duration,
    inner: Mutex<Inner>,
}

impl RequestScheduler {
    /// Create a scheduler that waits `debounce` before every dispatch.
    pub const fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            inner: Mutex::new(Inner {
                generation: 0,
                abort: None,
                state: RequestState::Idle,
            }),
        }
    }

    /// The cool-down applied before dispatch.
    pub const fn debounce(&self) -> Duration {
        self.debounce
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// State of the latest request.
    pub fn state(&self) -> RequestState {
        self.lock().state
    }

    /// Abort the live request, if any. Returns whether one was live.
    pub fn abort(&self) -> bool {
        let mut inner = self.lock();
        match inner.abort.take() {
            Some(handle) => {
                handle.abort();
                inner.state = RequestState::Aborted;
                debug!("Aborted pending request");
                true
            },
            None => false,
        }
    }

    fn set_state_if_current(&self, generation: u64, state: RequestState) {
        let mut inner = self.lock();
        if inner.generation == generation {
            inner.state = state;
        }
    }

    /// Debounce, then run `op`.
    ///
    /// Resolves to `None` when the request is aborted (by a newer call or by
    /// [`abort`](Self::abort)) or when `op` fails; failures are logged, never
    /// propagated.
    pub async fn run<T, F, Fut>(&self, op: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let (handle, registration) = AbortHandle::new_pair();
        let generation = {
            let mut inner = self.lock();
            if let Some(previous) = inner.abort.replace(handle) {
                previous.abort();
                debug!("Superseded pending request");
            }
            inner.generation += 1;
            inner.state = RequestState::Scheduled;
            inner.generation
        };

        let debounce = self.debounce;
        let work = async {
            tokio::time::sleep(debounce).await;
            self.set_state_if_current(generation, RequestState::InFlight);
            op().await
        };
        let outcome = Abortable::new(work, registration).await;

        let mut inner = self.lock();
        let current = inner.generation == generation;
        if current {
            inner.abort = None;
        }
        match outcome {
            Err(_aborted) => {
                if current {
                    inner.state = RequestState::Aborted;
                }
                None
            },
            Ok(Err(e)) => {
                if current {
                    inner.state = RequestState::Completed;
                }
                warn!(category = e.category(), "Request failed: {}", e);
                None
            },
            Ok(Ok(value)) => {
                if current {
                    inner.state = RequestState::Completed;
                }
                Some(value)
            },
        }
    }
}
