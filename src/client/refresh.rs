//! Single-flight access-token refresh.
//!
//! The first caller to need a refresh starts it; everyone arriving while it is in flight
//! subscribes to the same shared future and receives the same result. The coordinator
//! keeps only a weak handle, so once every subscriber is dropped the refresh future is
//! dropped too and the next caller starts over.

use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use super::error::RefreshError;

type RefreshFuture = BoxFuture<'static, Result<String, RefreshError>>;

#[derive(Default)]
pub struct RefreshCoordinator {
    in_flight: Mutex<Option<WeakShared<RefreshFuture>>>,
    started: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins the refresh in flight, or runs `start` if there is none.
    ///
    /// `start` is only invoked when a new refresh actually begins.
    pub async fn refresh<F, Fut>(&self, start: F) -> Result<String, RefreshError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, RefreshError>> + Send + 'static,
    {
        let shared = self.subscribe(start);
        let result = shared.clone().await;

        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        let finished_is_current = slot
            .as_ref()
            .and_then(WeakShared::upgrade)
            .map_or(true, |current| current.ptr_eq(&shared));
        if finished_is_current {
            *slot = None;
        }
        result
    }

    fn subscribe<F, Fut>(&self, start: F) -> Shared<RefreshFuture>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, RefreshError>> + Send + 'static,
    {
        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = slot.as_ref().and_then(WeakShared::upgrade) {
            return current;
        }

        self.started.fetch_add(1, Ordering::SeqCst);
        let shared = start().boxed().shared();
        *slot = shared.downgrade();
        shared
    }

    /// Whether a refresh is currently in flight.
    pub fn is_refreshing(&self) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(WeakShared::upgrade)
            .is_some()
    }

    /// How many refreshes have been started over the coordinator's lifetime.
    pub fn refreshes_started(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }
}
