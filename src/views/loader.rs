//! Superseding request slot for view fetches.
//!
//! A view owns one `ViewLoader`. Starting a load aborts whatever load is
//! still in flight on the same loader, so only the most recently issued
//! request can ever deliver rows to the view.

use futures::future::{AbortHandle, Abortable};
use std::fmt::Debug;
use std::future::Future;
use std::sync::Mutex;
use tracing::debug;

struct InFlight<K> {
    key: K,
    generation: u64,
    handle: AbortHandle,
}

/// Keyed, cancellable request slot.
pub struct ViewLoader<K> {
    state: Mutex<LoaderState<K>>,
}

struct LoaderState<K> {
    generation: u64,
    in_flight: Option<InFlight<K>>,
}

impl<K: Debug> Default for ViewLoader<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Debug> ViewLoader<K> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LoaderState {
                generation: 0,
                in_flight: None,
            }),
        }
    }

    /// Run `request` for `key`, superseding any in-flight request.
    ///
    /// Returns `None` if this request was itself superseded before it
    /// completed.
    pub async fn load<F, T>(&self, key: K, request: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        let (handle, registration) = AbortHandle::new_pair();

        let generation = {
            let mut state = self.lock();
            state.generation += 1;
            let generation = state.generation;
            let previous = state.in_flight.replace(InFlight {
                key,
                generation,
                handle,
            });
            if let Some(previous) = previous {
                debug!("Superseding in-flight request {:?}", previous.key);
                previous.handle.abort();
            }
            generation
        };

        let result = Abortable::new(request, registration).await.ok();

        let mut state = self.lock();
        if state
            .in_flight
            .as_ref()
            .is_some_and(|f| f.generation == generation)
        {
            state.in_flight = None;
        }

        result
    }

    /// Key of the request currently in flight, if any.
    pub fn in_flight_key(&self) -> Option<K>
    where
        K: Clone,
    {
        self.lock().in_flight.as_ref().map(|f| f.key.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LoaderState<K>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
