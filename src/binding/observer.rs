//! Observer handles and load state.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Where a binding is in its fetch lifecycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadState {
    /// Nothing fetched yet.
    Idle,
    /// First fetch in flight.
    Loading,
    Loaded,
    /// A later fetch is in flight; the previous value still stands.
    Reloading,
    /// The last fetch failed. `reloading` is true when a value from an
    /// earlier fetch is still being shown.
    Failed { message: String, reloading: bool },
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn is_reloading(&self) -> bool {
        matches!(self, LoadState::Reloading)
    }

    /// A fetched (or seeded) value is available.
    pub fn is_loaded(&self) -> bool {
        matches!(
            self,
            LoadState::Loaded | LoadState::Reloading | LoadState::Failed { reloading: true, .. }
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(self, LoadState::Failed { .. })
    }

    pub fn flags(&self) -> LoadFlags {
        LoadFlags {
            is_loading: self.is_loading(),
            is_reloading: self.is_reloading(),
            is_loaded: self.is_loaded(),
            is_reloading_error: matches!(self, LoadState::Failed { reloading: true, .. }),
        }
    }
}

/// Flattened view of [`LoadState`] for UI code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LoadFlags {
    pub is_loading: bool,
    pub is_reloading: bool,
    pub is_loaded: bool,
    pub is_reloading_error: bool,
}

/// Side of a binding an observer reports back to.
pub(crate) trait ObserverHost: Send + Sync {
    /// Drop one observer. Returns the pump task when this was the last one.
    fn detach(&self) -> Option<JoinHandle<()>>;
}

/// A live view onto a binding's value and load state.
///
/// The first observer of a binding starts it; when the last observer goes
/// away the binding releases its change stream. Dropping an observer detaches
/// it; [`Observer::unsubscribe`] does the same and also waits until the
/// stream has been released.
pub struct Observer<V> {
    value: watch::Receiver<V>,
    state: watch::Receiver<LoadState>,
    host: Option<Arc<dyn ObserverHost>>,
}

impl<V: Clone> Observer<V> {
    pub(crate) fn new(
        value: watch::Receiver<V>,
        state: watch::Receiver<LoadState>,
        host: Arc<dyn ObserverHost>,
    ) -> Self {
        Self {
            value,
            state,
            host: Some(host),
        }
    }

    /// Current value.
    pub fn value(&self) -> V {
        self.value.borrow().clone()
    }

    pub fn state(&self) -> LoadState {
        self.state.borrow().clone()
    }

    pub fn flags(&self) -> LoadFlags {
        self.state.borrow().flags()
    }

    /// Wait for the next value and return it.
    ///
    /// Returns `None` once the binding itself has been dropped.
    pub async fn changed(&mut self) -> Option<V> {
        self.value.changed().await.ok()?;
        Some(self.value.borrow_and_update().clone())
    }

    /// Wait until the value satisfies `predicate`, returning it.
    pub async fn wait_for(&mut self, mut predicate: impl FnMut(&V) -> bool) -> Option<V> {
        let value = self.value.wait_for(|v| predicate(v)).await.ok()?;
        Some(value.clone())
    }

    /// Wait until the load state satisfies `predicate`.
    pub async fn wait_for_state(
        &mut self,
        mut predicate: impl FnMut(&LoadState) -> bool,
    ) -> Option<LoadState> {
        let state = self.state.wait_for(|s| predicate(s)).await.ok()?;
        Some(state.clone())
    }

    /// Detach and wait for the change stream to be released if this was the
    /// last observer.
    pub async fn unsubscribe(mut self) {
        if let Some(task) = self.host.take().and_then(|host| host.detach()) {
            let _ = task.await;
        }
    }
}

impl<V> Drop for Observer<V> {
    fn drop(&mut self) {
        if let Some(host) = self.host.take() {
            // The pump finishes releasing on its own.
            let _ = host.detach();
        }
    }
}
