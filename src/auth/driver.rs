//! Reactive guard evaluation: watch (snapshot, path), navigate when told.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

use crate::guard::{self, Destination};
use crate::model::AuthSnapshot;

/// Performs navigation. Assumed infallible.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

impl<N: Navigator + ?Sized> Navigator for Arc<N> {
    fn navigate(&self, path: &str) {
        (**self).navigate(path);
    }
}

// =============================================================================
// PATH ROUTER
// =============================================================================

/// In-memory router. The current path is a `watch` channel so a
/// [`GuardDriver`] can react to it.
#[derive(Clone)]
pub struct PathRouter {
    tx: Arc<watch::Sender<String>>,
    history: Arc<Mutex<Vec<String>>>,
}

impl PathRouter {
    #[must_use]
    pub fn new(initial: &str) -> Self {
        let (tx, _) = watch::channel(initial.to_owned());
        Self { tx: Arc::new(tx), history: Arc::new(Mutex::new(vec![initial.to_owned()])) }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> String {
        self.tx.borrow().clone()
    }

    /// Every path visited, oldest first, including the initial one.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// User-initiated navigation (link click, address bar).
    pub fn set(&self, path: &str) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_owned());
        self.tx.send_replace(path.to_owned());
    }
}

impl Navigator for PathRouter {
    fn navigate(&self, path: &str) {
        tracing::info!(from = %self.current(), to = path, "guard redirect");
        self.set(path);
    }
}

// =============================================================================
// GUARD DRIVER
// =============================================================================

/// Runs [`guard::decide`] on every input change and forwards the result.
pub struct GuardDriver<N> {
    navigator: N,
    last_issued: Option<(String, Destination)>,
}

impl<N: Navigator> GuardDriver<N> {
    #[must_use]
    pub fn new(navigator: N) -> Self {
        Self { navigator, last_issued: None }
    }

    /// Evaluate once. Returns the destination navigated to, if a call was made.
    ///
    /// The same (path, destination) pair is not navigated twice in a row;
    /// a "stay" decision resets that memory.
    pub fn evaluate(&mut self, path: &str, snapshot: &AuthSnapshot) -> Option<Destination> {
        let path = guard::normalize(path);
        let Some(destination) = guard::decide(path, snapshot) else {
            self.last_issued = None;
            return None;
        };
        if self
            .last_issued
            .as_ref()
            .is_some_and(|(p, d)| p == path && *d == destination)
        {
            tracing::debug!(path, ?destination, "redirect already issued");
            return None;
        }
        self.last_issued = Some((path.to_owned(), destination));
        self.navigator.navigate(destination.path());
        Some(destination)
    }

    /// Evaluate now and after every change to either input.
    /// Returns when either sender is dropped.
    pub async fn run(mut self, mut snapshots: watch::Receiver<AuthSnapshot>, mut paths: watch::Receiver<String>) {
        loop {
            let snapshot = snapshots.borrow_and_update().clone();
            let path = paths.borrow_and_update().clone();
            self.evaluate(&path, &snapshot);

            tokio::select! {
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                changed = paths.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        tracing::debug!("guard driver stopped");
    }
}

#[cfg(test)]
#[path = "driver_test.rs"]
mod tests;
