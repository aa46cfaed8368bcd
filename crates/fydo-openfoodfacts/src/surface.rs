//! Last-write-wins cancellation for one query surface.
//!
//! A surface is anything that shows the result of at most one query at a
//! time (a search box, a product detail pane). Starting a query on a surface
//! fires the cancel signal of the query already in flight there; the older
//! future is dropped, which aborts its HTTP request, and its caller receives
//! `None`. Only the newest query's output is ever applied to the surface's
//! visible state.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

struct SurfaceState<S> {
    generation: u64,
    cancel: Option<oneshot::Sender<()>>,
    visible: S,
}

/// Visible state `S` guarded by a per-query generation counter.
pub struct QuerySurface<S> {
    inner: Mutex<SurfaceState<S>>,
}

impl<S: Default> Default for QuerySurface<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S> QuerySurface<S> {
    #[must_use]
    pub fn new(initial: S) -> Self {
        Self {
            inner: Mutex::new(SurfaceState {
                generation: 0,
                cancel: None,
                visible: initial,
            }),
        }
    }

    /// Runs `query` as the surface's current query.
    ///
    /// Returns `Some(apply(visible, output))` when the query finished while
    /// still current. Returns `None` when a newer query on this surface (or
    /// [`Self::cancel`]) superseded it; in that case the query future is
    /// dropped before completion and `apply` is never called.
    pub async fn run<T, R, Fut, F>(&self, query: Fut, apply: F) -> Option<R>
    where
        Fut: Future<Output = T>,
        F: FnOnce(&mut S, T) -> R,
    {
        self.run_prepared(|_| {}, query, apply).await
    }

    /// Like [`Self::run`], but first applies `prepare` to the visible state
    /// under the same lock that registers the query. Anything reading the
    /// surface afterwards sees the prepared state until the query resolves.
    pub async fn run_prepared<T, R, Fut, P, F>(&self, prepare: P, query: Fut, apply: F) -> Option<R>
    where
        Fut: Future<Output = T>,
        P: FnOnce(&mut S),
        F: FnOnce(&mut S, T) -> R,
    {
        let (generation, cancelled) = self.begin(prepare);

        let output = tokio::select! {
            biased;
            _ = cancelled => {
                tracing::debug!(generation, "query superseded before completion");
                return None;
            }
            output = query => output,
        };

        let mut state = self.lock();
        if state.generation != generation {
            return None;
        }
        state.cancel = None;
        Some(apply(&mut state.visible, output))
    }

    /// Cancels the in-flight query, if any. Used on teardown.
    pub fn cancel(&self) {
        let mut state = self.lock();
        state.generation = state.generation.wrapping_add(1);
        if let Some(previous) = state.cancel.take() {
            // The receiver is gone once its query has already finished.
            let _ = previous.send(());
        }
    }

    /// Reads the visible state.
    pub fn with_visible<R>(&self, read: impl FnOnce(&S) -> R) -> R {
        read(&self.lock().visible)
    }

    /// `true` while a query started on this surface has neither finished nor
    /// been cancelled.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.lock().cancel.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    fn begin(&self, prepare: impl FnOnce(&mut S)) -> (u64, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        let mut state = self.lock();
        state.generation = state.generation.wrapping_add(1);
        if let Some(previous) = state.cancel.replace(tx) {
            let _ = previous.send(());
        }
        prepare(&mut state.visible);
        (state.generation, rx)
    }

    fn lock(&self) -> MutexGuard<'_, SurfaceState<S>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
