//! Observers of the views a session has open.
//!
//! Every rendered list page is its own view with its own [`QueryObserver`],
//! addressed by a [`ViewId`] that the page carries in its fragment URLs. Two
//! tabs on the same session therefore never discard each other's results;
//! only a newer key within the same view does.
//!
//! A newly opened view starts from a copy of the session's most recently
//! active view, so the previous results stay on screen while it loads.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tokio::sync::Mutex;
use uuid::Uuid;

use vehicle_manager_core::SessionToken;

use super::QueryObserver;

/// Identifier of one rendered view.
pub type ViewId = Uuid;

/// Views kept per session. Older ones are forgotten first.
const MAX_OPEN_VIEWS: usize = 16;

struct OpenViews<K, V> {
    /// Least recently active first.
    views: VecDeque<(ViewId, QueryObserver<K, V>)>,
}

impl<K: PartialEq + Clone, V: Clone> OpenViews<K, V> {
    const fn new() -> Self {
        Self {
            views: VecDeque::new(),
        }
    }

    fn push(&mut self, id: ViewId, observer: QueryObserver<K, V>) {
        if self.views.len() >= MAX_OPEN_VIEWS {
            self.views.pop_front();
        }
        self.views.push_back((id, observer));
    }

    /// Run `f` on the observer of `id` and mark the view most recently active.
    fn with<R>(
        &mut self,
        id: ViewId,
        keep_previous: bool,
        f: impl FnOnce(&mut QueryObserver<K, V>) -> R,
    ) -> R {
        let mut observer = self
            .views
            .iter()
            .position(|(view, _)| *view == id)
            .and_then(|index| self.views.remove(index))
            .map_or_else(|| QueryObserver::new(keep_previous), |(_, observer)| observer);
        let result = f(&mut observer);
        self.push(id, observer);
        result
    }
}

/// Per-session registry of view observers.
#[derive(Clone)]
pub struct ViewRegistry<K, V> {
    sessions: Cache<SessionToken, Arc<Mutex<OpenViews<K, V>>>>,
    keep_previous: bool,
}

impl<K, V> ViewRegistry<K, V>
where
    K: PartialEq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a registry for up to `capacity` sessions, forgetting sessions
    /// idle for `idle`.
    #[must_use]
    pub fn new(capacity: u64, idle: Duration, keep_previous: bool) -> Self {
        let sessions = Cache::builder()
            .max_capacity(capacity)
            .time_to_idle(idle)
            .build();

        Self {
            sessions,
            keep_previous,
        }
    }

    async fn open_views(&self, scope: &SessionToken) -> Arc<Mutex<OpenViews<K, V>>> {
        self.sessions
            .get_with_by_ref(scope, async { Arc::new(Mutex::new(OpenViews::new())) })
            .await
    }

    /// Open a new view, seeded from the session's most recently active one.
    pub async fn open(&self, scope: &SessionToken) -> ViewId {
        let id = Uuid::new_v4();
        let views = self.open_views(scope).await;
        let mut views = views.lock().await;

        let seed = views.views.back().map_or_else(
            || QueryObserver::new(self.keep_previous),
            |(_, latest)| latest.clone(),
        );
        views.push(id, seed);
        id
    }

    /// Run `f` on the observer of view `id`.
    ///
    /// A view the registry no longer knows starts over with a fresh observer.
    pub async fn update<R>(
        &self,
        scope: &SessionToken,
        id: ViewId,
        f: impl FnOnce(&mut QueryObserver<K, V>) -> R,
    ) -> R {
        let views = self.open_views(scope).await;
        let mut views = views.lock().await;
        views.with(id, self.keep_previous, f)
    }

    /// Forget every view of a session.
    pub async fn clear_scope(&self, scope: &SessionToken) {
        self.sessions.invalidate(scope).await;
    }
}
