//! Paginated feed loader with stale-response suppression
//!
//! Responses are applied in request order, not arrival order: every call
//! takes a ticket before awaiting the network, and a response is applied only
//! if its ticket is still the latest one issued. Superseded requests are not
//! cancelled; their result is dropped on arrival.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::{EngagementApi, FeedScope, PostsQuery};
use crate::error::{EngagementError, EngagementResult};
use crate::metrics::{EngagementMetrics, PageMetric};
use crate::services::surfaces::ViewSurface;
use crate::store::PostStore;

#[derive(Debug, Default)]
struct PageState {
    /// Monotonic request sequence; the last issued ticket
    latest_ticket: u64,
    requested_page: u32,
    loaded_page: u32,
    total_pages: Option<u32>,
    in_flight: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Applied {
        page: u32,
        received: usize,
        has_more: bool,
    },
    /// A newer request was issued while this one was in flight
    Stale { page: u32, superseded_by: u32 },
}

impl PageOutcome {
    pub fn is_stale(&self) -> bool {
        matches!(self, PageOutcome::Stale { .. })
    }
}

pub struct FeedLoader<A: EngagementApi + ?Sized> {
    api: Arc<A>,
    store: Arc<PostStore>,
    surface: Arc<ViewSurface>,
    scope: FeedScope,
    limit: u32,
    state: Mutex<PageState>,
    apply: Mutex<()>,
}

impl<A: EngagementApi + ?Sized> FeedLoader<A> {
    pub fn new(
        api: Arc<A>,
        store: Arc<PostStore>,
        surface: Arc<ViewSurface>,
        scope: FeedScope,
        limit: u32,
    ) -> Self {
        Self {
            api,
            store,
            surface,
            scope,
            limit: limit.max(1),
            state: Mutex::new(PageState::default()),
            apply: Mutex::new(()),
        }
    }

    pub fn surface(&self) -> &Arc<ViewSurface> {
        &self.surface
    }

    pub fn scope(&self) -> FeedScope {
        self.scope
    }

    /// `true` until the server reports that the last page was loaded
    pub fn has_more(&self) -> bool {
        let state = self.state.lock();
        state
            .total_pages
            .map_or(true, |total| state.loaded_page < total)
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().in_flight > 0
    }

    pub fn loaded_page(&self) -> u32 {
        self.state.lock().loaded_page
    }

    pub fn requested_page(&self) -> u32 {
        self.state.lock().requested_page
    }

    /// Trigger rule for infinite scroll: sentinel visible, nothing in flight, pages left
    pub fn should_load_more(&self, sentinel_visible: bool) -> bool {
        sentinel_visible && !self.is_loading() && self.has_more()
    }

    pub async fn refresh(&self) -> EngagementResult<PageOutcome> {
        self.load_page(1).await
    }

    /// Load the page after the last accepted one if the trigger rule allows it
    pub async fn load_next(
        &self,
        sentinel_visible: bool,
    ) -> EngagementResult<Option<PageOutcome>> {
        if !self.should_load_more(sentinel_visible) {
            return Ok(None);
        }
        let next = self.loaded_page() + 1;
        self.load_page(next).await.map(Some)
    }

    /// Fetch `page`; page 1 replaces the surface, later pages append.
    pub async fn load_page(&self, page: u32) -> EngagementResult<PageOutcome> {
        if page == 0 {
            return Err(EngagementError::validation("Pages start at 1"));
        }

        let (ticket, in_flight) = {
            let mut state = self.state.lock();
            state.latest_ticket += 1;
            state.requested_page = page;
            state.in_flight += 1;
            (state.latest_ticket, InFlight { state: &self.state })
        };
        debug!(page, ticket, scope = %self.scope, "Requesting feed page");

        let query = PostsQuery {
            scope: self.scope,
            page,
            limit: self.limit,
        };
        let result = self.api.fetch_posts(&query).await;
        drop(in_flight);

        // staleness check and application must not interleave with another response
        let _applying = self.apply.lock();

        let superseded_by = {
            let state = self.state.lock();
            (state.latest_ticket != ticket).then_some(state.requested_page)
        };
        if let Some(current_page) = superseded_by {
            warn!(page, current_page, "Discarding stale feed page");
            EngagementMetrics::record_page(PageMetric::Stale);
            return Ok(PageOutcome::Stale {
                page,
                superseded_by: current_page,
            });
        }

        let fetched = result.map_err(|e| {
            warn!(page, error = %e, "Feed page failed");
            EngagementMetrics::record_page(PageMetric::Failed);
            e
        })?;

        // observers run here; the state lock is free so they may query the loader
        let received = fetched.posts.len();
        for post in &fetched.posts {
            self.store.merge(post.clone());
        }
        if page == 1 {
            self.surface.replace_all(fetched.posts);
        } else {
            self.surface.append(fetched.posts);
        }

        {
            let mut state = self.state.lock();
            state.loaded_page = page;
            state.total_pages = Some(fetched.pages);
        }
        let has_more = page < fetched.pages;

        EngagementMetrics::record_page(PageMetric::Applied);
        info!(page, received, pages = fetched.pages, has_more, "Feed page applied");
        Ok(PageOutcome::Applied {
            page,
            received,
            has_more,
        })
    }
}

/// Counts one request as in flight until dropped, also when the caller
/// abandons the future mid-request
struct InFlight<'a> {
    state: &'a Mutex<PageState>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::{InMemoryBackend, InMemorySession};
    use crate::api::CreatePostRequest;
    use crate::services::surfaces::SurfaceKind;
    use uuid::Uuid;

    async fn backend_with_posts(n: usize) -> (InMemoryBackend, Uuid) {
        let backend = InMemoryBackend::new();
        let author = Uuid::new_v4();
        let session = backend.session(author);
        for i in 0..n {
            session
                .create_post(&CreatePostRequest::text(format!("post {}", i)))
                .await
                .unwrap();
        }
        (backend, author)
    }

    fn loader(backend: &InMemoryBackend, limit: u32) -> FeedLoader<InMemorySession> {
        let store = PostStore::new();
        let surface = ViewSurface::attached(SurfaceKind::Feed, &store);
        FeedLoader::new(
            Arc::new(backend.session(Uuid::new_v4())),
            store,
            surface,
            FeedScope::Global,
            limit,
        )
    }

    #[tokio::test]
    async fn test_pages_append_until_exhausted() {
        let (backend, _) = backend_with_posts(5).await;
        let loader = loader(&backend, 2);

        assert!(loader.has_more());
        let mut loads = 0;
        while let Some(outcome) = loader.load_next(true).await.unwrap() {
            assert!(!outcome.is_stale());
            loads += 1;
        }

        assert_eq!(loads, 3);
        assert!(!loader.has_more());
        assert_eq!(loader.surface().len(), 5);
        assert_eq!(loader.load_next(true).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sentinel_must_be_visible() {
        let (backend, _) = backend_with_posts(3).await;
        let loader = loader(&backend, 2);

        assert_eq!(loader.load_next(false).await.unwrap(), None);
        assert_eq!(loader.loaded_page(), 0);
    }

    #[tokio::test]
    async fn test_page_one_replaces_feed() {
        let (backend, author) = backend_with_posts(4).await;
        let loader = loader(&backend, 2);
        loader.load_page(1).await.unwrap();
        loader.load_page(2).await.unwrap();
        assert_eq!(loader.surface().len(), 4);

        backend
            .session(author)
            .create_post(&CreatePostRequest::text("breaking"))
            .await
            .unwrap();
        let outcome = loader.refresh().await.unwrap();

        assert_eq!(
            outcome,
            PageOutcome::Applied {
                page: 1,
                received: 2,
                has_more: true
            }
        );
        assert_eq!(loader.surface().len(), 2);
        assert_eq!(loader.surface().posts()[0].content, "breaking");
    }

    /// Reads loader state from inside a store notification
    #[derive(Default)]
    struct LoaderWatcher {
        loader: Mutex<Option<Arc<FeedLoader<InMemorySession>>>>,
        seen: Mutex<Vec<(bool, bool)>>,
    }

    impl crate::store::PostObserver for LoaderWatcher {
        fn on_post_event(&self, _event: &crate::store::PostEvent) {
            if let Some(loader) = self.loader.lock().as_ref() {
                self.seen.lock().push((loader.has_more(), loader.is_loading()));
            }
        }
    }

    #[tokio::test]
    async fn test_observers_can_query_loader_while_page_applies() {
        let (backend, _) = backend_with_posts(3).await;
        let store = PostStore::new();
        let surface = ViewSurface::attached(SurfaceKind::Feed, &store);
        let loader = Arc::new(FeedLoader::new(
            Arc::new(backend.session(Uuid::new_v4())),
            Arc::clone(&store),
            surface,
            FeedScope::Global,
            2,
        ));

        // an outdated local copy makes the merge announce an update
        let mut outdated = backend
            .session(Uuid::new_v4())
            .fetch_posts(&PostsQuery {
                scope: FeedScope::Global,
                page: 1,
                limit: 1,
            })
            .await
            .unwrap()
            .posts
            .remove(0);
        outdated.content = "outdated".to_string();
        store.merge(outdated);

        let watcher = Arc::new(LoaderWatcher::default());
        *watcher.loader.lock() = Some(Arc::clone(&loader));
        store.register(&watcher);

        let outcome = loader.refresh().await.unwrap();

        assert!(!outcome.is_stale());
        assert_eq!(*watcher.seen.lock(), vec![(true, false)]);
    }

    #[tokio::test]
    async fn test_page_zero_rejected() {
        let (backend, _) = backend_with_posts(1).await;
        let loader = loader(&backend, 2);
        assert!(loader.load_page(0).await.unwrap_err().is_validation());
    }
}
