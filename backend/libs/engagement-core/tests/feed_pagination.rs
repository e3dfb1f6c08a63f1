//! Integration Tests: stale-response suppression in the feed loader
//!
//! Page responses are released by the test through oneshot gates, so the
//! arrival order is fully controlled.

mod common;

use async_trait::async_trait;
use engagement_core::api::{
    ContentRequest, CreatePostRequest, PostsPage, PostsQuery, ReactRequest, ReportRequest,
};
use engagement_core::domain::Post;
use engagement_core::{
    EngagementApi, EngagementError, EngagementResult, FeedLoader, FeedScope, PageOutcome,
    PostStore, ReactionTarget, SurfaceKind, ViewSurface,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use uuid::Uuid;

type Gate = oneshot::Receiver<EngagementResult<PostsPage>>;

/// Answers each page only when the test opens its gate
#[derive(Default)]
struct GatedApi {
    gates: Mutex<HashMap<u32, Gate>>,
    requested: Mutex<Vec<u32>>,
}

impl GatedApi {
    fn gate(&self, page: u32) -> oneshot::Sender<EngagementResult<PostsPage>> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().insert(page, rx);
        tx
    }
}

fn unsupported<T>() -> EngagementResult<T> {
    Err(EngagementError::Internal("not used by pagination tests".to_string()))
}

#[async_trait]
impl EngagementApi for GatedApi {
    async fn fetch_posts(&self, query: &PostsQuery) -> EngagementResult<PostsPage> {
        self.requested.lock().push(query.page);
        let gate = self
            .gates
            .lock()
            .remove(&query.page)
            .ok_or_else(|| {
                EngagementError::Internal(format!("no gate for page {}", query.page))
            })?;
        gate.await
            .map_err(|_| EngagementError::Network("gate dropped".to_string()))?
    }

    async fn create_post(&self, _request: &CreatePostRequest) -> EngagementResult<Post> {
        unsupported()
    }

    async fn react(
        &self,
        _post_id: Uuid,
        _target: &ReactionTarget,
        _request: &ReactRequest,
    ) -> EngagementResult<Post> {
        unsupported()
    }

    async fn add_comment(
        &self,
        _post_id: Uuid,
        _request: &ContentRequest,
    ) -> EngagementResult<Post> {
        unsupported()
    }

    async fn add_reply(
        &self,
        _post_id: Uuid,
        _comment_id: Uuid,
        _request: &ContentRequest,
    ) -> EngagementResult<Post> {
        unsupported()
    }

    async fn edit_post(&self, _post_id: Uuid, _request: &ContentRequest) -> EngagementResult<Post> {
        unsupported()
    }

    async fn delete_post(&self, _post_id: Uuid) -> EngagementResult<()> {
        unsupported()
    }

    async fn report_post(&self, _post_id: Uuid, _request: &ReportRequest) -> EngagementResult<()> {
        unsupported()
    }
}

fn page(posts: &[Post], pages: u32) -> EngagementResult<PostsPage> {
    Ok(PostsPage {
        posts: posts.to_vec(),
        pages,
    })
}

fn setup() -> (Arc<GatedApi>, FeedLoader<GatedApi>, Arc<ViewSurface>) {
    let api = Arc::new(GatedApi::default());
    let store = PostStore::new();
    let feed = ViewSurface::attached(SurfaceKind::Feed, &store);
    let loader = FeedLoader::new(api.clone(), store, feed.clone(), FeedScope::Global, 2);
    (api, loader, feed)
}

fn ids(posts: &[Post]) -> Vec<Uuid> {
    posts.iter().map(|p| p.id).collect()
}

#[tokio::test]
async fn test_earlier_page_arriving_late_is_discarded() {
    let (api, loader, feed) = setup();
    let first = common::posts(2, "page1");
    let second = common::posts(2, "page2");
    let tx1 = api.gate(1);
    let tx2 = api.gate(2);

    let (r1, r2, _) = tokio::join!(loader.load_page(1), loader.load_page(2), async {
        // both requests are issued before either response is released
        tx1.send(page(&first, 3)).unwrap();
        tokio::task::yield_now().await;
        tx2.send(page(&second, 3)).unwrap();
    });

    assert_eq!(
        r1.unwrap(),
        PageOutcome::Stale {
            page: 1,
            superseded_by: 2
        }
    );
    assert_eq!(
        r2.unwrap(),
        PageOutcome::Applied {
            page: 2,
            received: 2,
            has_more: true
        }
    );
    assert_eq!(feed.post_ids(), ids(&second));
    assert_eq!(*api.requested.lock(), vec![1, 2]);
}

#[tokio::test]
async fn test_out_of_order_arrival_applies_only_latest_request() {
    let (api, loader, feed) = setup();
    let first = common::posts(2, "page1");
    let tx1 = api.gate(1);
    tx1.send(page(&first, 5)).unwrap();
    loader.load_page(1).await.unwrap();

    let second = common::posts(2, "page2");
    let third = common::posts(2, "page3");
    let tx2 = api.gate(2);
    let tx3 = api.gate(3);

    // arrival order: 3 then 2
    let (r2, r3, _) = tokio::join!(loader.load_page(2), loader.load_page(3), async {
        tx3.send(page(&third, 5)).unwrap();
        tokio::task::yield_now().await;
        tx2.send(page(&second, 5)).unwrap();
    });

    assert!(r2.unwrap().is_stale());
    assert!(!r3.unwrap().is_stale());

    let mut expected = ids(&first);
    expected.extend(ids(&third));
    assert_eq!(feed.post_ids(), expected);
    assert_eq!(loader.loaded_page(), 3);
}

#[tokio::test]
async fn test_all_three_in_flight_arriving_three_one_two() {
    let (api, loader, feed) = setup();
    let p1 = common::posts(2, "p1");
    let p2 = common::posts(2, "p2");
    let p3 = common::posts(2, "p3");
    let tx1 = api.gate(1);
    let tx2 = api.gate(2);
    let tx3 = api.gate(3);

    let (r1, r2, r3, _) = tokio::join!(
        loader.load_page(1),
        loader.load_page(2),
        loader.load_page(3),
        async {
            tx3.send(page(&p3, 4)).unwrap();
            tokio::task::yield_now().await;
            tx1.send(page(&p1, 4)).unwrap();
            tokio::task::yield_now().await;
            tx2.send(page(&p2, 4)).unwrap();
        }
    );

    assert!(r1.unwrap().is_stale());
    assert!(r2.unwrap().is_stale());
    assert!(!r3.unwrap().is_stale());
    assert_eq!(feed.post_ids(), ids(&p3));
}

#[tokio::test]
async fn test_superseded_failure_is_silent() {
    let (api, loader, feed) = setup();
    let second = common::posts(1, "page2");
    let tx1 = api.gate(1);
    let tx2 = api.gate(2);

    let (r1, r2, _) = tokio::join!(loader.load_page(1), loader.load_page(2), async {
        tx1.send(Err(EngagementError::Network("timeout".to_string())))
            .unwrap();
        tokio::task::yield_now().await;
        tx2.send(page(&second, 2)).unwrap();
    });

    assert!(r1.unwrap().is_stale());
    assert!(!r2.unwrap().is_stale());
    assert_eq!(feed.len(), 1);
}

#[tokio::test]
async fn test_current_failure_surfaces_and_keeps_feed() {
    let (api, loader, feed) = setup();
    let first = common::posts(2, "page1");
    api.gate(1).send(page(&first, 3)).unwrap();
    loader.load_page(1).await.unwrap();

    api.gate(2)
        .send(Err(EngagementError::Server {
            status: 503,
            message: "unavailable".to_string(),
        }))
        .unwrap();
    let err = loader.load_page(2).await.unwrap_err();

    assert!(matches!(err, EngagementError::Server { status: 503, .. }));
    assert_eq!(feed.post_ids(), ids(&first));
    assert_eq!(loader.loaded_page(), 1);
    assert!(loader.has_more());
}

#[tokio::test]
async fn test_no_trigger_while_loading() {
    let (api, loader, _feed) = setup();
    let first = common::posts(2, "page1");
    let tx1 = api.gate(1);

    let (r1, _) = tokio::join!(loader.load_page(1), async {
        assert!(loader.is_loading());
        assert!(!loader.should_load_more(true));
        assert_eq!(loader.load_next(true).await.unwrap(), None);
        tx1.send(page(&first, 2)).unwrap();
    });

    r1.unwrap();
    assert!(!loader.is_loading());
    assert!(loader.should_load_more(true));
    assert!(!loader.should_load_more(false));
}

#[tokio::test]
async fn test_abandoned_request_releases_loading_state() {
    let (api, loader, feed) = setup();
    // gate for page 1 is never opened
    let _held = api.gate(1);

    let abandoned = tokio::time::timeout(Duration::from_millis(20), loader.load_page(1)).await;
    assert!(abandoned.is_err());

    assert!(!loader.is_loading());
    assert!(loader.should_load_more(true));

    let first = common::posts(2, "page1");
    api.gate(1).send(page(&first, 1)).unwrap();
    let outcome = loader.load_next(true).await.unwrap().unwrap();

    assert!(!outcome.is_stale());
    assert_eq!(feed.post_ids(), ids(&first));
}
