//! Wiring of store, surfaces, loader and engine for one signed-in viewer

use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use engagement_core::{
    EngagementApi, EngagementEngine, FeedLoader, Post, PostEvent, PostStore, SurfaceKind,
    ViewSurface,
};

use crate::config::FeedConfig;

pub struct EngagementSession<A: EngagementApi + ?Sized> {
    pub store: Arc<PostStore>,
    pub feed: Arc<ViewSurface>,
    pub detail: Arc<ViewSurface>,
    pub loader: FeedLoader<A>,
    pub engine: EngagementEngine<A>,
}

impl<A: EngagementApi + ?Sized> EngagementSession<A> {
    pub fn new(api: Arc<A>, viewer_id: Uuid, feed_config: &FeedConfig) -> Self {
        let store = PostStore::new();
        let feed = ViewSurface::attached(SurfaceKind::Feed, &store);
        let detail = ViewSurface::attached(SurfaceKind::Detail, &store);
        let loader = FeedLoader::new(
            Arc::clone(&api),
            Arc::clone(&store),
            Arc::clone(&feed),
            feed_config.scope,
            feed_config.page_limit,
        );
        let engine = EngagementEngine::new(api, Arc::clone(&store), viewer_id);

        Self {
            store,
            feed,
            detail,
            loader,
            engine,
        }
    }

    /// Profile surface for `user_id`, attached to this session's store
    pub fn profile(&self, user_id: Uuid) -> Arc<ViewSurface> {
        ViewSurface::attached(SurfaceKind::Profile { user_id }, &self.store)
    }
}

/// One log line per feed post: counter, top kinds and discussion size
pub fn log_feed(posts: &[Post]) {
    for post in posts {
        let summary = post.reactions.summary();
        let top: Vec<&str> = summary.top.iter().map(|k| k.as_str()).collect();
        info!(
            post_id = %post.id,
            author = %post.author_id,
            reactions = summary.total,
            top = ?top,
            comments = post.discussion_count(),
            "Feed post"
        );
    }
}

/// Log every store change until the store is dropped
pub fn spawn_event_log(store: &PostStore) -> JoinHandle<()> {
    let mut events = store.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(PostEvent::Created(post)) => debug!(post_id = %post.id, "Post created"),
                Ok(PostEvent::Updated(post)) => debug!(
                    post_id = %post.id,
                    reactions = post.reactions.len(),
                    comments = post.comments.len(),
                    "Post updated"
                ),
                Ok(PostEvent::Removed(post_id)) => debug!(post_id = %post_id, "Post removed"),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Store event log lagging");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
