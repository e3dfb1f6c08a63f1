//! Engagement synchronization core
//!
//! Keeps a client's view of posts, reactions, comments and replies consistent
//! with an authoritative server:
//!
//! - reactions are predicted locally, committed, then replaced by the server's post
//! - comments and replies are applied only from the server's post
//! - feed pages are applied in request order; stale responses are dropped
//! - every view surface observes one post-by-id store
//!
//! # Example
//!
//! ```no_run
//! use engagement_core::api::memory::InMemoryBackend;
//! use engagement_core::{
//!     EngagementEngine, FeedLoader, FeedScope, PostStore, ReactionKind, ReactionTarget,
//!     SurfaceKind, ViewSurface,
//! };
//! use std::sync::Arc;
//! use uuid::Uuid;
//!
//! # async fn example() -> engagement_core::EngagementResult<()> {
//! let viewer = Uuid::new_v4();
//! let api = Arc::new(InMemoryBackend::new().session(viewer));
//! let store = PostStore::new();
//!
//! let feed = ViewSurface::attached(SurfaceKind::Feed, &store);
//! let loader = FeedLoader::new(api.clone(), store.clone(), feed.clone(), FeedScope::Global, 10);
//! let engine = EngagementEngine::new(api, store, viewer);
//!
//! loader.refresh().await?;
//! if let Some(post) = feed.posts().first() {
//!     engine.react(post.id, ReactionTarget::Post, ReactionKind::Love).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod services;
pub mod store;

pub use api::{EngagementApi, FeedScope, MessagesApi, PostsPage, PostsQuery};
pub use domain::{Comment, Message, Post, ReactionKind, ReactionLedger, ReactionTarget, Reply};
pub use error::{EngagementError, EngagementResult};
pub use metrics::EngagementMetrics;
pub use services::{
    ConversationFeed, EngagementEngine, FeedLoader, PageOutcome, PollingSubscription,
    Subscription, SurfaceKind, ViewSurface,
};
pub use store::{PostEvent, PostObserver, PostStore};
