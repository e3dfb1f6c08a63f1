pub mod engagement;
pub mod feed_loader;
pub mod subscription;
pub mod surfaces;

pub use engagement::EngagementEngine;
pub use feed_loader::{FeedLoader, PageOutcome};
pub use subscription::{
    ConversationFeed, PollingSubscription, Subscription, DEFAULT_POLL_INTERVAL,
};
pub use surfaces::{SurfaceKind, ViewSurface};
