//! Observable post-by-id store
//!
//! One normalized copy of every post the client currently knows about. Each
//! write publishes a [`PostEvent`]:
//!
//! ```text
//! engine / loader
//!   1. write post into store
//!      ↓
//! PostStore
//!   2. notify registered observers (synchronously, same call)
//!   3. broadcast to async subscribers (tokio::sync::broadcast)
//!      ↓
//! feed / profile / detail surfaces
//!   4. replace their own entry with the same post id
//! ```

use dashmap::DashMap;
use parking_lot::{ReentrantMutex, RwLock};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::domain::Post;

/// Capacity of the async event channel; slow subscribers see `Lagged`
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Change notification for one post
#[derive(Debug, Clone, PartialEq)]
pub enum PostEvent {
    Created(Post),
    Updated(Post),
    Removed(Uuid),
}

impl PostEvent {
    pub fn post_id(&self) -> Uuid {
        match self {
            PostEvent::Created(post) | PostEvent::Updated(post) => post.id,
            PostEvent::Removed(id) => *id,
        }
    }
}

/// Receives every store change on the writer's call stack
pub trait PostObserver: Send + Sync {
    fn on_post_event(&self, event: &PostEvent);
}

pub struct PostStore {
    posts: DashMap<Uuid, Post>,
    /// Orders each write together with its notification, so observers see
    /// writes in the same order the map does. Reentrant: an observer may write.
    writes: ReentrantMutex<()>,
    observers: RwLock<Vec<Weak<dyn PostObserver>>>,
    events: broadcast::Sender<PostEvent>,
}

impl Default for PostStore {
    fn default() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            posts: DashMap::new(),
            writes: ReentrantMutex::new(()),
            observers: RwLock::new(Vec::new()),
            events,
        }
    }
}

impl PostStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn get(&self, post_id: Uuid) -> Option<Post> {
        self.posts.get(&post_id).map(|p| p.clone())
    }

    pub fn contains(&self, post_id: Uuid) -> bool {
        self.posts.contains_key(&post_id)
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Register an observer. The store keeps a weak reference only, so a
    /// dropped surface unregisters itself.
    pub fn register<O>(&self, observer: &Arc<O>)
    where
        O: PostObserver + 'static,
    {
        let observer: Arc<dyn PostObserver> = observer.clone();
        let weak = Arc::downgrade(&observer);
        self.observers.write().push(weak);
    }

    /// Async event stream for listeners that live outside the UI thread
    pub fn subscribe(&self) -> broadcast::Receiver<PostEvent> {
        self.events.subscribe()
    }

    /// Insert a post that did not exist before (fresh from create)
    pub fn insert_created(&self, post: Post) {
        let _write = self.writes.lock();
        self.posts.insert(post.id, post.clone());
        self.publish(PostEvent::Created(post));
    }

    /// Whole-object replacement with an authoritative post
    pub fn replace(&self, post: Post) {
        let _write = self.writes.lock();
        self.posts.insert(post.id, post.clone());
        self.publish(PostEvent::Updated(post));
    }

    /// Store a freshly fetched post; only announces it when it differs from
    /// the copy already held
    pub fn merge(&self, post: Post) -> bool {
        let _write = self.writes.lock();
        let changed = match self.posts.get(&post.id) {
            Some(existing) => *existing != post,
            None => {
                self.posts.insert(post.id, post);
                return false;
            }
        };
        if changed {
            self.replace(post);
        }
        changed
    }

    /// Mutate a post in place and announce the result.
    ///
    /// `f` returns `None` to leave the post untouched (nothing is published).
    pub fn update_with<F, T>(&self, post_id: Uuid, f: F) -> Option<(T, Post)>
    where
        F: FnOnce(&mut Post) -> Option<T>,
    {
        let _write = self.writes.lock();
        let (out, snapshot) = {
            let mut entry = self.posts.get_mut(&post_id)?;
            let out = f(entry.value_mut())?;
            (out, entry.value().clone())
        };
        // shard guard released before observers run
        self.publish(PostEvent::Updated(snapshot.clone()));
        Some((out, snapshot))
    }

    pub fn remove(&self, post_id: Uuid) -> Option<Post> {
        let _write = self.writes.lock();
        let (_, post) = self.posts.remove(&post_id)?;
        self.publish(PostEvent::Removed(post_id));
        Some(post)
    }

    fn publish(&self, event: PostEvent) {
        let observers: Vec<Arc<dyn PostObserver>> = {
            let mut observers = self.observers.write();
            observers.retain(|o| o.strong_count() > 0);
            observers.iter().filter_map(|o| o.upgrade()).collect()
        };

        trace!(
            post_id = %event.post_id(),
            observers = observers.len(),
            "Publishing post event"
        );

        for observer in &observers {
            observer.on_post_event(&event);
        }

        // No receivers is fine
        if self.events.send(event).is_err() {
            debug!("No async post event subscribers");
        }
    }
}
