//! View surfaces: feed list, profile activity list, post detail overlay.
//!
//! Each surface keeps its own ordered snapshot of posts and stays consistent
//! with the others by observing the shared [`PostStore`].

use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::trace;
use uuid::Uuid;

use crate::domain::Post;
use crate::store::{PostEvent, PostObserver, PostStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    /// Home feed; shows newly created posts at the top
    Feed,
    /// One user's activity tab; shows that user's new posts at the top
    Profile { user_id: Uuid },
    /// Single post overlay
    Detail,
}

pub struct ViewSurface {
    kind: SurfaceKind,
    posts: RwLock<Vec<Post>>,
}

impl ViewSurface {
    pub fn new(kind: SurfaceKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            posts: RwLock::new(Vec::new()),
        })
    }

    /// Create a surface already subscribed to `store`
    pub fn attached(kind: SurfaceKind, store: &PostStore) -> Arc<Self> {
        let surface = Self::new(kind);
        store.register(&surface);
        surface
    }

    pub fn kind(&self) -> SurfaceKind {
        self.kind
    }

    pub fn posts(&self) -> Vec<Post> {
        self.posts.read().clone()
    }

    pub fn post(&self, post_id: Uuid) -> Option<Post> {
        self.posts.read().iter().find(|p| p.id == post_id).cloned()
    }

    pub fn post_ids(&self) -> Vec<Uuid> {
        self.posts.read().iter().map(|p| p.id).collect()
    }

    pub fn len(&self) -> usize {
        self.posts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.read().is_empty()
    }

    /// Replace the whole list (first page / refresh)
    pub fn replace_all(&self, posts: Vec<Post>) {
        *self.posts.write() = posts;
    }

    /// Append at the tail, skipping posts already shown. Returns how many were added.
    pub fn append(&self, posts: Vec<Post>) -> usize {
        let mut current = self.posts.write();
        let mut known: HashSet<Uuid> = current.iter().map(|p| p.id).collect();
        let before = current.len();
        for post in posts {
            if known.insert(post.id) {
                current.push(post);
            }
        }
        current.len() - before
    }

    /// Show a single post (detail overlay)
    pub fn open(&self, post: Post) {
        *self.posts.write() = vec![post];
    }

    pub fn close(&self) {
        self.posts.write().clear();
    }

    fn accepts_created(&self, post: &Post) -> bool {
        match self.kind {
            SurfaceKind::Feed => true,
            SurfaceKind::Profile { user_id } => post.author_id == user_id,
            SurfaceKind::Detail => false,
        }
    }
}

impl PostObserver for ViewSurface {
    fn on_post_event(&self, event: &PostEvent) {
        match event {
            PostEvent::Updated(post) => {
                let mut posts = self.posts.write();
                if let Some(slot) = posts.iter_mut().find(|p| p.id == post.id) {
                    *slot = post.clone();
                    trace!(kind = ?self.kind, post_id = %post.id, "Surface entry replaced");
                }
            }
            PostEvent::Created(post) => {
                if self.accepts_created(post) {
                    let mut posts = self.posts.write();
                    if !posts.iter().any(|p| p.id == post.id) {
                        posts.insert(0, post.clone());
                    }
                }
            }
            PostEvent::Removed(post_id) => {
                self.posts.write().retain(|p| p.id != *post_id);
            }
        }
    }
}
