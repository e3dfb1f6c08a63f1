//! In-memory authoritative backend
//!
//! Holds the server-side copy of posts and messages and runs the same
//! transitions the REST backend runs (toggle rule, tail-append of comments and
//! replies). Several [`InMemorySession`]s can share one backend to act as
//! different users mutating the same posts.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::{
    ContentRequest, CreatePostRequest, EngagementApi, FeedScope, MessagesApi, PostsPage,
    PostsQuery, ReactRequest, ReportRequest,
};
use crate::domain::{self, Message, Post, Privacy, ReactionLedger, ReactionTarget};
use crate::error::{EngagementError, EngagementResult};

#[derive(Default)]
struct BackendState {
    /// Newest first
    posts: RwLock<Vec<Post>>,
    messages: RwLock<Vec<Message>>,
    reports: RwLock<Vec<(Uuid, Uuid, ReportRequest)>>,
}

#[derive(Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<BackendState>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an existing post after the ones already stored
    pub fn seed(&self, post: Post) {
        self.state.posts.write().push(post);
    }

    pub fn post(&self, post_id: Uuid) -> Option<Post> {
        self.state.posts.read().iter().find(|p| p.id == post_id).cloned()
    }

    pub fn report_count(&self, post_id: Uuid) -> usize {
        self.state
            .reports
            .read()
            .iter()
            .filter(|(id, _, _)| *id == post_id)
            .count()
    }

    /// Client view of the backend acting as `user_id`
    pub fn session(&self, user_id: Uuid) -> InMemorySession {
        InMemorySession {
            backend: self.clone(),
            user_id,
        }
    }

    fn with_post<F>(&self, post_id: Uuid, f: F) -> EngagementResult<Post>
    where
        F: FnOnce(&mut Post) -> EngagementResult<()>,
    {
        let mut posts = self.state.posts.write();
        let post = posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| EngagementError::not_found(format!("post {}", post_id)))?;
        f(post)?;
        Ok(post.clone())
    }
}

/// One authenticated user's connection to an [`InMemoryBackend`]
#[derive(Clone)]
pub struct InMemorySession {
    backend: InMemoryBackend,
    user_id: Uuid,
}

impl InMemorySession {
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    fn visible(&self, post: &Post) -> bool {
        post.privacy != Privacy::Private || post.author_id == self.user_id
    }

    fn forbidden(&self, post_id: Uuid) -> EngagementError {
        EngagementError::Server {
            status: 403,
            message: format!("user {} does not own post {}", self.user_id, post_id),
        }
    }
}

#[async_trait]
impl EngagementApi for InMemorySession {
    async fn fetch_posts(&self, query: &PostsQuery) -> EngagementResult<PostsPage> {
        if query.page == 0 || query.limit == 0 {
            return Err(EngagementError::validation("page and limit start at 1"));
        }

        let posts = self.backend.state.posts.read();
        // No follow graph here: following behaves like global
        let matching: Vec<&Post> = posts
            .iter()
            .filter(|p| self.visible(p))
            .filter(|p| match query.scope {
                FeedScope::Global | FeedScope::Following => true,
                FeedScope::User(author) => p.author_id == author,
            })
            .collect();

        let limit = query.limit as usize;
        let pages = matching.len().div_ceil(limit) as u32;
        let start = (query.page as usize - 1) * limit;
        let page: Vec<Post> = matching.into_iter().skip(start).take(limit).cloned().collect();

        debug!(page = query.page, returned = page.len(), pages, "Serving posts page");
        Ok(PostsPage { posts: page, pages })
    }

    async fn create_post(&self, request: &CreatePostRequest) -> EngagementResult<Post> {
        request.validate()?;

        let post = Post {
            id: Uuid::new_v4(),
            author_id: self.user_id,
            content: request.content.trim().to_string(),
            post_type: request.post_type,
            images: request.images.clone(),
            video_url: request.video_url.clone(),
            trip_id: request.trip_id,
            privacy: request.privacy,
            reactions: ReactionLedger::new(),
            comments: Vec::new(),
            created_at: Utc::now(),
            updated_at: None,
        };
        self.backend.state.posts.write().insert(0, post.clone());
        Ok(post)
    }

    async fn react(
        &self,
        post_id: Uuid,
        target: &ReactionTarget,
        request: &ReactRequest,
    ) -> EngagementResult<Post> {
        let user_id = self.user_id;
        self.backend.with_post(post_id, |post| {
            let ledger = post.ledger_mut(target).ok_or_else(|| {
                EngagementError::not_found(format!("{} on post {}", target, post_id))
            })?;
            let (next, _) = ledger.apply(user_id, request.reaction_type, Utc::now());
            *ledger = next;
            Ok(())
        })
    }

    async fn add_comment(&self, post_id: Uuid, request: &ContentRequest) -> EngagementResult<Post> {
        let user_id = self.user_id;
        self.backend.with_post(post_id, |post| {
            *post = domain::add_comment(post, user_id, &request.content)?;
            Ok(())
        })
    }

    async fn add_reply(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        request: &ContentRequest,
    ) -> EngagementResult<Post> {
        let user_id = self.user_id;
        self.backend.with_post(post_id, |post| {
            *post = domain::add_reply(post, comment_id, user_id, &request.content)?;
            Ok(())
        })
    }

    async fn edit_post(&self, post_id: Uuid, request: &ContentRequest) -> EngagementResult<Post> {
        let content = domain::validate_body(&request.content, "Post content")?.to_string();
        let user_id = self.user_id;
        let forbidden = self.forbidden(post_id);
        self.backend.with_post(post_id, |post| {
            if post.author_id != user_id {
                return Err(forbidden);
            }
            post.content = content;
            post.updated_at = Some(Utc::now());
            Ok(())
        })
    }

    async fn delete_post(&self, post_id: Uuid) -> EngagementResult<()> {
        let mut posts = self.backend.state.posts.write();
        let pos = posts
            .iter()
            .position(|p| p.id == post_id)
            .ok_or_else(|| EngagementError::not_found(format!("post {}", post_id)))?;
        if posts[pos].author_id != self.user_id {
            return Err(self.forbidden(post_id));
        }
        posts.remove(pos);
        Ok(())
    }

    async fn report_post(&self, post_id: Uuid, request: &ReportRequest) -> EngagementResult<()> {
        if self.backend.post(post_id).is_none() {
            return Err(EngagementError::not_found(format!("post {}", post_id)));
        }
        self.backend
            .state
            .reports
            .write()
            .push((post_id, self.user_id, request.clone()));
        Ok(())
    }
}

#[async_trait]
impl MessagesApi for InMemorySession {
    async fn fetch_messages(&self, conversation_id: Uuid) -> EngagementResult<Vec<Message>> {
        Ok(self
            .backend
            .state
            .messages
            .read()
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect())
    }

    async fn send_message(
        &self,
        conversation_id: Uuid,
        request: &ContentRequest,
    ) -> EngagementResult<Message> {
        let content = domain::validate_body(&request.content, "Message")?;
        let message = Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id: self.user_id,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        self.backend.state.messages.write().push(message.clone());
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ReactionKind;

    #[tokio::test]
    async fn test_pages_are_counted_from_visible_posts() {
        let backend = InMemoryBackend::new();
        let alice = backend.session(Uuid::new_v4());
        for i in 0..5 {
            alice
                .create_post(&CreatePostRequest::text(format!("post {}", i)))
                .await
                .unwrap();
        }

        let page = alice
            .fetch_posts(&PostsQuery {
                scope: FeedScope::Global,
                page: 3,
                limit: 2,
            })
            .await
            .unwrap();

        assert_eq!(page.pages, 3);
        assert_eq!(page.posts.len(), 1);
        assert_eq!(page.posts[0].content, "post 0");
    }

    #[tokio::test]
    async fn test_two_users_react_on_the_same_post() {
        let backend = InMemoryBackend::new();
        let alice = backend.session(Uuid::new_v4());
        let bob = backend.session(Uuid::new_v4());
        let post = alice
            .create_post(&CreatePostRequest::text("Hostel tips for Hanoi?"))
            .await
            .unwrap();

        let like = ReactRequest {
            reaction_type: ReactionKind::Like,
        };
        alice.react(post.id, &ReactionTarget::Post, &like).await.unwrap();
        let after = bob.react(post.id, &ReactionTarget::Post, &like).await.unwrap();

        assert_eq!(after.reactions.len(), 2);
        assert_eq!(after.reactions.count(ReactionKind::Like), 2);
    }

    #[tokio::test]
    async fn test_only_author_can_edit() {
        let backend = InMemoryBackend::new();
        let alice = backend.session(Uuid::new_v4());
        let bob = backend.session(Uuid::new_v4());
        let post = alice
            .create_post(&CreatePostRequest::text("original"))
            .await
            .unwrap();

        let err = bob
            .edit_post(post.id, &ContentRequest::new("hijacked"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngagementError::Server { status: 403, .. }));

        let edited = alice
            .edit_post(post.id, &ContentRequest::new("edited"))
            .await
            .unwrap();
        assert_eq!(edited.content, "edited");
        assert!(edited.updated_at.is_some());
    }
}
