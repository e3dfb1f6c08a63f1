//! Collaborator contracts consumed by the engagement core
//!
//! Every mutating call answers with a whole object (the full parent post),
//! never a delta. Implementations: the REST client in `engagement-sync` and
//! [`memory::InMemoryBackend`].

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::{Message, Post, PostType, Privacy, ReactionKind, ReactionTarget};
use crate::error::{EngagementError, EngagementResult};

/// Which posts a feed page is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum FeedScope {
    Global,
    Following,
    User(Uuid),
}

impl fmt::Display for FeedScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedScope::Global => write!(f, "global"),
            FeedScope::Following => write!(f, "following"),
            FeedScope::User(id) => write!(f, "user:{}", id),
        }
    }
}

impl FromStr for FeedScope {
    type Err = EngagementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(FeedScope::Global),
            "following" => Ok(FeedScope::Following),
            other => other
                .strip_prefix("user:")
                .and_then(|id| Uuid::parse_str(id).ok())
                .map(FeedScope::User)
                .ok_or_else(|| EngagementError::validation(format!("Invalid feed scope: {}", s))),
        }
    }
}

impl From<FeedScope> for String {
    fn from(scope: FeedScope) -> Self {
        scope.to_string()
    }
}

impl TryFrom<String> for FeedScope {
    type Error = EngagementError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Fetch posts page request: `{scope, page, limit}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostsQuery {
    pub scope: FeedScope,
    pub page: u32,
    pub limit: u32,
}

/// Fetch posts page response: `{posts, pages}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostsPage {
    pub posts: Vec<Post>,
    /// Total page count reported by the server
    pub pages: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[serde(default)]
    pub content: String,
    pub post_type: PostType,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<Uuid>,
    #[serde(default)]
    pub privacy: Privacy,
}

impl CreatePostRequest {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            post_type: PostType::Text,
            images: Vec::new(),
            video_url: None,
            trip_id: None,
            privacy: Privacy::Public,
        }
    }

    /// Required fields per post type
    pub fn validate(&self) -> EngagementResult<()> {
        match self.post_type {
            PostType::Text if self.content.trim().is_empty() => {
                Err(EngagementError::validation("Post content cannot be empty"))
            }
            PostType::Photo if self.images.iter().all(|i| i.trim().is_empty()) => {
                Err(EngagementError::validation("A photo post needs at least one image"))
            }
            PostType::Video if self.video_url.as_deref().map_or(true, |u| u.trim().is_empty()) => {
                Err(EngagementError::validation("A video post needs a video URL"))
            }
            PostType::Trip if self.trip_id.is_none() => {
                Err(EngagementError::validation("A trip post needs a trip"))
            }
            _ => Ok(()),
        }
    }
}

/// React request: carries only the requested kind, never the predicted ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactRequest {
    pub reaction_type: ReactionKind,
}

/// Body of comment, reply, edit and message requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRequest {
    pub content: String,
}

impl ContentRequest {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub reason: String,
    #[serde(default)]
    pub details: String,
}

/// Post and engagement endpoints
#[async_trait]
pub trait EngagementApi: Send + Sync {
    async fn fetch_posts(&self, query: &PostsQuery) -> EngagementResult<PostsPage>;

    async fn create_post(&self, request: &CreatePostRequest) -> EngagementResult<Post>;

    /// Returns the full updated post, also when `target` is a comment or reply
    async fn react(
        &self,
        post_id: Uuid,
        target: &ReactionTarget,
        request: &ReactRequest,
    ) -> EngagementResult<Post>;

    async fn add_comment(&self, post_id: Uuid, request: &ContentRequest) -> EngagementResult<Post>;

    async fn add_reply(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        request: &ContentRequest,
    ) -> EngagementResult<Post>;

    async fn edit_post(&self, post_id: Uuid, request: &ContentRequest) -> EngagementResult<Post>;

    async fn delete_post(&self, post_id: Uuid) -> EngagementResult<()>;

    async fn report_post(&self, post_id: Uuid, request: &ReportRequest) -> EngagementResult<()>;
}

/// Conversation endpoints polled by the messaging companion
#[async_trait]
pub trait MessagesApi: Send + Sync {
    async fn fetch_messages(&self, conversation_id: Uuid) -> EngagementResult<Vec<Message>>;

    async fn send_message(
        &self,
        conversation_id: Uuid,
        request: &ContentRequest,
    ) -> EngagementResult<Message>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_scope_round_trip() {
        let user = Uuid::new_v4();
        assert_eq!("global".parse::<FeedScope>().unwrap(), FeedScope::Global);
        assert_eq!(
            format!("user:{}", user).parse::<FeedScope>().unwrap(),
            FeedScope::User(user)
        );
        assert!("user:nope".parse::<FeedScope>().is_err());
        assert_eq!(FeedScope::Following.to_string(), "following");
    }

    #[test]
    fn test_react_request_wire_format() {
        let body = serde_json::to_value(ReactRequest {
            reaction_type: ReactionKind::Love,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"reactionType": "love"}));
    }

    #[test]
    fn test_create_post_required_fields() {
        assert!(CreatePostRequest::text("Road trip through Patagonia").validate().is_ok());
        assert!(CreatePostRequest::text("  ").validate().unwrap_err().is_validation());

        let mut photo = CreatePostRequest::text("");
        photo.post_type = PostType::Photo;
        assert!(photo.validate().is_err());
        photo.images.push("https://cdn.example.com/a.jpg".to_string());
        assert!(photo.validate().is_ok());

        let mut video = CreatePostRequest::text("clip");
        video.post_type = PostType::Video;
        assert!(video.validate().is_err());

        let mut trip = CreatePostRequest::text("");
        trip.post_type = PostType::Trip;
        assert!(trip.validate().is_err());
        trip.trip_id = Some(Uuid::new_v4());
        assert!(trip.validate().is_ok());
    }
}
