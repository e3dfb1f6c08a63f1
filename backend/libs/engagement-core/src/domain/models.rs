use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ledger::ReactionLedger;

/// Post entity - the unit every view surface displays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(alias = "_id")]
    pub id: Uuid,
    #[serde(rename = "author")]
    pub author_id: Uuid,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub post_type: PostType,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<Uuid>,
    #[serde(default)]
    pub privacy: Privacy,
    #[serde(default)]
    pub reactions: ReactionLedger,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Comment entity - appended at the tail of a post's comment list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(alias = "_id")]
    pub id: Uuid,
    #[serde(rename = "author")]
    pub author_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub reactions: ReactionLedger,
    #[serde(default)]
    pub replies: Vec<Reply>,
    pub created_at: DateTime<Utc>,
}

/// Reply entity - always attached to exactly one comment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    #[serde(alias = "_id")]
    pub id: Uuid,
    #[serde(rename = "author")]
    pub author_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub reactions: ReactionLedger,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    #[default]
    Text,
    Photo,
    Video,
    Trip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    #[default]
    Public,
    Friends,
    Private,
}

/// Which ledger inside a post a reaction addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReactionTarget {
    Post,
    Comment { comment_id: Uuid },
    Reply { comment_id: Uuid, reply_id: Uuid },
}

impl ReactionTarget {
    pub fn comment(comment_id: Uuid) -> Self {
        Self::Comment { comment_id }
    }

    pub fn reply(comment_id: Uuid, reply_id: Uuid) -> Self {
        Self::Reply {
            comment_id,
            reply_id,
        }
    }

    /// Node kind without ids, for log fields and metric labels
    pub fn label(&self) -> &'static str {
        match self {
            ReactionTarget::Post => "post",
            ReactionTarget::Comment { .. } => "comment",
            ReactionTarget::Reply { .. } => "reply",
        }
    }
}

impl std::fmt::Display for ReactionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReactionTarget::Post => write!(f, "post"),
            ReactionTarget::Comment { comment_id } => write!(f, "comment:{}", comment_id),
            ReactionTarget::Reply { reply_id, .. } => write!(f, "reply:{}", reply_id),
        }
    }
}

impl Post {
    pub fn comment(&self, comment_id: Uuid) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == comment_id)
    }

    pub fn comment_mut(&mut self, comment_id: Uuid) -> Option<&mut Comment> {
        self.comments.iter_mut().find(|c| c.id == comment_id)
    }

    /// Ledger addressed by `target`, `None` when the comment/reply is gone
    pub fn ledger(&self, target: &ReactionTarget) -> Option<&ReactionLedger> {
        match *target {
            ReactionTarget::Post => Some(&self.reactions),
            ReactionTarget::Comment { comment_id } => {
                self.comment(comment_id).map(|c| &c.reactions)
            }
            ReactionTarget::Reply {
                comment_id,
                reply_id,
            } => self
                .comment(comment_id)
                .and_then(|c| c.replies.iter().find(|r| r.id == reply_id))
                .map(|r| &r.reactions),
        }
    }

    pub fn ledger_mut(&mut self, target: &ReactionTarget) -> Option<&mut ReactionLedger> {
        match *target {
            ReactionTarget::Post => Some(&mut self.reactions),
            ReactionTarget::Comment { comment_id } => {
                self.comment_mut(comment_id).map(|c| &mut c.reactions)
            }
            ReactionTarget::Reply {
                comment_id,
                reply_id,
            } => self
                .comment_mut(comment_id)
                .and_then(|c| c.replies.iter_mut().find(|r| r.id == reply_id))
                .map(|r| &mut r.reactions),
        }
    }

    /// Comments plus replies
    pub fn discussion_count(&self) -> usize {
        self.comments.iter().map(|c| 1 + c.replies.len()).sum()
    }
}

/// Direct message inside a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(alias = "_id")]
    pub id: Uuid,
    pub conversation_id: Uuid,
    #[serde(rename = "sender")]
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
