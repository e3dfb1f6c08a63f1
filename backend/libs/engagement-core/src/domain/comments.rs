//! Comment tree operations
//!
//! These are the authoritative (server-side) transitions. Clients never apply
//! them locally: comment and reply identity is assigned by whoever owns the
//! post, so a client waits for the returned post instead of predicting it.

use chrono::Utc;
use uuid::Uuid;

use super::ledger::ReactionLedger;
use super::models::{Comment, Post, Reply};
use crate::error::{EngagementError, EngagementResult};

/// Trimmed body, or a validation error when nothing but whitespace is left
pub fn validate_body<'a>(body: &'a str, what: &str) -> EngagementResult<&'a str> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(EngagementError::validation(format!("{} cannot be empty", what)));
    }
    Ok(trimmed)
}

/// Append a comment at the tail of the post's comment list
pub fn add_comment(post: &Post, author_id: Uuid, body: &str) -> EngagementResult<Post> {
    let content = validate_body(body, "Comment")?;

    let mut updated = post.clone();
    updated.comments.push(Comment {
        id: Uuid::new_v4(),
        author_id,
        content: content.to_string(),
        reactions: ReactionLedger::new(),
        replies: Vec::new(),
        created_at: Utc::now(),
    });
    Ok(updated)
}

/// Append a reply at the tail of one comment's reply list
pub fn add_reply(
    post: &Post,
    comment_id: Uuid,
    author_id: Uuid,
    body: &str,
) -> EngagementResult<Post> {
    let content = validate_body(body, "Reply")?;

    let mut updated = post.clone();
    let comment = updated
        .comment_mut(comment_id)
        .ok_or_else(|| EngagementError::not_found(format!("comment {}", comment_id)))?;
    comment.replies.push(Reply {
        id: Uuid::new_v4(),
        author_id,
        content: content.to_string(),
        reactions: ReactionLedger::new(),
        created_at: Utc::now(),
    });
    Ok(updated)
}
