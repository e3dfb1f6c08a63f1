//! Shared fixtures for engagement-core integration tests
#![allow(dead_code)]

use chrono::Utc;
use engagement_core::domain::{Comment, Post, PostType, Privacy, ReactionLedger};
use uuid::Uuid;

pub fn post_by(author_id: Uuid, content: &str) -> Post {
    Post {
        id: Uuid::new_v4(),
        author_id,
        content: content.to_string(),
        post_type: PostType::Text,
        images: vec![],
        video_url: None,
        trip_id: None,
        privacy: Privacy::Public,
        reactions: ReactionLedger::new(),
        comments: vec![],
        created_at: Utc::now(),
        updated_at: None,
    }
}

pub fn with_comment(mut post: Post, author_id: Uuid, content: &str) -> Post {
    post.comments.push(Comment {
        id: Uuid::new_v4(),
        author_id,
        content: content.to_string(),
        reactions: ReactionLedger::new(),
        replies: vec![],
        created_at: Utc::now(),
    });
    post
}

pub fn posts(n: usize, label: &str) -> Vec<Post> {
    let author = Uuid::new_v4();
    (0..n)
        .map(|i| post_by(author, &format!("{} {}", label, i)))
        .collect()
}
