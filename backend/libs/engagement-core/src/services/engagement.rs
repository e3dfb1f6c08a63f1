//! Optimistic mutation engine
//!
//! Reactions are predicted locally before the request resolves; comments,
//! replies and post edits wait for the authoritative post because their
//! identity is assigned by the server. Every successful response replaces the
//! whole local post.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::{ContentRequest, CreatePostRequest, EngagementApi, ReactRequest, ReportRequest};
use crate::domain::{self, Post, ReactionChange, ReactionKind, ReactionLedger, ReactionTarget};
use crate::error::{EngagementError, EngagementResult};
use crate::metrics::{EngagementMetrics, ReactionMetric};
use crate::store::PostStore;

/// Prediction written into the store before commit
struct Prediction {
    previous: ReactionLedger,
    predicted: ReactionLedger,
    change: ReactionChange,
}

pub struct EngagementEngine<A: EngagementApi + ?Sized> {
    api: Arc<A>,
    store: Arc<PostStore>,
    viewer_id: Uuid,
}

impl<A: EngagementApi + ?Sized> Clone for EngagementEngine<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            store: Arc::clone(&self.store),
            viewer_id: self.viewer_id,
        }
    }
}

impl<A: EngagementApi + ?Sized> EngagementEngine<A> {
    pub fn new(api: Arc<A>, store: Arc<PostStore>, viewer_id: Uuid) -> Self {
        Self {
            api,
            store,
            viewer_id,
        }
    }

    pub fn viewer_id(&self) -> Uuid {
        self.viewer_id
    }

    pub fn store(&self) -> &Arc<PostStore> {
        &self.store
    }

    /// React to a post, comment or reply.
    ///
    /// 1. predict with the toggle rule and publish immediately
    /// 2. send only the requested kind
    /// 3. on success replace the whole post with the server's copy
    /// 4. on failure restore the previous ledger, unless something newer
    ///    already overwrote the prediction
    pub async fn react(
        &self,
        post_id: Uuid,
        target: ReactionTarget,
        kind: ReactionKind,
    ) -> EngagementResult<Post> {
        let viewer_id = self.viewer_id;
        let (prediction, _) = self
            .store
            .update_with(post_id, |post| {
                let ledger = post.ledger_mut(&target)?;
                let previous = ledger.clone();
                let (predicted, change) = previous.apply(viewer_id, kind, Utc::now());
                *ledger = predicted.clone();
                Some(Prediction {
                    previous,
                    predicted,
                    change,
                })
            })
            .ok_or_else(|| {
                EngagementError::not_found(format!("{} on post {}", target, post_id))
            })?;

        debug!(
            post_id = %post_id,
            target = %target,
            change = ?prediction.change,
            "Reaction predicted"
        );

        let request = ReactRequest {
            reaction_type: kind,
        };
        match self.api.react(post_id, &target, &request).await {
            Ok(post) => {
                info!(post_id = %post_id, target = %target, kind = %kind, "Reaction committed");
                EngagementMetrics::record_reaction(target.label(), ReactionMetric::Committed);
                self.store.replace(post.clone());
                Ok(post)
            }
            Err(e) => {
                self.rollback(post_id, &target, prediction);
                warn!(
                    post_id = %post_id,
                    target = %target,
                    error = %e,
                    "Reaction failed, prediction rolled back"
                );
                Err(e)
            }
        }
    }

    fn rollback(&self, post_id: Uuid, target: &ReactionTarget, prediction: Prediction) {
        let Prediction {
            previous,
            predicted,
            ..
        } = prediction;

        let restored = self.store.update_with(post_id, |post| {
            let ledger = post.ledger_mut(target)?;
            if *ledger != predicted {
                return None;
            }
            *ledger = previous;
            Some(())
        });

        if restored.is_some() {
            EngagementMetrics::record_reaction(target.label(), ReactionMetric::RolledBack);
        } else {
            debug!(post_id = %post_id, target = %target, "Newer state landed, rollback skipped");
            EngagementMetrics::record_reaction(target.label(), ReactionMetric::RollbackSkipped);
        }
    }

    /// Append a comment; local state changes only once the server answers
    pub async fn add_comment(&self, post_id: Uuid, body: &str) -> EngagementResult<Post> {
        let content = domain::validate_body(body, "Comment")?;

        let post = self
            .api
            .add_comment(post_id, &ContentRequest::new(content))
            .await
            .map_err(|e| {
                warn!(post_id = %post_id, error = %e, "Comment failed");
                e
            })?;

        info!(post_id = %post_id, comments = post.comments.len(), "Comment added");
        self.store.replace(post.clone());
        Ok(post)
    }

    pub async fn add_reply(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        body: &str,
    ) -> EngagementResult<Post> {
        let content = domain::validate_body(body, "Reply")?;

        let post = self
            .api
            .add_reply(post_id, comment_id, &ContentRequest::new(content))
            .await
            .map_err(|e| {
                warn!(post_id = %post_id, comment_id = %comment_id, error = %e, "Reply failed");
                e
            })?;

        info!(post_id = %post_id, comment_id = %comment_id, "Reply added");
        self.store.replace(post.clone());
        Ok(post)
    }

    pub async fn create_post(&self, request: CreatePostRequest) -> EngagementResult<Post> {
        request.validate()?;

        let post = self.api.create_post(&request).await?;
        info!(post_id = %post.id, post_type = ?post.post_type, "Post created");
        self.store.insert_created(post.clone());
        Ok(post)
    }

    pub async fn edit_post(&self, post_id: Uuid, content: &str) -> EngagementResult<Post> {
        let content = domain::validate_body(content, "Post content")?;

        let post = self
            .api
            .edit_post(post_id, &ContentRequest::new(content))
            .await?;
        info!(post_id = %post_id, "Post edited");
        self.store.replace(post.clone());
        Ok(post)
    }

    pub async fn delete_post(&self, post_id: Uuid) -> EngagementResult<()> {
        self.api.delete_post(post_id).await?;
        info!(post_id = %post_id, "Post deleted");
        self.store.remove(post_id);
        Ok(())
    }

    pub async fn report_post(
        &self,
        post_id: Uuid,
        reason: &str,
        details: &str,
    ) -> EngagementResult<()> {
        let reason = domain::validate_body(reason, "Report reason")?;

        self.api
            .report_post(
                post_id,
                &ReportRequest {
                    reason: reason.to_string(),
                    details: details.trim().to_string(),
                },
            )
            .await?;
        info!(post_id = %post_id, "Post reported");
        Ok(())
    }
}
