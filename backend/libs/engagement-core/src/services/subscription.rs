//! Near-real-time updates behind a transport-neutral subscription.
//!
//! [`PollingSubscription`] re-fetches on a fixed interval; a push transport
//! can implement [`Subscription`] without touching call sites.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::{ContentRequest, MessagesApi};
use crate::domain::{self, Message};
use crate::error::EngagementResult;
use crate::metrics::EngagementMetrics;

/// Default polling period while a conversation is open
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[async_trait]
pub trait Subscription: Send {
    type Item: Send;

    /// Next batch, `None` once the subscription is closed
    async fn next(&mut self) -> Option<Self::Item>;

    fn close(&mut self);
}

/// Fixed-interval poller running on a background task
pub struct PollingSubscription<T> {
    rx: mpsc::Receiver<T>,
    handle: JoinHandle<()>,
}

impl<T: Send + 'static> PollingSubscription<T> {
    /// Spawn the poll loop. The first poll runs immediately; failed polls are
    /// logged and skipped, nothing is retried early.
    pub fn spawn<F, Fut>(interval: Duration, poll: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = EngagementResult<T>> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(1);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                match poll().await {
                    Ok(batch) => {
                        EngagementMetrics::record_poll(true);
                        if tx.send(batch).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        EngagementMetrics::record_poll(false);
                        warn!(error = %e, "Poll failed, waiting for next tick");
                    }
                }
            }

            debug!("Polling subscription ended");
        });

        Self { rx, handle }
    }
}

#[async_trait]
impl<T: Send + 'static> Subscription for PollingSubscription<T> {
    type Item = T;

    async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    fn close(&mut self) {
        self.handle.abort();
        self.rx.close();
        // drop a batch that was already buffered
        while self.rx.try_recv().is_ok() {}
    }
}

impl<T> Drop for PollingSubscription<T> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Messages of the open conversation, ordered by creation time, one entry per message id
pub struct ConversationFeed<A: MessagesApi + ?Sized> {
    api: Arc<A>,
    conversation_id: Uuid,
    messages: RwLock<Vec<Message>>,
    seen: RwLock<HashSet<Uuid>>,
}

impl<A: MessagesApi + ?Sized + 'static> ConversationFeed<A> {
    pub fn new(api: Arc<A>, conversation_id: Uuid) -> Self {
        Self {
            api,
            conversation_id,
            messages: RwLock::new(Vec::new()),
            seen: RwLock::new(HashSet::new()),
        }
    }

    pub fn conversation_id(&self) -> Uuid {
        self.conversation_id
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.read().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }

    /// Merge a batch, skipping ids already present. Returns how many were new.
    pub fn merge(&self, batch: Vec<Message>) -> usize {
        let mut seen = self.seen.write();
        let mut messages = self.messages.write();

        let before = messages.len();
        for message in batch {
            if message.conversation_id == self.conversation_id && seen.insert(message.id) {
                messages.push(message);
            }
        }
        let added = messages.len() - before;
        if added > 0 {
            // stable: equal timestamps keep arrival order
            messages.sort_by_key(|m| m.created_at);
        }
        added
    }

    /// Send a message and show it right away from the server's response
    pub async fn send(&self, content: &str) -> EngagementResult<Message> {
        let content = domain::validate_body(content, "Message")?;
        let message = self
            .api
            .send_message(self.conversation_id, &ContentRequest::new(content))
            .await?;
        self.merge(vec![message.clone()]);
        Ok(message)
    }

    /// One immediate fetch
    pub async fn fetch(&self) -> EngagementResult<usize> {
        let batch = self.api.fetch_messages(self.conversation_id).await?;
        Ok(self.merge(batch))
    }

    /// Poll the conversation every `interval`
    pub fn watch(&self, interval: Duration) -> PollingSubscription<Vec<Message>> {
        let api = Arc::clone(&self.api);
        let conversation_id = self.conversation_id;
        info!(conversation_id = %conversation_id, ?interval, "Watching conversation");

        PollingSubscription::spawn(interval, move || {
            let api = Arc::clone(&api);
            async move { api.fetch_messages(conversation_id).await }
        })
    }

    /// Merge the next batch from `subscription`; `None` once it is closed
    pub async fn sync<S>(&self, subscription: &mut S) -> Option<usize>
    where
        S: Subscription<Item = Vec<Message>>,
    {
        let batch = subscription.next().await?;
        Some(self.merge(batch))
    }
}
