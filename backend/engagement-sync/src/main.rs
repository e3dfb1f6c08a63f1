use anyhow::{Context, Result};
use prometheus::{Encoder, Registry, TextEncoder};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use engagement_core::{ConversationFeed, EngagementMetrics};
use engagement_sync::session::{log_feed, spawn_event_log};
use engagement_sync::{Config, EngagementSession, HttpEngagementApi};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,engagement_core=debug,engagement_sync=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_line_number(true)
                .with_target(true),
        )
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        env = %config.app.env,
        api = %config.api.base_url,
        viewer_id = %config.session.viewer_id,
        scope = %config.feed.scope,
        "Starting engagement-sync"
    );

    let registry = Registry::new();
    EngagementMetrics::register(&registry).context("Failed to register metrics")?;

    let api = Arc::new(HttpEngagementApi::new(&config.api).context("Failed to build API client")?);
    let session = EngagementSession::new(Arc::clone(&api), config.session.viewer_id, &config.feed);
    let event_log = spawn_event_log(&session.store);

    let outcome = session
        .loader
        .refresh()
        .await
        .context("Failed to load first feed page")?;
    info!(?outcome, posts = session.feed.len(), "Feed ready");
    log_feed(&session.feed.posts());

    if let Some(conversation_id) = config.messaging.conversation_id {
        let conversation = ConversationFeed::new(api, conversation_id);
        let mut subscription = conversation.watch(config.messaging.poll_interval);

        loop {
            tokio::select! {
                synced = conversation.sync(&mut subscription) => match synced {
                    Some(0) => {}
                    Some(added) => info!(added, total = conversation.len(), "Conversation updated"),
                    None => {
                        warn!("Conversation subscription ended");
                        break;
                    }
                },
                signal = tokio::signal::ctrl_c() => {
                    if let Err(e) = signal {
                        error!("Failed to listen for shutdown signal: {}", e);
                    }
                    info!("Shutting down");
                    break;
                }
            }
        }
    }

    drop(session);
    event_log.abort();

    let mut buffer = Vec::new();
    match TextEncoder::new().encode(&registry.gather(), &mut buffer) {
        Ok(()) => debug!(metrics = %String::from_utf8_lossy(&buffer), "Engagement metrics"),
        Err(e) => warn!("Failed to encode metrics: {}", e),
    }
    Ok(())
}
