/// Configuration management for the engagement sync client
///
/// Loads configuration from environment variables.
use anyhow::{Context, Result};
use engagement_core::FeedScope;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Upper bound accepted for `FEED_PAGE_LIMIT`
pub const MAX_PAGE_LIMIT: u32 = 50;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Engagement API endpoint
    pub api: ApiConfig,
    /// Identity of the signed-in viewer
    pub session: SessionConfig,
    /// Feed loading
    pub feed: FeedConfig,
    /// Conversation polling
    pub messaging: MessagingConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (dev, staging, prod)
    pub env: String,
}

/// Engagement API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL, e.g. https://api.example.com/api/v1
    pub base_url: String,
    /// Bearer token sent with every request
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// Per-request transport timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub viewer_id: Uuid,
}

/// Feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub scope: FeedScope,
    /// Posts per page, 1..=50
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
}

/// Messaging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval: Duration,
    /// Conversation to watch; polling is off when unset
    pub conversation_id: Option<Uuid>,
}

// Default values
fn default_request_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_page_limit() -> u32 {
    10
}

fn default_poll_interval() -> Duration {
    engagement_core::services::DEFAULT_POLL_INTERVAL
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let app = AppConfig {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        };

        let api = ApiConfig {
            base_url: std::env::var("ENGAGEMENT_API_URL")
                .context("ENGAGEMENT_API_URL environment variable not set")?,
            token: std::env::var("ENGAGEMENT_API_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            request_timeout: std::env::var("ENGAGEMENT_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or_else(default_request_timeout),
        };

        let viewer_id = std::env::var("ENGAGEMENT_VIEWER_ID")
            .context("ENGAGEMENT_VIEWER_ID environment variable not set")?;
        let session = SessionConfig {
            viewer_id: Uuid::parse_str(viewer_id.trim())
                .context("ENGAGEMENT_VIEWER_ID must be a UUID")?,
        };

        let feed = FeedConfig {
            scope: match std::env::var("FEED_SCOPE") {
                Ok(scope) => scope
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid FEED_SCOPE: {}", scope))?,
                Err(_) => FeedScope::Global,
            },
            page_limit: std::env::var("FEED_PAGE_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_page_limit)
                .clamp(1, MAX_PAGE_LIMIT),
        };

        let messaging = MessagingConfig {
            poll_interval: std::env::var("MESSAGE_POLL_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|ms: &u64| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or_else(default_poll_interval),
            conversation_id: match std::env::var("MESSAGE_CONVERSATION_ID") {
                Ok(id) => Some(
                    Uuid::parse_str(id.trim())
                        .context("MESSAGE_CONVERSATION_ID must be a UUID")?,
                ),
                Err(_) => None,
            },
        };

        Ok(Config {
            app,
            api,
            session,
            feed,
            messaging,
        })
    }
}
