//! REST client for the engagement API
//!
//! Implements the collaborator contracts of `engagement-core` over HTTP.
//! Every mutation answers with the full parent post as JSON.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use engagement_core::api::{
    ContentRequest, CreatePostRequest, PostsPage, PostsQuery, ReactRequest, ReportRequest,
};
use engagement_core::{
    EngagementApi, EngagementError, EngagementResult, Message, MessagesApi, Post, ReactionTarget,
};

use crate::config::ApiConfig;

/// Error payload the API returns alongside non-success statuses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(alias = "error")]
    message: String,
}

/// HTTP implementation of [`EngagementApi`] and [`MessagesApi`]
pub struct HttpEngagementApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpEngagementApi {
    pub fn new(config: &ApiConfig) -> EngagementResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| EngagementError::Internal(format!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn execute(&self, builder: RequestBuilder) -> EngagementResult<Response> {
        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, "Engagement API request failed");
            EngagementError::Network(e.to_string())
        })?;

        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "Engagement API response");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }

    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder) -> EngagementResult<T> {
        let response = self.execute(builder).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| EngagementError::Network(e.to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Map a non-success status to the error the core reacts to
pub fn status_error(status: StatusCode, body: &str) -> EngagementError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| {
            if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("Unknown error").to_string()
            } else {
                body.trim().to_string()
            }
        });

    match status {
        StatusCode::NOT_FOUND => EngagementError::NotFound(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            EngagementError::Validation(message)
        }
        _ => EngagementError::Server {
            status: status.as_u16(),
            message,
        },
    }
}

/// Path of the react endpoint for `target` under `post_id`
pub fn reaction_path(post_id: Uuid, target: &ReactionTarget) -> String {
    match target {
        ReactionTarget::Post => format!("/posts/{}/react", post_id),
        ReactionTarget::Comment { comment_id } => {
            format!("/posts/{}/comments/{}/react", post_id, comment_id)
        }
        ReactionTarget::Reply {
            comment_id,
            reply_id,
        } => format!(
            "/posts/{}/comments/{}/replies/{}/react",
            post_id, comment_id, reply_id
        ),
    }
}

#[async_trait]
impl EngagementApi for HttpEngagementApi {
    async fn fetch_posts(&self, query: &PostsQuery) -> EngagementResult<PostsPage> {
        let params = [
            ("scope", query.scope.to_string()),
            ("page", query.page.to_string()),
            ("limit", query.limit.to_string()),
        ];
        self.fetch(self.request(Method::GET, "/posts").query(&params))
            .await
    }

    async fn create_post(&self, request: &CreatePostRequest) -> EngagementResult<Post> {
        self.fetch(self.request(Method::POST, "/posts").json(request))
            .await
    }

    async fn react(
        &self,
        post_id: Uuid,
        target: &ReactionTarget,
        request: &ReactRequest,
    ) -> EngagementResult<Post> {
        let path = reaction_path(post_id, target);
        self.fetch(self.request(Method::PUT, &path).json(request))
            .await
    }

    async fn add_comment(&self, post_id: Uuid, request: &ContentRequest) -> EngagementResult<Post> {
        let path = format!("/posts/{}/comments", post_id);
        self.fetch(self.request(Method::POST, &path).json(request))
            .await
    }

    async fn add_reply(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        request: &ContentRequest,
    ) -> EngagementResult<Post> {
        let path = format!("/posts/{}/comments/{}/replies", post_id, comment_id);
        self.fetch(self.request(Method::POST, &path).json(request))
            .await
    }

    async fn edit_post(&self, post_id: Uuid, request: &ContentRequest) -> EngagementResult<Post> {
        let path = format!("/posts/{}", post_id);
        self.fetch(self.request(Method::PUT, &path).json(request))
            .await
    }

    async fn delete_post(&self, post_id: Uuid) -> EngagementResult<()> {
        let path = format!("/posts/{}", post_id);
        self.execute(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }

    async fn report_post(&self, post_id: Uuid, request: &ReportRequest) -> EngagementResult<()> {
        let path = format!("/posts/{}/report", post_id);
        self.execute(self.request(Method::POST, &path).json(request))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl MessagesApi for HttpEngagementApi {
    async fn fetch_messages(&self, conversation_id: Uuid) -> EngagementResult<Vec<Message>> {
        let path = format!("/conversations/{}/messages", conversation_id);
        self.fetch(self.request(Method::GET, &path)).await
    }

    async fn send_message(
        &self,
        conversation_id: Uuid,
        request: &ContentRequest,
    ) -> EngagementResult<Message> {
        let path = format!("/conversations/{}/messages", conversation_id);
        self.fetch(self.request(Method::POST, &path).json(request))
            .await
    }
}
