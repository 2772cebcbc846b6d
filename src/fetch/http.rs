//! HTTP Upstream
//!
//! Calls a recent-search endpoint and shapes its response into the payload
//! served to clients.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::Config;
use crate::fetch::{empty_payload, Upstream, UpstreamError};

/// Fields requested for every search result
const RESULT_FIELDS: &str = "created_at,public_metrics";

// == Shape ==
/// Payload layout built from a search response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// `{items, count, timestamp}` holding at most `limit` results
    Items { limit: usize },
    /// `{twitter: {posts}, reddit: {posts}}` holding every returned result
    Posts,
}

// == HTTP Upstream ==
/// [`Upstream`] backed by a bearer-authenticated search API.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    url: String,
    bearer_token: Option<String>,
    query: String,
    max_results: u32,
    shape: Shape,
}

impl HttpUpstream {
    /// Upstream for the item feed, trimmed to `display_limit`.
    pub fn from_config(config: &Config) -> Result<Self, UpstreamError> {
        Self::build(
            config,
            config.max_results,
            Shape::Items {
                limit: config.display_limit,
            },
        )
    }

    /// Upstream for the posts feed, asking for `sentiment_max_results`.
    pub fn posts_from_config(config: &Config) -> Result<Self, UpstreamError> {
        Self::build(config, config.sentiment_max_results, Shape::Posts)
    }

    fn build(config: &Config, max_results: u32, shape: Shape) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: config.upstream_url.clone(),
            bearer_token: config.bearer_token.clone(),
            query: config.search_query.clone(),
            max_results,
            shape,
        })
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn fetch(&self) -> Result<Value, UpstreamError> {
        let max_results = self.max_results.to_string();
        let mut request = self.client.get(&self.url).query(&[
            ("query", self.query.as_str()),
            ("tweet.fields", RESULT_FIELDS),
            ("max_results", max_results.as_str()),
        ]);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let body: Value = response.json().await?;
        debug!(url = %self.url, shape = ?self.shape, "upstream search returned");
        Ok(match self.shape {
            Shape::Items { limit } => shape_results(&body, limit),
            Shape::Posts => shape_posts(&body),
        })
    }

    fn empty_payload(&self) -> Value {
        match self.shape {
            Shape::Items { .. } => empty_payload(),
            Shape::Posts => empty_posts(),
        }
    }
}

// == Response Shaping ==
/// Turns a raw search response into `{items, count, timestamp}`.
///
/// A body without a `data` array is an empty, successful result.
pub fn shape_results(body: &Value, limit: usize) -> Value {
    let items: Vec<Value> = body
        .get("data")
        .and_then(Value::as_array)
        .map(|results| results.iter().take(limit).map(shape_item).collect())
        .unwrap_or_default();

    json!({
        "count": items.len(),
        "items": items,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })
}

fn shape_item(result: &Value) -> Value {
    let metrics = result
        .get("public_metrics")
        .cloned()
        .unwrap_or_else(|| json!({ "like_count": 0, "retweet_count": 0 }));

    json!({
        "id": result.get("id").cloned().unwrap_or(Value::Null),
        "text": result.get("text").cloned().unwrap_or(Value::Null),
        "created_at": result.get("created_at").cloned().unwrap_or(Value::Null),
        "metrics": metrics,
        "platform": "twitter",
    })
}

/// Turns a raw search response into `{twitter: {posts}, reddit: {posts}}`.
///
/// The reddit list is always empty; only one platform is searched.
pub fn shape_posts(body: &Value) -> Value {
    let posts: Vec<Value> = body
        .get("data")
        .and_then(Value::as_array)
        .map(|results| {
            results
                .iter()
                .map(|result| {
                    json!({
                        "text": result.get("text").cloned().unwrap_or(Value::Null),
                        "platform": "twitter",
                        "timestamp": result.get("created_at").cloned().unwrap_or(Value::Null),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    json!({
        "twitter": { "posts": posts },
        "reddit": { "posts": [] },
    })
}

/// The posts layout with nothing in it.
pub fn empty_posts() -> Value {
    json!({
        "twitter": { "posts": [] },
        "reddit": { "posts": [] },
    })
}
