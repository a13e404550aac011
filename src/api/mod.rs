//! GoalGPT HTTP API client
//!
//! Fetches predictions and bot statistics and converts the responses into
//! typed records. When a `TtlCache` is attached, fresh cached responses are
//! served without touching the network.

pub mod wire;

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::TtlCache;
use crate::data::{BotStats, Prediction, SchemaMismatchError};

/// Default production API endpoint
pub const DEFAULT_API_URL: &str = "https://api.goalgpt.app";

/// Cache key for bot statistics
pub const BOT_STATS_KEY: &str = "bots:stats";

/// Cache key for the predictions list
pub const PREDICTIONS_KEY: &str = "predictions:all";

/// Time-to-live for cached bot statistics
pub const BOT_STATS_TTL: Duration = Duration::from_millis(300_000);

/// Time-to-live for the cached predictions list
pub const PREDICTIONS_TTL: Duration = Duration::from_millis(60_000);

/// Errors that can occur when calling the API
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("API returned HTTP {0}")]
    Status(u16),

    /// Response body did not match the expected schema
    #[error("unexpected API response: {0}")]
    Schema(#[from] SchemaMismatchError),
}

/// Client for the GoalGPT REST API
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// HTTP client for making requests
    http_client: Client,
    /// Base URL for the API (allows override for testing)
    base_url: String,
    /// Response cache, if enabled
    cache: Option<TtlCache>,
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl ApiClient {
    /// Creates a client for `base_url` with no cache
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache: None,
        }
    }

    /// Attaches a response cache
    pub fn with_cache(mut self, cache: TtlCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches all current predictions
    pub async fn fetch_predictions(&self) -> Result<Vec<Prediction>, ApiError> {
        self.cached(PREDICTIONS_KEY, PREDICTIONS_TTL, || async {
            let body = self.get_json("/api/predictions").await?;
            Ok::<_, ApiError>(wire::parse_predictions(&body)?)
        })
        .await
    }

    /// Fetches per-bot performance statistics
    pub async fn fetch_bot_stats(&self) -> Result<Vec<BotStats>, ApiError> {
        self.cached(BOT_STATS_KEY, BOT_STATS_TTL, || async {
            let body = self.get_json("/api/bots/stats").await?;
            Ok::<_, ApiError>(wire::parse_bot_stats(&body)?)
        })
        .await
    }

    /// Serves `key` from the cache if fresh, otherwise runs `fetch` and stores the result
    ///
    /// A failed cache write is logged and otherwise ignored; the fetched data
    /// is still returned.
    async fn cached<T, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Result<T, ApiError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if let Some(ref cache) = self.cache {
            if let Some(hit) = cache.get::<T>(key).await {
                debug!(key, "serving from cache");
                return Ok(hit);
            }
        }

        let fresh = fetch().await?;

        if let Some(ref cache) = self.cache {
            if let Err(e) = cache.set(key, &fresh, ttl).await {
                warn!(key, error = %e, "failed to cache API response");
            }
        }
        Ok(fresh)
    }

    async fn get_json(&self, path: &str) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "GET");

        let response = self.http_client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        Ok(response.json::<Value>().await?)
    }
}
