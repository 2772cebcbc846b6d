//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;

use crate::cache::DEFAULT_TTL_MS;
use crate::gate::DEFAULT_COOLDOWN_MS;

const DEFAULT_UPSTREAM_URL: &str = "https://api.twitter.com/2/tweets/search/recent";
const DEFAULT_SEARCH_QUERY: &str = "(crypto OR bitcoin OR ethereum) lang:en -is:retweet";
const DEFAULT_CACHE_KEY: &str = "twitter_sentiment";
const DEFAULT_SENTIMENT_KEY: &str = "sentiment_data";

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Freshness window for cached payloads, in milliseconds
    pub cache_ttl_ms: u64,
    /// Minimum spacing between upstream calls, in milliseconds
    pub cooldown_ms: u64,
    /// Cache slot served by the feed endpoint
    pub cache_key: String,
    /// Cache slot served by the sentiment endpoint
    pub sentiment_key: String,
    /// Recent-search endpoint
    pub upstream_url: String,
    /// Bearer token for the upstream, if it needs one
    pub bearer_token: Option<String>,
    /// Search query sent upstream
    pub search_query: String,
    /// Results requested per upstream call
    pub max_results: u32,
    /// Results kept in the served payload
    pub display_limit: usize,
    /// Results requested per upstream call for the sentiment endpoint
    pub sentiment_max_results: u32,
    /// Upstream request timeout in seconds
    pub upstream_timeout_secs: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_TTL_MS` - Cache TTL in milliseconds (default: 3600000)
    /// - `COOLDOWN_MS` - Upstream cooldown in milliseconds (default: 60000)
    /// - `CACHE_KEY` - Cache slot for the feed (default: twitter_sentiment)
    /// - `SENTIMENT_CACHE_KEY` - Cache slot for the sentiment posts (default: sentiment_data)
    /// - `UPSTREAM_URL` - Search endpoint URL
    /// - `UPSTREAM_BEARER_TOKEN` - Bearer token (default: unset)
    /// - `UPSTREAM_QUERY` - Search query
    /// - `UPSTREAM_MAX_RESULTS` - Results per upstream call (default: 10)
    /// - `DISPLAY_LIMIT` - Results kept per payload (default: 5)
    /// - `SENTIMENT_MAX_RESULTS` - Results per sentiment upstream call (default: 5)
    /// - `UPSTREAM_TIMEOUT_SECS` - Upstream timeout (default: 10)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            cache_ttl_ms: parse_var("CACHE_TTL_MS").unwrap_or(defaults.cache_ttl_ms),
            cooldown_ms: parse_var("COOLDOWN_MS").unwrap_or(defaults.cooldown_ms),
            cache_key: non_empty_var("CACHE_KEY").unwrap_or(defaults.cache_key),
            sentiment_key: non_empty_var("SENTIMENT_CACHE_KEY").unwrap_or(defaults.sentiment_key),
            upstream_url: non_empty_var("UPSTREAM_URL").unwrap_or(defaults.upstream_url),
            bearer_token: non_empty_var("UPSTREAM_BEARER_TOKEN"),
            search_query: non_empty_var("UPSTREAM_QUERY").unwrap_or(defaults.search_query),
            max_results: parse_var("UPSTREAM_MAX_RESULTS").unwrap_or(defaults.max_results),
            display_limit: parse_var("DISPLAY_LIMIT").unwrap_or(defaults.display_limit),
            sentiment_max_results: parse_var("SENTIMENT_MAX_RESULTS")
                .unwrap_or(defaults.sentiment_max_results),
            upstream_timeout_secs: parse_var("UPSTREAM_TIMEOUT_SECS")
                .unwrap_or(defaults.upstream_timeout_secs),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            cache_ttl_ms: DEFAULT_TTL_MS,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            cache_key: DEFAULT_CACHE_KEY.to_string(),
            sentiment_key: DEFAULT_SENTIMENT_KEY.to_string(),
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            bearer_token: None,
            search_query: DEFAULT_SEARCH_QUERY.to_string(),
            max_results: 10,
            display_limit: 5,
            sentiment_max_results: 5,
            upstream_timeout_secs: 10,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cache_ttl_ms, 3_600_000);
        assert_eq!(config.cooldown_ms, 60_000);
        assert_eq!(config.cache_key, "twitter_sentiment");
        assert_eq!(config.sentiment_key, "sentiment_data");
        assert_eq!(config.max_results, 10);
        assert_eq!(config.sentiment_max_results, 5);
        assert_eq!(config.display_limit, 5);
        assert!(config.bearer_token.is_none());
    }

    #[test]
    fn test_config_from_env() {
        // Single test touches the environment to avoid races between tests
        env::remove_var("SERVER_PORT");
        env::remove_var("CACHE_TTL_MS");
        env::remove_var("UPSTREAM_BEARER_TOKEN");
        env::set_var("COOLDOWN_MS", "1500");
        env::set_var("CACHE_KEY", "  ");
        env::set_var("DISPLAY_LIMIT", "not-a-number");
        env::set_var("SENTIMENT_CACHE_KEY", "digest");

        let config = Config::from_env();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cache_ttl_ms, 3_600_000);
        assert_eq!(config.cooldown_ms, 1500);
        assert_eq!(config.cache_key, "twitter_sentiment");
        assert_eq!(config.display_limit, 5);
        assert_eq!(config.sentiment_key, "digest");
        assert!(config.bearer_token.is_none());

        env::remove_var("COOLDOWN_MS");
        env::remove_var("CACHE_KEY");
        env::remove_var("DISPLAY_LIMIT");
        env::remove_var("SENTIMENT_CACHE_KEY");
    }
}
