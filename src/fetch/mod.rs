//! HTTP fetching with caching.
//!
//! Fetches raw JSON from the match statistics API and caches it locally so
//! repeated runs against the same match do not spend API quota.

pub mod matches;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};
use url::Url;

pub use matches::{LatestMatch, MatchClient, MatchQuery};

/// Errors that can occur during fetching.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Rate limited by {host}, retry after {retry_after_secs}s")]
    RateLimited { host: String, retry_after_secs: u64 },

    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("Content too large: {size} bytes (max {max_size})")]
    ContentTooLarge { size: usize, max_size: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No competitive matches found for {0}")]
    NoMatches(String),
}

/// Result of a fetch operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult {
    pub url: Url,

    /// Path where the body is cached
    pub cache_path: PathBuf,

    pub content_length: usize,

    pub fetched_at: DateTime<Utc>,

    /// Whether this was served from cache
    pub from_cache: bool,
}

/// Sidecar metadata stored next to a cached body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub url: String,
    pub fetched_at: DateTime<Utc>,
    pub content_type: Option<String>,
    pub content_length: usize,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Directory to cache raw content
    pub cache_dir: PathBuf,

    /// How long cached content is considered fresh
    pub cache_ttl: Duration,

    /// Maximum body size to accept (default 20MB)
    pub max_content_size: usize,

    pub timeout: Duration,

    pub user_agent: String,

    /// Sent verbatim as the `Authorization` header when set
    pub api_key: Option<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./data/raw"),
            cache_ttl: Duration::from_secs(600), // 10 minutes
            max_content_size: 20 * 1024 * 1024,
            timeout: Duration::from_secs(30),
            user_agent: format!("match-coach/{}", env!("CARGO_PKG_VERSION")),
            api_key: None,
        }
    }
}

/// HTTP fetcher with local caching.
pub struct Fetcher {
    client: Client,
    config: FetcherConfig,
}

impl Fetcher {
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("match-coach")),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

        if let Some(key) = &config.api_key {
            let mut value = HeaderValue::from_str(key)
                .map_err(|e| FetchError::InvalidHeader(e.to_string()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    pub fn with_defaults() -> Result<Self, FetchError> {
        Self::new(FetcherConfig::default())
    }

    /// Fetch a URL, using cache if available and fresh.
    pub async fn fetch(&self, url: &Url) -> Result<FetchResult, FetchError> {
        let cache_path = self.cache_path_for_url(url);
        let meta_path = self.meta_path_for_url(url);

        if let Some(result) = self.check_cache(url, &cache_path, &meta_path).await? {
            return Ok(result);
        }

        self.fetch_and_cache(url, &cache_path, &meta_path).await
    }

    /// Force fetch from network, ignoring cache.
    pub async fn fetch_fresh(&self, url: &Url) -> Result<FetchResult, FetchError> {
        let cache_path = self.cache_path_for_url(url);
        let meta_path = self.meta_path_for_url(url);
        self.fetch_and_cache(url, &cache_path, &meta_path).await
    }

    async fn check_cache(
        &self,
        url: &Url,
        cache_path: &Path,
        meta_path: &Path,
    ) -> Result<Option<FetchResult>, FetchError> {
        if !cache_path.exists() || !meta_path.exists() {
            return Ok(None);
        }

        let meta_content = fs::read_to_string(meta_path).await?;
        let meta: CacheMetadata = match serde_json::from_str(&meta_content) {
            Ok(m) => m,
            Err(_) => return Ok(None),
        };

        let age = Utc::now().signed_duration_since(meta.fetched_at);
        if age.num_seconds() > self.config.cache_ttl.as_secs() as i64 {
            debug!("Cache expired for {}", url);
            return Ok(None);
        }

        info!("Serving {} from cache", url);
        Ok(Some(FetchResult {
            url: url.clone(),
            cache_path: cache_path.to_path_buf(),
            content_length: meta.content_length,
            fetched_at: meta.fetched_at,
            from_cache: true,
        }))
    }

    async fn fetch_and_cache(
        &self,
        url: &Url,
        cache_path: &Path,
        meta_path: &Path,
    ) -> Result<FetchResult, FetchError> {
        info!("Fetching {}", url);

        let response = self.client.get(url.as_str()).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(FetchError::RateLimited {
                host: url.host_str().unwrap_or("unknown").to_string(),
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let content = response.bytes().await?;

        if content.len() > self.config.max_content_size {
            return Err(FetchError::ContentTooLarge {
                size: content.len(),
                max_size: self.config.max_content_size,
            });
        }

        if let Some(parent) = cache_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(cache_path, &content).await?;

        let fetched_at = Utc::now();
        let meta = CacheMetadata {
            url: url.to_string(),
            fetched_at,
            content_type,
            content_length: content.len(),
            expires_at: Some(
                fetched_at + chrono::Duration::seconds(self.config.cache_ttl.as_secs() as i64),
            ),
        };
        fs::write(meta_path, serde_json::to_string_pretty(&meta)?).await?;

        Ok(FetchResult {
            url: url.clone(),
            cache_path: cache_path.to_path_buf(),
            content_length: content.len(),
            fetched_at,
            from_cache: false,
        })
    }

    fn cache_path_for_url(&self, url: &Url) -> PathBuf {
        let host = url.host_str().unwrap_or("unknown");
        self.config
            .cache_dir
            .join(host)
            .join(format!("{}.json", Self::url_hash(url)))
    }

    fn meta_path_for_url(&self, url: &Url) -> PathBuf {
        let host = url.host_str().unwrap_or("unknown");
        self.config
            .cache_dir
            .join(host)
            .join(format!("{}.meta.json", Self::url_hash(url)))
    }

    /// First 8 bytes of the URL's SHA256, hex encoded.
    fn url_hash(url: &Url) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_str().as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..8])
    }

    pub async fn read_cached_text(&self, result: &FetchResult) -> Result<String, FetchError> {
        Ok(fs::read_to_string(&result.cache_path).await?)
    }

    /// Write `body` into the cache for `url` as if it had just been fetched.
    #[cfg(test)]
    pub(crate) fn seed_cache(&self, url: &Url, body: &str) {
        let cache_path = self.cache_path_for_url(url);
        let meta_path = self.meta_path_for_url(url);
        std::fs::create_dir_all(cache_path.parent().unwrap()).unwrap();
        std::fs::write(&cache_path, body).unwrap();

        let meta = CacheMetadata {
            url: url.to_string(),
            fetched_at: Utc::now(),
            content_type: Some("application/json".to_string()),
            content_length: body.len(),
            expires_at: None,
        };
        std::fs::write(&meta_path, serde_json::to_string(&meta).unwrap()).unwrap();
    }
}
