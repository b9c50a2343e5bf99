//! HenrikDev Valorant API client.
//!
//! Resolves a player's most recent competitive match. All API specifics
//! (endpoint layout, query parameters, envelope shape) live here.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use super::{FetchError, Fetcher};
use crate::models::{MatchDocument, MatchResponse};

/// Player identity and match filter for one lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchQuery {
    /// Riot name (the part before `#`)
    pub name: String,

    /// Riot tag (the part after `#`)
    pub tag: String,

    /// Shard: "ap", "eu", "na", "kr", "latam", "br"
    pub region: String,

    pub platform: String,

    /// Queue filter, e.g. "competitive"
    pub mode: String,

    /// Number of matches to request
    pub size: u32,
}

impl MatchQuery {
    pub fn competitive(
        region: impl Into<String>,
        name: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
            region: region.into(),
            platform: "pc".to_string(),
            mode: "competitive".to_string(),
            size: 1,
        }
    }

    /// `name#tag`, as shown in game.
    pub fn riot_id(&self) -> String {
        format!("{}#{}", self.name, self.tag)
    }
}

/// Client for the v4 matches endpoint.
pub struct MatchClient {
    fetcher: Fetcher,
    api_base: String,
}

impl MatchClient {
    pub fn new(fetcher: Fetcher, api_base: String) -> Self {
        let api_base = api_base.trim_end_matches('/').to_string();
        Self { fetcher, api_base }
    }

    #[cfg(test)]
    pub(crate) fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Build the request URL for a query.
    pub fn matches_url(&self, query: &MatchQuery) -> Result<Url, FetchError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| FetchError::InvalidUrl(format!("Bad API base: {}", e)))?;

        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl(format!("Not a base URL: {}", self.api_base)))?
            .extend([
                "valorant",
                "v4",
                "matches",
                query.region.as_str(),
                query.platform.as_str(),
                query.name.as_str(),
                query.tag.as_str(),
            ]);

        url.query_pairs_mut()
            .append_pair("mode", &query.mode)
            .append_pair("size", &query.size.to_string());

        Ok(url)
    }

    /// Fetch the raw response body for a query.
    pub async fn fetch_raw(&self, query: &MatchQuery) -> Result<String, FetchError> {
        let url = self.matches_url(query)?;
        info!("Fetching latest {} match for {}", query.mode, query.riot_id());

        let fetch_result = self.fetcher.fetch(&url).await?;
        self.fetcher.read_cached_text(&fetch_result).await
    }

    /// Fetch and parse the player's most recent match.
    ///
    /// The raw body is returned alongside so callers can persist it as-is.
    pub async fn fetch_latest(&self, query: &MatchQuery) -> Result<LatestMatch, FetchError> {
        let raw = self.fetch_raw(query).await?;
        let document = parse_latest(&raw, query)?;
        Ok(LatestMatch { document, raw })
    }
}

/// Most recent match plus the response body it came from.
#[derive(Debug, Clone)]
pub struct LatestMatch {
    pub document: MatchDocument,
    pub raw: String,
}

/// Pull the newest match out of a raw envelope.
pub fn parse_latest(raw: &str, query: &MatchQuery) -> Result<MatchDocument, FetchError> {
    let response: MatchResponse = serde_json::from_str(raw).map_err(|e| {
        warn!(
            "Could not parse matches response for {}. Preview: {}",
            query.riot_id(),
            raw.chars().take(300).collect::<String>()
        );
        FetchError::Json(e)
    })?;

    let count = response.data.len();
    let document = response
        .into_latest()
        .ok_or_else(|| FetchError::NoMatches(query.riot_id()))?;

    info!(
        "Got {} match(es) for {}, using {} on {}",
        count,
        query.riot_id(),
        document.match_id(),
        document.map_name()
    );
    Ok(document)
}

/// Save a raw response as pretty-printed JSON.
pub fn save_raw(raw: &str, path: &Path) -> Result<(), FetchError> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    Ok(())
}
