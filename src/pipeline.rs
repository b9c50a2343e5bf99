//! Coaching pipeline.
//!
//! fetch latest match -> validate -> derive summaries (cached) -> coach -> history.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::agents::backend::{create_backend, AiBackend};
use crate::agents::coach::{CoachAgent, CoachInput};
use crate::agents::{Agent, AgentError, RetryPolicy};
use crate::calculate::{
    derive_combat_summary, extract_player_rounds, extract_player_summary, AnalysisError,
};
use crate::config::{ApiConfig, AppConfig, LEGACY_API_KEY_ENV};
use crate::fetch::matches::save_raw;
use crate::fetch::{FetchError, Fetcher, FetcherConfig, MatchClient, MatchQuery};
use crate::models::{CombatSummary, FeedbackRecord, MatchDocument, PlayerSummary, RoundSummary};
use crate::storage::{FeedbackLog, StorageConfig, StorageError, SummaryCache};

pub const PLAYER_SUMMARY_FILE: &str = "player_summary.json";
pub const COMBAT_SUMMARY_FILE: &str = "player_combat_summary.json";
pub const ROUND_SUMMARY_FILE: &str = "round_summary.json";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error("No coach configured")]
    NoCoach,
}

/// Everything derived for one player in one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchAnalysis {
    pub player: PlayerSummary,
    pub combat: CombatSummary,
    pub rounds: Vec<RoundSummary>,
}

/// Result of a full coaching run.
#[derive(Debug, Clone)]
pub struct CoachingReport {
    pub match_id: String,
    pub analysis: MatchAnalysis,
    pub feedback: String,
    pub model: String,
    pub record_id: String,
}

/// Derive all summaries without touching disk.
pub fn analyze(document: &MatchDocument, player: &str) -> Result<MatchAnalysis, AnalysisError> {
    Ok(MatchAnalysis {
        player: extract_player_summary(document, player)?,
        combat: derive_combat_summary(document, player),
        rounds: extract_player_rounds(document, player),
    })
}

/// Derive all summaries, reusing cached files where present.
///
/// The player summary goes first so an unknown player fails before anything
/// is written.
pub fn analyze_cached(
    document: &MatchDocument,
    player: &str,
    cache: &SummaryCache,
) -> Result<MatchAnalysis, PipelineError> {
    let player_summary = cache.load_or_compute(PLAYER_SUMMARY_FILE, || {
        Ok::<_, PipelineError>(extract_player_summary(document, player)?)
    })?;
    let combat = cache.load_or_compute(COMBAT_SUMMARY_FILE, || {
        Ok::<_, PipelineError>(derive_combat_summary(document, player))
    })?;
    let rounds = cache.load_or_compute(ROUND_SUMMARY_FILE, || {
        Ok::<_, PipelineError>(extract_player_rounds(document, player))
    })?;

    Ok(MatchAnalysis {
        player: player_summary,
        combat,
        rounds,
    })
}

/// Read a saved API envelope (e.g. `match_data.json`) and return its latest match.
pub fn load_document(path: &Path) -> Result<MatchDocument, PipelineError> {
    if !path.exists() {
        return Err(StorageError::PathNotFound(path.to_path_buf()).into());
    }
    let raw = std::fs::read_to_string(path).map_err(StorageError::from)?;
    let document = MatchDocument::from_response_json(&raw)?;
    document.validate()?;
    Ok(document)
}

/// Build a query from API settings, with an optional region override.
pub fn match_query(api: &ApiConfig, name: &str, tag: &str, region: Option<&str>) -> MatchQuery {
    let mut query = MatchQuery::competitive(region.unwrap_or(api.region.as_str()), name, tag);
    query.platform = api.platform.clone();
    query.mode = api.mode.clone();
    query
}

pub struct CoachingPipeline {
    client: MatchClient,
    storage: StorageConfig,
    coach: Option<CoachAgent>,
    refresh: bool,
}

impl CoachingPipeline {
    pub fn new(client: MatchClient, storage: StorageConfig) -> Self {
        Self {
            client,
            storage,
            coach: None,
            refresh: false,
        }
    }

    pub fn with_coach(mut self, coach: CoachAgent) -> Self {
        self.coach = Some(coach);
        self
    }

    /// Recompute summaries even when cached files exist.
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    /// Pipeline without an AI backend; enough for fetching and analysis.
    pub fn from_config(config: &AppConfig) -> Result<Self, PipelineError> {
        let storage = StorageConfig::new(config.data_dir.clone());

        let api_key = config.api.api_key();
        if api_key.is_none() {
            warn!(
                "Neither {} nor {} is set, requests will likely be rejected",
                config.api.api_key_env, LEGACY_API_KEY_ENV
            );
        }

        let fetcher = Fetcher::new(FetcherConfig {
            cache_dir: storage.raw_dir(),
            cache_ttl: Duration::from_secs(config.api.cache_ttl_seconds),
            timeout: Duration::from_secs(config.api.timeout_seconds),
            api_key,
            ..FetcherConfig::default()
        })?;

        let client = MatchClient::new(fetcher, config.api.base_url.clone());
        Ok(Self::new(client, storage))
    }

    /// Full pipeline including the configured AI backend.
    pub fn from_config_with_coach(config: &AppConfig) -> Result<Self, PipelineError> {
        let backend: Arc<dyn AiBackend> = Arc::from(create_backend(&config.ai)?);
        let coach = CoachAgent::new(backend)
            .with_max_tokens(config.coach.max_tokens)
            .with_temperature(config.coach.temperature)
            .with_retry_policy(RetryPolicy {
                max_retries: config.ai.max_retries,
                ..RetryPolicy::default()
            });

        Ok(Self::from_config(config)?.with_coach(coach))
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    /// Fetch the player's latest match, save the raw envelope and validate it.
    pub async fn fetch(&self, query: &MatchQuery) -> Result<MatchDocument, PipelineError> {
        let latest = self.client.fetch_latest(query).await?;

        let path = self.storage.match_data_path();
        save_raw(&latest.raw, &path)?;
        info!("Saved raw match data to {:?}", path);

        latest.document.validate()?;
        Ok(latest.document)
    }

    /// Offline part of the pipeline for an already-parsed match.
    pub fn analyze_document(
        &self,
        document: &MatchDocument,
        player: &str,
    ) -> Result<MatchAnalysis, PipelineError> {
        let dir = self.storage.player_summaries_dir(document.match_id(), player);
        let cache = SummaryCache::new(dir);
        if self.refresh {
            info!("Refreshing cached summaries in {:?}", cache.dir());
            cache.clear()?;
        }
        analyze_cached(document, player, &cache)
    }

    /// Analyze a match, request coaching and record it in the history log.
    pub async fn coach_document(
        &self,
        document: &MatchDocument,
        player: &str,
        question: Option<String>,
    ) -> Result<CoachingReport, PipelineError> {
        let coach = self.coach.as_ref().ok_or(PipelineError::NoCoach)?;
        let analysis = self.analyze_document(document, player)?;

        let output = coach
            .execute(CoachInput {
                player: analysis.player.clone(),
                combat: analysis.combat.clone(),
                rounds: analysis.rounds.clone(),
                question: question.clone(),
            })
            .await?;

        let record = FeedbackRecord::new(
            document.match_id(),
            player,
            output.model.clone(),
            question,
            output.feedback.clone(),
        );
        FeedbackLog::new(&self.storage).record(&record)?;
        info!("Recorded feedback {} for {}", record.id, player);

        Ok(CoachingReport {
            match_id: document.match_id().to_string(),
            analysis,
            feedback: output.feedback,
            model: output.model,
            record_id: record.id,
        })
    }

    /// Fetch the latest match for `query` and coach its player.
    pub async fn run(
        &self,
        query: &MatchQuery,
        question: Option<String>,
    ) -> Result<CoachingReport, PipelineError> {
        let coach = self.coach.as_ref().ok_or(PipelineError::NoCoach)?;
        if !coach.check_backend().await {
            warn!("AI backend did not pass its health check, coaching may fail");
        }

        let document = self.fetch(query).await?;
        self.coach_document(&document, &query.name, question).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::backend::MockBackend;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    const FIXTURE: &str = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/competitive_match.json"
    ));

    fn fixture() -> MatchDocument {
        let document = MatchDocument::from_response_json(FIXTURE).unwrap();
        document.validate().unwrap();
        document
    }

    fn pipeline(tmp: &TempDir, backend: Arc<MockBackend>) -> CoachingPipeline {
        let config = AppConfig {
            data_dir: tmp.path().to_path_buf(),
            ..AppConfig::default()
        };
        let coach = CoachAgent::new(backend).with_retry_policy(RetryPolicy::none());
        CoachingPipeline::from_config(&config)
            .unwrap()
            .with_coach(coach)
    }

    #[test]
    fn test_analyze_fixture() {
        let analysis = analyze(&fixture(), "Swift728").unwrap();

        assert_eq!(analysis.player.map, "Ascent");
        assert_eq!(analysis.player.agent, "Sova");
        assert_eq!(analysis.player.tier, "Diamond 2");
        assert_eq!(analysis.player.headshot_percent, 23.8);
        assert_eq!(analysis.player.credits_spent_avg, 3266.7);
        assert_eq!(analysis.player.ability_usage.ultimate, 0);

        let combat = &analysis.combat;
        assert_eq!(combat.total_kills, 3);
        assert_eq!(combat.total_deaths, 1);
        assert_eq!(combat.first_bloods_won, 1);
        assert_eq!(combat.first_deaths, 1);
        assert_eq!(combat.multi_kills, BTreeMap::from([(2, 1)]));
        assert_eq!(combat.clutch_1vx_total, 1);
        assert_eq!(combat.clutch_wins, 1);

        let victims: Vec<&str> = combat.kills.iter().map(|k| k.opponent.as_str()).collect();
        assert_eq!(victims, vec!["Rook", "Vex", "Rook"]);
        assert_eq!(combat.deaths[0].weapon, "Sheriff");

        let won: Vec<bool> = analysis.rounds.iter().map(|r| r.won).collect();
        assert_eq!(won, vec![true, false, true]);
        assert_eq!(analysis.rounds[0].plant_site.as_deref(), Some("A"));
        assert_eq!(analysis.rounds[2].locations.len(), 1);
    }

    #[test]
    fn test_analyze_unknown_player() {
        let err = analyze(&fixture(), "Nobody").unwrap_err();
        assert!(matches!(err, AnalysisError::PlayerNotFound(_)));
    }

    #[test]
    fn test_analyze_cached_writes_files() {
        let tmp = TempDir::new().unwrap();
        let cache = SummaryCache::new(tmp.path().join("m"));
        let document = fixture();

        let first = analyze_cached(&document, "Swift728", &cache).unwrap();
        for name in [PLAYER_SUMMARY_FILE, COMBAT_SUMMARY_FILE, ROUND_SUMMARY_FILE] {
            assert!(cache.path_for(name).exists(), "{} missing", name);
        }

        let second = analyze_cached(&document, "Swift728", &cache).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_analyze_cached_unknown_player_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let cache = SummaryCache::new(tmp.path().join("m"));

        let result = analyze_cached(&fixture(), "Nobody", &cache);
        assert!(matches!(
            result,
            Err(PipelineError::Analysis(AnalysisError::PlayerNotFound(_)))
        ));
        assert!(!cache.dir().exists());
    }

    #[test]
    fn test_load_document() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("match_data.json");
        std::fs::write(&path, FIXTURE).unwrap();

        let document = load_document(&path).unwrap();
        assert_eq!(document.players.len(), 4);

        let missing = load_document(&tmp.path().join("nope.json"));
        assert!(matches!(
            missing,
            Err(PipelineError::Storage(StorageError::PathNotFound(_)))
        ));
    }

    #[test]
    fn test_match_query_from_config() {
        let api = ApiConfig::default();

        let query = match_query(&api, "Swift728", "OC", None);
        assert_eq!(query.region, "ap");
        assert_eq!(query.mode, "competitive");

        let query = match_query(&api, "Swift728", "OC", Some("eu"));
        assert_eq!(query.region, "eu");
    }

    #[tokio::test]
    async fn test_coach_document_records_history() {
        let tmp = TempDir::new().unwrap();
        let backend = Arc::new(MockBackend::new("Hold your first-blood angle longer."));
        let pipeline = pipeline(&tmp, backend.clone());
        let document = fixture();

        let report = pipeline
            .coach_document(&document, "Swift728", Some("Why did I lose round 2?".to_string()))
            .await
            .unwrap();

        assert_eq!(report.feedback, "Hold your first-blood angle longer.");
        assert_eq!(report.match_id, document.match_id());
        assert_eq!(report.analysis.combat.clutch_wins, 1);

        let summaries = pipeline
            .storage()
            .player_summaries_dir(document.match_id(), "Swift728");
        assert!(summaries.join(COMBAT_SUMMARY_FILE).exists());

        let history = FeedbackLog::new(pipeline.storage()).recent(None, 10).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, report.record_id);
        assert_eq!(history[0].question.as_deref(), Some("Why did I lose round 2?"));

        let requests = backend.requests();
        let prompt = &requests[0].messages[1].content;
        assert!(prompt.contains("Why did I lose round 2?"));
        assert!(prompt.contains("Multi-kills: 1x double"));
    }

    #[test]
    fn test_refresh_recomputes_cached_summaries() {
        let tmp = TempDir::new().unwrap();
        let backend = Arc::new(MockBackend::new(""));
        let document = fixture();

        let cached = pipeline(&tmp, backend.clone());
        cached.analyze_document(&document, "Swift728").unwrap();

        let path = cached
            .storage()
            .player_summaries_dir(document.match_id(), "Swift728")
            .join(PLAYER_SUMMARY_FILE);
        let stale = PlayerSummary {
            player: "Swift728".to_string(),
            ..PlayerSummary::default()
        };
        std::fs::write(&path, serde_json::to_string(&stale).unwrap()).unwrap();

        let analysis = cached.analyze_document(&document, "Swift728").unwrap();
        assert_eq!(analysis.player, stale);

        let refreshed = pipeline(&tmp, backend).with_refresh(true);
        let analysis = refreshed.analyze_document(&document, "Swift728").unwrap();
        assert_eq!(analysis.player.map, "Ascent");
        assert_eq!(analysis.player.headshot_percent, 23.8);
    }

    #[tokio::test]
    async fn test_run_serves_cached_response() {
        let tmp = TempDir::new().unwrap();
        let storage = StorageConfig::new(tmp.path().to_path_buf());
        let fetcher = Fetcher::new(FetcherConfig {
            cache_dir: storage.raw_dir(),
            ..FetcherConfig::default()
        })
        .unwrap();

        let api = ApiConfig::default();
        let query = match_query(&api, "Swift728", "OC", None);
        let client = MatchClient::new(fetcher, api.base_url.clone());
        let url = client.matches_url(&query).unwrap();
        client.fetcher().seed_cache(&url, FIXTURE);

        let backend = Arc::new(MockBackend::new("Trade your entry.").unhealthy());
        let coach = CoachAgent::new(backend).with_retry_policy(RetryPolicy::none());
        let pipeline = CoachingPipeline::new(client, storage).with_coach(coach);

        let report = pipeline.run(&query, None).await.unwrap();
        assert_eq!(report.feedback, "Trade your entry.");
        assert_eq!(report.analysis.combat.total_kills, 3);
        assert!(pipeline.storage().match_data_path().exists());
    }

    #[tokio::test]
    async fn test_coach_document_without_coach() {
        let tmp = TempDir::new().unwrap();
        let config = AppConfig {
            data_dir: tmp.path().to_path_buf(),
            ..AppConfig::default()
        };
        let pipeline = CoachingPipeline::from_config(&config).unwrap();

        let result = pipeline.coach_document(&fixture(), "Swift728", None).await;
        assert!(matches!(result, Err(PipelineError::NoCoach)));
    }
}
