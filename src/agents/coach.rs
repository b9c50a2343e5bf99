//! Coach Agent.
//!
//! Turns a player's match summaries into actionable coaching feedback, or
//! answers a follow-up question about the match.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::backend::{AiBackend, ChatMessage, ChatRequest, TokenUsage};
use super::{with_retry, Agent, AgentError, RetryPolicy};
use crate::models::{CombatSummary, PlayerSummary, RoundSummary};

/// Input for the Coach agent.
#[derive(Debug, Clone)]
pub struct CoachInput {
    pub player: PlayerSummary,
    pub combat: CombatSummary,

    /// Per-round view; left out of the prompt when empty.
    pub rounds: Vec<RoundSummary>,

    /// Follow-up question. `None` asks for general feedback.
    pub question: Option<String>,
}

/// Output from the Coach agent.
#[derive(Debug, Clone)]
pub struct CoachOutput {
    pub feedback: String,
    pub model: String,
    pub tokens_used: Option<TokenUsage>,
}

/// Coach agent implementation.
pub struct CoachAgent {
    backend: Arc<dyn AiBackend>,
    max_tokens: u32,
    temperature: f32,
    retry: RetryPolicy,
}

impl CoachAgent {
    pub fn new(backend: Arc<dyn AiBackend>) -> Self {
        Self {
            backend,
            max_tokens: 500,
            temperature: 0.3,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Whether the backend answers its health check. Failures count as down.
    pub async fn check_backend(&self) -> bool {
        match self.backend.health_check().await {
            Ok(up) => up,
            Err(e) => {
                warn!("{} health check errored: {}", self.backend.name(), e);
                false
            }
        }
    }

    fn build_prompt(&self, input: &CoachInput) -> Vec<ChatMessage> {
        let mut prompt = format!(
            "Here is the player summary: {}\n\nHere is the combat summary: {}\n\nKills: {}\n\nDeaths: {}\n",
            to_json(&input.player),
            to_json(&CombatTotals::from(&input.combat)),
            to_json(&input.combat.kills),
            to_json(&input.combat.deaths),
        );

        if !input.rounds.is_empty() {
            prompt.push_str(&format!("\nRound by round: {}\n", to_json(&input.rounds)));
        }

        match &input.question {
            Some(question) => {
                prompt.push_str(&format!(
                    "\nMatch digest:\n{}\n\nThe player asks: {}\nAnswer using the match data above.",
                    match_digest(&input.player, &input.combat),
                    question
                ));
            }
            None => prompt.push_str(FEEDBACK_REQUEST),
        }

        vec![ChatMessage::system(COACH_SYSTEM_PROMPT), ChatMessage::user(prompt)]
    }
}

const COACH_SYSTEM_PROMPT: &str = "You are a professional Valorant coach. \
You review a single competitive match using the statistics you are given. \
Only reference numbers that appear in the data. Be direct and specific.";

const FEEDBACK_REQUEST: &str = "\nProvide actionable feedback on strengths, weaknesses, aim, \
positioning, and ability usage.";

/// Combat summary without the engagement lists, which are sent separately.
#[derive(Serialize)]
struct CombatTotals<'a> {
    total_kills: u32,
    total_deaths: u32,
    first_bloods_won: u32,
    first_deaths: u32,
    multi_kills: &'a std::collections::BTreeMap<u32, u32>,
    clutch_1vx_total: u32,
    clutch_wins: u32,
}

impl<'a> From<&'a CombatSummary> for CombatTotals<'a> {
    fn from(c: &'a CombatSummary) -> Self {
        Self {
            total_kills: c.total_kills,
            total_deaths: c.total_deaths,
            first_bloods_won: c.first_bloods_won,
            first_deaths: c.first_deaths,
            multi_kills: &c.multi_kills,
            clutch_1vx_total: c.clutch_1vx_total,
            clutch_wins: c.clutch_wins,
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}

/// Compact plain-text digest of one match.
pub fn match_digest(player: &PlayerSummary, combat: &CombatSummary) -> String {
    format!(
        "Match on {} as {} ({})\n\
         K/D/A: {}/{}/{}, Headshot%: {}%\n\
         First bloods won: {}\n\
         First deaths: {}\n\
         Multi-kills: {}\n\
         Clutch wins: {}\n\
         Clutch 1vX total: {}",
        player.map,
        player.agent,
        player.tier,
        player.kills,
        player.deaths,
        player.assists,
        player.headshot_percent,
        combat.first_bloods_won,
        combat.first_deaths,
        combat.multi_kill_labels(),
        combat.clutch_wins,
        combat.clutch_1vx_total,
    )
}

#[async_trait]
impl Agent for CoachAgent {
    type Input = CoachInput;
    type Output = CoachOutput;

    fn name(&self) -> &'static str {
        "coach"
    }

    async fn execute(&self, input: Self::Input) -> Result<Self::Output, AgentError> {
        info!(
            "Requesting coaching for {} via {}",
            input.player.player,
            self.backend.name()
        );

        let request = ChatRequest::new(self.build_prompt(&input))
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        let response = with_retry(&self.retry, || self.backend.chat(request.clone())).await?;
        debug!("AI response: {}", response.content);

        let feedback = response.content.trim().to_string();
        if feedback.is_empty() {
            return Err(AgentError::ExtractionRefused(format!(
                "{} returned an empty response",
                response.model
            )));
        }

        if let Some(usage) = &response.tokens_used {
            info!(
                "Coaching generated by {} ({} tokens)",
                response.model, usage.total_tokens
            );
        }

        Ok(CoachOutput {
            feedback,
            model: response.model,
            tokens_used: response.tokens_used,
        })
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.retry.clone()
    }
}
