//! Derived summary models.
//!
//! These are the analysis outputs that get cached as JSON and interpolated
//! into coaching prompts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{AbilityCasts, Location, RoundCombatStats, RoundEconomy, Team};

/// Identity and aggregate stats of one player in one match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub player: String,
    pub match_id: String,
    pub map: String,
    pub agent: String,
    pub tier: String,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,

    /// Headshots over all hits, as a percentage rounded to one decimal.
    pub headshot_percent: f64,

    pub ability_usage: AbilityCasts,
    pub credits_spent_total: u32,
    pub credits_spent_avg: f64,
}

/// One side of a kill event, seen from the target player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Engagement {
    pub round: u32,

    /// Victim for kills, killer for deaths.
    pub opponent: String,

    pub weapon: String,
    pub location: Option<Location>,
    pub time_in_round_ms: u64,
}

/// Combat statistics derived from the kill log and round rosters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombatSummary {
    pub total_kills: u32,
    pub total_deaths: u32,
    pub first_bloods_won: u32,
    pub first_deaths: u32,

    /// Kills-in-a-round (always >= 2) to number of rounds with that count.
    pub multi_kills: BTreeMap<u32, u32>,

    pub clutch_1vx_total: u32,
    pub clutch_wins: u32,

    pub kills: Vec<Engagement>,
    pub deaths: Vec<Engagement>,
}

impl CombatSummary {
    /// Kills per death, treating zero deaths as one.
    pub fn kd_ratio(&self) -> f64 {
        self.total_kills as f64 / self.total_deaths.max(1) as f64
    }

    /// Human-readable multi-kill breakdown, e.g. "2x double, 1x triple".
    pub fn multi_kill_labels(&self) -> String {
        if self.multi_kills.is_empty() {
            return "none".to_string();
        }

        self.multi_kills
            .iter()
            .map(|(&count, &rounds)| format!("{}x {}", rounds, multi_kill_name(count)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn multi_kill_name(count: u32) -> String {
    match count {
        2 => "double".to_string(),
        3 => "triple".to_string(),
        4 => "quadra".to_string(),
        5 => "ace".to_string(),
        n => format!("{}-kill", n),
    }
}

/// One round from the target player's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSummary {
    pub round: u32,
    pub round_result: Team,
    pub won: bool,
    pub stats: RoundCombatStats,
    pub economy: RoundEconomy,

    /// Where the player stood when the spike was planted or defused.
    pub locations: Vec<Location>,

    pub plant_site: Option<String>,
}
