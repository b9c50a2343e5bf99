//! Typed view over a fetched match record.
//!
//! Mirrors the subset of the HenrikDev v4 match payload the analysis needs.
//! Fields the analysis does not read are left out; serde ignores them.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::calculate::AnalysisError;

/// Team label. A match always has exactly two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    Red,
    Blue,
}

impl Team {
    /// The other team.
    pub fn opponent(self) -> Team {
        match self {
            Team::Red => Team::Blue,
            Team::Blue => Team::Red,
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::Red => write!(f, "Red"),
            Team::Blue => write!(f, "Blue"),
        }
    }
}

/// API envelope: `{ "data": [match, ...] }`, most recent match first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResponse {
    #[serde(default)]
    pub data: Vec<MatchDocument>,
}

impl MatchResponse {
    /// The most recent match in the envelope, if any.
    pub fn into_latest(self) -> Option<MatchDocument> {
        self.data.into_iter().next()
    }
}

/// One played match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchDocument {
    #[serde(default)]
    pub metadata: MatchMetadata,

    pub players: Vec<Player>,

    pub rounds: Vec<Round>,

    /// Flat, match-wide kill log. Not guaranteed to be ordered.
    #[serde(default)]
    pub kills: Vec<KillEvent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchMetadata {
    #[serde(default)]
    pub match_id: String,

    #[serde(default)]
    pub map: Option<NamedRef>,

    #[serde(default)]
    pub started_at: Option<String>,

    #[serde(default)]
    pub queue: Option<NamedRef>,
}

/// `{ "id": ..., "name": ... }` reference used for maps, agents, tiers, queues.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedRef {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: Option<String>,
    pub name: String,
}

/// Ids arrive as strings for maps/agents and as integers for tiers.
fn deserialize_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub name: String,

    #[serde(default)]
    pub tag: String,

    #[serde(rename = "team_id")]
    pub team: Team,

    pub agent: NamedRef,

    pub tier: NamedRef,

    pub stats: PlayerStats,

    #[serde(default)]
    pub ability_casts: AbilityCasts,

    #[serde(default)]
    pub economy: PlayerEconomy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerStats {
    #[serde(default)]
    pub score: u32,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub headshots: u32,
    pub bodyshots: u32,
    pub legshots: u32,
}

impl PlayerStats {
    pub fn total_shots(&self) -> u32 {
        self.headshots + self.bodyshots + self.legshots
    }
}

/// Ability cast counts. The API reports `null` for agents that never cast.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityCasts {
    #[serde(default, deserialize_with = "null_as_zero")]
    pub grenade: u32,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub ability1: u32,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub ability2: u32,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub ultimate: u32,
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or(0))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerEconomy {
    #[serde(default)]
    pub spent: CreditTotals,
    #[serde(default)]
    pub loadout_value: CreditTotals,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreditTotals {
    #[serde(default)]
    pub overall: u32,
    #[serde(default)]
    pub average: f64,
}

/// Player reference embedded in rounds and kill events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRef {
    pub name: String,
    #[serde(default)]
    pub tag: String,
    pub team: Team,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    /// Round number, shared with `KillEvent::round`.
    #[serde(rename = "id")]
    pub number: u32,

    pub winning_team: Team,

    /// Per-player stats; the round's starting roster.
    pub stats: Vec<RoundPlayerStats>,

    #[serde(default)]
    pub plant: Option<SiteAction>,

    #[serde(default)]
    pub defuse: Option<SiteAction>,
}

impl Round {
    /// Stats entry for a player in this round.
    pub fn stats_for(&self, player_name: &str) -> Option<&RoundPlayerStats> {
        self.stats.iter().find(|s| s.player.name == player_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundPlayerStats {
    pub player: PlayerRef,

    #[serde(default)]
    pub stats: RoundCombatStats,

    #[serde(default)]
    pub economy: RoundEconomy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundCombatStats {
    #[serde(default)]
    pub score: u32,
    #[serde(default)]
    pub kills: u32,
    #[serde(default)]
    pub headshots: u32,
    #[serde(default)]
    pub bodyshots: u32,
    #[serde(default)]
    pub legshots: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundEconomy {
    #[serde(default)]
    pub loadout_value: u32,
    #[serde(default)]
    pub remaining: u32,
    #[serde(default)]
    pub weapon: Option<NamedRef>,
}

/// Spike plant or defuse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteAction {
    #[serde(default)]
    pub round_time_in_ms: u64,

    #[serde(default)]
    pub site: Option<String>,

    #[serde(default)]
    pub player: Option<PlayerRef>,

    #[serde(default)]
    pub player_locations: Vec<PlayerLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerLocation {
    pub player: PlayerRef,
    #[serde(default)]
    pub view_radians: f64,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: i64,
    pub y: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillEvent {
    pub round: u32,

    /// Milliseconds since round start.
    pub time_in_round_in_ms: u64,

    pub killer: PlayerRef,

    pub victim: PlayerRef,

    #[serde(default)]
    pub weapon: Option<NamedRef>,

    #[serde(default)]
    pub location: Option<Location>,
}

impl KillEvent {
    pub fn weapon_name(&self) -> &str {
        self.weapon
            .as_ref()
            .map(|w| w.name.as_str())
            .unwrap_or("Unknown")
    }
}

impl MatchDocument {
    /// Parse the latest match out of a raw API envelope.
    pub fn from_response_json(json: &str) -> Result<Self, AnalysisError> {
        let response: MatchResponse = serde_json::from_str(json)?;
        response.into_latest().ok_or(AnalysisError::NoMatches)
    }

    pub fn match_id(&self) -> &str {
        &self.metadata.match_id
    }

    pub fn map_name(&self) -> &str {
        self.metadata
            .map
            .as_ref()
            .map(|m| m.name.as_str())
            .unwrap_or("Unknown")
    }

    pub fn player(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    pub fn round(&self, number: u32) -> Option<&Round> {
        self.rounds.iter().find(|r| r.number == number)
    }

    /// Kill events of one round, in log order.
    pub fn kills_in_round(&self, number: u32) -> impl Iterator<Item = &KillEvent> {
        self.kills.iter().filter(move |k| k.round == number)
    }

    /// Check the cross-references the analysis relies on.
    ///
    /// Every kill must point at an existing round and must not be a
    /// self-elimination.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let round_numbers: HashSet<u32> = self.rounds.iter().map(|r| r.number).collect();

        for (index, kill) in self.kills.iter().enumerate() {
            if !round_numbers.contains(&kill.round) {
                return Err(AnalysisError::InvalidDocument(format!(
                    "kill #{} references unknown round {}",
                    index, kill.round
                )));
            }
            if kill.killer.name == kill.victim.name {
                return Err(AnalysisError::InvalidDocument(format!(
                    "kill #{} in round {} is a self-elimination by {}",
                    index, kill.round, kill.killer.name
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player_ref(name: &str, team: Team) -> PlayerRef {
        PlayerRef {
            name: name.to_string(),
            tag: String::new(),
            team,
        }
    }

    fn document(rounds: &[u32], kills: Vec<KillEvent>) -> MatchDocument {
        MatchDocument {
            metadata: MatchMetadata::default(),
            players: Vec::new(),
            rounds: rounds
                .iter()
                .map(|&number| Round {
                    number,
                    winning_team: Team::Red,
                    stats: Vec::new(),
                    plant: None,
                    defuse: None,
                })
                .collect(),
            kills,
        }
    }

    fn kill(round: u32, killer: &str, victim: &str) -> KillEvent {
        KillEvent {
            round,
            time_in_round_in_ms: 1000,
            killer: player_ref(killer, Team::Red),
            victim: player_ref(victim, Team::Blue),
            weapon: None,
            location: None,
        }
    }

    #[test]
    fn test_team_opponent() {
        assert_eq!(Team::Red.opponent(), Team::Blue);
        assert_eq!(Team::Blue.opponent(), Team::Red);
    }

    #[test]
    fn test_validate_ok() {
        let doc = document(&[0, 1], vec![kill(0, "A", "B"), kill(1, "B", "A")]);
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn test_validate_unknown_round() {
        let doc = document(&[0], vec![kill(3, "A", "B")]);
        let err = doc.validate().unwrap_err();
        assert!(err.to_string().contains("unknown round 3"));
    }

    #[test]
    fn test_validate_self_elimination() {
        let doc = document(&[0], vec![kill(0, "A", "A")]);
        assert!(matches!(
            doc.validate(),
            Err(AnalysisError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_unknown_team_label_is_rejected() {
        let json = r#"{"name": "A", "tag": "X", "team": "Green"}"#;
        assert!(serde_json::from_str::<PlayerRef>(json).is_err());
    }

    #[test]
    fn test_missing_timestamp_is_rejected() {
        let json = r#"{
            "round": 0,
            "killer": {"name": "A", "team": "Red"},
            "victim": {"name": "B", "team": "Blue"}
        }"#;
        assert!(serde_json::from_str::<KillEvent>(json).is_err());
    }

    #[test]
    fn test_round_without_stats_is_rejected() {
        let json = r#"{"id": 0, "winning_team": "Red"}"#;
        assert!(serde_json::from_str::<Round>(json).is_err());
    }

    #[test]
    fn test_ability_casts_null() {
        let json = r#"{"grenade": 3, "ability1": null, "ability2": 5, "ultimate": null}"#;
        let casts: AbilityCasts = serde_json::from_str(json).unwrap();
        assert_eq!(casts.grenade, 3);
        assert_eq!(casts.ability1, 0);
        assert_eq!(casts.ultimate, 0);
    }

    #[test]
    fn test_named_ref_numeric_id() {
        let json = r#"{"id": 24, "name": "Immortal 1"}"#;
        let tier: NamedRef = serde_json::from_str(json).unwrap();
        assert_eq!(tier.id.as_deref(), Some("24"));
        assert_eq!(tier.name, "Immortal 1");
    }

    #[test]
    fn test_empty_envelope() {
        let err = MatchDocument::from_response_json(r#"{"data": []}"#).unwrap_err();
        assert!(matches!(err, AnalysisError::NoMatches));
    }
}
