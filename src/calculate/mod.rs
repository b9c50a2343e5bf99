//! Match analysis engine.
//!
//! Computes derived summaries from a fetched match document:
//! - Player identity and aggregate stats
//! - Per-round participation
//! - Combat events (first bloods, multi-kills, clutches)

pub mod combat;
pub mod player;
pub mod survival;

use thiserror::Error;

pub use combat::derive_combat_summary;
pub use player::{extract_player_rounds, extract_player_summary, lookup_player_summary};
pub use survival::{simulate_round, AliveRosters};

/// Errors that can occur during analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Player not found in match: {0}")]
    PlayerNotFound(String),

    #[error("Match response contains no matches")]
    NoMatches,

    #[error("Invalid match document: {0}")]
    InvalidDocument(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outcome of looking up a player's data in a match.
///
/// Callers pick the policy: `into_result` turns absence into an error,
/// `unwrap_or_default` treats it as empty.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound { player: String },
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound { .. } => None,
        }
    }

    pub fn into_result(self) -> Result<T, AnalysisError> {
        match self {
            Lookup::Found(value) => Ok(value),
            Lookup::NotFound { player } => Err(AnalysisError::PlayerNotFound(player)),
        }
    }
}

impl<T: Default> Lookup<T> {
    pub fn unwrap_or_default(self) -> T {
        self.found().unwrap_or_default()
    }
}

/// Round to one decimal place on the exact binary value, ties to even.
///
/// `6.25` becomes `6.2` and `3262.45` (stored as `3262.4499..`) becomes
/// `3262.4`; scaling by ten first would round both up.
pub fn round_one_decimal(value: f64) -> f64 {
    format!("{:.1}", value).parse().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_into_result() {
        let found: Lookup<u32> = Lookup::Found(3);
        assert_eq!(found.into_result().unwrap(), 3);

        let missing: Lookup<u32> = Lookup::NotFound {
            player: "Ghost".to_string(),
        };
        let err = missing.into_result().unwrap_err();
        assert!(matches!(err, AnalysisError::PlayerNotFound(ref p) if p == "Ghost"));
    }

    #[test]
    fn test_lookup_unwrap_or_default() {
        let missing: Lookup<u32> = Lookup::NotFound {
            player: "Ghost".to_string(),
        };
        assert!(!missing.is_found());
        assert_eq!(missing.unwrap_or_default(), 0);
    }

    #[test]
    fn test_round_one_decimal() {
        assert_eq!(round_one_decimal(23.456), 23.5);
        assert_eq!(round_one_decimal(0.04), 0.0);
        assert_eq!(round_one_decimal(100.0), 100.0);
    }

    #[test]
    fn test_round_one_decimal_halves() {
        // 1 headshot out of 16 shots is exactly 6.25%.
        assert_eq!(round_one_decimal(1.0 / 16.0 * 100.0), 6.2);
        assert_eq!(round_one_decimal(3262.45), 3262.4);
        assert_eq!(round_one_decimal(0.35), 0.3);
        assert_eq!(round_one_decimal(6.35), 6.3);
        assert_eq!(round_one_decimal(-2.25), -2.2);
    }
}
