//! Player and per-round summary extraction.

use super::{round_one_decimal, AnalysisError, Lookup};
use crate::models::{MatchDocument, PlayerSummary, RoundSummary};

/// Look up a player's summary. Absence is reported, not raised.
pub fn lookup_player_summary(document: &MatchDocument, player: &str) -> Lookup<PlayerSummary> {
    let Some(data) = document.player(player) else {
        return Lookup::NotFound {
            player: player.to_string(),
        };
    };

    let stats = &data.stats;
    let headshot_percent =
        round_one_decimal(stats.headshots as f64 / stats.total_shots().max(1) as f64 * 100.0);

    Lookup::Found(PlayerSummary {
        player: data.name.clone(),
        match_id: document.match_id().to_string(),
        map: document.map_name().to_string(),
        agent: data.agent.name.clone(),
        tier: data.tier.name.clone(),
        kills: stats.kills,
        deaths: stats.deaths,
        assists: stats.assists,
        headshot_percent,
        ability_usage: data.ability_casts.clone(),
        credits_spent_total: data.economy.spent.overall,
        credits_spent_avg: round_one_decimal(data.economy.spent.average),
    })
}

/// Extract a player's summary, failing if the player is not in the match.
pub fn extract_player_summary(
    document: &MatchDocument,
    player: &str,
) -> Result<PlayerSummary, AnalysisError> {
    lookup_player_summary(document, player).into_result()
}

/// Summaries of every round the player took part in, in round order.
pub fn extract_player_rounds(document: &MatchDocument, player: &str) -> Vec<RoundSummary> {
    let mut rounds: Vec<RoundSummary> = document
        .rounds
        .iter()
        .filter_map(|round| {
            let entry = round.stats_for(player)?;

            let locations = [round.plant.as_ref(), round.defuse.as_ref()]
                .into_iter()
                .flatten()
                .flat_map(|action| action.player_locations.iter())
                .filter(|loc| loc.player.name == player)
                .map(|loc| loc.location)
                .collect();

            Some(RoundSummary {
                round: round.number,
                round_result: round.winning_team,
                won: round.winning_team == entry.player.team,
                stats: entry.stats.clone(),
                economy: entry.economy.clone(),
                locations,
                plant_site: round.plant.as_ref().and_then(|p| p.site.clone()),
            })
        })
        .collect();

    rounds.sort_by_key(|r| r.round);
    rounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AbilityCasts, CreditTotals, Location, MatchMetadata, NamedRef, Player, PlayerEconomy,
        PlayerLocation, PlayerRef, PlayerStats, Round, RoundPlayerStats, SiteAction, Team,
    };

    fn named(name: &str) -> NamedRef {
        NamedRef {
            id: None,
            name: name.to_string(),
        }
    }

    fn player(name: &str, headshots: u32, bodyshots: u32, legshots: u32) -> Player {
        Player {
            name: name.to_string(),
            tag: "OC".to_string(),
            team: Team::Blue,
            agent: named("Sova"),
            tier: named("Diamond 2"),
            stats: PlayerStats {
                score: 4000,
                kills: 18,
                deaths: 14,
                assists: 6,
                headshots,
                bodyshots,
                legshots,
            },
            ability_casts: AbilityCasts {
                grenade: 10,
                ability1: 12,
                ability2: 20,
                ultimate: 2,
            },
            economy: PlayerEconomy {
                spent: CreditTotals {
                    overall: 75000,
                    average: 3260.8695,
                },
                loadout_value: CreditTotals::default(),
            },
        }
    }

    fn document(players: Vec<Player>, rounds: Vec<Round>) -> MatchDocument {
        MatchDocument {
            metadata: MatchMetadata {
                match_id: "match-1".to_string(),
                map: Some(named("Ascent")),
                ..Default::default()
            },
            players,
            rounds,
            kills: Vec::new(),
        }
    }

    fn me(team: Team) -> PlayerRef {
        PlayerRef {
            name: "Swift728".to_string(),
            tag: "OC".to_string(),
            team,
        }
    }

    #[test]
    fn test_extract_player_summary() {
        let doc = document(vec![player("Swift728", 30, 90, 10)], Vec::new());

        let summary = extract_player_summary(&doc, "Swift728").unwrap();

        assert_eq!(summary.player, "Swift728");
        assert_eq!(summary.match_id, "match-1");
        assert_eq!(summary.map, "Ascent");
        assert_eq!(summary.agent, "Sova");
        assert_eq!(summary.tier, "Diamond 2");
        assert_eq!(summary.headshot_percent, 23.1);
        assert_eq!(summary.credits_spent_total, 75000);
        assert_eq!(summary.credits_spent_avg, 3260.9);
        assert_eq!(summary.ability_usage.ultimate, 2);
    }

    #[test]
    fn test_headshot_percent_zero_shots() {
        let doc = document(vec![player("Swift728", 0, 0, 0)], Vec::new());
        let summary = extract_player_summary(&doc, "Swift728").unwrap();
        assert_eq!(summary.headshot_percent, 0.0);
    }

    #[test]
    fn test_headshot_percent_half_rounds_to_even() {
        let mut data = player("Swift728", 1, 15, 0);
        data.economy.spent.average = 3262.45;
        let doc = document(vec![data], Vec::new());

        let summary = extract_player_summary(&doc, "Swift728").unwrap();
        assert_eq!(summary.headshot_percent, 6.2);
        assert_eq!(summary.credits_spent_avg, 3262.4);
    }

    #[test]
    fn test_missing_player_default_summary() {
        let doc = document(vec![player("Swift728", 1, 1, 1)], Vec::new());

        let summary = lookup_player_summary(&doc, "Nobody").unwrap_or_default();
        assert_eq!(summary, PlayerSummary::default());
        assert_eq!(summary.kills, 0);
    }

    #[test]
    fn test_missing_player_is_hard_failure() {
        let doc = document(vec![player("Swift728", 1, 1, 1)], Vec::new());

        let err = extract_player_summary(&doc, "Nobody").unwrap_err();
        assert!(matches!(err, AnalysisError::PlayerNotFound(ref p) if p == "Nobody"));

        assert!(!lookup_player_summary(&doc, "Nobody").is_found());
    }

    #[test]
    fn test_extract_player_rounds() {
        let spot = Location { x: 100, y: -250 };
        let rounds = vec![
            Round {
                number: 1,
                winning_team: Team::Red,
                stats: vec![RoundPlayerStats {
                    player: me(Team::Blue),
                    stats: Default::default(),
                    economy: Default::default(),
                }],
                plant: Some(SiteAction {
                    round_time_in_ms: 40000,
                    site: Some("A".to_string()),
                    player: None,
                    player_locations: vec![PlayerLocation {
                        player: me(Team::Blue),
                        view_radians: 0.5,
                        location: spot,
                    }],
                }),
                defuse: None,
            },
            Round {
                number: 0,
                winning_team: Team::Blue,
                stats: vec![RoundPlayerStats {
                    player: me(Team::Blue),
                    stats: Default::default(),
                    economy: Default::default(),
                }],
                plant: None,
                defuse: None,
            },
            Round {
                number: 2,
                winning_team: Team::Blue,
                stats: Vec::new(),
                plant: None,
                defuse: None,
            },
        ];
        let doc = document(Vec::new(), rounds);

        let summaries = extract_player_rounds(&doc, "Swift728");

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].round, 0);
        assert!(summaries[0].won);
        assert!(summaries[0].locations.is_empty());

        assert_eq!(summaries[1].round, 1);
        assert!(!summaries[1].won);
        assert_eq!(summaries[1].plant_site.as_deref(), Some("A"));
        assert_eq!(summaries[1].locations, vec![spot]);
    }
}
