//! Combat event derivation.
//!
//! Walks the kill log and the round rosters of one match and derives the
//! target player's combat summary: kill/death lists, first bloods, first
//! deaths, multi-kill histogram and 1vX clutches.

use std::collections::BTreeMap;

use tracing::debug;

use super::survival::{chronological, simulate_round};
use crate::models::{CombatSummary, Engagement, KillEvent, MatchDocument, Round};

/// Derive the combat summary for `player` in `document`.
///
/// A player who appears nowhere in the match yields an all-zero summary.
pub fn derive_combat_summary(document: &MatchDocument, player: &str) -> CombatSummary {
    let mut summary = CombatSummary::default();

    for (_, events) in group_by_round(&document.kills) {
        tally_round_events(&mut summary, &events, player);
    }

    for round in &document.rounds {
        tally_clutch(&mut summary, round, document.kills_in_round(round.number), player);
    }

    summary.total_kills = summary.kills.len() as u32;
    summary.total_deaths = summary.deaths.len() as u32;

    debug!(
        player,
        kills = summary.total_kills,
        deaths = summary.total_deaths,
        clutches = summary.clutch_1vx_total,
        "Derived combat summary"
    );

    summary
}

/// Kill events keyed by round number, each group in round-time order.
fn group_by_round(kills: &[KillEvent]) -> BTreeMap<u32, Vec<&KillEvent>> {
    let mut rounds: BTreeMap<u32, Vec<&KillEvent>> = BTreeMap::new();
    for kill in kills {
        rounds.entry(kill.round).or_default().push(kill);
    }
    rounds
        .into_iter()
        .map(|(round, events)| (round, chronological(events)))
        .collect()
}

fn tally_round_events(summary: &mut CombatSummary, events: &[&KillEvent], player: &str) {
    if let Some(first) = events.first() {
        if first.killer.name == player {
            summary.first_bloods_won += 1;
        } else if first.victim.name == player {
            summary.first_deaths += 1;
        }
    }

    let mut round_kills = 0;
    for kill in events {
        if kill.killer.name == player {
            round_kills += 1;
            summary.kills.push(engagement(kill, &kill.victim.name));
        }
        if kill.victim.name == player {
            summary.deaths.push(engagement(kill, &kill.killer.name));
        }
    }

    if round_kills >= 2 {
        *summary.multi_kills.entry(round_kills).or_insert(0) += 1;
    }
}

fn tally_clutch<'a, I>(summary: &mut CombatSummary, round: &Round, events: I, player: &str)
where
    I: IntoIterator<Item = &'a KillEvent>,
{
    let alive = simulate_round(round, events);

    // Not rostered (or already dead): no clutch either way.
    let Some(team) = alive.team_of(player) else {
        return;
    };

    let teammates_alive = alive.team(team).len() - 1;
    let enemies_alive = alive.team(team.opponent()).len();

    if teammates_alive == 0 && enemies_alive >= 1 {
        summary.clutch_1vx_total += 1;
        if round.winning_team == team {
            summary.clutch_wins += 1;
        }
    }
}

fn engagement(kill: &KillEvent, opponent: &str) -> Engagement {
    Engagement {
        round: kill.round,
        opponent: opponent.to_string(),
        weapon: kill.weapon_name().to_string(),
        location: kill.location,
        time_in_round_ms: kill.time_in_round_in_ms,
    }
}
