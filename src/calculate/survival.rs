//! Round survival replay.
//!
//! Rebuilds who is still alive at the end of a round by replaying its kill
//! events, in round-time order, against the round's starting roster.

use std::collections::BTreeSet;

use crate::models::{KillEvent, Round, Team};

/// Alive players per team at the end of one round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliveRosters {
    pub red: BTreeSet<String>,
    pub blue: BTreeSet<String>,
}

impl AliveRosters {
    /// Seed both rosters from a round's per-player stats.
    pub fn from_round(round: &Round) -> Self {
        let mut rosters = Self::default();
        for entry in &round.stats {
            rosters
                .team_mut(entry.player.team)
                .insert(entry.player.name.clone());
        }
        rosters
    }

    pub fn team(&self, team: Team) -> &BTreeSet<String> {
        match team {
            Team::Red => &self.red,
            Team::Blue => &self.blue,
        }
    }

    fn team_mut(&mut self, team: Team) -> &mut BTreeSet<String> {
        match team {
            Team::Red => &mut self.red,
            Team::Blue => &mut self.blue,
        }
    }

    /// Team the player is rostered on, if any.
    pub fn team_of(&self, player: &str) -> Option<Team> {
        if self.red.contains(player) {
            Some(Team::Red)
        } else if self.blue.contains(player) {
            Some(Team::Blue)
        } else {
            None
        }
    }

    pub fn is_alive(&self, player: &str) -> bool {
        self.team_of(player).is_some()
    }

    /// Remove an eliminated player. No-op if already gone.
    fn eliminate(&mut self, player: &str) {
        if !self.red.remove(player) {
            self.blue.remove(player);
        }
    }
}

/// Sort a round's events by time in round. Ties keep their input order.
pub fn chronological<'a, I>(events: I) -> Vec<&'a KillEvent>
where
    I: IntoIterator<Item = &'a KillEvent>,
{
    let mut sorted: Vec<&KillEvent> = events.into_iter().collect();
    sorted.sort_by_key(|k| k.time_in_round_in_ms);
    sorted
}

/// Replay `events` against `round`'s roster and return who survived.
pub fn simulate_round<'a, I>(round: &Round, events: I) -> AliveRosters
where
    I: IntoIterator<Item = &'a KillEvent>,
{
    let mut rosters = AliveRosters::from_round(round);
    for kill in chronological(events) {
        rosters.eliminate(&kill.victim.name);
    }
    rosters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PlayerRef, RoundPlayerStats};

    fn player_ref(name: &str, team: Team) -> PlayerRef {
        PlayerRef {
            name: name.to_string(),
            tag: String::new(),
            team,
        }
    }

    fn round(red: &[&str], blue: &[&str]) -> Round {
        let stats = red
            .iter()
            .map(|n| (n, Team::Red))
            .chain(blue.iter().map(|n| (n, Team::Blue)))
            .map(|(n, team)| RoundPlayerStats {
                player: player_ref(n, team),
                stats: Default::default(),
                economy: Default::default(),
            })
            .collect();

        Round {
            number: 0,
            winning_team: Team::Red,
            stats,
            plant: None,
            defuse: None,
        }
    }

    fn kill(time: u64, killer: &str, victim: &str) -> KillEvent {
        KillEvent {
            round: 0,
            time_in_round_in_ms: time,
            killer: player_ref(killer, Team::Red),
            victim: player_ref(victim, Team::Blue),
            weapon: None,
            location: None,
        }
    }

    #[test]
    fn test_rosters_seeded_from_stats() {
        let rosters = AliveRosters::from_round(&round(&["A", "B"], &["C"]));
        assert_eq!(rosters.red.len(), 2);
        assert_eq!(rosters.blue.len(), 1);
        assert_eq!(rosters.team_of("C"), Some(Team::Blue));
        assert_eq!(rosters.team_of("Z"), None);
    }

    #[test]
    fn test_replay_removes_victims() {
        let r = round(&["A", "B"], &["C", "D"]);
        let events = vec![kill(500, "A", "C"), kill(900, "D", "B")];

        let alive = simulate_round(&r, &events);

        assert!(alive.is_alive("A"));
        assert!(!alive.is_alive("B"));
        assert!(!alive.is_alive("C"));
        assert!(alive.is_alive("D"));
    }

    #[test]
    fn test_repeated_victim_is_idempotent() {
        let r = round(&["A"], &["C", "D"]);
        let events = vec![kill(100, "A", "C"), kill(200, "A", "C")];

        let alive = simulate_round(&r, &events);
        assert_eq!(alive.team(Team::Blue).len(), 1);
        assert_eq!(alive.team(Team::Red).len(), 1);
    }

    #[test]
    fn test_unknown_victim_ignored() {
        let r = round(&["A"], &["C"]);
        let alive = simulate_round(&r, &[kill(100, "A", "Nobody")]);
        assert_eq!(alive, AliveRosters::from_round(&r));
    }

    #[test]
    fn test_chronological_is_stable() {
        let events = vec![
            kill(2000, "A", "X"),
            kill(1000, "B", "Y"),
            kill(1000, "C", "Z"),
        ];

        let sorted = chronological(&events);
        let victims: Vec<&str> = sorted.iter().map(|k| k.victim.name.as_str()).collect();
        assert_eq!(victims, vec!["Y", "Z", "X"]);
    }

    #[test]
    fn test_each_round_starts_fresh() {
        let r = round(&["A"], &["C"]);
        let first = simulate_round(&r, &[kill(100, "A", "C")]);
        let second = simulate_round(&r, std::iter::empty());

        assert!(!first.is_alive("C"));
        assert!(second.is_alive("C"));
    }
}
