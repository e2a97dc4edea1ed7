//! Match lifecycle: WAITING -> COUNTDOWN -> ACTIVE -> ENDED -> WAITING

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::ws::protocol::{QueueMode, Team, TeamSummary, TeamsSummary, Winner};

use super::player::PlayerId;
use super::ranking::MatchOutcome;

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPhase {
    /// No match; matchmaking is evaluated
    Waiting,
    /// Roster frozen, ships may turn but not thrust or fire
    Countdown,
    /// Match in progress
    Active,
    /// Settlement in progress (instantaneous)
    Ended,
}

/// Aggregate stats for one team in the current match
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamStats {
    pub score: u64,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub credits: u64,
}

impl TeamStats {
    pub fn record_kill(&mut self, score: u64, credits: u64) {
        self.kills = self.kills.saturating_add(1);
        self.score = self.score.saturating_add(score);
        self.credits = self.credits.saturating_add(credits);
    }

    pub fn record_assist(&mut self, score: u64, credits: u64) {
        self.assists = self.assists.saturating_add(1);
        self.score = self.score.saturating_add(score);
        self.credits = self.credits.saturating_add(credits);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TeamBoard {
    pub red: TeamStats,
    pub blue: TeamStats,
}

impl TeamBoard {
    pub fn get(&self, team: Team) -> &TeamStats {
        match team {
            Team::Red => &self.red,
            Team::Blue => &self.blue,
        }
    }

    pub fn get_mut(&mut self, team: Team) -> &mut TeamStats {
        match team {
            Team::Red => &mut self.red,
            Team::Blue => &mut self.blue,
        }
    }

    /// Higher team score wins; equal scores draw
    pub fn winner(&self) -> Winner {
        match self.red.score.cmp(&self.blue.score) {
            std::cmp::Ordering::Greater => Winner::Red,
            std::cmp::Ordering::Less => Winner::Blue,
            std::cmp::Ordering::Equal => Winner::Draw,
        }
    }

    pub fn summary(&self, red_count: usize, blue_count: usize) -> TeamsSummary {
        let describe = |team: Team, count: usize| TeamSummary {
            stats: *self.get(team),
            count,
            color: team.color().to_string(),
            name: team.display_name().to_string(),
        };
        TeamsSummary {
            red: describe(Team::Red, red_count),
            blue: describe(Team::Blue, blue_count),
        }
    }
}

/// Outcome of a finished match for a player on `team`
pub fn outcome_for(winner: Winner, team: Team) -> MatchOutcome {
    match (winner, team) {
        (Winner::Draw, _) => MatchOutcome::Draw,
        (Winner::Red, Team::Red) | (Winner::Blue, Team::Blue) => MatchOutcome::Win,
        _ => MatchOutcome::Loss,
    }
}

/// Phase transition observed by [`Match::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseChange {
    Activated,
    Ended,
}

/// The single shared match slot
#[derive(Debug, Clone)]
pub struct Match {
    pub id: u64,
    pub phase: MatchPhase,
    pub mode: QueueMode,
    /// Absolute deadlines (unix ms); `None` while waiting
    pub countdown_ends_at: Option<u64>,
    pub ends_at: Option<u64>,
    pub teams: TeamBoard,
    pub roster: HashSet<PlayerId>,
}

impl Default for Match {
    fn default() -> Self {
        Self::new()
    }
}

impl Match {
    pub fn new() -> Self {
        Self {
            id: 0,
            phase: MatchPhase::Waiting,
            mode: QueueMode::Normal,
            countdown_ends_at: None,
            ends_at: None,
            teams: TeamBoard::default(),
            roster: HashSet::new(),
        }
    }

    /// Countdown or active
    pub fn is_live(&self) -> bool {
        matches!(self.phase, MatchPhase::Countdown | MatchPhase::Active)
    }

    pub fn is_active(&self) -> bool {
        self.phase == MatchPhase::Active
    }

    pub fn in_roster(&self, id: &PlayerId) -> bool {
        self.roster.contains(id)
    }

    /// WAITING -> COUNTDOWN. Returns false (no change) unless waiting with a
    /// non-empty roster.
    pub fn begin_countdown(
        &mut self,
        mode: QueueMode,
        roster: HashSet<PlayerId>,
        now: u64,
        countdown_ms: u64,
        match_length_ms: u64,
    ) -> bool {
        if self.phase != MatchPhase::Waiting || roster.is_empty() {
            return false;
        }
        let countdown_ends_at = now + countdown_ms;
        self.id += 1;
        self.phase = MatchPhase::Countdown;
        self.mode = mode;
        self.countdown_ends_at = Some(countdown_ends_at);
        self.ends_at = Some(countdown_ends_at + match_length_ms);
        self.teams = TeamBoard::default();
        self.roster = roster;
        true
    }

    /// Advance time-driven transitions
    pub fn poll(&mut self, now: u64) -> Option<PhaseChange> {
        match self.phase {
            MatchPhase::Countdown if self.countdown_ends_at.is_some_and(|at| now >= at) => {
                self.phase = MatchPhase::Active;
                Some(PhaseChange::Activated)
            }
            MatchPhase::Active if self.ends_at.is_some_and(|at| now >= at) => {
                self.phase = MatchPhase::Ended;
                Some(PhaseChange::Ended)
            }
            _ => None,
        }
    }

    /// ENDED -> WAITING; releases the roster
    pub fn reset(&mut self) -> HashSet<PlayerId> {
        self.phase = MatchPhase::Waiting;
        self.countdown_ends_at = None;
        self.ends_at = None;
        std::mem::take(&mut self.roster)
    }

    pub fn remove_from_roster(&mut self, id: &PlayerId) -> bool {
        self.roster.remove(id)
    }

    /// Milliseconds until the countdown ends (0 outside countdown)
    pub fn countdown_remaining(&self, now: u64) -> u64 {
        match (self.phase, self.countdown_ends_at) {
            (MatchPhase::Countdown, Some(at)) => at.saturating_sub(now),
            _ => 0,
        }
    }

    /// Milliseconds until the match ends (0 outside active)
    pub fn time_remaining(&self, now: u64) -> u64 {
        match (self.phase, self.ends_at) {
            (MatchPhase::Active, Some(at)) => at.saturating_sub(now),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn roster(n: usize) -> HashSet<PlayerId> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn test_full_phase_sequence() {
        let mut m = Match::new();
        assert_eq!(m.phase, MatchPhase::Waiting);
        assert_eq!(m.poll(1_000), None);

        assert!(m.begin_countdown(QueueMode::Ranked, roster(3), 1_000, 30_000, 300_000));
        assert_eq!(m.id, 1);
        assert_eq!(m.phase, MatchPhase::Countdown);
        assert_eq!(m.countdown_remaining(11_000), 20_000);
        assert_eq!(m.time_remaining(11_000), 0);

        assert_eq!(m.poll(30_999), None);
        assert_eq!(m.poll(31_000), Some(PhaseChange::Activated));
        assert_eq!(m.phase, MatchPhase::Active);
        assert_eq!(m.time_remaining(31_000), 300_000);

        assert_eq!(m.poll(330_999), None);
        assert_eq!(m.poll(331_000), Some(PhaseChange::Ended));
        assert_eq!(m.phase, MatchPhase::Ended);

        let released = m.reset();
        assert_eq!(released.len(), 3);
        assert_eq!(m.phase, MatchPhase::Waiting);
        assert!(m.roster.is_empty());
    }

    #[test]
    fn test_countdown_only_from_waiting() {
        let mut m = Match::new();
        assert!(!m.begin_countdown(QueueMode::Normal, HashSet::new(), 0, 10, 10));
        assert!(m.begin_countdown(QueueMode::Normal, roster(2), 0, 10, 10));
        assert!(!m.begin_countdown(QueueMode::Normal, roster(2), 0, 10, 10));
        assert_eq!(m.id, 1);
    }

    #[test]
    fn test_team_stats_reset_on_new_match() {
        let mut m = Match::new();
        m.teams.red.score = 500;
        m.begin_countdown(QueueMode::Normal, roster(2), 0, 10, 10);
        assert_eq!(m.teams.red, TeamStats::default());
    }

    #[test]
    fn test_winner_and_outcome() {
        let mut board = TeamBoard::default();
        assert_eq!(board.winner(), Winner::Draw);
        board.blue.score = 10;
        assert_eq!(board.winner(), Winner::Blue);
        assert_eq!(outcome_for(Winner::Blue, Team::Blue), MatchOutcome::Win);
        assert_eq!(outcome_for(Winner::Blue, Team::Red), MatchOutcome::Loss);
        assert_eq!(outcome_for(Winner::Draw, Team::Red), MatchOutcome::Draw);
    }

    #[test]
    fn test_team_summary_serializes_flat() {
        let mut board = TeamBoard::default();
        board.red.kills = 4;
        let summary = board.summary(5, 5);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["red"]["kills"], 4);
        assert_eq!(json["red"]["count"], 5);
        assert_eq!(json["blue"]["score"], 0);
    }
}
