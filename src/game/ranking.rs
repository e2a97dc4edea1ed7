//! Ranked rating: RP deltas, tier resolution and forfeit penalties

use serde::{Deserialize, Serialize};

/// Bounds of a single match's RP change
pub const MAX_RP_DELTA: i64 = 220;

/// Ascending RP thresholds. The last tier has no sublevel.
pub const RANK_TIERS: [(i64, &str, Option<u8>); 16] = [
    (0, "Demir", Some(1)),
    (350, "Demir", Some(2)),
    (550, "Demir", Some(3)),
    (750, "Bronz", Some(1)),
    (980, "Bronz", Some(2)),
    (1200, "Bronz", Some(3)),
    (1450, "Gümüş", Some(1)),
    (1750, "Gümüş", Some(2)),
    (2050, "Gümüş", Some(3)),
    (2350, "Altın", Some(1)),
    (2650, "Altın", Some(2)),
    (2950, "Altın", Some(3)),
    (3250, "Elmas", Some(1)),
    (3550, "Elmas", Some(2)),
    (3850, "Elmas", Some(3)),
    (4200, "Space", None),
];

/// Result of a match from one player's perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOutcome {
    Win,
    Loss,
    Draw,
}

impl MatchOutcome {
    fn bonus(self) -> f64 {
        match self {
            MatchOutcome::Win => 140.0,
            MatchOutcome::Loss => -160.0,
            MatchOutcome::Draw => -40.0,
        }
    }
}

/// Resolved tier for an RP value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankInfo {
    pub tier: &'static str,
    pub sublevel: Option<u8>,
    pub label: String,
}

/// Resolve the highest tier whose threshold is <= points
pub fn resolve_rank(points: i64) -> RankInfo {
    let (_, tier, sublevel) = RANK_TIERS
        .iter()
        .take_while(|(min, _, _)| points >= *min)
        .last()
        .copied()
        .unwrap_or(RANK_TIERS[0]);

    let label = match sublevel {
        Some(level) => format!("{} {}", tier, level),
        None => tier.to_string(),
    };

    RankInfo {
        tier,
        sublevel,
        label,
    }
}

/// Per-match performance fed into the RP formula
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchPerformance {
    pub kills: u32,
    pub assists: u32,
    pub deaths: u32,
    pub score: u64,
    /// Kill streak held when the match ended
    pub streak: u32,
}

/// RP change for one finished ranked match, clamped to [-220, 220]
pub fn rank_delta(perf: &MatchPerformance, outcome: MatchOutcome) -> i64 {
    let kills = f64::from(perf.kills);
    let assists = f64::from(perf.assists);
    let deaths = f64::from(perf.deaths);
    let kda = (kills + assists) / deaths.max(1.0);

    let mut delta = 32.0 * kills + 24.0 * assists - 28.0 * deaths;
    delta += (0.08 * perf.score as f64).min(220.0);
    delta += 22.0 * (kda - 1.0);
    if perf.kills == 0 && perf.assists == 0 && perf.deaths >= 1 {
        delta -= 60.0;
    }
    if perf.kills >= 5 {
        delta += 20.0;
    }
    if perf.streak >= 3 {
        delta += 18.0 * f64::from(perf.streak - 2);
    }
    delta += outcome.bonus();

    (delta.round() as i64).clamp(-MAX_RP_DELTA, MAX_RP_DELTA)
}

/// A player's rating with its resolved label and all-time high
#[derive(Debug, Clone, PartialEq)]
pub struct RankState {
    pub points: i64,
    pub label: String,
    pub highest_points: i64,
    pub highest_label: String,
    /// Change applied by the most recent settlement or forfeit
    pub delta: i64,
}

impl Default for RankState {
    fn default() -> Self {
        Self::new(0)
    }
}

impl RankState {
    pub fn new(points: i64) -> Self {
        let points = points.max(0);
        let label = resolve_rank(points).label;
        Self {
            points,
            highest_points: points,
            highest_label: label.clone(),
            label,
            delta: 0,
        }
    }

    /// Restore a persisted rating, keeping the stored high-water mark if it is higher
    pub fn restore(points: i64, highest_points: i64, highest_label: Option<String>) -> Self {
        let mut state = Self::new(points);
        if highest_points > state.highest_points {
            state.highest_points = highest_points;
            state.highest_label = highest_label.unwrap_or_else(|| resolve_rank(highest_points).label);
        }
        state
    }

    /// Apply a signed change, flooring at zero, and ratchet the high-water mark
    pub fn apply(&mut self, delta: i64) {
        let previous = self.points;
        self.points = self.points.saturating_add(delta).max(0);
        self.delta = self.points - previous;
        self.label = resolve_rank(self.points).label;
        if self.points > self.highest_points {
            self.highest_points = self.points;
            self.highest_label = self.label.clone();
        }
    }

    /// Settle a finished ranked match and return the formula delta
    pub fn settle(&mut self, perf: &MatchPerformance, outcome: MatchOutcome) -> i64 {
        let delta = rank_delta(perf, outcome);
        self.apply(delta);
        self.delta = delta;
        delta
    }

    /// Apply the fixed forfeit penalty; returns the penalty reported to the client
    pub fn forfeit(&mut self, penalty: i64) -> i64 {
        let penalty = penalty.max(0);
        self.apply(-penalty);
        self.delta = -penalty;
        penalty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_rank_labels() {
        assert_eq!(resolve_rank(0).label, "Demir 1");
        assert_eq!(resolve_rank(349).label, "Demir 1");
        assert_eq!(resolve_rank(350).label, "Demir 2");
        assert_eq!(resolve_rank(1450).label, "Gümüş 1");
        assert_eq!(resolve_rank(3999).label, "Elmas 3");

        let top = resolve_rank(9000);
        assert_eq!(top.tier, "Space");
        assert_eq!(top.sublevel, None);
        assert_eq!(top.label, "Space");
    }

    #[test]
    fn test_negative_points_resolve_to_lowest_tier() {
        assert_eq!(resolve_rank(-50).label, "Demir 1");
    }

    #[test]
    fn test_rank_delta_example() {
        let perf = MatchPerformance {
            kills: 3,
            assists: 2,
            deaths: 1,
            score: 500,
            streak: 0,
        };
        // 96 + 48 - 28 + 40 + 22*(5-1) + 140 = 384 -> clamped
        assert_eq!(rank_delta(&perf, MatchOutcome::Win), 220);

        // 96 + 48 - 28 + 40 + 88 - 40 = 204
        assert_eq!(rank_delta(&perf, MatchOutcome::Draw), 204);
    }

    #[test]
    fn test_rank_delta_idle_loss() {
        let perf = MatchPerformance {
            kills: 0,
            assists: 0,
            deaths: 2,
            score: 0,
            streak: 0,
        };
        // -56 + 0 + 22*(0-1) - 60 - 160 = -298 -> clamped
        assert_eq!(rank_delta(&perf, MatchOutcome::Loss), -220);
    }

    #[test]
    fn test_rank_delta_streak_and_kill_bonus() {
        let perf = MatchPerformance {
            kills: 5,
            assists: 0,
            deaths: 5,
            score: 0,
            streak: 4,
        };
        // 160 - 140 + 0 + 0 + 20 + 36 - 40 = 36
        assert_eq!(rank_delta(&perf, MatchOutcome::Draw), 36);
    }

    #[test]
    fn test_rank_delta_always_bounded() {
        for kills in [0u32, 1, 7, 40] {
            for deaths in [0u32, 1, 9, 60] {
                for score in [0u64, 900, 100_000] {
                    for outcome in [MatchOutcome::Win, MatchOutcome::Loss, MatchOutcome::Draw] {
                        let perf = MatchPerformance {
                            kills,
                            assists: kills / 2,
                            deaths,
                            score,
                            streak: kills,
                        };
                        let delta = rank_delta(&perf, outcome);
                        assert!((-MAX_RP_DELTA..=MAX_RP_DELTA).contains(&delta));
                    }
                }
            }
        }
    }

    #[test]
    fn test_apply_floors_at_zero_and_ratchets_highest() {
        let mut rank = RankState::new(100);
        rank.apply(300);
        assert_eq!(rank.points, 400);
        assert_eq!(rank.highest_points, 400);
        assert_eq!(rank.highest_label, "Demir 2");

        rank.apply(-1000);
        assert_eq!(rank.points, 0);
        assert_eq!(rank.label, "Demir 1");
        assert_eq!(rank.highest_points, 400);
        assert_eq!(rank.highest_label, "Demir 2");
    }

    #[test]
    fn test_forfeit_penalty() {
        let mut rank = RankState::new(500);
        assert_eq!(rank.forfeit(75), 75);
        assert_eq!(rank.points, 425);
        assert_eq!(rank.delta, -75);

        let mut low = RankState::new(30);
        low.forfeit(75);
        assert_eq!(low.points, 0);
    }

    #[test]
    fn test_restore_keeps_higher_peak() {
        let rank = RankState::restore(800, 2400, Some("Altın 1".to_string()));
        assert_eq!(rank.points, 800);
        assert_eq!(rank.label, "Bronz 1");
        assert_eq!(rank.highest_points, 2400);
        assert_eq!(rank.highest_label, "Altın 1");

        let rank = RankState::restore(800, 100, None);
        assert_eq!(rank.highest_points, 800);
    }
}
