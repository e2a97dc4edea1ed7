//! Snapshot building and publish cadence

use std::collections::HashMap;

use crate::ws::protocol::{LeaderboardEntry, PlayerSnapshot};

use super::player::{Player, PlayerId};

const LEADERBOARD_SIZE: usize = 10;

/// Decides on which ticks a fresh snapshot is published
pub struct SnapshotBuilder {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
        }
    }

    /// Check if it's time to publish a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force snapshot on next check (used for phase changes)
    pub fn force_next(&mut self) {
        self.ticks_since_snapshot = self.snapshot_interval;
    }
}

pub fn player_snapshot(p: &Player) -> PlayerSnapshot {
    PlayerSnapshot {
        id: p.id,
        name: p.name.clone(),
        x: p.body.x,
        y: p.body.y,
        vx: p.body.vx,
        vy: p.body.vy,
        angle: p.body.angle,
        hp: p.hp,
        max_hp: p.max_hp,
        is_bot: p.is_bot,
        score: p.score,
        kills: p.kills,
        deaths: p.deaths,
        assists: p.assists,
        level: p.level,
        xp: p.xp,
        credits: p.credits,
        skills: p.skills,
        weapons: p.weapons,
        ship_color: p.ship_color.clone(),
        kill_streak: p.kill_streak,
        best_streak: p.best_streak,
        magnetic: p.magnetic,
        team: p.team,
        rank: p.rank.label.clone(),
        rank_points: p.rank.points,
        rank_delta: p.rank.delta,
        normal_matches: p.normal_matches,
        state: p.status,
        queue_mode: p.queue_mode,
    }
}

/// Top players by score across the whole world
pub fn leaderboard(players: &HashMap<PlayerId, Player>) -> Vec<LeaderboardEntry> {
    let mut ranked: Vec<&Player> = players.values().collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    ranked
        .into_iter()
        .take(LEADERBOARD_SIZE)
        .map(|p| LeaderboardEntry {
            name: p.name.clone(),
            score: p.score,
            kills: p.kills,
            level: p.level,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::physics::Spawn;
    use crate::ws::protocol::Team;
    use uuid::Uuid;

    #[test]
    fn test_should_send_every_interval() {
        let mut builder = SnapshotBuilder::new(2);
        assert!(!builder.should_send());
        assert!(builder.should_send());
        assert!(!builder.should_send());

        builder.force_next();
        assert!(builder.should_send());
    }

    #[test]
    fn test_leaderboard_top_ten_by_score() {
        let players: HashMap<PlayerId, Player> = (0..12)
            .map(|i| {
                let mut p = Player::new_human(
                    Uuid::new_v4(),
                    format!("p{:02}", i),
                    Team::Red,
                    Spawn { x: 0.0, y: 0.0, angle: 0.0 },
                );
                p.score = i * 10;
                (p.id, p)
            })
            .collect();

        let board = leaderboard(&players);
        assert_eq!(board.len(), 10);
        assert_eq!(board[0].name, "p11");
        assert_eq!(board[0].score, 110);
        assert_eq!(board[9].name, "p02");
    }
}
