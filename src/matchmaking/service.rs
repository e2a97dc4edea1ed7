//! Matchmaking service - normal and ranked queues and group selection

use crate::game::player::PlayerId;
use crate::ws::protocol::{QueueMode, QueueSizes};

use super::queue::{ModeQueue, QueueEntry};

/// Queue join rejections reported to the client as `queue:error`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("Ranked için {required} normal maç tamamlaman gerekiyor.")]
    RankedLocked { required: u32 },
}

/// Result of a successful join request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Newly queued; `left` is the other mode's queue if the player was in it
    Joined { left: Option<QueueMode> },
    /// Already queued for this mode, nothing changed
    AlreadyQueued,
}

/// Selection limits for one evaluation
#[derive(Debug, Clone, Copy)]
pub struct SelectionRules {
    /// Roster cap
    pub max_players: usize,
    /// Smallest acceptable ranked group
    pub min_group: usize,
    /// Largest RP spread accepted for a ranked group
    pub max_rp_gap: i64,
}

/// Both matchmaking queues
#[derive(Debug, Default)]
pub struct Matchmaker {
    normal: ModeQueue,
    ranked: ModeQueue,
}

impl Matchmaker {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self, mode: QueueMode) -> &ModeQueue {
        match mode {
            QueueMode::Normal => &self.normal,
            QueueMode::Ranked => &self.ranked,
        }
    }

    fn queue_mut(&mut self, mode: QueueMode) -> &mut ModeQueue {
        match mode {
            QueueMode::Normal => &mut self.normal,
            QueueMode::Ranked => &mut self.ranked,
        }
    }

    /// Ranked requires a number of completed normal matches
    pub fn check_eligibility(
        mode: QueueMode,
        normal_matches: u32,
        required: u32,
    ) -> Result<(), QueueError> {
        if mode == QueueMode::Ranked && normal_matches < required {
            return Err(QueueError::RankedLocked { required });
        }
        Ok(())
    }

    /// Join `mode`, silently leaving the other queue
    pub fn join(&mut self, player_id: PlayerId, mode: QueueMode, now: u64) -> JoinOutcome {
        if self.queue(mode).contains(&player_id) {
            return JoinOutcome::AlreadyQueued;
        }
        let other = match mode {
            QueueMode::Normal => QueueMode::Ranked,
            QueueMode::Ranked => QueueMode::Normal,
        };
        let left = self.queue_mut(other).dequeue(&player_id).map(|_| other);
        self.queue_mut(mode).enqueue(QueueEntry::new(player_id, now));
        JoinOutcome::Joined { left }
    }

    /// Remove a player from whichever queue holds them
    pub fn leave(&mut self, player_id: &PlayerId) -> Option<QueueMode> {
        if self.normal.dequeue(player_id).is_some() {
            return Some(QueueMode::Normal);
        }
        self.ranked.dequeue(player_id).map(|_| QueueMode::Ranked)
    }

    /// Longest current wait in a mode's queue (ms)
    pub fn oldest_wait(&self, mode: QueueMode, now: u64) -> Option<u64> {
        self.queue(mode).oldest_wait(now)
    }

    pub fn sizes(&self) -> QueueSizes {
        QueueSizes {
            normal: self.normal.len(),
            ranked: self.ranked.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.normal.is_empty() && self.ranked.is_empty()
    }

    /// Pick the humans for the next match from `mode`'s queue. `eligible`
    /// filters out stale entries; `rank_points` is consulted for ranked.
    /// Nothing is dequeued.
    pub fn select<E, R>(
        &self,
        mode: QueueMode,
        rules: &SelectionRules,
        eligible: E,
        rank_points: R,
    ) -> Vec<PlayerId>
    where
        E: Fn(&PlayerId) -> bool,
        R: Fn(&PlayerId) -> i64,
    {
        let candidates: Vec<PlayerId> = self
            .queue(mode)
            .iter()
            .map(|e| e.player_id)
            .filter(|id| eligible(id))
            .collect();

        match mode {
            QueueMode::Normal => candidates.into_iter().take(rules.max_players).collect(),
            QueueMode::Ranked => select_ranked_group(candidates, rules, rank_points),
        }
    }

    /// Dequeue a started group
    pub fn remove_all(&mut self, ids: &[PlayerId]) {
        for id in ids {
            self.leave(id);
        }
    }
}

/// Sort by RP and take the first window (up to the roster cap) with at
/// least `min_group` players whose spread fits the gap. Falls back to the
/// whole pool when it fits the cap, else to the front of the queue.
fn select_ranked_group<R>(
    candidates: Vec<PlayerId>,
    rules: &SelectionRules,
    rank_points: R,
) -> Vec<PlayerId>
where
    R: Fn(&PlayerId) -> i64,
{
    let cap = rules.max_players.max(1);
    let min_group = rules.min_group.max(2);

    let mut sorted: Vec<(PlayerId, i64)> = candidates
        .iter()
        .map(|id| (*id, rank_points(id)))
        .collect();
    // Stable: equal RP keeps queue order
    sorted.sort_by_key(|(_, rp)| *rp);

    for start in 0..sorted.len() {
        let window = &sorted[start..(start + cap).min(sorted.len())];
        if window.len() < min_group {
            break;
        }
        let spread = window[window.len() - 1].1 - window[0].1;
        if spread <= rules.max_rp_gap {
            return window.iter().map(|(id, _)| *id).collect();
        }
    }

    if candidates.len() <= cap {
        return candidates;
    }
    candidates.into_iter().take(cap).collect()
}
