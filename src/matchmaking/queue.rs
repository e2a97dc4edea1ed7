//! Matchmaking queue implementation

use std::collections::VecDeque;

use crate::game::player::PlayerId;

/// Player waiting in one mode's queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueEntry {
    pub player_id: PlayerId,
    /// Unix ms when the player joined
    pub enqueued_at: u64,
}

impl QueueEntry {
    pub fn new(player_id: PlayerId, enqueued_at: u64) -> Self {
        Self {
            player_id,
            enqueued_at,
        }
    }

    /// How long this player has been waiting (ms)
    pub fn wait_time(&self, now: u64) -> u64 {
        now.saturating_sub(self.enqueued_at)
    }
}

/// FIFO queue for a single mode
#[derive(Debug, Default)]
pub struct ModeQueue {
    queue: VecDeque<QueueEntry>,
}

impl ModeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a player to the back of the queue. Returns false if already
    /// queued; its position is kept.
    pub fn enqueue(&mut self, entry: QueueEntry) -> bool {
        if self.contains(&entry.player_id) {
            return false;
        }
        self.queue.push_back(entry);
        true
    }

    /// Remove a player from the queue
    pub fn dequeue(&mut self, player_id: &PlayerId) -> Option<QueueEntry> {
        let pos = self.queue.iter().position(|e| &e.player_id == player_id)?;
        self.queue.remove(pos)
    }

    /// Check if a player is in the queue
    pub fn contains(&self, player_id: &PlayerId) -> bool {
        self.queue.iter().any(|e| &e.player_id == player_id)
    }

    /// Get queue length
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if queue is empty
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Entries in queue order
    pub fn iter(&self) -> impl Iterator<Item = &QueueEntry> {
        self.queue.iter()
    }

    /// Longest current wait (ms)
    pub fn oldest_wait(&self, now: u64) -> Option<u64> {
        self.queue.front().map(|e| e.wait_time(now))
    }
}
