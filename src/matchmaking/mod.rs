//! Matchmaking: per-mode queues and match group selection

pub mod queue;
pub mod service;

pub use queue::{ModeQueue, QueueEntry};
pub use service::{JoinOutcome, Matchmaker, QueueError, SelectionRules};
