//! Authoritative tick loop and snapshot broadcaster

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::store::ProgressJob;
use crate::util::time::{
    clamp_delta, unix_millis, Timer, SIMULATION_TPS, SNAPSHOT_INTERVAL_MICROS, SNAPSHOT_TPS,
    TICK_DURATION_MICROS,
};
use crate::ws::protocol::{ServerMsg, WorldSnapshot};

use super::player::PlayerId;
use super::snapshot::SnapshotBuilder;
use super::world::{Outbound, World};
use super::{Command, SessionMsg};

const COMMAND_QUEUE_CAPACITY: usize = 1024;
const EVENT_QUEUE_CAPACITY: usize = 256;

/// Cloneable access to the running game for HTTP and websocket handlers
#[derive(Clone)]
pub struct GameHandle {
    pub command_tx: mpsc::Sender<Command>,
    /// `state` frames plus world-wide events
    pub events_tx: broadcast::Sender<ServerMsg>,
    pub snapshot_rx: watch::Receiver<Arc<WorldSnapshot>>,
    pub player_count: Arc<AtomicUsize>,
}

impl GameHandle {
    /// Connected websocket sessions
    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }

    pub fn latest_snapshot(&self) -> Arc<WorldSnapshot> {
        self.snapshot_rx.borrow().clone()
    }
}

/// Owns the world and is its only writer
pub struct GameRunner {
    world: World,
    command_rx: mpsc::Receiver<Command>,
    events_tx: broadcast::Sender<ServerMsg>,
    snapshot_tx: watch::Sender<Arc<WorldSnapshot>>,
    progress_tx: mpsc::UnboundedSender<ProgressJob>,
    sessions: HashMap<PlayerId, mpsc::UnboundedSender<SessionMsg>>,
    snapshot_builder: SnapshotBuilder,
    player_count: Arc<AtomicUsize>,
}

impl GameRunner {
    pub fn new(world: World, progress_tx: mpsc::UnboundedSender<ProgressJob>) -> (Self, GameHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let (events_tx, _) = broadcast::channel(EVENT_QUEUE_CAPACITY);
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(world.snapshot(unix_millis())));
        let player_count = Arc::new(AtomicUsize::new(0));

        let handle = GameHandle {
            command_tx,
            events_tx: events_tx.clone(),
            snapshot_rx,
            player_count: player_count.clone(),
        };

        let runner = Self {
            world,
            command_rx,
            events_tx,
            snapshot_tx,
            progress_tx,
            sessions: HashMap::new(),
            snapshot_builder: SnapshotBuilder::new(SIMULATION_TPS / SNAPSHOT_TPS),
            player_count,
        };

        (runner, handle)
    }

    /// Run the fixed-rate tick loop until every command sender is gone
    pub async fn run(mut self) {
        info!(tps = SIMULATION_TPS, "Game loop started");

        let mut tick_interval = interval(Duration::from_micros(TICK_DURATION_MICROS));
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_tick = unix_millis();

        loop {
            tick_interval.tick().await;
            let timer = Timer::new();
            let now = unix_millis();
            let dt = clamp_delta(now.saturating_sub(last_tick));
            last_tick = now;

            let phase_before = self.world.phase();
            if !self.process_commands(now) {
                break;
            }
            self.world.tick(dt, now);
            self.route_outbox();

            if self.world.phase() != phase_before {
                let queues = self.world.queue_sizes();
                info!(
                    match_id = self.world.match_id(),
                    phase = ?self.world.phase(),
                    roster = self.world.roster_size(),
                    humans = self.world.human_count(),
                    queued_normal = queues.normal,
                    queued_ranked = queues.ranked,
                    "Match phase changed"
                );
                self.snapshot_builder.force_next();
            }
            if self.snapshot_builder.should_send() {
                self.snapshot_tx
                    .send_replace(Arc::new(self.world.snapshot(now)));
            }

            let elapsed = timer.elapsed_micros();
            if elapsed > TICK_DURATION_MICROS {
                warn!(elapsed_us = elapsed, "Tick overran its budget");
            }
        }

        info!("Game loop stopped");
    }

    /// Drain queued commands. Returns false once the channel is closed.
    fn process_commands(&mut self, now: u64) -> bool {
        loop {
            match self.command_rx.try_recv() {
                Ok(command) => self.apply(command, now),
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    fn apply(&mut self, command: Command, now: u64) {
        match command {
            Command::Connect {
                player_id,
                account,
                session,
            } => {
                self.sessions.insert(player_id, session);
                self.world.connect(player_id, account, now);
            }
            Command::Client { player_id, msg } => {
                self.world.handle(player_id, msg, now);
            }
            Command::Disconnect { player_id } => {
                self.sessions.remove(&player_id);
                self.world.disconnect(player_id, now);
            }
        }
        self.player_count
            .store(self.sessions.len(), Ordering::Relaxed);
    }

    fn route_outbox(&mut self) {
        for out in self.world.drain_outbox() {
            match out {
                Outbound::Broadcast(msg) => {
                    // No subscribers is fine
                    let _ = self.events_tx.send(msg);
                }
                Outbound::Direct(player_id, msg) => {
                    if let Some(session) = self.sessions.get(&player_id) {
                        let _ = session.send(SessionMsg::Send(msg));
                    }
                }
                Outbound::Checkpoint {
                    player_id,
                    account_id,
                    progress,
                } => {
                    debug!(player_id = %player_id, account_id = %account_id, "Queueing progress checkpoint");
                    if self
                        .progress_tx
                        .send(ProgressJob {
                            account_id,
                            progress,
                        })
                        .is_err()
                    {
                        warn!(account_id = %account_id, "Progress writer is gone, checkpoint dropped");
                    }
                }
                Outbound::Disconnect(player_id) => {
                    if let Some(session) = self.sessions.remove(&player_id) {
                        let _ = session.send(SessionMsg::Close);
                    }
                    self.player_count
                        .store(self.sessions.len(), Ordering::Relaxed);
                }
            }
        }
    }
}

/// Forward the latest snapshot as a `state` frame at the broadcast rate
pub fn spawn_broadcaster(handle: &GameHandle) -> tokio::task::JoinHandle<()> {
    let mut snapshot_rx = handle.snapshot_rx.clone();
    let events_tx = handle.events_tx.clone();

    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_micros(SNAPSHOT_INTERVAL_MICROS));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            match snapshot_rx.has_changed() {
                Ok(true) => {}
                Ok(false) => continue,
                // Tick loop has stopped
                Err(_) => break,
            }
            let snapshot = snapshot_rx.borrow_and_update().clone();
            if events_tx.receiver_count() > 0 {
                let _ = events_tx.send(ServerMsg::State(snapshot));
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::ws::protocol::ClientMsg;
    use uuid::Uuid;

    fn runner() -> (GameRunner, GameHandle, mpsc::UnboundedReceiver<ProgressJob>) {
        let config = GameConfig {
            bot_count: 2,
            ..GameConfig::default()
        };
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let (runner, handle) = GameRunner::new(World::new(config, 5, 0), progress_tx);
        (runner, handle, progress_rx)
    }

    #[test]
    fn test_connect_routes_init_to_session() {
        let (mut runner, handle, _progress) = runner();
        let (session_tx, mut session_rx) = mpsc::unbounded_channel();
        let player_id = Uuid::new_v4();

        runner.apply(
            Command::Connect {
                player_id,
                account: None,
                session: session_tx,
            },
            0,
        );
        runner.route_outbox();

        assert_eq!(handle.player_count(), 1);
        let first = session_rx.try_recv().unwrap();
        assert!(matches!(first, SessionMsg::Send(ServerMsg::Init { id, .. }) if id == player_id));
    }

    #[test]
    fn test_queue_changes_are_broadcast() {
        let (mut runner, handle, _progress) = runner();
        let mut events = handle.events_tx.subscribe();
        let (session_tx, _session_rx) = mpsc::unbounded_channel();
        let player_id = Uuid::new_v4();

        runner.apply(
            Command::Connect {
                player_id,
                account: None,
                session: session_tx,
            },
            0,
        );
        runner.apply(
            Command::Client {
                player_id,
                msg: ClientMsg::QueueJoin { mode: None },
            },
            0,
        );
        runner.route_outbox();

        let mut saw_summary = false;
        let mut saw_start = false;
        while let Ok(msg) = events.try_recv() {
            saw_summary |= matches!(msg, ServerMsg::QueueSummary { .. });
            saw_start |= matches!(msg, ServerMsg::MatchStart(_));
        }
        assert!(saw_summary);
        assert!(saw_start);
    }

    #[test]
    fn test_disconnect_forgets_session() {
        let (mut runner, handle, _progress) = runner();
        let (session_tx, _session_rx) = mpsc::unbounded_channel();
        let player_id = Uuid::new_v4();

        runner.apply(
            Command::Connect {
                player_id,
                account: None,
                session: session_tx,
            },
            0,
        );
        runner.apply(Command::Disconnect { player_id }, 10);
        runner.route_outbox();

        assert_eq!(handle.player_count(), 0);
        assert!(runner.world.player(&player_id).is_none());
    }

    #[test]
    fn test_account_checkpoint_reaches_writer() {
        let (mut runner, _handle, mut progress) = runner();
        let (session_tx, _session_rx) = mpsc::unbounded_channel();
        let player_id = Uuid::new_v4();
        let account_id = Uuid::new_v4();

        runner.apply(
            Command::Connect {
                player_id,
                account: Some(crate::game::AccountLink {
                    account_id,
                    display_name: None,
                    progress: Default::default(),
                }),
                session: session_tx,
            },
            0,
        );
        runner.apply(Command::Disconnect { player_id }, 10);
        runner.route_outbox();

        let job = progress.try_recv().unwrap();
        assert_eq!(job.account_id, account_id);
    }
}
