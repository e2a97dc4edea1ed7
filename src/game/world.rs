//! The shared world: players, munitions, the match slot and both queues.
//!
//! `World` is plain synchronous state. The runner task owns the only
//! instance, feeds it client commands and calls [`World::tick`] at the
//! simulation rate. Everything that must leave the world (frames for
//! clients, persistence checkpoints, forced disconnects) is queued in an
//! outbox that the runner drains after every step.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::GameConfig;
use crate::matchmaking::{JoinOutcome, Matchmaker, SelectionRules};
use crate::ws::protocol::{
    ClientMsg, ForfeitResult, MatchEndSummary, MatchInfo, MatchStartInfo, PersistentData,
    PlayerMatchSummary, ProgressSnapshot, QueueMode, QueueSizes, ServerMsg, Team, TeamsSummary,
    WeaponKind, WorldSnapshot,
};

use super::bot::{
    bot_name, nearest_enemy, randomize_loadout, BotBrain, BotController, BOT_THINK_INTERVAL,
};
use super::combat::{self, CombatSystem, KillFeed};
use super::lifecycle::{outcome_for, Match, MatchPhase, PhaseChange};
use super::physics::{Arena, PhysicsSystem};
use super::player::{Player, PlayerId, PlayerStatus, BOT_CREDITS, SHIP_COLORS};
use super::ranking::MatchPerformance;
use super::repulsion;
use super::snapshot::{leaderboard, player_snapshot};

/// Team size cap used for team assignment
pub const MAX_PER_TEAM: usize = 10;
pub const MAX_NAME_LEN: usize = 20;
/// How often queued players get a `queue:status` echo (ms)
pub const QUEUE_ECHO_INTERVAL_MS: u64 = 5_000;

/// Why a ranked forfeit was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForfeitError {
    #[error("Oyuncu bulunamadı.")]
    UnknownPlayer,

    #[error("Şu anda ranked maçtan ayrılamazsın.")]
    NotEligible,
}

/// Stored progress for an authenticated connection
#[derive(Debug, Clone)]
pub struct AccountLink {
    pub account_id: Uuid,
    pub display_name: Option<String>,
    pub progress: PersistentData,
}

/// Side effects produced by the world, routed by the runner
#[derive(Debug, Clone)]
pub enum Outbound {
    /// Frame for every connected client
    Broadcast(ServerMsg),
    /// Frame for one client
    Direct(PlayerId, ServerMsg),
    /// Progress to persist for an authenticated account
    Checkpoint {
        player_id: PlayerId,
        account_id: Uuid,
        progress: ProgressSnapshot,
    },
    /// Close this client's connection
    Disconnect(PlayerId),
}

pub struct World {
    config: GameConfig,
    arena: Arena,
    players: HashMap<PlayerId, Player>,
    combat: CombatSystem,
    kill_feed: KillFeed,
    current: Match,
    matchmaker: Matchmaker,
    rng: ChaCha8Rng,
    /// Simulated seconds since the last bot decision
    bot_think_acc: f32,
    last_queue_echo: u64,
    outbox: Vec<Outbound>,
}

impl World {
    /// Create the world and fill the bot pool
    pub fn new(config: GameConfig, seed: u64, now: u64) -> Self {
        let mut world = Self {
            config,
            arena: Arena::default(),
            players: HashMap::new(),
            combat: CombatSystem::new(),
            kill_feed: KillFeed::default(),
            current: Match::new(),
            matchmaker: Matchmaker::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            bot_think_acc: 0.0,
            last_queue_echo: now,
            outbox: Vec::new(),
        };
        for _ in 0..world.config.bot_count {
            world.spawn_bot();
        }
        world
    }

    pub fn phase(&self) -> MatchPhase {
        self.current.phase
    }

    pub fn match_id(&self) -> u64 {
        self.current.id
    }

    pub fn roster_size(&self) -> usize {
        self.current.roster.len()
    }

    pub fn queue_sizes(&self) -> QueueSizes {
        self.matchmaker.sizes()
    }

    pub fn human_count(&self) -> usize {
        self.players.values().filter(|p| p.is_human()).count()
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    /// Take everything queued since the last drain
    pub fn drain_outbox(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbox)
    }

    fn push(&mut self, out: Outbound) {
        self.outbox.push(out);
    }

    // --- connection lifecycle -------------------------------------------

    /// Add a human to the lobby and greet them with `init`
    pub fn connect(&mut self, id: PlayerId, account: Option<AccountLink>, now: u64) {
        let team = self.pick_team_for_player();
        let name = account
            .as_ref()
            .and_then(|a| a.display_name.as_deref())
            .and_then(sanitize_name)
            .unwrap_or_else(|| format!("Pilot-{:03}", self.rng.gen_range(0..1000)));
        let spawn = self.arena.team_spawn(&mut self.rng, team);

        let mut player = Player::new_human(id, name, team, spawn);
        if let Some(link) = account {
            player.account_id = Some(link.account_id);
            player.apply_persistent(&link.progress);
        }

        let init = ServerMsg::Init {
            id,
            name: player.name.clone(),
            world: self.arena.dims(),
            team,
            available_colors: SHIP_COLORS.iter().map(|c| c.to_string()).collect(),
            match_info: self.match_info(now),
        };
        info!(
            player_id = %id,
            name = %player.name,
            team = ?team,
            authenticated = player.account_id.is_some(),
            "Player connected"
        );
        self.players.insert(id, player);

        self.push(Outbound::Direct(id, init));
        self.send_queue_status(id);
    }

    /// Remove a human entirely: queue, roster and world
    pub fn disconnect(&mut self, id: PlayerId, now: u64) {
        if !self.players.contains_key(&id) {
            return;
        }
        self.matchmaker.leave(&id);
        self.current.remove_from_roster(&id);
        self.persist(id);
        self.players.remove(&id);

        info!(player_id = %id, "Player disconnected");
        self.broadcast_queue_summary();
        self.evaluate(now);
    }

    /// Apply one validated client event
    pub fn handle(&mut self, id: PlayerId, msg: ClientMsg, now: u64) {
        if !self.players.get(&id).is_some_and(|p| p.is_human()) {
            return;
        }
        match msg {
            ClientMsg::Join {
                name,
                persistent_data,
                mode,
            } => self.join(id, name, persistent_data, mode, now),
            ClientMsg::Input { thrust, turn } => self.input(id, thrust, turn),
            ClientMsg::Fire { angle } => self.fire(id, WeaponKind::Cannon, angle, now),
            ClientMsg::FireTorpedo { angle } => self.fire(id, WeaponKind::Torpedo, angle, now),
            ClientMsg::FireMissile { angle } => self.fire(id, WeaponKind::Missile, angle, now),
            ClientMsg::UpgradeSkill { name } => {
                if let Some(player) = self.players.get_mut(&id) {
                    player.try_upgrade_skill(name);
                }
            }
            ClientMsg::UpgradeWeapon { name } => {
                if let Some(player) = self.players.get_mut(&id) {
                    player.try_upgrade_weapon(name);
                }
            }
            ClientMsg::ChangeColor { index } => {
                if let Some(player) = self.players.get_mut(&id) {
                    player.set_color(index);
                }
            }
            ClientMsg::QueueJoin { mode } => {
                self.queue_join(id, QueueMode::from_wire(mode.as_deref()), now)
            }
            ClientMsg::QueueLeave => self.queue_leave(id, now),
            ClientMsg::RankedForfeit => self.forfeit(id),
            ClientMsg::RequestMatchStart => self.evaluate(now),
        }
    }

    fn join(
        &mut self,
        id: PlayerId,
        name: Option<String>,
        persistent: Option<PersistentData>,
        mode: Option<String>,
        now: u64,
    ) {
        let Some(player) = self.players.get_mut(&id) else {
            return;
        };
        if let Some(name) = name.as_deref().and_then(sanitize_name) {
            player.name = name;
        }
        // Authenticated progress comes from the store, never from the client
        if let Some(data) = persistent.filter(|_| player.account_id.is_none()) {
            player.apply_persistent(&data);
        }

        if let Some(mode) = mode {
            self.queue_join(id, QueueMode::from_wire(Some(&mode)), now);
            return;
        }
        self.send_queue_status(id);
        self.broadcast_queue_summary();
        self.evaluate(now);
    }

    fn input(&mut self, id: PlayerId, thrust: Option<bool>, turn: Option<f32>) {
        if turn.is_some_and(|t| !t.is_finite() || !(-1.0..=1.0).contains(&t)) {
            return;
        }
        let Some(player) = self.players.get_mut(&id) else {
            return;
        };
        if let Some(thrust) = thrust {
            player.thrust = thrust;
        }
        if let Some(turn) = turn {
            player.turn = turn;
        }
    }

    fn fire(&mut self, id: PlayerId, kind: WeaponKind, angle: Option<f32>, now: u64) {
        if angle.is_some_and(|a| !a.is_finite()) {
            return;
        }
        if !self.current.is_active() || !self.current.in_roster(&id) {
            return;
        }
        let Some(shooter) = self.players.get_mut(&id) else {
            return;
        };
        self.combat.try_fire(shooter, kind, angle, None, now);
    }

    // --- queues ---------------------------------------------------------

    fn queue_join(&mut self, id: PlayerId, mode: QueueMode, now: u64) {
        let Some(player) = self.players.get(&id) else {
            return;
        };
        if player.status == PlayerStatus::InMatch {
            return;
        }
        if let Err(err) = Matchmaker::check_eligibility(
            mode,
            player.normal_matches,
            self.config.ranked_min_normal_matches,
        ) {
            self.push(Outbound::Direct(
                id,
                ServerMsg::QueueError {
                    message: err.to_string(),
                },
            ));
            self.send_queue_status(id);
            return;
        }

        match self.matchmaker.join(id, mode, now) {
            JoinOutcome::AlreadyQueued => self.send_queue_status(id),
            JoinOutcome::Joined { left } => {
                if let Some(player) = self.players.get_mut(&id) {
                    player.status = PlayerStatus::Queued;
                    player.queue_mode = Some(mode);
                }
                debug!(player_id = %id, mode = ?mode, left = ?left, "Joined queue");
                self.send_queue_status(id);
                self.push(Outbound::Direct(id, ServerMsg::QueueJoined { mode }));
                self.broadcast_queue_summary();
                self.evaluate(now);
            }
        }
    }

    fn queue_leave(&mut self, id: PlayerId, now: u64) {
        if self.matchmaker.leave(&id).is_none() {
            return;
        }
        if let Some(player) = self.players.get_mut(&id) {
            player.queue_mode = None;
            if player.status != PlayerStatus::InMatch {
                player.status = PlayerStatus::Lobby;
            }
        }
        debug!(player_id = %id, "Left queue");
        self.push(Outbound::Direct(id, ServerMsg::QueueLeft));
        self.send_queue_status(id);
        self.broadcast_queue_summary();
        self.evaluate(now);
    }

    fn send_queue_status(&mut self, id: PlayerId) {
        let Some(player) = self.players.get(&id) else {
            return;
        };
        let sizes = self.matchmaker.sizes();
        let status = ServerMsg::QueueStatus {
            mode: player.queue_mode,
            normal_size: sizes.normal,
            ranked_size: sizes.ranked,
        };
        self.push(Outbound::Direct(id, status));
    }

    fn broadcast_queue_summary(&mut self) {
        let sizes = self.matchmaker.sizes();
        self.push(Outbound::Broadcast(ServerMsg::QueueSummary {
            normal_size: sizes.normal,
            ranked_size: sizes.ranked,
        }));
    }

    /// Try to start a match, ranked first. Only while waiting.
    pub fn evaluate(&mut self, now: u64) {
        if self.current.phase != MatchPhase::Waiting {
            return;
        }
        if !self.try_start(QueueMode::Ranked, now) {
            self.try_start(QueueMode::Normal, now);
        }
    }

    fn try_start(&mut self, mode: QueueMode, now: u64) -> bool {
        let rules = SelectionRules {
            max_players: self.config.roster_size,
            min_group: self.config.min_players_to_start,
            max_rp_gap: self.config.ranked_max_rp_gap,
        };
        let players = &self.players;
        let selected = self.matchmaker.select(
            mode,
            &rules,
            |id| {
                players
                    .get(id)
                    .is_some_and(|p| p.is_human() && p.status != PlayerStatus::InMatch)
            },
            |id| players.get(id).map_or(0, |p| p.rank.points),
        );
        if selected.is_empty() {
            return false;
        }

        let slots = self.config.roster_size.saturating_sub(selected.len());
        let mut idle_bots: Vec<PlayerId> = self
            .players
            .values()
            .filter(|p| p.is_bot && !self.current.in_roster(&p.id))
            .map(|p| p.id)
            .collect();
        idle_bots.sort();
        idle_bots.truncate(slots);

        if selected.len() + idle_bots.len() < self.config.min_players_to_start.max(1) {
            return false;
        }

        self.matchmaker.remove_all(&selected);
        for id in &selected {
            if let Some(player) = self.players.get_mut(id) {
                player.status = PlayerStatus::InMatch;
                player.queue_mode = None;
            }
            self.push(Outbound::Direct(*id, ServerMsg::QueueLeft));
            self.send_queue_status(*id);
        }

        let roster: HashSet<PlayerId> = selected.iter().chain(idle_bots.iter()).copied().collect();
        self.start_match(mode, roster, selected.len(), now)
    }

    // --- match lifecycle ------------------------------------------------

    fn start_match(
        &mut self,
        mode: QueueMode,
        roster: HashSet<PlayerId>,
        humans: usize,
        now: u64,
    ) -> bool {
        if !self.current.begin_countdown(
            mode,
            roster,
            now,
            self.config.countdown_ms,
            self.config.match_length_ms,
        ) {
            return false;
        }
        self.combat.clear();
        self.kill_feed.clear();

        for id in &self.current.roster {
            let Some(player) = self.players.get_mut(id) else {
                continue;
            };
            let spawn = self.arena.team_spawn(&mut self.rng, player.team);
            player.reset_for_match(spawn);
            player.status = PlayerStatus::InMatch;
            player.queue_mode = None;
            if player.is_bot {
                player.credits = BOT_CREDITS;
                player.brain = Some(BotBrain::new(&mut self.rng, &self.arena, player.team));
            }
        }

        info!(
            match_id = self.current.id,
            mode = ?mode,
            humans,
            roster = self.current.roster.len(),
            "Match countdown started"
        );

        let start = MatchStartInfo {
            id: self.current.id,
            countdown: self.config.countdown_ms,
            starts_at: self.current.countdown_ends_at.unwrap_or(now),
            ends_at: self.current.ends_at.unwrap_or(now),
            phase: self.current.phase,
            mode,
            teams: self.teams_summary(),
        };
        self.push(Outbound::Broadcast(ServerMsg::MatchStart(start)));
        self.broadcast_queue_summary();
        true
    }

    /// ENDED: rank, checkpoint and release the roster, then back to waiting
    fn settle(&mut self, now: u64) {
        let winner = self.current.teams.winner();
        let mode = self.current.mode;
        let mut roster: Vec<PlayerId> = self.current.roster.iter().copied().collect();
        roster.sort();

        let mut summaries = Vec::with_capacity(roster.len());
        for id in &roster {
            let Some(player) = self.players.get_mut(id) else {
                continue;
            };
            match (player.is_human(), mode) {
                (true, QueueMode::Normal) => {
                    player.normal_matches = player.normal_matches.saturating_add(1);
                    player.rank.delta = 0;
                }
                (true, QueueMode::Ranked) => {
                    let performance = MatchPerformance {
                        kills: player.kills,
                        assists: player.assists,
                        deaths: player.deaths,
                        score: player.score,
                        streak: player.kill_streak,
                    };
                    player
                        .rank
                        .settle(&performance, outcome_for(winner, player.team));
                }
                (false, _) => player.rank.delta = 0,
            }
            player.thrust = false;
            player.turn = 0.0;
            player.body.vx = 0.0;
            player.body.vy = 0.0;

            summaries.push(PlayerMatchSummary {
                id: player.id,
                name: player.name.clone(),
                team: player.team,
                kills: player.kills,
                deaths: player.deaths,
                assists: player.assists,
                score: player.score,
                credits: player.credits,
                is_bot: player.is_bot,
                normal_matches: player.normal_matches,
                rank_label: player.rank.label.clone(),
                rank_points: player.rank.points,
                rank_delta: player.rank.delta,
            });
        }

        for id in &roster {
            self.checkpoint(*id);
        }

        info!(
            match_id = self.current.id,
            mode = ?mode,
            winner = ?winner,
            red_score = self.current.teams.red.score,
            blue_score = self.current.teams.blue.score,
            "Match ended"
        );

        let summary = MatchEndSummary {
            id: self.current.id,
            winner,
            mode,
            teams: self.teams_summary(),
            players: summaries,
            ended_at: now,
        };
        self.push(Outbound::Broadcast(ServerMsg::MatchEnd(summary)));

        for id in self.current.reset() {
            if let Some(player) = self.players.get_mut(&id) {
                player.status = PlayerStatus::Lobby;
                player.queue_mode = None;
            }
        }
        self.combat.clear();
        self.broadcast_queue_summary();
        self.evaluate(now);
    }

    /// Leave a live ranked match early for a fixed RP penalty
    pub fn forfeit(&mut self, id: PlayerId) {
        match self.try_forfeit(id) {
            Ok(result) => {
                info!(
                    player_id = %id,
                    match_id = self.current.id,
                    penalty = ?result.penalty,
                    "Ranked forfeit"
                );
                self.checkpoint(id);
                self.push(Outbound::Direct(id, ServerMsg::ForfeitResult(result)));
                self.push(Outbound::Disconnect(id));
                self.broadcast_queue_summary();
            }
            Err(err) => {
                debug!(player_id = %id, error = %err, "Forfeit rejected");
                let result = ForfeitResult {
                    success: false,
                    penalty: None,
                    rank_points: None,
                    rank_label: None,
                    highest_rank_points: None,
                    highest_rank_label: None,
                    error: Some(err.to_string()),
                };
                self.push(Outbound::Direct(id, ServerMsg::ForfeitResult(result)));
            }
        }
    }

    fn try_forfeit(&mut self, id: PlayerId) -> Result<ForfeitResult, ForfeitError> {
        let eligible_match = self.current.mode == QueueMode::Ranked
            && self.current.is_live()
            && self.current.in_roster(&id);
        let penalty = self.config.ranked_forfeit_penalty;

        let player = self
            .players
            .get_mut(&id)
            .ok_or(ForfeitError::UnknownPlayer)?;
        if !eligible_match || player.is_bot || player.status != PlayerStatus::InMatch {
            return Err(ForfeitError::NotEligible);
        }

        let applied = player.rank.forfeit(penalty);
        player.status = PlayerStatus::Lobby;
        player.queue_mode = None;
        player.thrust = false;
        player.turn = 0.0;
        let result = ForfeitResult {
            success: true,
            penalty: Some(applied),
            rank_points: Some(player.rank.points),
            rank_label: Some(player.rank.label.clone()),
            highest_rank_points: Some(player.rank.highest_points),
            highest_rank_label: Some(player.rank.highest_label.clone()),
            error: None,
        };

        self.current.remove_from_roster(&id);
        self.matchmaker.leave(&id);
        Ok(result)
    }

    /// `saveProgress` to the client plus a store write for accounts
    fn checkpoint(&mut self, id: PlayerId) {
        let Some(progress) = self
            .players
            .get(&id)
            .filter(|p| p.is_human())
            .map(|p| p.progress_snapshot())
        else {
            return;
        };
        self.persist(id);
        self.push(Outbound::Direct(id, ServerMsg::SaveProgress(progress)));
    }

    fn persist(&mut self, id: PlayerId) {
        let Some((account_id, progress)) = self
            .players
            .get(&id)
            .and_then(|p| p.account_id.map(|account| (account, p.progress_snapshot())))
        else {
            return;
        };
        self.push(Outbound::Checkpoint {
            player_id: id,
            account_id,
            progress,
        });
    }

    // --- tick -----------------------------------------------------------

    /// Advance the simulation by `dt` seconds at wall time `now` (ms)
    pub fn tick(&mut self, dt: f32, now: u64) {
        match self.current.poll(now) {
            Some(PhaseChange::Activated) => {
                info!(match_id = self.current.id, "Match active");
            }
            Some(PhaseChange::Ended) => {
                self.settle(now);
                return;
            }
            None => {}
        }
        let active = self.current.is_active();

        self.bot_think_acc += dt;
        if self.bot_think_acc >= BOT_THINK_INTERVAL {
            self.bot_think_acc -= BOT_THINK_INTERVAL;
            self.run_bots(active, now);
        }

        repulsion::decay_contact(&mut self.players, dt);

        let live = self.live_roster();
        for id in &live {
            let Some(player) = self.players.get_mut(id) else {
                continue;
            };
            let stats = player.ship_stats();
            PhysicsSystem::update_ship(
                &mut player.body,
                player.thrust && active,
                player.turn,
                &stats,
                &self.arena,
                dt,
            );
        }

        self.combat.advance(&self.players, dt);
        if active {
            self.resolve_combat(now);
        }
        self.combat.expire(now);

        let live = self.live_roster();
        repulsion::resolve_all(&mut self.players, &live, dt, &mut self.rng);

        for id in &self.current.roster {
            if let Some(player) = self.players.get_mut(id) {
                let (x, y) = self.arena.clamp_point(player.body.x, player.body.y);
                player.body.x = x;
                player.body.y = y;
            }
        }

        let dead: Vec<PlayerId> = self
            .players
            .values()
            .filter(|p| !p.is_alive())
            .map(|p| p.id)
            .collect();
        for id in dead {
            self.respawn(id);
        }

        if self.players.values().filter(|p| p.is_bot).count() < self.config.bot_count {
            self.spawn_bot();
        }

        if self.current.phase == MatchPhase::Waiting {
            self.evaluate(now);
            if now.saturating_sub(self.last_queue_echo) >= QUEUE_ECHO_INTERVAL_MS {
                self.last_queue_echo = now;
                self.echo_queue_status(now);
            }
        }
    }

    /// Live roster members in a stable order
    fn live_roster(&self) -> Vec<PlayerId> {
        let mut ids: Vec<PlayerId> = self
            .current
            .roster
            .iter()
            .filter(|id| self.players.get(id).is_some_and(|p| p.is_alive()))
            .copied()
            .collect();
        ids.sort();
        ids
    }

    fn run_bots(&mut self, active: bool, now: u64) {
        let mut bots: Vec<PlayerId> = self
            .players
            .values()
            .filter(|p| p.is_bot)
            .map(|p| p.id)
            .collect();
        bots.sort();

        for id in bots {
            if !active || !self.current.in_roster(&id) {
                if let Some(bot) = self.players.get_mut(&id) {
                    BotController::idle(bot);
                }
                continue;
            }
            let target = match self.players.get(&id) {
                Some(bot) if bot.is_alive() => {
                    nearest_enemy(bot, &self.players, &self.current.roster)
                }
                _ => continue,
            };
            let Some(bot) = self.players.get_mut(&id) else {
                continue;
            };
            if let Some(order) = BotController::think(bot, target, &self.arena, &mut self.rng, now)
            {
                self.combat
                    .try_fire(bot, order.weapon, None, order.homing_target, now);
            }
        }
    }

    fn resolve_combat(&mut self, now: u64) {
        let hits = self.combat.resolve_hits(
            &mut self.players,
            &self.current.roster,
            &self.arena,
            now,
        );

        for hit in hits.into_iter().filter(|h| h.target_killed) {
            let Some(report) = combat::resolve_kill(
                &mut self.players,
                &mut self.current.teams,
                &mut self.kill_feed,
                hit.target_id,
                Some(hit.shooter_id),
                hit.weapon,
                now,
            ) else {
                continue;
            };
            debug!(
                match_id = self.current.id,
                victim = %report.victim_id,
                killer = ?report.killer_id,
                weapon = ?hit.weapon,
                "Ship destroyed"
            );
            self.push(Outbound::Broadcast(ServerMsg::Explosion {
                x: report.x,
                y: report.y,
            }));
            if let (Some(killer), Some((streak, bonus))) = (report.killer_id, report.streak_notice) {
                self.push(Outbound::Direct(killer, ServerMsg::Streak { streak, bonus }));
            }
        }
    }

    fn respawn(&mut self, id: PlayerId) {
        let Some(player) = self.players.get_mut(&id) else {
            return;
        };
        let spawn = self.arena.team_spawn(&mut self.rng, player.team);
        player.respawn(spawn);
        if player.is_bot {
            player.brain = Some(BotBrain::new(&mut self.rng, &self.arena, player.team));
        } else {
            self.checkpoint(id);
        }
    }

    fn echo_queue_status(&mut self, now: u64) {
        debug!(
            normal_wait_ms = ?self.matchmaker.oldest_wait(QueueMode::Normal, now),
            ranked_wait_ms = ?self.matchmaker.oldest_wait(QueueMode::Ranked, now),
            "Queue waiting for players"
        );
        let queued: Vec<PlayerId> = self
            .players
            .values()
            .filter(|p| p.status == PlayerStatus::Queued)
            .map(|p| p.id)
            .collect();
        for id in queued {
            self.send_queue_status(id);
        }
    }

    // --- teams and bots -------------------------------------------------

    fn team_counts(&self) -> (usize, usize) {
        self.players
            .values()
            .fold((0, 0), |(red, blue), p| match p.team {
                Team::Red => (red + 1, blue),
                Team::Blue => (red, blue + 1),
            })
    }

    /// Random team that still has room
    fn pick_team_for_player(&mut self) -> Team {
        let (red, blue) = self.team_counts();
        let mut order = Team::ALL;
        if self.rng.gen_bool(0.5) {
            order.swap(0, 1);
        }
        order
            .into_iter()
            .find(|team| match team {
                Team::Red => red < MAX_PER_TEAM,
                Team::Blue => blue < MAX_PER_TEAM,
            })
            .unwrap_or(order[0])
    }

    /// Smaller team, random on a tie
    fn pick_team_for_bot(&mut self) -> Team {
        let (red, blue) = self.team_counts();
        if red >= MAX_PER_TEAM {
            return Team::Blue;
        }
        if blue >= MAX_PER_TEAM {
            return Team::Red;
        }
        match red.cmp(&blue) {
            std::cmp::Ordering::Less => Team::Red,
            std::cmp::Ordering::Greater => Team::Blue,
            std::cmp::Ordering::Equal if self.rng.gen_bool(0.5) => Team::Red,
            std::cmp::Ordering::Equal => Team::Blue,
        }
    }

    fn spawn_bot(&mut self) -> PlayerId {
        let team = self.pick_team_for_bot();
        let id = Uuid::new_v4();
        let name = bot_name(&mut self.rng);
        let spawn = self.arena.team_spawn(&mut self.rng, team);
        let brain = BotBrain::new(&mut self.rng, &self.arena, team);

        let mut bot = Player::new_bot(
            id,
            name,
            team,
            spawn,
            brain,
            self.config.ranked_min_normal_matches,
        );
        randomize_loadout(&mut self.rng, &mut bot);
        debug!(bot_id = %id, team = ?team, "Spawned bot");
        self.players.insert(id, bot);
        id
    }

    // --- views ----------------------------------------------------------

    fn teams_summary(&self) -> TeamsSummary {
        let (red, blue) = self.team_counts();
        self.current.teams.summary(red, blue)
    }

    pub fn match_info(&self, now: u64) -> MatchInfo {
        MatchInfo {
            id: self.current.id,
            countdown: self.current.countdown_remaining(now),
            time_remaining: self.current.time_remaining(now),
            phase: self.current.phase,
            mode: self.current.mode,
            teams: self.teams_summary(),
        }
    }

    /// Read-only view of the match for the broadcaster
    pub fn snapshot(&self, now: u64) -> WorldSnapshot {
        let mut roster: Vec<&Player> = self
            .current
            .roster
            .iter()
            .filter_map(|id| self.players.get(id))
            .collect();
        roster.sort_by_key(|p| p.id);

        WorldSnapshot {
            t: now,
            players: roster.into_iter().map(player_snapshot).collect(),
            bullets: self.combat.bullet_snapshots(),
            projectiles: self.combat.projectile_snapshots(),
            leaderboard: leaderboard(&self.players),
            kill_feed: self.kill_feed.entries(),
            match_info: self.match_info(now),
            queues: self.matchmaker.sizes(),
        }
    }
}

/// Trimmed display name, capped in length; `None` when blank
fn sanitize_name(raw: &str) -> Option<String> {
    let name: String = raw.trim().chars().take(MAX_NAME_LEN).collect();
    let name = name.trim_end().to_string();
    (!name.is_empty()).then_some(name)
}
