//! Player state shared by humans and bots

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::ws::protocol::{
    PersistentData, ProgressSnapshot, QueueMode, SkillKind, Team, WeaponKind,
};

use super::bot::BotBrain;
use super::physics::{Kinematics, ShipStats, Spawn};
use super::ranking::RankState;

pub type PlayerId = Uuid;

/// Skill and weapon level cap
pub const MAX_UPGRADE_LEVEL: u8 = 3;
pub const BASE_MAX_HP: f32 = 100.0;
pub const MAX_HP_PER_LEVEL: f32 = 10.0;
/// Credits granted to every bot at match start
pub const BOT_CREDITS: u64 = 999;
/// How long a hit counts towards an assist (ms)
pub const ASSIST_WINDOW_MS: u64 = 6_000;

/// Ceilings for progress restored from storage or sent by a client
pub const MAX_PROGRESS_VALUE: u64 = 1_000_000_000;
pub const MAX_LEVEL: u32 = 1_000;
pub const MAX_STORED_RANK_POINTS: i64 = 100_000;
pub const MAX_MATCH_COUNT: u32 = 1_000_000;

pub const SHIP_COLORS: [&str; 8] = [
    "#00ff00", "#ff6b9d", "#c9a0dc", "#ffd700", "#00ffff", "#ff8c00", "#7fffd4", "#ff69b4",
];

const SPEED_BOOST_COSTS: [u64; 3] = [75, 150, 225];
const SHIELD_COSTS: [u64; 3] = [75, 150, 225];
const RAPID_FIRE_COSTS: [u64; 3] = [100, 200, 300];
const CANNON_COSTS: [u64; 3] = [100, 200, 300];
const TORPEDO_COSTS: [u64; 3] = [150, 300, 500];
const MISSILE_COSTS: [u64; 3] = [200, 400, 700];

/// Where a player is in the lobby / queue / match flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayerStatus {
    Lobby,
    Queued,
    InMatch,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SkillLevels {
    pub speed_boost: u8,
    pub shield: u8,
    pub rapid_fire: u8,
}

impl SkillLevels {
    pub fn get(&self, kind: SkillKind) -> u8 {
        match kind {
            SkillKind::SpeedBoost => self.speed_boost,
            SkillKind::Shield => self.shield,
            SkillKind::RapidFire => self.rapid_fire,
        }
    }

    fn level_mut(&mut self, kind: SkillKind) -> &mut u8 {
        match kind {
            SkillKind::SpeedBoost => &mut self.speed_boost,
            SkillKind::Shield => &mut self.shield,
            SkillKind::RapidFire => &mut self.rapid_fire,
        }
    }

    pub fn clamped(self) -> Self {
        Self {
            speed_boost: self.speed_boost.min(MAX_UPGRADE_LEVEL),
            shield: self.shield.min(MAX_UPGRADE_LEVEL),
            rapid_fire: self.rapid_fire.min(MAX_UPGRADE_LEVEL),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WeaponLevels {
    pub cannon: u8,
    pub torpedo: u8,
    pub missile: u8,
}

impl Default for WeaponLevels {
    fn default() -> Self {
        Self {
            cannon: 1,
            torpedo: 0,
            missile: 0,
        }
    }
}

impl WeaponLevels {
    pub fn get(&self, kind: WeaponKind) -> u8 {
        match kind {
            WeaponKind::Cannon => self.cannon,
            WeaponKind::Torpedo => self.torpedo,
            WeaponKind::Missile => self.missile,
        }
    }

    fn level_mut(&mut self, kind: WeaponKind) -> &mut u8 {
        match kind {
            WeaponKind::Cannon => &mut self.cannon,
            WeaponKind::Torpedo => &mut self.torpedo,
            WeaponKind::Missile => &mut self.missile,
        }
    }

    /// Cannon is always owned
    pub fn clamped(self) -> Self {
        Self {
            cannon: self.cannon.clamp(1, MAX_UPGRADE_LEVEL),
            torpedo: self.torpedo.min(MAX_UPGRADE_LEVEL),
            missile: self.missile.min(MAX_UPGRADE_LEVEL),
        }
    }
}

/// Price of the next skill level, `None` when maxed
pub fn skill_cost(kind: SkillKind, current: u8) -> Option<u64> {
    let table = match kind {
        SkillKind::SpeedBoost => &SPEED_BOOST_COSTS,
        SkillKind::Shield => &SHIELD_COSTS,
        SkillKind::RapidFire => &RAPID_FIRE_COSTS,
    };
    table.get(usize::from(current)).copied()
}

/// Price of the next weapon level, `None` when maxed
pub fn weapon_cost(kind: WeaponKind, current: u8) -> Option<u64> {
    let table = match kind {
        WeaponKind::Cannon => &CANNON_COSTS,
        WeaponKind::Torpedo => &TORPEDO_COSTS,
        WeaponKind::Missile => &MISSILE_COSTS,
    };
    table.get(usize::from(current)).copied()
}

/// Max hp for a given level
pub fn max_hp_for_level(level: u32) -> f32 {
    BASE_MAX_HP + MAX_HP_PER_LEVEL * level.saturating_sub(1) as f32
}

/// Most recent hit time per attacker
#[derive(Debug, Clone, Default)]
pub struct AssistTracker {
    hits: HashMap<PlayerId, u64>,
}

impl AssistTracker {
    pub fn record(&mut self, attacker: PlayerId, now: u64) {
        self.hits.insert(attacker, now);
    }

    /// Attackers other than the killer that hit within the assist window.
    /// The tracker is cleared.
    pub fn collect(&mut self, killer: Option<PlayerId>, now: u64) -> Vec<PlayerId> {
        self.hits
            .drain()
            .filter(|(id, hit_at)| {
                Some(*id) != killer && now.saturating_sub(*hit_at) <= ASSIST_WINDOW_MS
            })
            .map(|(id, _)| id)
            .collect()
    }

    pub fn clear(&mut self) {
        self.hits.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// A ship in the world, human or bot
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    /// Authenticated account, if any (enables server-side persistence)
    pub account_id: Option<Uuid>,
    pub name: String,
    pub is_bot: bool,
    pub brain: Option<BotBrain>,
    pub team: Team,

    pub body: Kinematics,
    pub thrust: bool,
    pub turn: f32,

    pub hp: f32,
    pub max_hp: f32,

    // Per-match counters
    pub score: u64,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub kill_streak: u32,

    // Lifetime progress
    pub best_streak: u32,
    pub total_kills: u64,
    pub total_score: u64,
    pub total_deaths: u64,
    pub level: u32,
    pub xp: u64,
    pub credits: u64,
    pub skills: SkillLevels,
    pub weapons: WeaponLevels,
    pub ship_color: String,
    pub normal_matches: u32,
    pub rank: RankState,

    pub last_fire_at: Option<u64>,
    pub last_torpedo_at: Option<u64>,
    pub last_missile_at: Option<u64>,

    pub status: PlayerStatus,
    pub queue_mode: Option<QueueMode>,
    pub assist_tracker: AssistTracker,
    /// Repulsion contact intensity in [0, 1]
    pub magnetic: f32,
}

impl Player {
    fn base(id: PlayerId, name: String, team: Team, spawn: Spawn, is_bot: bool) -> Self {
        Self {
            id,
            account_id: None,
            name,
            is_bot,
            brain: None,
            team,
            body: Kinematics {
                x: spawn.x,
                y: spawn.y,
                angle: spawn.angle,
                vx: 0.0,
                vy: 0.0,
            },
            thrust: false,
            turn: 0.0,
            hp: BASE_MAX_HP,
            max_hp: BASE_MAX_HP,
            score: 0,
            kills: 0,
            deaths: 0,
            assists: 0,
            kill_streak: 0,
            best_streak: 0,
            total_kills: 0,
            total_score: 0,
            total_deaths: 0,
            level: 1,
            xp: 0,
            credits: 0,
            skills: SkillLevels::default(),
            weapons: WeaponLevels::default(),
            ship_color: team.color().to_string(),
            normal_matches: 0,
            rank: RankState::default(),
            last_fire_at: None,
            last_torpedo_at: None,
            last_missile_at: None,
            status: PlayerStatus::Lobby,
            queue_mode: None,
            assist_tracker: AssistTracker::default(),
            magnetic: 0.0,
        }
    }

    pub fn new_human(id: PlayerId, name: String, team: Team, spawn: Spawn) -> Self {
        Self::base(id, name, team, spawn, false)
    }

    /// Bots are ranked-eligible from the start and carry a brain
    pub fn new_bot(
        id: PlayerId,
        name: String,
        team: Team,
        spawn: Spawn,
        brain: BotBrain,
        min_normal_matches: u32,
    ) -> Self {
        let mut bot = Self::base(id, name, team, spawn, true);
        bot.brain = Some(brain);
        bot.credits = BOT_CREDITS;
        bot.normal_matches = min_normal_matches;
        bot
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0.0
    }

    pub fn is_human(&self) -> bool {
        !self.is_bot
    }

    pub fn ship_stats(&self) -> ShipStats {
        ShipStats::for_skills(&self.skills)
    }

    /// Seed persistent fields from stored or client-provided progress.
    /// Everything is clamped into its legal range.
    pub fn apply_persistent(&mut self, data: &PersistentData) {
        let cap = |value: u64| value.min(MAX_PROGRESS_VALUE);
        if let Some(total_kills) = data.total_kills {
            self.total_kills = cap(total_kills);
        }
        if let Some(total_score) = data.total_score {
            self.total_score = cap(total_score);
        }
        if let Some(best_streak) = data.best_streak {
            self.best_streak = best_streak.min(MAX_MATCH_COUNT);
        }
        if let Some(total_deaths) = data.total_deaths {
            self.total_deaths = cap(total_deaths);
        }
        if let Some(color) = data.ship_color.as_ref().filter(|c| !c.is_empty()) {
            self.ship_color = color.clone();
        }
        if let Some(normal_matches) = data.normal_matches {
            self.normal_matches = normal_matches.min(MAX_MATCH_COUNT);
        }
        if data.rank_points.is_some() || data.highest_rank_points.is_some() {
            let points = data
                .rank_points
                .unwrap_or(self.rank.points)
                .min(MAX_STORED_RANK_POINTS);
            let highest = data
                .highest_rank_points
                .unwrap_or(points)
                .min(MAX_STORED_RANK_POINTS);
            self.rank = RankState::restore(points, highest, data.highest_rank_label.clone());
        }
        if let Some(level) = data.level {
            self.level = level.clamp(1, MAX_LEVEL);
            self.max_hp = max_hp_for_level(self.level);
            self.hp = self.max_hp;
        }
        if let Some(xp) = data.xp {
            self.xp = cap(xp);
        }
        if let Some(credits) = data.credits.filter(|_| self.is_human()) {
            self.credits = cap(credits);
        }
        if let Some(skills) = data.skills {
            self.skills = skills.clamped();
        }
        if let Some(weapons) = data.weapons {
            self.weapons = weapons.clamped();
        }
    }

    /// Fields written at every persistence checkpoint
    pub fn progress_snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            total_kills: self.total_kills,
            total_score: self.total_score,
            best_streak: self.best_streak,
            total_deaths: self.total_deaths,
            ship_color: self.ship_color.clone(),
            normal_matches: self.normal_matches,
            rank_points: self.rank.points,
            rank_label: self.rank.label.clone(),
            highest_rank_points: self.rank.highest_points,
            highest_rank_label: self.rank.highest_label.clone(),
            level: self.level,
            xp: self.xp,
            credits: self.credits,
            skills: self.skills,
            weapons: self.weapons,
        }
    }

    /// Place the ship at a spawn point at rest
    pub fn place(&mut self, spawn: Spawn) {
        self.body = Kinematics {
            x: spawn.x,
            y: spawn.y,
            angle: spawn.angle,
            vx: 0.0,
            vy: 0.0,
        };
        self.thrust = false;
        self.turn = 0.0;
    }

    /// Reset per-match counters and put the ship at full health for a new match
    pub fn reset_for_match(&mut self, spawn: Spawn) {
        self.place(spawn);
        self.max_hp = max_hp_for_level(self.level);
        self.hp = self.max_hp;
        self.score = 0;
        self.kills = 0;
        self.deaths = 0;
        self.assists = 0;
        self.kill_streak = 0;
        self.rank.delta = 0;
        self.assist_tracker.clear();
        self.magnetic = 0.0;
        self.last_fire_at = None;
        self.last_torpedo_at = None;
        self.last_missile_at = None;
    }

    /// Bring a dead ship back. Bought skills and weapons are lost; credits,
    /// level and xp are kept.
    pub fn respawn(&mut self, spawn: Spawn) {
        self.place(spawn);
        self.hp = self.max_hp;
        self.kill_streak = 0;
        self.skills = SkillLevels::default();
        self.weapons = WeaponLevels::default();
        self.last_fire_at = None;
        self.last_torpedo_at = None;
        self.last_missile_at = None;
        self.assist_tracker.clear();
    }

    /// Apply damage, never dropping below zero. Returns true when this hit killed.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        let was_alive = self.is_alive();
        self.hp = (self.hp - amount).max(0.0);
        was_alive && !self.is_alive()
    }

    pub fn heal(&mut self, amount: f32) {
        self.hp = (self.hp + amount).min(self.max_hp);
    }

    /// Add xp; a single grant levels up at most once. Returns true on level-up.
    pub fn gain_xp(&mut self, amount: u64) -> bool {
        self.xp = self.xp.saturating_add(amount).min(MAX_PROGRESS_VALUE);
        let needed = u64::from(self.level) * 100;
        if self.xp < needed || self.level >= MAX_LEVEL {
            return false;
        }
        self.xp -= needed;
        self.level += 1;
        self.max_hp += MAX_HP_PER_LEVEL;
        self.hp = self.max_hp;
        true
    }

    /// Credit score to both the match and lifetime counters
    pub fn add_score(&mut self, score: u64) {
        self.score = self.score.saturating_add(score);
        self.total_score = self.total_score.saturating_add(score).min(MAX_PROGRESS_VALUE);
    }

    pub fn add_credits(&mut self, credits: u64) {
        self.credits = self.credits.saturating_add(credits).min(MAX_PROGRESS_VALUE);
    }

    pub fn try_upgrade_skill(&mut self, kind: SkillKind) -> bool {
        let current = self.skills.get(kind);
        let Some(cost) = skill_cost(kind, current) else {
            return false;
        };
        if self.credits < cost {
            return false;
        }
        self.credits -= cost;
        *self.skills.level_mut(kind) += 1;
        true
    }

    pub fn try_upgrade_weapon(&mut self, kind: WeaponKind) -> bool {
        let current = self.weapons.get(kind);
        let Some(cost) = weapon_cost(kind, current) else {
            return false;
        };
        if self.credits < cost {
            return false;
        }
        self.credits -= cost;
        *self.weapons.level_mut(kind) += 1;
        true
    }

    /// Humans only; out-of-range indices are ignored
    pub fn set_color(&mut self, index: i64) -> bool {
        if self.is_bot {
            return false;
        }
        let Some(color) = usize::try_from(index)
            .ok()
            .and_then(|i| SHIP_COLORS.get(i))
        else {
            return false;
        };
        self.ship_color = (*color).to_string();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn() -> Spawn {
        Spawn {
            x: 3000.0,
            y: 2600.0,
            angle: 0.0,
        }
    }

    fn human() -> Player {
        Player::new_human(Uuid::new_v4(), "Pilot".to_string(), Team::Red, spawn())
    }

    #[test]
    fn test_skill_upgrade_costs_and_cap() {
        let mut player = human();
        player.credits = 1_000;

        assert!(player.try_upgrade_skill(SkillKind::RapidFire));
        assert!(player.try_upgrade_skill(SkillKind::RapidFire));
        assert!(player.try_upgrade_skill(SkillKind::RapidFire));
        assert_eq!(player.skills.rapid_fire, 3);
        assert_eq!(player.credits, 1_000 - 100 - 200 - 300);

        // Capped: no charge
        assert!(!player.try_upgrade_skill(SkillKind::RapidFire));
        assert_eq!(player.credits, 400);
    }

    #[test]
    fn test_upgrade_requires_credits() {
        let mut player = human();
        player.credits = 74;
        assert!(!player.try_upgrade_skill(SkillKind::Shield));
        assert_eq!(player.skills.shield, 0);
        assert_eq!(player.credits, 74);
    }

    #[test]
    fn test_weapon_cost_indexed_by_current_level() {
        let mut player = human();
        player.credits = 150;
        // Cannon starts at level 1, so the next level costs the second entry
        assert!(!player.try_upgrade_weapon(WeaponKind::Cannon));
        assert!(player.try_upgrade_weapon(WeaponKind::Torpedo));
        assert_eq!(player.weapons.torpedo, 1);
        assert_eq!(player.credits, 0);
    }

    #[test]
    fn test_set_color() {
        let mut player = human();
        assert!(player.set_color(3));
        assert_eq!(player.ship_color, SHIP_COLORS[3]);
        assert!(!player.set_color(8));
        assert!(!player.set_color(-1));
        assert_eq!(player.ship_color, SHIP_COLORS[3]);
    }

    #[test]
    fn test_gain_xp_levels_up_once_per_grant() {
        let mut player = human();
        player.hp = 10.0;
        // Enough for two levels, but one grant only pays for one
        assert!(player.gain_xp(320));
        assert_eq!(player.level, 2);
        assert_eq!(player.xp, 220);
        assert_eq!(player.max_hp, 110.0);
        assert_eq!(player.hp, 110.0);

        assert!(player.gain_xp(0));
        assert_eq!(player.level, 3);
        assert_eq!(player.xp, 20);
        assert!(!player.gain_xp(0));
    }

    #[test]
    fn test_respawn_drops_upgrades_but_keeps_progression() {
        let mut player = human();
        player.credits = 450;
        player.level = 4;
        player.xp = 30;
        player.max_hp = 130.0;
        player.skills.shield = 3;
        player.weapons.missile = 2;
        player.weapons.cannon = 3;
        player.last_missile_at = Some(500);
        player.hp = 0.0;

        player.respawn(spawn());

        assert_eq!(player.hp, 130.0);
        assert_eq!(player.skills, SkillLevels::default());
        assert_eq!(
            player.weapons,
            WeaponLevels {
                cannon: 1,
                torpedo: 0,
                missile: 0
            }
        );
        assert_eq!(player.last_missile_at, None);
        assert_eq!(player.credits, 450);
        assert_eq!(player.level, 4);
        assert_eq!(player.xp, 30);
    }

    #[test]
    fn test_hostile_progress_is_capped() {
        let mut player = human();
        player.apply_persistent(&PersistentData {
            credits: Some(u64::MAX),
            xp: Some(u64::MAX),
            level: Some(u32::MAX),
            total_score: Some(u64::MAX),
            total_kills: Some(u64::MAX),
            normal_matches: Some(u32::MAX),
            rank_points: Some(i64::MAX),
            ..Default::default()
        });

        assert_eq!(player.credits, MAX_PROGRESS_VALUE);
        assert_eq!(player.xp, MAX_PROGRESS_VALUE);
        assert_eq!(player.level, MAX_LEVEL);
        assert_eq!(player.total_score, MAX_PROGRESS_VALUE);
        assert_eq!(player.normal_matches, MAX_MATCH_COUNT);
        assert_eq!(player.rank.points, MAX_STORED_RANK_POINTS);

        // Further gains saturate instead of overflowing
        player.add_credits(u64::MAX);
        player.add_score(u64::MAX);
        assert!(!player.gain_xp(u64::MAX));
        assert_eq!(player.credits, MAX_PROGRESS_VALUE);
        assert_eq!(player.total_score, MAX_PROGRESS_VALUE);
        assert_eq!(player.score, u64::MAX);
    }

    #[test]
    fn test_take_damage_floors_at_zero() {
        let mut player = human();
        assert!(!player.take_damage(60.0));
        assert!(player.take_damage(60.0));
        assert_eq!(player.hp, 0.0);
        assert!(!player.take_damage(10.0));
    }

    #[test]
    fn test_apply_persistent_clamps() {
        let mut player = human();
        player.apply_persistent(&PersistentData {
            level: Some(0),
            credits: Some(500),
            rank_points: Some(-30),
            highest_rank_points: Some(2400),
            skills: Some(SkillLevels {
                speed_boost: 9,
                shield: 1,
                rapid_fire: 0,
            }),
            weapons: Some(WeaponLevels {
                cannon: 0,
                torpedo: 7,
                missile: 2,
            }),
            ..Default::default()
        });

        assert_eq!(player.level, 1);
        assert_eq!(player.credits, 500);
        assert_eq!(player.rank.points, 0);
        assert_eq!(player.rank.highest_points, 2400);
        assert_eq!(player.skills.speed_boost, 3);
        assert_eq!(player.weapons.cannon, 1);
        assert_eq!(player.weapons.torpedo, 3);
        assert_eq!(player.weapons.missile, 2);
    }

    #[test]
    fn test_reset_for_match_recomputes_max_hp() {
        let mut player = human();
        player.level = 4;
        player.kills = 7;
        player.score = 900;
        player.kill_streak = 4;
        player.assist_tracker.record(Uuid::new_v4(), 10);
        player.reset_for_match(spawn());

        assert_eq!(player.max_hp, 130.0);
        assert_eq!(player.hp, 130.0);
        assert_eq!(player.kills, 0);
        assert_eq!(player.score, 0);
        assert_eq!(player.kill_streak, 0);
        assert!(player.assist_tracker.is_empty());
    }

    #[test]
    fn test_assist_tracker_window_and_killer_exclusion() {
        let killer = Uuid::new_v4();
        let helper = Uuid::new_v4();
        let stale = Uuid::new_v4();

        let mut tracker = AssistTracker::default();
        tracker.record(stale, 1_000);
        tracker.record(helper, 5_000);
        tracker.record(killer, 9_000);

        let assisters = tracker.collect(Some(killer), 10_000);
        assert_eq!(assisters, vec![helper]);
        assert!(tracker.is_empty());
    }
}
