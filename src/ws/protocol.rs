//! WebSocket protocol message definitions
//! These are the wire types for client-server communication.
//!
//! Every frame is `{"event": <name>, "data": <payload>}`.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::game::combat::ProjectileKind;
use crate::game::lifecycle::{MatchPhase, TeamStats};
use crate::game::player::{PlayerStatus, SkillLevels, WeaponLevels};

/// Team a ship fights for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Red,
    Blue,
}

impl Team {
    pub const ALL: [Team; 2] = [Team::Red, Team::Blue];

    pub fn display_name(self) -> &'static str {
        match self {
            Team::Red => "Kırmızı Takım",
            Team::Blue => "Mavi Takım",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Team::Red => "#ff5f5f",
            Team::Blue => "#5fb6ff",
        }
    }
}

/// Matchmaking queue flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueMode {
    Normal,
    Ranked,
}

impl QueueMode {
    /// Anything that is not exactly "ranked" is treated as a normal request
    pub fn from_wire(raw: Option<&str>) -> Self {
        match raw {
            Some("ranked") => QueueMode::Ranked,
            _ => QueueMode::Normal,
        }
    }
}

/// Purchasable ship skills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkillKind {
    SpeedBoost,
    Shield,
    RapidFire,
}

/// Purchasable weapon tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WeaponKind {
    Cannon,
    Torpedo,
    Missile,
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all_fields = "camelCase")]
pub enum ClientMsg {
    /// Set display name and seed persistent progress (guests)
    #[serde(rename = "join")]
    Join {
        name: Option<String>,
        persistent_data: Option<PersistentData>,
        mode: Option<String>,
    },

    /// Movement intent
    #[serde(rename = "input")]
    Input {
        thrust: Option<bool>,
        /// Turn rate in [-1, 1]
        turn: Option<f32>,
    },

    /// Fire the cannon, optionally snapping to an aim angle (radians)
    #[serde(rename = "fire")]
    Fire { angle: Option<f32> },

    #[serde(rename = "fireTorpedo")]
    FireTorpedo { angle: Option<f32> },

    #[serde(rename = "fireMissile")]
    FireMissile { angle: Option<f32> },

    #[serde(rename = "upgradeSkill")]
    UpgradeSkill { name: SkillKind },

    #[serde(rename = "upgradeWeapon")]
    UpgradeWeapon { name: WeaponKind },

    #[serde(rename = "changeColor")]
    ChangeColor { index: i64 },

    #[serde(rename = "queue:join")]
    QueueJoin { mode: Option<String> },

    #[serde(rename = "queue:leave")]
    QueueLeave,

    #[serde(rename = "ranked:forfeit")]
    RankedForfeit,

    #[serde(rename = "requestMatchStart")]
    RequestMatchStart,
}

/// Client-held progress, applied on `join` (all fields optional)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistentData {
    pub total_kills: Option<u64>,
    pub total_score: Option<u64>,
    pub best_streak: Option<u32>,
    pub total_deaths: Option<u64>,
    pub ship_color: Option<String>,
    pub normal_matches: Option<u32>,
    pub rank_points: Option<i64>,
    pub rank_label: Option<String>,
    pub highest_rank_points: Option<i64>,
    pub highest_rank_label: Option<String>,
    pub level: Option<u32>,
    pub xp: Option<u64>,
    pub credits: Option<u64>,
    pub skills: Option<SkillLevels>,
    pub weapons: Option<WeaponLevels>,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all_fields = "camelCase")]
pub enum ServerMsg {
    /// Sent once after connection
    #[serde(rename = "init")]
    Init {
        id: Uuid,
        name: String,
        world: WorldDims,
        team: Team,
        available_colors: Vec<String>,
        #[serde(rename = "match")]
        match_info: MatchInfo,
    },

    /// Full world state (broadcast at SNAPSHOT_TPS)
    #[serde(rename = "state")]
    State(Arc<WorldSnapshot>),

    #[serde(rename = "matchStart")]
    MatchStart(MatchStartInfo),

    #[serde(rename = "matchEnd")]
    MatchEnd(MatchEndSummary),

    #[serde(rename = "explosion")]
    Explosion { x: f32, y: f32 },

    /// Private kill streak notification
    #[serde(rename = "streak")]
    Streak { streak: u32, bonus: u64 },

    /// Progress checkpoint for client-side storage
    #[serde(rename = "saveProgress")]
    SaveProgress(ProgressSnapshot),

    #[serde(rename = "queue:status")]
    QueueStatus {
        mode: Option<QueueMode>,
        normal_size: usize,
        ranked_size: usize,
    },

    #[serde(rename = "queue:summary")]
    QueueSummary {
        normal_size: usize,
        ranked_size: usize,
    },

    #[serde(rename = "queue:joined")]
    QueueJoined { mode: QueueMode },

    #[serde(rename = "queue:left")]
    QueueLeft,

    #[serde(rename = "queue:error")]
    QueueError { message: String },

    #[serde(rename = "ranked:forfeit:result")]
    ForfeitResult(ForfeitResult),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WorldDims {
    pub width: f32,
    pub height: f32,
}

/// Public match state embedded in `init` and `state`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchInfo {
    pub id: u64,
    /// Milliseconds until the countdown ends (0 outside countdown)
    pub countdown: u64,
    /// Milliseconds until the match ends (0 outside active)
    pub time_remaining: u64,
    pub phase: MatchPhase,
    pub mode: QueueMode,
    pub teams: TeamsSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamsSummary {
    pub red: TeamSummary,
    pub blue: TeamSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamSummary {
    #[serde(flatten)]
    pub stats: TeamStats,
    pub count: usize,
    pub color: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStartInfo {
    pub id: u64,
    pub countdown: u64,
    pub starts_at: u64,
    pub ends_at: u64,
    pub phase: MatchPhase,
    pub mode: QueueMode,
    pub teams: TeamsSummary,
}

/// Match winner (team score comparison)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Red,
    Blue,
    Draw,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEndSummary {
    pub id: u64,
    pub winner: Winner,
    pub mode: QueueMode,
    pub teams: TeamsSummary,
    pub players: Vec<PlayerMatchSummary>,
    pub ended_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMatchSummary {
    pub id: Uuid,
    pub name: String,
    pub team: Team,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub score: u64,
    pub credits: u64,
    pub is_bot: bool,
    pub normal_matches: u32,
    pub rank_label: String,
    pub rank_points: i64,
    pub rank_delta: i64,
}

/// Everything the persistence layer stores for a human player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub total_kills: u64,
    pub total_score: u64,
    pub best_streak: u32,
    pub total_deaths: u64,
    pub ship_color: String,
    pub normal_matches: u32,
    pub rank_points: i64,
    pub rank_label: String,
    pub highest_rank_points: i64,
    pub highest_rank_label: String,
    pub level: u32,
    pub xp: u64,
    pub credits: u64,
    pub skills: SkillLevels,
    pub weapons: WeaponLevels,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForfeitResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub penalty: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank_points: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highest_rank_points: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highest_rank_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Read-only world snapshot published by the tick loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSnapshot {
    /// Server time of the snapshot (ms)
    pub t: u64,
    pub players: Vec<PlayerSnapshot>,
    pub bullets: Vec<BulletSnapshot>,
    pub projectiles: Vec<ProjectileSnapshot>,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub kill_feed: Vec<KillFeedEntry>,
    #[serde(rename = "match")]
    pub match_info: MatchInfo,
    pub queues: QueueSizes,
}

/// Ship state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub id: Uuid,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub angle: f32,
    pub hp: f32,
    pub max_hp: f32,
    pub is_bot: bool,
    pub score: u64,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub level: u32,
    pub xp: u64,
    pub credits: u64,
    pub skills: SkillLevels,
    pub weapons: WeaponLevels,
    pub ship_color: String,
    pub kill_streak: u32,
    pub best_streak: u32,
    /// Repulsion contact intensity in [0, 1], presentation only
    pub magnetic: f32,
    pub team: Team,
    pub rank: String,
    pub rank_points: i64,
    pub rank_delta: i64,
    pub normal_matches: u32,
    pub state: PlayerStatus,
    pub queue_mode: Option<QueueMode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulletSnapshot {
    pub id: u64,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectileSnapshot {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    #[serde(rename = "type")]
    pub kind: ProjectileKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: u64,
    pub kills: u32,
    pub level: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillFeedEntry {
    pub killer: String,
    pub killed: String,
    pub timestamp: u64,
    pub streak: u32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QueueSizes {
    pub normal: usize,
    pub ranked: usize,
}
