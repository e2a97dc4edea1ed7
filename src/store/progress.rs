//! Long-term player progress: Supabase table or in-memory map

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::config::Config;
use crate::game::player::{SkillLevels, WeaponLevels};
use crate::game::ranking::resolve_rank;
use crate::ws::protocol::{PersistentData, ProgressSnapshot};

use super::supabase::{SupabaseClient, SupabaseError};

pub const PROGRESS_TABLE: &str = "player_progress";

/// One row of `player_progress`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub account_id: Uuid,
    pub display_name: String,
    #[serde(default)]
    pub total_kills: u64,
    #[serde(default)]
    pub total_score: u64,
    #[serde(default)]
    pub best_streak: u32,
    #[serde(default)]
    pub total_deaths: u64,
    pub ship_color: Option<String>,
    #[serde(default)]
    pub normal_matches: u32,
    #[serde(default)]
    pub rank_points: i64,
    pub rank_label: Option<String>,
    #[serde(default)]
    pub highest_rank_points: i64,
    pub highest_rank_label: Option<String>,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub credits: u64,
    #[serde(default)]
    pub skills: SkillLevels,
    #[serde(default)]
    pub weapons: WeaponLevels,
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_level() -> u32 {
    1
}

impl ProgressRecord {
    /// Fresh record for a first-time account
    pub fn new(account_id: Uuid, display_name: &str) -> Self {
        let label = resolve_rank(0).label;
        Self {
            account_id,
            display_name: display_name.to_string(),
            total_kills: 0,
            total_score: 0,
            best_streak: 0,
            total_deaths: 0,
            ship_color: None,
            normal_matches: 0,
            rank_points: 0,
            rank_label: Some(label.clone()),
            highest_rank_points: 0,
            highest_rank_label: Some(label),
            level: 1,
            xp: 0,
            credits: 0,
            skills: SkillLevels::default(),
            weapons: WeaponLevels::default(),
            updated_at: Some(Utc::now()),
        }
    }

    /// Seed for a player entering the world
    pub fn to_persistent_data(&self) -> PersistentData {
        PersistentData {
            total_kills: Some(self.total_kills),
            total_score: Some(self.total_score),
            best_streak: Some(self.best_streak),
            total_deaths: Some(self.total_deaths),
            ship_color: self.ship_color.clone(),
            normal_matches: Some(self.normal_matches),
            rank_points: Some(self.rank_points),
            rank_label: self.rank_label.clone(),
            highest_rank_points: Some(self.highest_rank_points),
            highest_rank_label: self.highest_rank_label.clone(),
            level: Some(self.level),
            xp: Some(self.xp),
            credits: Some(self.credits),
            skills: Some(self.skills),
            weapons: Some(self.weapons),
        }
    }

    fn apply(&mut self, update: &ProgressUpdate) {
        self.total_kills = update.total_kills;
        self.total_score = update.total_score;
        self.best_streak = self.best_streak.max(update.best_streak);
        self.total_deaths = update.total_deaths;
        self.ship_color = Some(update.ship_color.clone());
        self.normal_matches = update.normal_matches;
        self.rank_points = update.rank_points;
        self.rank_label = Some(update.rank_label.clone());
        if update.highest_rank_points >= self.highest_rank_points {
            self.highest_rank_points = update.highest_rank_points;
            self.highest_rank_label = Some(update.highest_rank_label.clone());
        }
        self.level = update.level;
        self.xp = update.xp;
        self.credits = update.credits;
        self.skills = update.skills;
        self.weapons = update.weapons;
        self.updated_at = Some(update.updated_at);
    }
}

/// New row for insertion
#[derive(Debug, Clone, Serialize)]
struct NewProgress<'a> {
    account_id: Uuid,
    display_name: &'a str,
}

/// Checkpoint write. Values are clamped into their legal ranges.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressUpdate {
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
    pub updated_at: DateTime<Utc>,
}

impl ProgressUpdate {
    pub fn from_snapshot(progress: &ProgressSnapshot) -> Self {
        let rank_points = progress.rank_points.max(0);
        let (highest_rank_points, highest_rank_label) = if progress.highest_rank_points >= rank_points
        {
            (progress.highest_rank_points, progress.highest_rank_label.clone())
        } else {
            (rank_points, resolve_rank(rank_points).label)
        };

        Self {
            total_kills: progress.total_kills,
            total_score: progress.total_score,
            best_streak: progress.best_streak,
            total_deaths: progress.total_deaths,
            ship_color: progress.ship_color.clone(),
            normal_matches: progress.normal_matches,
            rank_points,
            rank_label: resolve_rank(rank_points).label,
            highest_rank_points,
            highest_rank_label,
            level: progress.level.max(1),
            xp: progress.xp,
            credits: progress.credits,
            skills: progress.skills.clamped(),
            weapons: progress.weapons.clamped(),
            updated_at: Utc::now(),
        }
    }
}

/// Progress store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Supabase error: {0}")]
    Supabase(#[from] SupabaseError),
}

/// Where progress lives
pub enum ProgressStore {
    /// Supabase `player_progress` table
    Remote(SupabaseClient),
    /// Process-local map used in offline mode
    Memory(DashMap<Uuid, ProgressRecord>),
}

impl ProgressStore {
    pub fn from_config(config: &Config) -> Self {
        if config.offline_mode {
            return Self::in_memory();
        }
        match SupabaseClient::from_config(config) {
            Some(client) => Self::Remote(client),
            None => {
                warn!("Supabase is not configured, keeping progress in memory");
                Self::in_memory()
            }
        }
    }

    pub fn in_memory() -> Self {
        Self::Memory(DashMap::new())
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    pub async fn lookup(&self, account_id: Uuid) -> Result<Option<ProgressRecord>, StoreError> {
        match self {
            Self::Remote(client) => {
                let query = format!("account_id=eq.{}", account_id);
                Ok(client.get_one(PROGRESS_TABLE, &query).await?)
            }
            Self::Memory(records) => Ok(records.get(&account_id).map(|r| r.value().clone())),
        }
    }

    pub async fn create(
        &self,
        account_id: Uuid,
        display_name: &str,
    ) -> Result<ProgressRecord, StoreError> {
        match self {
            Self::Remote(client) => {
                let row = NewProgress {
                    account_id,
                    display_name,
                };
                Ok(client.insert(PROGRESS_TABLE, &row).await?)
            }
            Self::Memory(records) => {
                let record = records
                    .entry(account_id)
                    .or_insert_with(|| ProgressRecord::new(account_id, display_name));
                Ok(record.value().clone())
            }
        }
    }

    pub async fn update(&self, account_id: Uuid, update: &ProgressUpdate) -> Result<(), StoreError> {
        match self {
            Self::Remote(client) => {
                let query = format!("account_id=eq.{}", account_id);
                Ok(client.update(PROGRESS_TABLE, &query, update).await?)
            }
            Self::Memory(records) => {
                records
                    .entry(account_id)
                    .or_insert_with(|| ProgressRecord::new(account_id, "Pilot"))
                    .apply(update);
                Ok(())
            }
        }
    }

    /// Lookup, creating the record on first sight
    pub async fn ensure(
        &self,
        account_id: Uuid,
        display_name: &str,
    ) -> Result<ProgressRecord, StoreError> {
        match self.lookup(account_id).await? {
            Some(record) => Ok(record),
            None => self.create(account_id, display_name).await,
        }
    }
}
