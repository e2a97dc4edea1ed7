//! Combat system - weapons, munitions, hit detection and kill rewards

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

use crate::ws::protocol::{
    BulletSnapshot, KillFeedEntry, ProjectileSnapshot, Team, WeaponKind,
};

use super::lifecycle::TeamBoard;
use super::physics::{angle_diff, distance_sq, Arena, SHIP_RADIUS};
use super::player::{Player, PlayerId};

/// Shield damage multipliers by shield level
pub const SHIELD_DAMAGE_MULTIPLIERS: [f32; 4] = [1.0, 0.875, 0.75, 0.65];
/// Streak bonus table, indexed by min(5, streak - 2) once streak >= 5
pub const STREAK_BONUSES: [u64; 6] = [0, 50, 100, 200, 400, 800];
/// Cooldown reduction per rapidFire level
pub const RAPID_FIRE_REDUCTION: f32 = 0.15;
/// Fraction of the angular error a homing bullet corrects per tick
pub const HOMING_STRENGTH: f32 = 0.15;
pub const BULLET_MAX_RANGE: f32 = 800.0;

pub const KILL_HEAL: f32 = 50.0;
pub const ASSIST_SCORE: u64 = 60;
pub const ASSIST_CREDITS: u64 = 40;
const KILL_FEED_LEN: usize = 2;

/// Kind of slow projectile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectileKind {
    Torpedo,
    Missile,
}

impl ProjectileKind {
    pub fn weapon(self) -> WeaponKind {
        match self {
            ProjectileKind::Torpedo => WeaponKind::Torpedo,
            ProjectileKind::Missile => WeaponKind::Missile,
        }
    }
}

/// Fixed stats of one weapon
#[derive(Debug, Clone, Copy)]
pub struct WeaponStats {
    /// Damage per hit before shields
    pub damage: f32,
    /// Munition speed (px/s)
    pub speed: f32,
    /// Base cooldown between shots (ms)
    pub cooldown_ms: f32,
    /// Distance ahead of the ship the munition spawns
    pub spawn_offset: f32,
    /// Centre distance that counts as a hit
    pub hit_radius: f32,
    /// Lifetime (ms)
    pub ttl_ms: u64,
}

impl WeaponStats {
    pub fn for_weapon(kind: WeaponKind) -> Self {
        match kind {
            WeaponKind::Cannon => Self {
                damage: 20.0,
                speed: 950.0,
                cooldown_ms: 500.0,
                spawn_offset: 25.0,
                hit_radius: SHIP_RADIUS + 6.0,
                ttl_ms: 2_500,
            },
            WeaponKind::Torpedo => Self {
                damage: 35.0,
                speed: 500.0,
                cooldown_ms: 3_000.0,
                spawn_offset: 30.0,
                hit_radius: SHIP_RADIUS + 10.0,
                ttl_ms: 6_000,
            },
            WeaponKind::Missile => Self {
                damage: 50.0,
                speed: 400.0,
                cooldown_ms: 5_000.0,
                spawn_offset: 30.0,
                hit_radius: SHIP_RADIUS + 10.0,
                ttl_ms: 6_000,
            },
        }
    }
}

/// Cannon shot
#[derive(Debug, Clone)]
pub struct Bullet {
    pub id: u64,
    pub owner_id: PlayerId,
    pub owner_team: Team,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub start_x: f32,
    pub start_y: f32,
    pub created_at: u64,
    pub homing_target: Option<PlayerId>,
}

/// Torpedo or missile
#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: u64,
    pub owner_id: PlayerId,
    pub owner_team: Team,
    pub kind: ProjectileKind,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub created_at: u64,
}

/// A damaging hit resolved this tick
#[derive(Debug, Clone)]
pub struct HitResult {
    pub shooter_id: PlayerId,
    pub target_id: PlayerId,
    pub weapon: WeaponKind,
    pub target_killed: bool,
}

/// Everything produced by a kill that leaves the combat system
#[derive(Debug, Clone)]
pub struct KillReport {
    pub victim_id: PlayerId,
    pub killer_id: Option<PlayerId>,
    pub x: f32,
    pub y: f32,
    /// Private streak notice for a human killer: (streak, bonus)
    pub streak_notice: Option<(u32, u64)>,
}

/// Streak bonus for the killer's new streak
pub fn streak_bonus(streak: u32) -> u64 {
    if streak < 5 {
        return 0;
    }
    let index = ((streak - 2) as usize).min(STREAK_BONUSES.len() - 1);
    STREAK_BONUSES[index]
}

/// Cannon cooldown after rapidFire, other weapons are fixed
pub fn cooldown_ms(kind: WeaponKind, rapid_fire: u8) -> u64 {
    let stats = WeaponStats::for_weapon(kind);
    let scale = match kind {
        WeaponKind::Cannon => 1.0 - RAPID_FIRE_REDUCTION * f32::from(rapid_fire),
        WeaponKind::Torpedo | WeaponKind::Missile => 1.0,
    };
    (stats.cooldown_ms * scale).round() as u64
}

/// Weapon owned and off cooldown
pub fn is_ready(shooter: &Player, kind: WeaponKind, now: u64) -> bool {
    if shooter.weapons.get(kind) == 0 {
        return false;
    }
    let last = match kind {
        WeaponKind::Cannon => shooter.last_fire_at,
        WeaponKind::Torpedo => shooter.last_torpedo_at,
        WeaponKind::Missile => shooter.last_missile_at,
    };
    match last {
        Some(at) => now.saturating_sub(at) >= cooldown_ms(kind, shooter.skills.rapid_fire),
        None => true,
    }
}

pub fn shield_multiplier(shield: u8) -> f32 {
    SHIELD_DAMAGE_MULTIPLIERS[usize::from(shield).min(SHIELD_DAMAGE_MULTIPLIERS.len() - 1)]
}

/// Newest-first kill feed
#[derive(Debug, Clone, Default)]
pub struct KillFeed {
    entries: VecDeque<KillFeedEntry>,
}

impl KillFeed {
    pub fn push(&mut self, entry: KillFeedEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(KILL_FEED_LEN);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> Vec<KillFeedEntry> {
        self.entries.iter().cloned().collect()
    }
}

/// All live munitions in the world
#[derive(Debug, Default)]
pub struct CombatSystem {
    bullets: Vec<Bullet>,
    projectiles: Vec<Projectile>,
    next_bullet_id: u64,
    next_projectile_id: u64,
}

impl CombatSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bullets(&self) -> &[Bullet] {
        &self.bullets
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    pub fn clear(&mut self) {
        self.bullets.clear();
        self.projectiles.clear();
    }

    /// Fire a weapon if it is owned and off cooldown. The caller gates on
    /// match phase and roster membership.
    ///
    /// An aim angle snaps the cannon heading; torpedoes and missiles always
    /// leave along the current heading.
    pub fn try_fire(
        &mut self,
        shooter: &mut Player,
        kind: WeaponKind,
        aim: Option<f32>,
        homing_target: Option<PlayerId>,
        now: u64,
    ) -> bool {
        if !shooter.is_alive() || !is_ready(shooter, kind, now) {
            return false;
        }
        match kind {
            WeaponKind::Cannon => shooter.last_fire_at = Some(now),
            WeaponKind::Torpedo => shooter.last_torpedo_at = Some(now),
            WeaponKind::Missile => shooter.last_missile_at = Some(now),
        }

        let stats = WeaponStats::for_weapon(kind);
        match kind {
            WeaponKind::Cannon => {
                if let Some(angle) = aim {
                    shooter.body.angle = angle;
                }
                let angle = shooter.body.angle;
                let x = shooter.body.x + angle.cos() * stats.spawn_offset;
                let y = shooter.body.y + angle.sin() * stats.spawn_offset;
                self.next_bullet_id += 1;
                self.bullets.push(Bullet {
                    id: self.next_bullet_id,
                    owner_id: shooter.id,
                    owner_team: shooter.team,
                    x,
                    y,
                    vx: angle.cos() * stats.speed,
                    vy: angle.sin() * stats.speed,
                    start_x: x,
                    start_y: y,
                    created_at: now,
                    homing_target,
                });
            }
            WeaponKind::Torpedo | WeaponKind::Missile => {
                let projectile_kind = if kind == WeaponKind::Torpedo {
                    ProjectileKind::Torpedo
                } else {
                    ProjectileKind::Missile
                };
                let angle = shooter.body.angle;
                self.next_projectile_id += 1;
                self.projectiles.push(Projectile {
                    id: self.next_projectile_id,
                    owner_id: shooter.id,
                    owner_team: shooter.team,
                    kind: projectile_kind,
                    x: shooter.body.x + angle.cos() * stats.spawn_offset,
                    y: shooter.body.y + angle.sin() * stats.spawn_offset,
                    vx: angle.cos() * stats.speed,
                    vy: angle.sin() * stats.speed,
                    created_at: now,
                });
            }
        }
        true
    }

    /// Move every munition; homing bullets turn toward a live target first
    pub fn advance(&mut self, players: &HashMap<PlayerId, Player>, dt: f32) {
        for bullet in &mut self.bullets {
            if let Some(target) = bullet
                .homing_target
                .and_then(|id| players.get(&id))
                .filter(|p| p.is_alive())
            {
                let dx = target.body.x - bullet.x;
                let dy = target.body.y - bullet.y;
                if dx != 0.0 || dy != 0.0 {
                    let current = bullet.vy.atan2(bullet.vx);
                    let desired = dy.atan2(dx);
                    let heading = current + angle_diff(desired, current) * HOMING_STRENGTH;
                    let speed = (bullet.vx * bullet.vx + bullet.vy * bullet.vy).sqrt();
                    bullet.vx = heading.cos() * speed;
                    bullet.vy = heading.sin() * speed;
                }
            }
            bullet.x += bullet.vx * dt;
            bullet.y += bullet.vy * dt;
        }

        for projectile in &mut self.projectiles {
            projectile.x += projectile.vx * dt;
            projectile.y += projectile.vy * dt;
        }
    }

    /// Test every munition against live, in-roster, opposing ships inside the
    /// arena. Damage and assist credit are applied here; each munition hits
    /// at most one ship and is removed on hit.
    pub fn resolve_hits(
        &mut self,
        players: &mut HashMap<PlayerId, Player>,
        roster: &HashSet<PlayerId>,
        arena: &Arena,
        now: u64,
    ) -> Vec<HitResult> {
        let mut hits = Vec::new();

        let cannon = WeaponStats::for_weapon(WeaponKind::Cannon);
        self.bullets.retain(|bullet| {
            match strike(
                players,
                roster,
                arena,
                bullet.owner_id,
                bullet.owner_team,
                bullet.x,
                bullet.y,
                WeaponKind::Cannon,
                &cannon,
                now,
            ) {
                Some(hit) => {
                    hits.push(hit);
                    false
                }
                None => true,
            }
        });

        self.projectiles.retain(|projectile| {
            let weapon = projectile.kind.weapon();
            let stats = WeaponStats::for_weapon(weapon);
            match strike(
                players,
                roster,
                arena,
                projectile.owner_id,
                projectile.owner_team,
                projectile.x,
                projectile.y,
                weapon,
                &stats,
                now,
            ) {
                Some(hit) => {
                    hits.push(hit);
                    false
                }
                None => true,
            }
        });

        hits
    }

    /// Drop munitions past their lifetime; bullets also expire past max range
    pub fn expire(&mut self, now: u64) {
        let bullet_ttl = WeaponStats::for_weapon(WeaponKind::Cannon).ttl_ms;
        self.bullets.retain(|b| {
            now.saturating_sub(b.created_at) < bullet_ttl
                && distance_sq(b.start_x, b.start_y, b.x, b.y) <= BULLET_MAX_RANGE * BULLET_MAX_RANGE
        });

        self.projectiles.retain(|p| {
            now.saturating_sub(p.created_at) < WeaponStats::for_weapon(p.kind.weapon()).ttl_ms
        });
    }

    pub fn bullet_snapshots(&self) -> Vec<BulletSnapshot> {
        self.bullets
            .iter()
            .map(|b| BulletSnapshot {
                id: b.id,
                x: b.x,
                y: b.y,
            })
            .collect()
    }

    pub fn projectile_snapshots(&self) -> Vec<ProjectileSnapshot> {
        self.projectiles
            .iter()
            .map(|p| ProjectileSnapshot {
                id: p.id,
                x: p.x,
                y: p.y,
                kind: p.kind,
            })
            .collect()
    }
}

/// Find the first eligible ship under a munition and damage it
#[allow(clippy::too_many_arguments)]
fn strike(
    players: &mut HashMap<PlayerId, Player>,
    roster: &HashSet<PlayerId>,
    arena: &Arena,
    owner_id: PlayerId,
    owner_team: Team,
    x: f32,
    y: f32,
    weapon: WeaponKind,
    stats: &WeaponStats,
    now: u64,
) -> Option<HitResult> {
    let radius_sq = stats.hit_radius * stats.hit_radius;
    let shooter_present = players.contains_key(&owner_id);

    let target = players.values_mut().find(|p| {
        p.id != owner_id
            && p.is_alive()
            && p.team != owner_team
            && roster.contains(&p.id)
            && arena.contains(p.body.x, p.body.y)
            && distance_sq(x, y, p.body.x, p.body.y) < radius_sq
    })?;

    // Shields only soften cannon fire
    let damage = match weapon {
        WeaponKind::Cannon => stats.damage * shield_multiplier(target.skills.shield),
        WeaponKind::Torpedo | WeaponKind::Missile => stats.damage,
    };
    let killed = target.take_damage(damage);
    if shooter_present {
        target.assist_tracker.record(owner_id, now);
    }

    Some(HitResult {
        shooter_id: owner_id,
        target_id: target.id,
        weapon,
        target_killed: killed,
    })
}

/// Apply kill rewards, loot, assists and victim bookkeeping.
///
/// `killer_id` is `None` when the shooter has left the world; assists are
/// still paid out in that case.
pub fn resolve_kill(
    players: &mut HashMap<PlayerId, Player>,
    teams: &mut TeamBoard,
    feed: &mut KillFeed,
    victim_id: PlayerId,
    killer_id: Option<PlayerId>,
    weapon: WeaponKind,
    now: u64,
) -> Option<KillReport> {
    let killer_id = killer_id.filter(|id| players.contains_key(id));

    let (victim_name, victim_team, x, y, loot, assisters) = {
        let victim = players.get_mut(&victim_id)?;
        let quarter = victim.credits / 4;
        let loot = if killer_id.is_some() { quarter } else { 0 };
        if killer_id.is_some() {
            victim.credits = quarter;
        }
        let assisters = victim.assist_tracker.collect(killer_id, now);

        victim.kill_streak = 0;
        victim.deaths = victim.deaths.saturating_add(1);
        if victim.is_human() {
            victim.total_deaths = victim.total_deaths.saturating_add(1);
        }
        (
            victim.name.clone(),
            victim.team,
            victim.body.x,
            victim.body.y,
            loot,
            assisters,
        )
    };
    let victim_board = teams.get_mut(victim_team);
    victim_board.deaths = victim_board.deaths.saturating_add(1);

    let mut streak_notice = None;
    if let Some(killer) = killer_id.and_then(|id| players.get_mut(&id)) {
        killer.kill_streak = killer.kill_streak.saturating_add(1);
        killer.kills = killer.kills.saturating_add(1);
        killer.total_kills = killer.total_kills.saturating_add(1);
        killer.heal(KILL_HEAL);

        let streak = killer.kill_streak;
        let bonus = streak_bonus(streak);
        let (base_score, xp, reward) = match weapon {
            WeaponKind::Cannon => (100, 50, 75 + if streak >= 3 { 25 } else { 0 }),
            WeaponKind::Torpedo | WeaponKind::Missile => (150, 75, 100),
        };
        let score = base_score + bonus;

        killer.add_credits(loot.saturating_add(reward));
        killer.add_score(score);
        killer.best_streak = killer.best_streak.max(streak);
        killer.gain_xp(xp);

        teams
            .get_mut(killer.team)
            .record_kill(score, loot.saturating_add(reward));

        feed.push(KillFeedEntry {
            killer: killer.name.clone(),
            killed: victim_name,
            timestamp: now,
            streak,
        });

        if streak >= 3 && killer.is_human() {
            streak_notice = Some((streak, bonus));
        }
    }

    for assister_id in assisters {
        let Some(assister) = players.get_mut(&assister_id) else {
            continue;
        };
        if assister.team == victim_team {
            continue;
        }
        assister.assists = assister.assists.saturating_add(1);
        assister.add_score(ASSIST_SCORE);
        assister.add_credits(ASSIST_CREDITS);

        teams
            .get_mut(assister.team)
            .record_assist(ASSIST_SCORE, ASSIST_CREDITS);
    }

    Some(KillReport {
        victim_id,
        killer_id,
        x,
        y,
        streak_notice,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::physics::Spawn;
    use crate::game::player::MAX_PROGRESS_VALUE;
    use uuid::Uuid;

    fn ship(team: Team, x: f32, y: f32) -> Player {
        Player::new_human(
            Uuid::new_v4(),
            format!("{:?}", team),
            team,
            Spawn { x, y, angle: 0.0 },
        )
    }

    fn world_of(ships: Vec<Player>) -> (HashMap<PlayerId, Player>, HashSet<PlayerId>) {
        let roster = ships.iter().map(|p| p.id).collect();
        let players = ships.into_iter().map(|p| (p.id, p)).collect();
        (players, roster)
    }

    #[test]
    fn test_streak_bonus_table() {
        assert_eq!(streak_bonus(1), 0);
        assert_eq!(streak_bonus(4), 0);
        assert_eq!(streak_bonus(5), 200);
        assert_eq!(streak_bonus(6), 400);
        assert_eq!(streak_bonus(7), 800);
        assert_eq!(streak_bonus(30), 800);
    }

    #[test]
    fn test_cannon_cooldown_scales_with_rapid_fire() {
        assert_eq!(cooldown_ms(WeaponKind::Cannon, 0), 500);
        assert_eq!(cooldown_ms(WeaponKind::Cannon, 2), 350);
        assert_eq!(cooldown_ms(WeaponKind::Torpedo, 3), 3_000);
        assert_eq!(cooldown_ms(WeaponKind::Missile, 3), 5_000);
    }

    #[test]
    fn test_fire_respects_cooldown_and_ownership() {
        let mut combat = CombatSystem::new();
        let mut shooter = ship(Team::Red, 3000.0, 2600.0);

        assert!(combat.try_fire(&mut shooter, WeaponKind::Cannon, None, None, 1_000));
        assert!(!combat.try_fire(&mut shooter, WeaponKind::Cannon, None, None, 1_200));
        assert!(combat.try_fire(&mut shooter, WeaponKind::Cannon, None, None, 1_500));
        assert_eq!(combat.bullets().len(), 2);

        // Torpedo not owned
        assert!(!combat.try_fire(&mut shooter, WeaponKind::Torpedo, None, None, 2_000));
        shooter.weapons.torpedo = 1;
        assert!(combat.try_fire(&mut shooter, WeaponKind::Torpedo, None, None, 2_000));
        assert_eq!(combat.projectiles().len(), 1);
        assert_eq!(combat.projectiles()[0].kind, ProjectileKind::Torpedo);
    }

    #[test]
    fn test_cannon_aim_snaps_heading_but_projectiles_ignore_it() {
        let mut combat = CombatSystem::new();
        let mut shooter = ship(Team::Red, 3000.0, 2600.0);
        shooter.weapons.missile = 1;

        combat.try_fire(&mut shooter, WeaponKind::Missile, Some(1.0), None, 0);
        assert_eq!(shooter.body.angle, 0.0);
        let missile = &combat.projectiles()[0];
        assert!((missile.x - 3030.0).abs() < 1e-3);
        assert!(missile.vy.abs() < 1e-3);

        combat.try_fire(&mut shooter, WeaponKind::Cannon, Some(1.0), None, 0);
        assert_eq!(shooter.body.angle, 1.0);
        let bullet = &combat.bullets()[0];
        assert!((bullet.x - (3000.0 + 1.0f32.cos() * 25.0)).abs() < 1e-3);
    }

    #[test]
    fn test_bullet_hit_applies_shield_and_records_assist() {
        let shooter = ship(Team::Red, 3000.0, 2600.0);
        let mut victim = ship(Team::Blue, 3050.0, 2600.0);
        victim.skills.shield = 2;
        let (shooter_id, victim_id) = (shooter.id, victim.id);
        let (mut players, roster) = world_of(vec![shooter, victim]);

        let mut combat = CombatSystem::new();
        let shooter = players.get_mut(&shooter_id).unwrap();
        assert!(combat.try_fire(shooter, WeaponKind::Cannon, None, None, 0));
        combat.advance(&players, 0.02);

        let hits = combat.resolve_hits(&mut players, &roster, &Arena::default(), 20);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].target_id, victim_id);
        assert!(combat.bullets().is_empty());

        let victim = &players[&victim_id];
        assert_eq!(victim.hp, 85.0);
        assert!(!victim.assist_tracker.is_empty());
    }

    #[test]
    fn test_torpedo_ignores_shield() {
        let mut shooter = ship(Team::Red, 3000.0, 2600.0);
        shooter.weapons.torpedo = 1;
        let mut victim = ship(Team::Blue, 3050.0, 2600.0);
        victim.skills.shield = 3;
        let (shooter_id, victim_id) = (shooter.id, victim.id);
        let (mut players, roster) = world_of(vec![shooter, victim]);

        let mut combat = CombatSystem::new();
        let shooter = players.get_mut(&shooter_id).unwrap();
        assert!(combat.try_fire(shooter, WeaponKind::Torpedo, None, None, 0));
        combat.advance(&players, 0.02);

        let hits = combat.resolve_hits(&mut players, &roster, &Arena::default(), 20);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].weapon, WeaponKind::Torpedo);
        assert_eq!(players[&victim_id].hp, 65.0);
    }

    #[test]
    fn test_no_friendly_fire_and_no_hits_outside_roster() {
        let shooter = ship(Team::Red, 3000.0, 2600.0);
        let teammate = ship(Team::Red, 3040.0, 2600.0);
        let shooter_id = shooter.id;
        let (mut players, roster) = world_of(vec![shooter, teammate]);

        let mut combat = CombatSystem::new();
        combat.try_fire(players.get_mut(&shooter_id).unwrap(), WeaponKind::Cannon, None, None, 0);
        let hits = combat.resolve_hits(&mut players, &roster, &Arena::default(), 0);
        assert!(hits.is_empty());

        let outsider = ship(Team::Blue, 3030.0, 2600.0);
        let outsider_id = outsider.id;
        players.insert(outsider_id, outsider);
        let hits = combat.resolve_hits(&mut players, &roster, &Arena::default(), 0);
        assert!(hits.is_empty());
        assert_eq!(players[&outsider_id].hp, 100.0);
    }

    #[test]
    fn test_bullets_expire_by_ttl_and_range() {
        let mut combat = CombatSystem::new();
        let mut shooter = ship(Team::Red, 3000.0, 2600.0);
        combat.try_fire(&mut shooter, WeaponKind::Cannon, None, None, 0);

        let players = HashMap::new();
        // 0.8 s at 950 px/s travels 760 px
        combat.advance(&players, 0.8);
        combat.expire(800);
        assert_eq!(combat.bullets().len(), 1);

        combat.advance(&players, 0.1);
        combat.expire(900);
        assert!(combat.bullets().is_empty());
    }

    #[test]
    fn test_homing_bullet_turns_gradually() {
        let mut combat = CombatSystem::new();
        let mut shooter = ship(Team::Red, 3000.0, 2600.0);
        let target = ship(Team::Blue, 3000.0, 3000.0);
        let target_id = target.id;
        combat.try_fire(&mut shooter, WeaponKind::Cannon, None, Some(target_id), 0);

        let players: HashMap<_, _> = [(target_id, target)].into_iter().collect();
        combat.advance(&players, 1.0 / 60.0);

        let bullet = &combat.bullets()[0];
        let heading = bullet.vy.atan2(bullet.vx);
        assert!(heading > 0.0);
        assert!(heading < std::f32::consts::FRAC_PI_2 * 0.5);
        let speed = (bullet.vx * bullet.vx + bullet.vy * bullet.vy).sqrt();
        assert!((speed - 950.0).abs() < 1e-2);
    }

    #[test]
    fn test_kill_loot_rewards_and_assists() {
        let killer = ship(Team::Red, 3000.0, 2600.0);
        let helper = ship(Team::Red, 2900.0, 2600.0);
        let mut victim = ship(Team::Blue, 3050.0, 2600.0);
        victim.credits = 100;
        victim.hp = 0.0;
        victim.assist_tracker.record(helper.id, 9_000);
        victim.assist_tracker.record(killer.id, 9_500);
        let (killer_id, helper_id, victim_id) = (killer.id, helper.id, victim.id);
        let (mut players, _) = world_of(vec![killer, helper, victim]);

        let mut teams = TeamBoard::default();
        let mut feed = KillFeed::default();
        let report = resolve_kill(
            &mut players,
            &mut teams,
            &mut feed,
            victim_id,
            Some(killer_id),
            WeaponKind::Cannon,
            10_000,
        )
        .unwrap();

        assert_eq!(report.killer_id, Some(killer_id));
        assert_eq!(report.streak_notice, None);

        let killer = &players[&killer_id];
        assert_eq!(killer.kills, 1);
        assert_eq!(killer.kill_streak, 1);
        assert_eq!(killer.score, 100);
        assert_eq!(killer.xp, 50);
        // 25 loot + 75 reward
        assert_eq!(killer.credits, 100);

        let victim = &players[&victim_id];
        assert_eq!(victim.credits, 25);
        assert_eq!(victim.deaths, 1);
        assert_eq!(victim.total_deaths, 1);
        assert!(victim.assist_tracker.is_empty());

        let helper = &players[&helper_id];
        assert_eq!(helper.assists, 1);
        assert_eq!(helper.score, ASSIST_SCORE);
        assert_eq!(helper.credits, ASSIST_CREDITS);

        assert_eq!(teams.red.kills, 1);
        assert_eq!(teams.red.assists, 1);
        assert_eq!(teams.red.score, 160);
        assert_eq!(teams.red.credits, 140);
        assert_eq!(teams.blue.deaths, 1);
        assert_eq!(feed.entries().len(), 1);
    }

    #[test]
    fn test_projectile_kill_streak_notice() {
        let mut killer = ship(Team::Blue, 3000.0, 2600.0);
        killer.kill_streak = 4;
        killer.hp = 20.0;
        let victim = ship(Team::Red, 3050.0, 2600.0);
        let (killer_id, victim_id) = (killer.id, victim.id);
        let (mut players, _) = world_of(vec![killer, victim]);

        let mut teams = TeamBoard::default();
        let mut feed = KillFeed::default();
        let report = resolve_kill(
            &mut players,
            &mut teams,
            &mut feed,
            victim_id,
            Some(killer_id),
            WeaponKind::Missile,
            0,
        )
        .unwrap();

        assert_eq!(report.streak_notice, Some((5, 200)));
        let killer = &players[&killer_id];
        assert_eq!(killer.score, 350);
        assert_eq!(killer.credits, 100);
        assert_eq!(killer.best_streak, 5);
        assert_eq!(killer.hp, 70.0);
    }

    #[test]
    fn test_kill_rewards_saturate_at_ceiling() {
        let mut killer = ship(Team::Red, 3000.0, 2600.0);
        killer.credits = u64::MAX;
        killer.score = u64::MAX;
        killer.total_score = u64::MAX;
        killer.kills = u32::MAX;
        killer.kill_streak = u32::MAX;
        killer.xp = u64::MAX;
        let mut victim = ship(Team::Blue, 3050.0, 2600.0);
        victim.credits = u64::MAX;
        victim.deaths = u32::MAX;
        let (killer_id, victim_id) = (killer.id, victim.id);
        let (mut players, _) = world_of(vec![killer, victim]);

        let mut teams = TeamBoard::default();
        teams.red.score = u64::MAX;
        teams.red.credits = u64::MAX;
        let mut feed = KillFeed::default();
        resolve_kill(
            &mut players,
            &mut teams,
            &mut feed,
            victim_id,
            Some(killer_id),
            WeaponKind::Cannon,
            0,
        )
        .unwrap();

        let killer = &players[&killer_id];
        assert_eq!(killer.credits, MAX_PROGRESS_VALUE);
        assert_eq!(killer.score, u64::MAX);
        assert_eq!(killer.total_score, MAX_PROGRESS_VALUE);
        assert_eq!(killer.kills, u32::MAX);
        assert_eq!(killer.kill_streak, u32::MAX);
        assert_eq!(players[&victim_id].deaths, u32::MAX);
        assert_eq!(teams.red.score, u64::MAX);
        assert_eq!(teams.red.credits, u64::MAX);
        assert_eq!(teams.red.kills, 1);
    }

    #[test]
    fn test_kill_feed_keeps_two_newest() {
        let mut feed = KillFeed::default();
        for i in 0..4 {
            feed.push(KillFeedEntry {
                killer: format!("k{}", i),
                killed: "v".to_string(),
                timestamp: i,
                streak: 1,
            });
        }
        let entries = feed.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].killer, "k3");
        assert_eq!(entries[1].killer, "k2");
    }
}
