//! Bot AI controller: ADVANCE / ATTACK / RETREAT state machine

use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::f32::consts::TAU;

use crate::ws::protocol::{SkillKind, Team, WeaponKind};

use super::combat::is_ready;
use super::physics::{angle_diff, distance_sq, Arena};
use super::player::{Player, PlayerId, MAX_UPGRADE_LEVEL};

/// Seconds of simulated time between decisions
pub const BOT_THINK_INTERVAL: f32 = 0.3;
pub const DETECTION_RANGE: f32 = 1600.0;
pub const RETREAT_HP: f32 = 35.0;
pub const RETREAT_DISTANCE: f32 = 450.0;
pub const WALL_MARGIN: f32 = 180.0;
pub const AIM_TOLERANCE: f32 = 0.35;

const NAV_ARRIVAL: f32 = 120.0;
const ADVANCE_ARRIVAL: f32 = 160.0;
const RETREAT_ARRIVAL: f32 = 180.0;
const ORBIT_DISTANCE: f32 = 160.0;
const CHASE_DISTANCE: f32 = 260.0;

const MISSILE_MIN_RANGE: f32 = 400.0;
const TORPEDO_MIN_RANGE: f32 = 250.0;
const TORPEDO_MAX_RANGE: f32 = 700.0;

const BOT_NAMES: [&str; 12] = [
    "Vega", "Orion", "Lyra", "Draco", "Nova", "Rigel", "Atlas", "Sirius", "Altair", "Deneb",
    "Castor", "Pollux",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotState {
    Advance,
    Attack,
    Retreat,
}

/// Per-bot decision state
#[derive(Debug, Clone)]
pub struct BotBrain {
    pub state: BotState,
    pub target_id: Option<PlayerId>,
    pub nav: (f32, f32),
    /// Unix ms of the next timed decision
    pub next_decision_at: u64,
    /// -1.0 or 1.0
    pub strafe_dir: f32,
}

impl BotBrain {
    pub fn new<R: Rng + ?Sized>(rng: &mut R, arena: &Arena, team: Team) -> Self {
        Self {
            state: BotState::Advance,
            target_id: None,
            nav: arena.enemy_zone_point(rng, team),
            next_decision_at: 0,
            strafe_dir: random_sign(rng),
        }
    }
}

fn random_sign<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    if rng.gen_bool(0.5) {
        -1.0
    } else {
        1.0
    }
}

pub fn bot_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let base = BOT_NAMES[rng.gen_range(0..BOT_NAMES.len())];
    format!("{}-{:03}", base, rng.gen_range(0..1000))
}

/// Random loadout: 0-6 skill points, cannon 1-3, optional torpedo and missile
pub fn randomize_loadout<R: Rng + ?Sized>(rng: &mut R, bot: &mut Player) {
    const SKILLS: [SkillKind; 3] = [SkillKind::SpeedBoost, SkillKind::Shield, SkillKind::RapidFire];

    for _ in 0..rng.gen_range(0..=6) {
        let skill = SKILLS[rng.gen_range(0..SKILLS.len())];
        let level = match skill {
            SkillKind::SpeedBoost => &mut bot.skills.speed_boost,
            SkillKind::Shield => &mut bot.skills.shield,
            SkillKind::RapidFire => &mut bot.skills.rapid_fire,
        };
        if *level < MAX_UPGRADE_LEVEL {
            *level += 1;
        }
    }

    if rng.gen_bool(0.5) {
        bot.weapons.torpedo = rng.gen_range(1..=MAX_UPGRADE_LEVEL);
    }
    if rng.gen_bool(0.4) {
        bot.weapons.missile = rng.gen_range(1..=MAX_UPGRADE_LEVEL);
    }
    bot.weapons.cannon = rng.gen_range(1..=MAX_UPGRADE_LEVEL);
}

/// Nearest enemy a bot has locked onto
#[derive(Debug, Clone, Copy)]
pub struct BotTarget {
    pub id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub distance: f32,
}

/// Nearest live, in-roster opponent within detection range
pub fn nearest_enemy(
    bot: &Player,
    players: &HashMap<PlayerId, Player>,
    roster: &HashSet<PlayerId>,
) -> Option<BotTarget> {
    players
        .values()
        .filter(|p| {
            p.id != bot.id && p.is_alive() && p.team != bot.team && roster.contains(&p.id)
        })
        .map(|p| (p, distance_sq(bot.body.x, bot.body.y, p.body.x, p.body.y)))
        .filter(|(_, d)| *d <= DETECTION_RANGE * DETECTION_RANGE)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(p, d)| BotTarget {
            id: p.id,
            x: p.body.x,
            y: p.body.y,
            distance: d.sqrt(),
        })
}

/// A shot the bot wants this decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FireOrder {
    pub weapon: WeaponKind,
    /// Cannon shots home onto the locked target
    pub homing_target: Option<PlayerId>,
}

/// Controller for all bots
pub struct BotController;

impl BotController {
    /// Run one decision for a live bot during an active match. Sets the bot's
    /// thrust and turn intents and returns the weapon to fire, if any.
    pub fn think<R: Rng + ?Sized>(
        bot: &mut Player,
        target: Option<BotTarget>,
        arena: &Arena,
        rng: &mut R,
        now: u64,
    ) -> Option<FireOrder> {
        let team = bot.team;
        let (x, y, heading) = (bot.body.x, bot.body.y, bot.body.angle);
        let hp = bot.hp;
        let previous_thrust = bot.thrust;

        let brain = bot
            .brain
            .get_or_insert_with(|| BotBrain::new(rng, arena, team));

        match target {
            Some(t) => {
                brain.target_id = Some(t.id);
                if hp < RETREAT_HP && t.distance < RETREAT_DISTANCE {
                    brain.state = BotState::Retreat;
                    brain.nav = arena.friendly_zone_point(rng, team);
                    brain.next_decision_at = now + 1_200;
                } else {
                    brain.state = BotState::Attack;
                    if now >= brain.next_decision_at {
                        brain.strafe_dir = random_sign(rng);
                        brain.next_decision_at = now + rng.gen_range(900..=1_500);
                    }
                }
            }
            None => {
                brain.target_id = None;
                let (nx, ny) = brain.nav;
                if distance_sq(x, y, nx, ny) < NAV_ARRIVAL * NAV_ARRIVAL
                    || now >= brain.next_decision_at
                    || brain.state == BotState::Attack
                {
                    brain.state = BotState::Advance;
                    brain.nav = arena.enemy_zone_point(rng, team);
                    brain.next_decision_at = now + rng.gen_range(2_000..=4_000);
                }
            }
        }

        let mut thrust = true;
        let mut turn;
        match (brain.state, target) {
            (BotState::Attack, Some(t)) => {
                let bearing = (t.y - y).atan2(t.x - x);
                let strafe = brain.strafe_dir;
                let err = angle_diff(bearing + strafe * 0.25, heading);
                turn = (err * 1.6).clamp(-1.0, 1.0) + strafe * 0.35;
                if t.distance < ORBIT_DISTANCE {
                    thrust = false;
                    turn += strafe * 0.6;
                } else if t.distance <= CHASE_DISTANCE {
                    thrust = previous_thrust;
                }
            }
            (BotState::Retreat, _) => {
                let (nx, ny) = brain.nav;
                turn = angle_diff((ny - y).atan2(nx - x), heading) * 1.8;
                if distance_sq(x, y, nx, ny) < RETREAT_ARRIVAL * RETREAT_ARRIVAL {
                    brain.state = BotState::Advance;
                    brain.next_decision_at = now + 1_500;
                }
            }
            _ => {
                let (nx, ny) = brain.nav;
                turn = angle_diff((ny - y).atan2(nx - x), heading) * 1.5;
                if distance_sq(x, y, nx, ny) < ADVANCE_ARRIVAL * ADVANCE_ARRIVAL {
                    brain.nav = arena.enemy_zone_point(rng, team);
                    brain.next_decision_at = now + rng.gen_range(2_000..=4_000);
                }
            }
        }

        // Wall avoidance overrides state steering
        if arena.is_near_edge(x, y, WALL_MARGIN) {
            let (cx, cy) = arena.center();
            turn = angle_diff((cy - y).atan2(cx - x), heading) * 1.7;
            thrust = true;
        }

        bot.thrust = thrust;
        bot.turn = turn.clamp(-1.0, 1.0);

        let t = target?;
        let bearing = (t.y - y).atan2(t.x - x);
        if angle_diff(bearing, heading).abs() >= AIM_TOLERANCE {
            return None;
        }

        let weapon = if t.distance > MISSILE_MIN_RANGE && is_ready(bot, WeaponKind::Missile, now)
        {
            WeaponKind::Missile
        } else if t.distance > TORPEDO_MIN_RANGE
            && t.distance < TORPEDO_MAX_RANGE
            && is_ready(bot, WeaponKind::Torpedo, now)
        {
            WeaponKind::Torpedo
        } else if is_ready(bot, WeaponKind::Cannon, now) {
            WeaponKind::Cannon
        } else {
            return None;
        };

        Some(FireOrder {
            weapon,
            homing_target: (weapon == WeaponKind::Cannon).then_some(t.id),
        })
    }

    /// Outside an active match bots hold still
    pub fn idle(bot: &mut Player) {
        bot.thrust = false;
        bot.turn = 0.0;
    }
}

/// Random heading, used for coincident-ship separation and similar
pub fn random_angle<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    rng.gen_range(0.0..TAU)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::physics::Spawn;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use uuid::Uuid;

    fn bot_at(x: f32, y: f32, angle: f32) -> (Player, ChaCha8Rng) {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let arena = Arena::default();
        let brain = BotBrain::new(&mut rng, &arena, Team::Red);
        let bot = Player::new_bot(
            Uuid::new_v4(),
            "Bot".to_string(),
            Team::Red,
            Spawn { x, y, angle },
            brain,
            5,
        );
        (bot, rng)
    }

    fn target(x: f32, y: f32, from: &Player) -> BotTarget {
        BotTarget {
            id: Uuid::new_v4(),
            x,
            y,
            distance: distance_sq(from.body.x, from.body.y, x, y).sqrt(),
        }
    }

    #[test]
    fn test_attacks_aligned_target_with_homing_cannon() {
        let (mut bot, mut rng) = bot_at(3000.0, 2600.0, 0.0);
        let t = target(3200.0, 2600.0, &bot);

        let order = BotController::think(&mut bot, Some(t), &Arena::default(), &mut rng, 10_000);

        assert_eq!(bot.brain.as_ref().unwrap().state, BotState::Attack);
        assert_eq!(
            order,
            Some(FireOrder {
                weapon: WeaponKind::Cannon,
                homing_target: Some(t.id),
            })
        );
    }

    #[test]
    fn test_prefers_missile_at_range() {
        let (mut bot, mut rng) = bot_at(3000.0, 2600.0, 0.0);
        bot.weapons.missile = 1;
        bot.weapons.torpedo = 1;
        let t = target(3500.0, 2600.0, &bot);

        let order = BotController::think(&mut bot, Some(t), &Arena::default(), &mut rng, 10_000);
        assert_eq!(order.map(|o| o.weapon), Some(WeaponKind::Missile));
        assert_eq!(order.and_then(|o| o.homing_target), None);
    }

    #[test]
    fn test_torpedo_in_mid_range_when_missile_cooling() {
        let (mut bot, mut rng) = bot_at(3000.0, 2600.0, 0.0);
        bot.weapons.missile = 1;
        bot.weapons.torpedo = 1;
        bot.last_missile_at = Some(9_000);
        let t = target(3500.0, 2600.0, &bot);

        let order = BotController::think(&mut bot, Some(t), &Arena::default(), &mut rng, 10_000);
        assert_eq!(order.map(|o| o.weapon), Some(WeaponKind::Torpedo));
    }

    #[test]
    fn test_no_fire_when_misaligned() {
        let (mut bot, mut rng) = bot_at(3000.0, 2600.0, std::f32::consts::PI);
        let t = target(3200.0, 2600.0, &bot);
        let order = BotController::think(&mut bot, Some(t), &Arena::default(), &mut rng, 10_000);
        assert_eq!(order, None);
    }

    #[test]
    fn test_retreats_when_low_and_close() {
        let (mut bot, mut rng) = bot_at(3000.0, 2600.0, 0.0);
        bot.hp = 20.0;
        let t = target(3300.0, 2600.0, &bot);

        BotController::think(&mut bot, Some(t), &Arena::default(), &mut rng, 10_000);
        let brain = bot.brain.as_ref().unwrap();
        assert_eq!(brain.state, BotState::Retreat);
        assert_eq!(brain.next_decision_at, 11_200);
        assert!(bot.thrust);
    }

    #[test]
    fn test_orbits_close_target() {
        let (mut bot, mut rng) = bot_at(3000.0, 2600.0, 0.0);
        let t = target(3100.0, 2600.0, &bot);
        BotController::think(&mut bot, Some(t), &Arena::default(), &mut rng, 10_000);
        assert!(!bot.thrust);
        assert!(bot.turn.abs() > 0.5);
    }

    #[test]
    fn test_wall_override_steers_to_centre() {
        let arena = Arena::default();
        // Near the east wall, heading further east
        let (mut bot, mut rng) = bot_at(5850.0, 2600.0, 0.0);
        BotController::think(&mut bot, None, &arena, &mut rng, 10_000);
        assert!(bot.thrust);
        assert_eq!(bot.turn.abs(), 1.0);
        assert_eq!(bot.brain.as_ref().unwrap().state, BotState::Advance);
    }

    #[test]
    fn test_idle_clears_intents() {
        let (mut bot, _) = bot_at(3000.0, 2600.0, 0.0);
        bot.thrust = true;
        bot.turn = 0.7;
        BotController::idle(&mut bot);
        assert!(!bot.thrust);
        assert_eq!(bot.turn, 0.0);
    }

    #[test]
    fn test_nearest_enemy_respects_roster_and_range() {
        let (bot, _) = bot_at(3000.0, 2600.0, 0.0);
        let near = Player::new_human(
            Uuid::new_v4(),
            "near".to_string(),
            Team::Blue,
            Spawn { x: 3300.0, y: 2600.0, angle: 0.0 },
        );
        let nearer_outside = Player::new_human(
            Uuid::new_v4(),
            "lobby".to_string(),
            Team::Blue,
            Spawn { x: 3100.0, y: 2600.0, angle: 0.0 },
        );
        let far = Player::new_human(
            Uuid::new_v4(),
            "far".to_string(),
            Team::Blue,
            Spawn { x: 3000.0, y: 4900.0, angle: 0.0 },
        );
        let roster: HashSet<PlayerId> = [bot.id, near.id, far.id].into_iter().collect();
        let near_id = near.id;
        let far_id = far.id;
        let mut players: HashMap<PlayerId, Player> = [near, nearer_outside, far]
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        players.insert(bot.id, bot.clone());

        let found = nearest_enemy(&bot, &players, &roster).unwrap();
        assert_eq!(found.id, near_id);
        assert!((found.distance - 300.0).abs() < 1e-3);

        players.remove(&near_id);
        // The remaining roster enemy is 2300 px away
        assert!(nearest_enemy(&bot, &players, &roster).is_none());
        assert!(players.contains_key(&far_id));
    }

    #[test]
    fn test_random_loadout_within_caps() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..50 {
            let (mut bot, _) = bot_at(3000.0, 2600.0, 0.0);
            randomize_loadout(&mut rng, &mut bot);
            assert!(bot.skills.speed_boost <= 3 && bot.skills.shield <= 3);
            assert!((1..=3).contains(&bot.weapons.cannon));
            assert!(bot.weapons.torpedo <= 3 && bot.weapons.missile <= 3);
        }
    }
}
