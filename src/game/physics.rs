//! Ship physics and elliptical arena containment

use rand::Rng;
use std::f32::consts::{PI, TAU};

use crate::ws::protocol::{Team, WorldDims};

use super::player::SkillLevels;

pub const WORLD_WIDTH: f32 = 6000.0;
pub const WORLD_HEIGHT: f32 = 5200.0;
pub const SHIP_RADIUS: f32 = 20.0;

/// Base top speed (px/s)
pub const MAX_SPEED: f32 = 180.0;
/// Base forward acceleration (px/s^2)
pub const ACCELERATION: f32 = 250.0;
/// Turn rate at full stick (rad/s)
pub const TURN_SPEED: f32 = PI * 1.4;
/// Fraction of velocity kept after one second of coasting
pub const FRICTION: f32 = 0.5;
/// Per-level bonus of the speedBoost skill
pub const SPEED_BOOST_PER_LEVEL: f32 = 0.2;

/// Ship movement constants after skill modifiers
#[derive(Debug, Clone, Copy)]
pub struct ShipStats {
    pub max_speed: f32,
    pub acceleration: f32,
    pub turn_rate: f32,
    pub friction: f32,
}

impl ShipStats {
    pub fn for_skills(skills: &SkillLevels) -> Self {
        let boost = 1.0 + f32::from(skills.speed_boost) * SPEED_BOOST_PER_LEVEL;
        Self {
            max_speed: MAX_SPEED * boost,
            acceleration: ACCELERATION * boost,
            turn_rate: TURN_SPEED,
            friction: FRICTION,
        }
    }
}

/// Position, heading and velocity of a ship
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Kinematics {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub vx: f32,
    pub vy: f32,
}

/// A spawn location with an initial heading
#[derive(Debug, Clone, Copy)]
pub struct Spawn {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
}

/// The playable area: an axis-aligned ellipse inscribed in the world rectangle.
/// Containment is measured on the ship centre, so the legal ellipse is shrunk
/// by one ship radius.
#[derive(Debug, Clone, Copy)]
pub struct Arena {
    pub width: f32,
    pub height: f32,
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            width: WORLD_WIDTH,
            height: WORLD_HEIGHT,
        }
    }
}

impl Arena {
    pub fn dims(&self) -> WorldDims {
        WorldDims {
            width: self.width,
            height: self.height,
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.width / 2.0, self.height / 2.0)
    }

    fn legal_radii(&self) -> (f32, f32) {
        (self.width / 2.0 - SHIP_RADIUS, self.height / 2.0 - SHIP_RADIUS)
    }

    /// Squared normalized ellipse distance (<= 1 inside), with radii shrunk by `inset`
    fn normalized_sq(&self, x: f32, y: f32, inset: f32) -> f32 {
        let (cx, cy) = self.center();
        let (rx, ry) = self.legal_radii();
        let nx = (x - cx) / (rx - inset).max(1.0);
        let ny = (y - cy) / (ry - inset).max(1.0);
        nx * nx + ny * ny
    }

    /// Check if a ship centre is inside the legal ellipse
    pub fn contains(&self, x: f32, y: f32) -> bool {
        self.normalized_sq(x, y, 0.0) <= 1.0
    }

    /// Check if a point lies outside an inner ellipse `margin` px from the edge
    pub fn is_near_edge(&self, x: f32, y: f32, margin: f32) -> bool {
        self.normalized_sq(x, y, margin) > 1.0
    }

    /// Project a point onto the legal ellipse along the ray from the centre.
    /// Points already inside are returned unchanged.
    pub fn clamp_point(&self, x: f32, y: f32) -> (f32, f32) {
        let dist_sq = self.normalized_sq(x, y, 0.0);
        if dist_sq <= 1.0 {
            return (x, y);
        }
        let (cx, cy) = self.center();
        let dist = dist_sq.sqrt();
        (cx + (x - cx) / dist, cy + (y - cy) / dist)
    }

    /// Outward unit normal of the legal ellipse at a boundary point
    pub fn outward_normal(&self, x: f32, y: f32) -> (f32, f32) {
        let (cx, cy) = self.center();
        let (rx, ry) = self.legal_radii();
        let gx = (x - cx) / (rx * rx);
        let gy = (y - cy) / (ry * ry);
        let len = (gx * gx + gy * gy).sqrt();
        if len < f32::EPSILON {
            return (0.0, 0.0);
        }
        (gx / len, gy / len)
    }

    /// Random spawn inside the team's home band (red south, blue north)
    pub fn team_spawn<R: Rng + ?Sized>(&self, rng: &mut R, team: Team) -> Spawn {
        let (min_y, max_y, base_angle) = match team {
            Team::Red => (self.height * 0.6, self.height * 0.92, -PI / 2.0),
            Team::Blue => (self.height * 0.08, self.height * 0.4, PI / 2.0),
        };

        for _ in 0..60 {
            let x = rng.gen_range(0.0..self.width);
            let y = rng.gen_range(min_y..max_y);
            if !self.contains(x, y) {
                continue;
            }
            let angle = base_angle + (rng.gen::<f32>() - 0.5) * 0.6;
            return Spawn { x, y, angle };
        }

        // Band is always reachable near the vertical axis
        let (cx, _) = self.center();
        Spawn {
            x: cx,
            y: (min_y + max_y) / 2.0,
            angle: base_angle,
        }
    }

    /// Navigation point deep in the opposing team's half
    pub fn enemy_zone_point<R: Rng + ?Sized>(&self, rng: &mut R, team: Team) -> (f32, f32) {
        let x = self.width * rng.gen_range(0.2..0.8);
        let y = match team {
            Team::Red => self.height * rng.gen_range(0.18..0.30),
            Team::Blue => self.height * rng.gen_range(0.70..0.82),
        };
        self.clamp_point(x, y)
    }

    /// Navigation point in the team's own half, used to disengage
    pub fn friendly_zone_point<R: Rng + ?Sized>(&self, rng: &mut R, team: Team) -> (f32, f32) {
        let x = self.width * rng.gen_range(0.3..0.7);
        let y = match team {
            Team::Red => self.height * rng.gen_range(0.78..0.88),
            Team::Blue => self.height * rng.gen_range(0.12..0.22),
        };
        self.clamp_point(x, y)
    }
}

/// Signed smallest difference `target - current`, wrapped to [-PI, PI]
pub fn angle_diff(target: f32, current: f32) -> f32 {
    let diff = (target - current).rem_euclid(TAU);
    if diff > PI {
        diff - TAU
    } else {
        diff
    }
}

pub fn distance_sq(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    let dx = x2 - x1;
    let dy = y2 - y1;
    dx * dx + dy * dy
}

/// Physics system for updating ship positions and velocities
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Integrate one ship for `dt` seconds. `thrust` must already be gated by
    /// the match phase.
    pub fn update_ship(
        ship: &mut Kinematics,
        thrust: bool,
        turn: f32,
        stats: &ShipStats,
        arena: &Arena,
        dt: f32,
    ) {
        let turn = turn.clamp(-1.0, 1.0);
        ship.angle = (ship.angle + turn * stats.turn_rate * dt).rem_euclid(TAU);

        if thrust {
            ship.vx += ship.angle.cos() * stats.acceleration * dt;
            ship.vy += ship.angle.sin() * stats.acceleration * dt;
        }

        // Exponential decay, frame-rate independent
        let decay = stats.friction.powf(dt);
        ship.vx *= decay;
        ship.vy *= decay;

        let speed = (ship.vx * ship.vx + ship.vy * ship.vy).sqrt();
        if speed > stats.max_speed {
            let scale = stats.max_speed / speed;
            ship.vx *= scale;
            ship.vy *= scale;
        }

        let next_x = ship.x + ship.vx * dt;
        let next_y = ship.y + ship.vy * dt;

        if arena.contains(next_x, next_y) {
            ship.x = next_x;
            ship.y = next_y;
            return;
        }

        // Slide along the wall: drop the outward component, stay put this tick
        let (bx, by) = arena.clamp_point(next_x, next_y);
        let (nx, ny) = arena.outward_normal(bx, by);
        let outward = ship.vx * nx + ship.vy * ny;
        if outward > 0.0 {
            ship.vx -= outward * nx;
            ship.vy -= outward * ny;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_thrust_accelerates_along_heading() {
        let arena = Arena::default();
        let (cx, cy) = arena.center();
        let mut ship = Kinematics {
            x: cx,
            y: cy,
            ..Default::default()
        };
        let stats = ShipStats::for_skills(&SkillLevels::default());

        for _ in 0..30 {
            PhysicsSystem::update_ship(&mut ship, true, 0.0, &stats, &arena, DT);
        }
        assert!(ship.x > cx);
        assert!(ship.vx > 0.0);
        assert!(ship.vy.abs() < 1e-3);
    }

    #[test]
    fn test_speed_is_capped_by_skill() {
        let arena = Arena::default();
        let (cx, cy) = arena.center();
        let base = ShipStats::for_skills(&SkillLevels::default());
        let boosted = ShipStats::for_skills(&SkillLevels {
            speed_boost: 3,
            ..Default::default()
        });

        for stats in [base, boosted] {
            let mut ship = Kinematics {
                x: cx,
                y: cy,
                vx: 5000.0,
                ..Default::default()
            };
            PhysicsSystem::update_ship(&mut ship, false, 0.0, &stats, &arena, DT);
            let speed = (ship.vx * ship.vx + ship.vy * ship.vy).sqrt();
            assert!(speed <= stats.max_speed + 1e-3);
        }
        assert!(boosted.max_speed > base.max_speed);
    }

    #[test]
    fn test_friction_decays_velocity() {
        let arena = Arena::default();
        let (cx, cy) = arena.center();
        let stats = ShipStats::for_skills(&SkillLevels::default());
        let mut ship = Kinematics {
            x: cx,
            y: cy,
            vx: 100.0,
            ..Default::default()
        };
        for _ in 0..60 {
            PhysicsSystem::update_ship(&mut ship, false, 0.0, &stats, &arena, DT);
        }
        // one second of coasting keeps half the speed
        assert!((ship.vx - 50.0).abs() < 1.0);
    }

    #[test]
    fn test_wall_strips_outward_velocity_and_keeps_position() {
        let arena = Arena::default();
        let (cx, cy) = arena.center();
        let edge_x = cx + arena.width / 2.0 - SHIP_RADIUS - 0.5;
        let stats = ShipStats::for_skills(&SkillLevels::default());
        let mut ship = Kinematics {
            x: edge_x,
            y: cy,
            vx: 150.0,
            vy: 40.0,
            angle: 0.0,
        };

        PhysicsSystem::update_ship(&mut ship, false, 0.0, &stats, &arena, DT);

        assert_eq!(ship.x, edge_x);
        assert_eq!(ship.y, cy);
        // Outward (x) velocity removed, tangential slide kept
        assert!(ship.vx.abs() < 0.05);
        assert!(ship.vy > 30.0);
        assert!(arena.contains(ship.x, ship.y));
    }

    #[test]
    fn test_ship_never_leaves_arena() {
        let arena = Arena::default();
        let (cx, cy) = arena.center();
        let stats = ShipStats::for_skills(&SkillLevels {
            speed_boost: 3,
            ..Default::default()
        });
        let mut ship = Kinematics {
            x: cx,
            y: cy,
            angle: 0.7,
            ..Default::default()
        };
        for i in 0..3000 {
            let turn = if i % 400 < 200 { 0.1 } else { -0.3 };
            PhysicsSystem::update_ship(&mut ship, true, turn, &stats, &arena, DT);
            assert!(arena.contains(ship.x, ship.y));
        }
    }

    #[test]
    fn test_clamp_point_projects_to_boundary() {
        let arena = Arena::default();
        let (cx, cy) = arena.center();
        let (x, y) = arena.clamp_point(cx + 10_000.0, cy);
        assert!((x - (cx + arena.width / 2.0 - SHIP_RADIUS)).abs() < 1e-2);
        assert!((y - cy).abs() < 1e-3);
        assert_eq!(arena.clamp_point(cx, cy), (cx, cy));
    }

    #[test]
    fn test_team_spawns_are_inside_home_band() {
        let arena = Arena::default();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..200 {
            let red = arena.team_spawn(&mut rng, Team::Red);
            assert!(arena.contains(red.x, red.y));
            assert!(red.y >= arena.height * 0.6);

            let blue = arena.team_spawn(&mut rng, Team::Blue);
            assert!(arena.contains(blue.x, blue.y));
            assert!(blue.y <= arena.height * 0.4);
        }
    }

    #[test]
    fn test_angle_diff_wraps() {
        assert!((angle_diff(0.1, TAU - 0.1) - 0.2).abs() < 1e-5);
        assert!((angle_diff(-0.1, 0.1) + 0.2).abs() < 1e-5);
        assert!(angle_diff(PI, 0.0).abs() <= PI + 1e-5);
    }
}
