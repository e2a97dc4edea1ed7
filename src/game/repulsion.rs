//! Pairwise ship repulsion (soft barrier instead of hard collisions)

use rand::Rng;
use std::collections::HashMap;

use super::bot::random_angle;
use super::physics::{Kinematics, SHIP_RADIUS};
use super::player::{Player, PlayerId};

/// Centre distance below which two ships push apart
pub const REPULSION_RADIUS: f32 = SHIP_RADIUS * 3.4;
pub const REPULSION_FORCE: f32 = 1600.0;
/// Contact intensity lost per second
pub const CONTACT_DECAY: f32 = 1.8;

/// Separate one overlapping pair. Returns the normalized overlap in [0, 1],
/// or `None` when the ships are not in contact.
pub fn separate<R: Rng + ?Sized>(
    a: &mut Kinematics,
    b: &mut Kinematics,
    dt: f32,
    rng: &mut R,
) -> Option<f32> {
    let mut dx = b.x - a.x;
    let mut dy = b.y - a.y;
    let dist_sq = dx * dx + dy * dy;
    if dist_sq >= REPULSION_RADIUS * REPULSION_RADIUS {
        return None;
    }

    let mut dist = dist_sq.sqrt();
    if dist < 1e-4 {
        let angle = random_angle(rng);
        dx = angle.cos() * 1e-4;
        dy = angle.sin() * 1e-4;
        dist = 1e-4;
    }
    let nx = dx / dist;
    let ny = dy / dist;
    let overlap = REPULSION_RADIUS - dist;

    let push = overlap * 0.5;
    a.x -= nx * push;
    a.y -= ny * push;
    b.x += nx * push;
    b.y += ny * push;

    let impulse = REPULSION_FORCE * (overlap / REPULSION_RADIUS + 0.2) * dt;
    a.vx -= nx * impulse;
    a.vy -= ny * impulse;
    b.vx += nx * impulse;
    b.vy += ny * impulse;

    // Damp what is left of the approach
    let closing = (b.vx - a.vx) * nx + (b.vy - a.vy) * ny;
    if closing < 0.0 {
        let cancel = closing * 0.5;
        a.vx += nx * cancel;
        a.vy += ny * cancel;
        b.vx -= nx * cancel;
        b.vy -= ny * cancel;
    }

    Some((overlap / REPULSION_RADIUS).clamp(0.0, 1.0))
}

/// Decay every ship's contact intensity
pub fn decay_contact(players: &mut HashMap<PlayerId, Player>, dt: f32) {
    for player in players.values_mut() {
        player.magnetic = (player.magnetic - CONTACT_DECAY * dt).max(0.0);
    }
}

/// Resolve every overlapping pair among `ids`
pub fn resolve_all<R: Rng + ?Sized>(
    players: &mut HashMap<PlayerId, Player>,
    ids: &[PlayerId],
    dt: f32,
    rng: &mut R,
) {
    for (i, a_id) in ids.iter().enumerate() {
        for b_id in &ids[i + 1..] {
            let (Some(a), Some(b)) = (players.get(a_id), players.get(b_id)) else {
                continue;
            };
            let (mut ka, mut kb) = (a.body, b.body);

            let Some(intensity) = separate(&mut ka, &mut kb, dt, rng) else {
                continue;
            };

            if let Some(a) = players.get_mut(a_id) {
                a.body = ka;
                a.magnetic = a.magnetic.max(intensity);
            }
            if let Some(b) = players.get_mut(b_id) {
                b.body = kb;
                b.magnetic = b.magnetic.max(intensity);
            }
        }
    }
}
