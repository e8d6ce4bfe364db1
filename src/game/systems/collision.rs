//! Narrow-phase tests and contact response
//!
//! Circle against circle for everything that moves, circle against an
//! axis-aligned square for walls. Degenerate (zero distance) contacts fall back
//! to a fixed normal so no NaN ever reaches positions or velocities.

use crate::game::constants::physics::{
    BODY_CONTACT_FACTOR, BOSS_BULLET_NUDGE, BOSS_PUSH_MULTIPLIER, BULLET_NUDGE, PUSH_SHARE,
};
use crate::game::entity::Entity;
use crate::game::events::{Events, SimEvent};
use crate::util::vec2::Vec2;

/// Normal used when two centres coincide
const FALLBACK_NORMAL: Vec2 = Vec2::new(1.0, 0.0);

/// Whether two circles overlap (touching does not count)
#[inline]
pub fn circles_overlap(a: &Entity, b: &Entity) -> bool {
    let reach = a.radius + b.radius;
    a.position.distance_sq_to(b.position) < reach * reach
}

/// Resolve a moving entity against a square wall of half-side `half` at `center`
///
/// Bullets are destroyed on contact. Anything else is moved out along the
/// contact normal by the exact penetration depth. Returns whether they touched.
pub fn resolve_wall(entity: &mut Entity, center: Vec2, half: f32) -> bool {
    let min = Vec2::new(center.x - half, center.y - half);
    let max = Vec2::new(center.x + half, center.y + half);
    let closest = entity.position.clamp(min, max);
    let delta = entity.position - closest;
    let dist_sq = delta.length_sq();

    if dist_sq >= entity.radius * entity.radius {
        return false;
    }
    if entity.kind.is_bullet() {
        entity.health = 0.0;
        return true;
    }

    let dist = dist_sq.sqrt();
    let (normal, depth) = if dist > 0.0 {
        (delta * (1.0 / dist), entity.radius - dist)
    } else {
        // Centre inside the box: leave through the nearest face
        let p = entity.position;
        let faces = [
            (p.x - min.x, Vec2::new(-1.0, 0.0)),
            (max.x - p.x, Vec2::new(1.0, 0.0)),
            (p.y - min.y, Vec2::new(0.0, -1.0)),
            (max.y - p.y, Vec2::new(0.0, 1.0)),
        ];
        let (face, normal) = faces
            .into_iter()
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .unwrap_or((0.0, FALLBACK_NORMAL));
        (normal, face + entity.radius)
    };

    entity.position += normal * depth;
    true
}

/// Bullet strike: damage both ways and attribute the hit to the bullet owner
fn bullet_hit(bullet: &mut Entity, victim: &mut Entity, events: &mut Events) {
    victim.health -= bullet.damage;
    bullet.health -= victim.contact_damage();
    victim.hit_flash = 1.0;
    bullet.hit_flash = 1.0;
    victim.last_hit_by = bullet.owner;
    events.push(SimEvent::Hit {
        at: bullet.position,
        color: bullet.color,
    });
}

#[inline]
fn bullet_nudge(target: &Entity) -> f32 {
    if target.kind.is_boss() {
        BOSS_BULLET_NUDGE
    } else {
        BULLET_NUDGE
    }
}

/// Resolve an overlapping circle pair; returns false when they do not overlap
///
/// Non-bullet pairs are separated; the boss never yields to a non-boss, which
/// instead absorbs the whole correction. Bullets deal and take damage, and two
/// bodies grind each other down.
pub fn resolve_contact(a: &mut Entity, b: &mut Entity, events: &mut Events) -> bool {
    let delta = a.position - b.position;
    let (normal, dist) = delta.normalize_with_length();
    let reach = a.radius + b.radius;
    if dist >= reach {
        return false;
    }
    let normal = if dist > 0.0 { normal } else { FALLBACK_NORMAL };
    let overlap = (reach - dist) / 2.0;

    let a_bullet = a.kind.is_bullet();
    let b_bullet = b.kind.is_bullet();

    if !a_bullet && !b_bullet {
        match (a.kind.is_boss(), b.kind.is_boss()) {
            (true, false) => b.position -= normal * (overlap * BOSS_PUSH_MULTIPLIER),
            (false, true) => a.position += normal * (overlap * BOSS_PUSH_MULTIPLIER),
            _ => {
                let share = (reach - dist) * PUSH_SHARE;
                a.position += normal * share;
                b.position -= normal * share;
            }
        }
    }

    if a_bullet {
        bullet_hit(a, b, events);
        if !b_bullet {
            b.velocity -= normal * bullet_nudge(b);
        }
    } else if b_bullet {
        bullet_hit(b, a, events);
        a.velocity += normal * bullet_nudge(a);
    } else {
        a.health -= b.stats.body_damage * BODY_CONTACT_FACTOR;
        b.health -= a.stats.body_damage * BODY_CONTACT_FACTOR;
        a.hit_flash = 1.0;
        b.hit_flash = 1.0;
        a.last_hit_by = Some(b.id);
        b.last_hit_by = Some(a.id);
    }
    true
}
