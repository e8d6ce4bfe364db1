//! Heuristic autopilot for the local player
//!
//! Independent of the behavior tree: a single-pass scan of the neighbourhood
//! that produces a synthetic [`PlayerInput`], plus an upgrade picker for
//! auto-leveling.

use crate::game::constants::autopilot::*;
use crate::game::constants::progression::MAX_STAT_LEVEL;
use crate::game::constants::world::MAP_SIZE;
use crate::game::entity::Entity;
use crate::game::state::EntityStore;
use crate::net::protocol::PlayerInput;
use crate::util::vec2::Vec2;

/// Upgrade throttle state; steering itself is stateless
#[derive(Debug, Clone, Default)]
pub struct Autopilot {
    last_upgrade_ms: Option<f64>,
}

impl Autopilot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute movement, aim and fire for `player`
    ///
    /// The returned input always has `auto_fire` and `auto_pilot` set.
    pub fn steer(&self, player: &Entity, store: &EntityStore) -> PlayerInput {
        let mut input = PlayerInput {
            auto_fire: true,
            auto_pilot: true,
            ..Default::default()
        };
        let origin = player.position;

        let mut nearby: Vec<(&Entity, f32)> = store
            .iter()
            .filter(|e| e.id != player.id && e.is_alive())
            .map(|e| (e, e.position.distance_to(origin)))
            .filter(|(_, d)| *d <= SCAN_RADIUS)
            .collect();
        nearby.sort_unstable_by_key(|(e, _)| e.id);

        let mut threats: Vec<(&Entity, f32)> = Vec::new();
        let mut targets: Vec<(&Entity, f32)> = Vec::new();
        let mut food: Vec<(&Entity, f32)> = Vec::new();
        for &(e, d) in &nearby {
            if e.kind.is_combatant() {
                threats.push((e, d));
                targets.push((e, d));
            } else if e.kind.is_bullet() && e.owner != Some(player.id) {
                if d < BULLET_THREAT_RADIUS {
                    threats.push((e, d));
                }
            } else if e.kind.is_food() {
                food.push((e, d));
            }
        }

        let low_health = player.health_ratio() < LOW_HEALTH_RATIO;
        let threat_close = threats.iter().any(|(_, d)| *d < THREAT_RADIUS);
        let mut steer = Vec2::ZERO;

        if low_health && threat_close {
            for (threat, dist) in &threats {
                if *dist > 0.0 {
                    steer += (origin - threat.position) * (FLEE_WEIGHT / dist);
                }
            }
            input.shoot = true;
        } else {
            let primary = nearest(&targets).or_else(|| richest(&food));
            if let Some((target, dist)) = primary {
                if dist > 0.0 {
                    let dir = (target.position - origin) * (1.0 / dist);
                    input.aim_vector = dir;
                    input.shoot = true;

                    if target.kind.is_combatant() {
                        steer = if dist < KITE_MIN {
                            -dir
                        } else if dist > KITE_MAX {
                            dir
                        } else {
                            dir.perpendicular()
                        };
                    } else if dist > FOOD_REACH {
                        steer = dir;
                    }
                }
            }
        }

        let hi = MAP_SIZE - EDGE_MARGIN;
        if origin.x < EDGE_MARGIN {
            steer.x += 1.0;
        }
        if origin.x > hi {
            steer.x -= 1.0;
        }
        if origin.y < EDGE_MARGIN {
            steer.y += 1.0;
        }
        if origin.y > hi {
            steer.y -= 1.0;
        }

        input.move_vector = steer.normalize();
        input
    }

    /// Next stat to spend a point on, following the fixed priority list
    ///
    /// Returns `None` without points, when every stat is maxed, or when the last
    /// pick was less than the throttle interval ago.
    pub fn next_upgrade(&mut self, upgrades: &[u8], points: u32, now_ms: f64) -> Option<usize> {
        if points == 0 {
            return None;
        }
        if let Some(last) = self.last_upgrade_ms {
            if now_ms - last < UPGRADE_THROTTLE_MS {
                return None;
            }
        }
        let stat = UPGRADE_PRIORITY
            .iter()
            .copied()
            .find(|&s| upgrades.get(s).is_some_and(|&level| level < MAX_STAT_LEVEL))?;
        self.last_upgrade_ms = Some(now_ms);
        Some(stat)
    }
}

/// Nearest candidate; the earlier (lower id) one wins ties
fn nearest<'a>(candidates: &[(&'a Entity, f32)]) -> Option<(&'a Entity, f32)> {
    candidates
        .iter()
        .copied()
        .reduce(|best, cur| if cur.1 < best.1 { cur } else { best })
}

/// Food with the best value per distance
fn richest<'a>(candidates: &[(&'a Entity, f32)]) -> Option<(&'a Entity, f32)> {
    let value = |(e, d): (&Entity, f32)| {
        let score = if e.score_value > 0.0 {
            e.score_value
        } else {
            DEFAULT_FOOD_VALUE
        };
        score / (d + 1.0)
    };
    candidates
        .iter()
        .copied()
        .reduce(|best, cur| if value(cur) > value(best) { cur } else { best })
}
