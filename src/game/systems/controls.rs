//! Per-tick control application for human-driven tanks, plus the upkeep every
//! entity receives regardless of who drives it (barrels, regen, food spin).

use crate::game::constants::combat::BARREL_RECOIL_DECAY;
use crate::game::constants::controls::{AUTO_SPIN_RATE, AXIS_DEADZONE};
use crate::game::constants::spawn::FOOD_SPIN;
use crate::game::entity::Entity;
use crate::net::protocol::PlayerInput;
use crate::util::vec2::Vec2;

#[inline]
fn beyond_deadzone(v: Vec2) -> bool {
    v.x.abs() > AXIS_DEADZONE || v.y.abs() > AXIS_DEADZONE
}

/// Movement direction: analog vector when active, otherwise the direction keys
pub fn movement_axes(input: &PlayerInput) -> Vec2 {
    if beyond_deadzone(input.move_vector) {
        input.move_vector
    } else {
        input.key_axes()
    }
}

/// Apply movement and aim; returns whether the entity wants to fire
///
/// `pointer_aim` enables cursor aiming, which only the local player has and
/// only while the autopilot is off.
pub fn apply_input(entity: &mut Entity, input: &PlayerInput, pointer_aim: bool) -> bool {
    let alive = entity.is_alive();
    if alive {
        entity.velocity += movement_axes(input) * entity.stats.movement_speed;
    }

    if input.auto_spin {
        entity.rotation += AUTO_SPIN_RATE;
    } else if beyond_deadzone(input.aim_vector) {
        entity.rotation = input.aim_vector.angle();
    } else if pointer_aim && !input.auto_pilot {
        entity.rotation = input.pointer.angle();
    }

    alive && (input.shoot || input.auto_fire)
}

/// Count barrel cooldowns down one tick and relax the visual recoil
pub fn tick_barrels(entity: &mut Entity) {
    for cooldown in entity.barrel_cooldown.iter_mut() {
        if *cooldown > 0.0 {
            *cooldown -= 1.0;
        }
    }
    for recoil in entity.barrel_recoil.iter_mut() {
        if *recoil > 0.0 {
            *recoil *= BARREL_RECOIL_DECAY;
        }
    }
}

/// Live tanks below max health regenerate, never past the max
pub fn regenerate(entity: &mut Entity) {
    if entity.kind.is_tank() && entity.is_alive() && entity.health < entity.max_health {
        entity.health = (entity.health + entity.stats.regen).min(entity.max_health);
    }
}

/// Idle food rotation
#[inline]
pub fn spin_food(entity: &mut Entity) {
    if entity.kind.is_food() {
        entity.rotation += FOOD_SPIN;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::{EntityKind, FoodKind};
    use std::f32::consts::PI;

    fn create_player() -> Entity {
        Entity::new(1, EntityKind::Player, Vec2::new(500.0, 500.0), 0.0)
    }

    #[test]
    fn test_keys_move() {
        let mut e = create_player();
        let input = PlayerInput {
            left: true,
            down: true,
            ..Default::default()
        };
        assert!(!apply_input(&mut e, &input, true));
        assert_eq!(e.velocity, Vec2::new(-0.5, 0.5));
    }

    #[test]
    fn test_move_vector_overrides_keys() {
        let mut e = create_player();
        let input = PlayerInput {
            left: true,
            move_vector: Vec2::new(0.0, 1.0),
            ..Default::default()
        };
        apply_input(&mut e, &input, true);
        assert_eq!(e.velocity, Vec2::new(0.0, 0.5));

        // Inside the deadzone the keys win
        let mut e = create_player();
        let input = PlayerInput {
            left: true,
            move_vector: Vec2::new(0.05, 0.05),
            ..Default::default()
        };
        apply_input(&mut e, &input, true);
        assert_eq!(e.velocity, Vec2::new(-0.5, 0.0));
    }

    #[test]
    fn test_aim_priority() {
        let mut e = create_player();
        let input = PlayerInput {
            auto_spin: true,
            aim_vector: Vec2::new(0.0, 1.0),
            ..Default::default()
        };
        apply_input(&mut e, &input, true);
        assert!((e.rotation - AUTO_SPIN_RATE).abs() < 1e-6);

        let input = PlayerInput {
            aim_vector: Vec2::new(0.0, 1.0),
            pointer: Vec2::new(-1.0, 0.0),
            ..Default::default()
        };
        apply_input(&mut e, &input, true);
        assert!((e.rotation - PI / 2.0).abs() < 1e-6);

        let input = PlayerInput {
            pointer: Vec2::new(-10.0, 0.0),
            ..Default::default()
        };
        apply_input(&mut e, &input, true);
        assert!((e.rotation - PI).abs() < 1e-6);
    }

    #[test]
    fn test_pointer_ignored_for_remote_and_autopilot() {
        let mut e = create_player();
        let input = PlayerInput {
            pointer: Vec2::new(-10.0, 0.0),
            ..Default::default()
        };
        apply_input(&mut e, &input, false);
        assert_eq!(e.rotation, 0.0);

        let input = PlayerInput {
            pointer: Vec2::new(-10.0, 0.0),
            auto_pilot: true,
            ..Default::default()
        };
        apply_input(&mut e, &input, true);
        assert_eq!(e.rotation, 0.0);
    }

    #[test]
    fn test_dead_entity_neither_moves_nor_fires() {
        let mut e = create_player();
        e.mark_dead();
        let input = PlayerInput {
            right: true,
            shoot: true,
            ..Default::default()
        };
        assert!(!apply_input(&mut e, &input, true));
        assert_eq!(e.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_auto_fire() {
        let mut e = create_player();
        let input = PlayerInput {
            auto_fire: true,
            ..Default::default()
        };
        assert!(apply_input(&mut e, &input, true));
    }

    #[test]
    fn test_tick_barrels() {
        let mut e = create_player();
        e.barrel_cooldown[0] = 2.0;
        e.barrel_recoil[0] = 5.0;
        tick_barrels(&mut e);
        assert_eq!(e.barrel_cooldown[0], 1.0);
        assert_eq!(e.barrel_recoil[0], 4.0);
    }

    #[test]
    fn test_regen_clamps_to_max() {
        let mut e = create_player();
        e.stats.regen = 5.0;
        e.health = 98.0;
        regenerate(&mut e);
        assert_eq!(e.health, 100.0);

        let mut food = Entity::new(2, EntityKind::Food(FoodKind::Square), Vec2::ZERO, 0.0);
        food.health = 5.0;
        regenerate(&mut food);
        assert_eq!(food.health, 5.0);
        spin_food(&mut food);
        assert!((food.rotation - FOOD_SPIN).abs() < 1e-6);
    }
}
