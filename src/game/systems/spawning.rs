//! Spawn policy for every entity kind except bullets
//!
//! Bullets are created by [`super::weapons::attempt_shoot`].

use std::f32::consts::TAU;

use rand::Rng;

use crate::game::classes::{classes, required_level};
use crate::game::constants::progression::{MAX_STAT_LEVEL, STAT_COUNT};
use crate::game::constants::{boss, spawn, world};
use crate::game::entity::{Entity, EntityId, EntityKind, FoodKind, Stats};
use crate::game::state::EntityStore;
use crate::game::systems::progression::{apply_class_change, recalculate_stats};
use crate::util::vec2::Vec2;

fn random_rotation(rng: &mut impl Rng) -> f32 {
    rng.gen::<f32>() * TAU
}

fn random_position(rng: &mut impl Rng) -> Vec2 {
    Vec2::new(
        rng.gen::<f32>() * world::MAP_SIZE,
        rng.gen::<f32>() * world::MAP_SIZE,
    )
}

fn create(store: &mut EntityStore, kind: EntityKind, position: Vec2, rng: &mut impl Rng) -> Entity {
    let id = store.allocate_id();
    Entity::new(id, kind, position, random_rotation(rng))
}

/// Static square wall centred on `position`
pub fn spawn_wall(store: &mut EntityStore, position: Vec2, rng: &mut impl Rng) -> EntityId {
    let mut wall = create(store, EntityKind::Wall, position, rng);
    wall.radius = spawn::WALL_SIZE / 2.0;
    wall.health = 999_999.0;
    wall.max_health = wall.health;
    wall.damage = 0.0;
    store.insert(wall)
}

/// Player in the outer annulus, base class
pub fn spawn_player(store: &mut EntityStore, rng: &mut impl Rng) -> EntityId {
    let angle = rng.gen::<f32>() * TAU;
    let distance = spawn::PLAYER_RING_INNER + rng.gen::<f32>() * spawn::PLAYER_RING_WIDTH;
    let center = Vec2::new(world::CENTER, world::CENTER);
    let position = center + Vec2::from_angle(angle) * distance;
    let player = create(store, EntityKind::Player, position, rng);
    store.insert(player)
}

/// Pre-levelled bot evolved as far as its level allows
pub fn spawn_bot(store: &mut EntityStore, rng: &mut impl Rng) -> EntityId {
    let position = random_position(rng);
    let mut bot = create(store, EntityKind::Enemy, position, rng);

    for _ in 0..spawn::BOT_UPGRADE_ROLLS {
        let stat = rng.gen_range(0..STAT_COUNT);
        if bot.upgrades[stat] < MAX_STAT_LEVEL {
            bot.upgrades[stat] += 1;
        }
    }
    bot.level = rng.gen_range(1..=spawn::BOT_MAX_LEVEL);
    recalculate_stats(&mut bot);
    evolve_for_level(&mut bot, rng);

    store.insert(bot)
}

/// Walk the class graph while the bot's level meets the next tier
///
/// Bounded by the table: every edge strictly increases the tier.
fn evolve_for_level(bot: &mut Entity, rng: &mut impl Rng) {
    let table = classes();
    loop {
        let Some(current) = table.get(bot.class_index) else {
            break;
        };
        let Some(first) = current.evolves_to.first().and_then(|&i| table.get(i)) else {
            break;
        };
        if bot.level < required_level(first.tier) {
            break;
        }
        let next = current.evolves_to[rng.gen_range(0..current.evolves_to.len())];
        if !apply_class_change(bot, next) {
            break;
        }
    }
}

/// Boss at the centre (jittered) or just inside a random edge
pub fn spawn_boss(store: &mut EntityStore, rng: &mut impl Rng) -> EntityId {
    let edge = rng.gen_range(0..4);
    let position = if rng.gen_bool(0.5) {
        let jx = (rng.gen::<f32>() - 0.5) * boss::CENTER_JITTER;
        let jy = (rng.gen::<f32>() - 0.5) * boss::CENTER_JITTER;
        Vec2::new(world::CENTER + jx, world::CENTER + jy)
    } else {
        let along = rng.gen::<f32>() * world::MAP_SIZE;
        let far = world::MAP_SIZE - boss::EDGE_INSET;
        match edge {
            0 => Vec2::new(along, boss::EDGE_INSET),
            1 => Vec2::new(far, along),
            2 => Vec2::new(along, far),
            _ => Vec2::new(boss::EDGE_INSET, along),
        }
    };

    let mut entity = create(store, EntityKind::Boss, position, rng);
    apply_class_change(&mut entity, classes().final_index());
    entity.radius = 80.0;
    entity.max_health = 50_000.0;
    entity.health = entity.max_health;
    entity.damage = boss::BODY_DAMAGE;
    entity.score_value = boss::SCORE_VALUE as f32;
    entity.level = boss::LEVEL;
    entity.stats = Stats::BOSS;

    let id = store.insert(entity);
    tracing::info!(id, x = position.x, y = position.y, "Boss spawned");
    id
}

/// Food variant for a spawn point `distance` from the centre and a uniform roll
pub fn food_for_zone(distance: f32, roll: f64) -> FoodKind {
    if distance < spawn::NEST_RADIUS {
        match roll {
            r if r > 0.98 => FoodKind::Omega,
            r if r > 0.95 => FoodKind::AlphaPentagon,
            r if r > 0.90 => FoodKind::Star,
            r if r > 0.85 => FoodKind::Nonagon,
            r if r > 0.50 => FoodKind::Pentagon,
            _ => FoodKind::Triangle,
        }
    } else if distance < spawn::MIDDLE_RADIUS {
        match roll {
            r if r > 0.99 => FoodKind::AlphaPentagon,
            r if r > 0.96 => FoodKind::Octagon,
            r if r > 0.92 => FoodKind::Heptagon,
            r if r > 0.85 => FoodKind::Hexagon,
            r if r > 0.75 => FoodKind::Pentagon,
            r if r > 0.40 => FoodKind::Triangle,
            _ => FoodKind::Square,
        }
    } else {
        match roll {
            r if r > 0.99 => FoodKind::Cross,
            r if r > 0.85 => FoodKind::Triangle,
            _ => FoodKind::Square,
        }
    }
}

/// Food at a uniform position, variant chosen by radial zone
pub fn spawn_food(store: &mut EntityStore, rng: &mut impl Rng) -> EntityId {
    let position = random_position(rng);
    let distance = position.distance_to(Vec2::new(world::CENTER, world::CENTER));
    let food = food_for_zone(distance, rng.gen::<f64>());
    let profile = food.profile();

    let mut entity = create(store, EntityKind::Food(food), position, rng);
    entity.radius = profile.radius;
    entity.health = profile.health;
    entity.max_health = profile.health;
    entity.score_value = profile.score;
    entity.damage = profile.body_damage;
    entity.stats.body_damage = profile.body_damage;
    entity.xp_value = Some(profile.xp);
    store.insert(entity)
}

/// Wall lattice, then the initial food and bot population
pub fn generate_world(store: &mut EntityStore, rng: &mut impl Rng, food: usize, bots: usize) {
    let center = Vec2::new(world::CENTER, world::CENTER);
    let step = spawn::WALL_SIZE * 2.0;
    let mut walls = 0usize;

    let mut x = spawn::WALL_START;
    while x < world::MAP_SIZE {
        let mut y = spawn::WALL_START;
        while y < world::MAP_SIZE {
            let spot = Vec2::new(x, y);
            if spot.distance_to(center) >= spawn::WALL_CLEAR_RADIUS && rng.gen_bool(spawn::WALL_CHANCE) {
                spawn_wall(store, spot, rng);
                walls += 1;
                if rng.gen_bool(spawn::WALL_EXTENSION_CHANCE) {
                    spawn_wall(store, Vec2::new(x + step, y), rng);
                    walls += 1;
                }
                if rng.gen_bool(spawn::WALL_EXTENSION_CHANCE) {
                    spawn_wall(store, Vec2::new(x, y + step), rng);
                    walls += 1;
                }
            }
            y += spawn::WALL_SPACING;
        }
        x += spawn::WALL_SPACING;
    }

    for _ in 0..food {
        spawn_food(store, rng);
    }
    for _ in 0..bots {
        spawn_bot(store, rng);
    }
    tracing::debug!(walls, food, bots, "World generated");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_bot_upgrades_never_exceed_cap() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut store = EntityStore::new();
        for _ in 0..200 {
            let id = spawn_bot(&mut store, &mut rng);
            let bot = store.get(id).unwrap();
            assert!(bot.upgrades.iter().all(|&u| u <= MAX_STAT_LEVEL));
            assert!(bot.upgrades.iter().map(|&u| u as usize).sum::<usize>() <= 30);
            assert!(bot.health <= bot.max_health);
            assert_eq!(bot.barrel_cooldown.len(), classes().barrel_count(bot.class_index));
        }
    }

    #[test]
    fn test_bot_class_matches_level() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut store = EntityStore::new();
        for _ in 0..100 {
            let id = spawn_bot(&mut store, &mut rng);
            let bot = store.get(id).unwrap();
            let class = classes().get(bot.class_index).unwrap();
            // Stopped because the next tier was out of reach
            if let Some(&next) = class.evolves_to.first() {
                assert!(bot.level < classes().get(next).unwrap().required_level());
            }
        }
    }

    #[test]
    fn test_player_spawns_in_ring() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut store = EntityStore::new();
        let center = Vec2::new(world::CENTER, world::CENTER);
        for _ in 0..50 {
            let id = spawn_player(&mut store, &mut rng);
            let player = store.get(id).unwrap();
            let d = player.position.distance_to(center);
            assert!((5999.0..=9001.0).contains(&d), "distance {}", d);
            assert_eq!(player.class_index, 0);
        }
    }

    #[test]
    fn test_boss_stat_block() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut store = EntityStore::new();
        let id = spawn_boss(&mut store, &mut rng);
        let boss = store.get(id).unwrap();
        assert_eq!(boss.class_index, classes().final_index());
        assert_eq!(boss.radius, 80.0);
        assert_eq!(boss.health, 50_000.0);
        assert_eq!(boss.stats, Stats::BOSS);
        assert_eq!(boss.barrel_cooldown.len(), 12);
        assert!(store.boss_alive());
    }

    #[test]
    fn test_food_zones() {
        assert_eq!(food_for_zone(100.0, 0.99), FoodKind::Omega);
        assert_eq!(food_for_zone(100.0, 0.1), FoodKind::Triangle);
        assert_eq!(food_for_zone(3000.0, 0.995), FoodKind::AlphaPentagon);
        assert_eq!(food_for_zone(3000.0, 0.2), FoodKind::Square);
        assert_eq!(food_for_zone(9000.0, 0.995), FoodKind::Cross);
        assert_eq!(food_for_zone(9000.0, 0.5), FoodKind::Square);
    }

    #[test]
    fn test_food_profile_applied() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut store = EntityStore::new();
        let id = spawn_food(&mut store, &mut rng);
        let food = store.get(id).unwrap();
        let EntityKind::Food(kind) = food.kind else {
            panic!("expected food");
        };
        let profile = kind.profile();
        assert_eq!(food.radius, profile.radius);
        assert_eq!(food.xp_value, Some(profile.xp));
        assert_eq!(food.stats.body_damage, profile.body_damage);
    }

    #[test]
    fn test_generate_world_keeps_nest_clear() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut store = EntityStore::new();
        generate_world(&mut store, &mut rng, 20, 5);
        let center = Vec2::new(world::CENTER, world::CENTER);
        let walls: Vec<_> = store.iter().filter(|e| e.kind.is_wall()).collect();
        assert!(!walls.is_empty());
        // Extensions sit at most 200 from an allowed lattice spot
        assert!(walls
            .iter()
            .all(|w| w.position.distance_to(center) >= spawn::WALL_CLEAR_RADIUS - 300.0));
        assert_eq!(store.count_kind(EntityKind::Enemy), 5);
        assert_eq!(store.iter().filter(|e| e.kind.is_food()).count(), 20);
    }
}
