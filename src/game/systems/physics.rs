//! Fixed-step integration, collision pass and death sweep

use crate::game::constants::physics::{
    BOSS_FRICTION, BULLET_DECAY, BULLET_MARGIN, FRICTION, HIT_FLASH_DECAY,
};
use crate::game::constants::world::MAP_SIZE;
use crate::game::entity::{Entity, EntityId};
use crate::game::events::{Events, SimEvent};
use crate::game::spatial::SpatialGrid;
use crate::game::state::EntityStore;
use crate::game::systems::collision;
use crate::game::systems::progression::gain_xp;
use crate::util::vec2::Vec2;

/// Result of one physics step
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StepOutcome {
    /// Entities marked dead this step, in the order they died
    pub died: Vec<EntityId>,
    /// Score earned by the local player
    pub score: f32,
}

/// Advance the world one tick
///
/// Entities are processed in ascending id order so a step is deterministic for
/// a given store. Dead entities stay in the store; removal is the caller's job.
pub fn step(
    store: &mut EntityStore,
    grid: &mut SpatialGrid,
    local_player: Option<EntityId>,
    events: &mut Events,
) -> StepOutcome {
    prepare(store, grid);

    let mut outcome = StepOutcome::default();
    let ids = store.ids_sorted();

    for &id in &ids {
        let Some(entity) = store.get_mut(id) else {
            continue;
        };
        if entity.kind.is_wall() {
            continue;
        }
        integrate(entity);
        let (position, radius) = (entity.position, entity.radius);

        for other_id in grid.query(id, position, radius) {
            resolve_pair(store, id, other_id, events);
        }
        check_death(store, id, local_player, events, &mut outcome);
    }

    // Catch anything damaged after its own turn this tick
    for &id in &ids {
        check_death(store, id, local_player, events, &mut outcome);
    }
    outcome
}

/// Rebuild the grid, record interpolation history, fade hit flashes
fn prepare(store: &mut EntityStore, grid: &mut SpatialGrid) {
    grid.clear();
    for entity in store.iter_mut() {
        if !entity.kind.is_wall() {
            entity.snapshot_pose();
            if entity.hit_flash > 0.0 {
                entity.hit_flash *= HIT_FLASH_DECAY;
            }
        }
        grid.insert_entity(entity);
    }
}

/// Move by velocity; friction, clamping and bouncing for bodies, decay for bullets
pub fn integrate(entity: &mut Entity) {
    entity.position += entity.velocity;

    if entity.kind.is_bullet() {
        entity.health -= BULLET_DECAY;
        let p = entity.position;
        let lo = -BULLET_MARGIN;
        let hi = MAP_SIZE + BULLET_MARGIN;
        if p.x < lo || p.x > hi || p.y < lo || p.y > hi {
            entity.health = 0.0;
        }
        return;
    }

    let friction = if entity.kind.is_boss() {
        BOSS_FRICTION
    } else {
        FRICTION
    };
    entity.velocity *= friction;

    entity.position = entity
        .position
        .clamp(Vec2::ZERO, Vec2::new(MAP_SIZE, MAP_SIZE));
    if entity.position.x <= 0.0 || entity.position.x >= MAP_SIZE {
        entity.velocity.x = -entity.velocity.x;
    }
    if entity.position.y <= 0.0 || entity.position.y >= MAP_SIZE {
        entity.velocity.y = -entity.velocity.y;
    }
}

fn resolve_pair(store: &mut EntityStore, id: EntityId, other_id: EntityId, events: &mut Events) {
    let (Some(entity), Some(other)) = (store.get(id), store.get(other_id)) else {
        return;
    };
    if entity.kind.is_bullet() && entity.owner == Some(other_id) {
        return;
    }
    if other.kind.is_bullet() && other.owner == Some(id) {
        return;
    }
    if entity.is_dead() || other.is_dead() {
        return;
    }

    // Walls never move, so every mover checks them regardless of id order
    if other.kind.is_wall() {
        let (center, half) = (other.position, other.radius);
        if let Some(entity) = store.get_mut(id) {
            collision::resolve_wall(entity, center, half);
        }
        return;
    }

    if id >= other_id || !collision::circles_overlap(entity, other) {
        return;
    }
    store.with_pair(id, other_id, |a, b| collision::resolve_contact(a, b, events));
}

/// Mark `id` dead if its health ran out, reward the killer and report it
fn check_death(
    store: &mut EntityStore,
    id: EntityId,
    local_player: Option<EntityId>,
    events: &mut Events,
    outcome: &mut StepOutcome,
) {
    let Some(entity) = store.get_mut(id) else {
        return;
    };
    if entity.health > 0.0 || entity.is_dead() {
        return;
    }
    entity.mark_dead();

    let killer = entity.last_hit_by;
    let reward = entity.xp_value.unwrap_or(entity.score_value * 0.5);
    let score = entity.score_value;
    events.push(SimEvent::Died {
        id,
        kind: entity.kind,
        at: entity.position,
        color: entity.color,
        radius: entity.radius,
        killer,
    });
    outcome.died.push(id);

    let Some(killer_id) = killer else {
        return;
    };
    if let Some(attacker) = store.get_mut(killer_id) {
        if attacker.kind.is_combatant() {
            gain_xp(attacker, reward, events);
            if local_player == Some(killer_id) {
                outcome.score += score;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::{EntityKind, FoodKind};

    fn spawn_at(store: &mut EntityStore, kind: EntityKind, x: f32, y: f32) -> EntityId {
        let id = store.allocate_id();
        store.insert(Entity::new(id, kind, Vec2::new(x, y), 0.0))
    }

    fn run(store: &mut EntityStore, local: Option<EntityId>) -> (StepOutcome, Events) {
        let mut grid = SpatialGrid::default();
        let mut events = Events::new();
        let outcome = step(store, &mut grid, local, &mut events);
        (outcome, events)
    }

    #[test]
    fn test_friction_and_integration() {
        let mut store = EntityStore::new();
        let id = spawn_at(&mut store, EntityKind::Enemy, 1000.0, 1000.0);
        store.get_mut(id).unwrap().velocity = Vec2::new(10.0, 0.0);
        run(&mut store, None);
        let e = store.get(id).unwrap();
        assert_eq!(e.position.x, 1010.0);
        assert!((e.velocity.x - 9.2).abs() < 1e-5);
        assert_eq!(e.prev_position.x, 1000.0);
    }

    #[test]
    fn test_bullets_keep_velocity() {
        let mut store = EntityStore::new();
        let id = spawn_at(&mut store, EntityKind::Bullet, 1000.0, 1000.0);
        store.get_mut(id).unwrap().velocity = Vec2::new(10.0, 0.0);
        run(&mut store, None);
        let b = store.get(id).unwrap();
        assert_eq!(b.velocity.x, 10.0);
        assert!((b.health - 99.99).abs() < 1e-3);
    }

    #[test]
    fn test_bounce_at_map_edge() {
        let mut store = EntityStore::new();
        let id = spawn_at(&mut store, EntityKind::Player, 5.0, 1000.0);
        store.get_mut(id).unwrap().velocity = Vec2::new(-10.0, 0.0);
        run(&mut store, None);
        let e = store.get(id).unwrap();
        assert_eq!(e.position.x, 0.0);
        assert!(e.velocity.x > 0.0);
    }

    #[test]
    fn test_bullet_outside_margin_dies() {
        let mut store = EntityStore::new();
        let id = spawn_at(&mut store, EntityKind::Bullet, MAP_SIZE + 99.0, 1000.0);
        {
            let b = store.get_mut(id).unwrap();
            b.health = 500.0;
            b.velocity = Vec2::new(2.0, 0.0);
        }
        let (outcome, _) = run(&mut store, None);
        assert_eq!(outcome.died, vec![id]);
        let b = store.get(id).unwrap();
        assert!(b.is_dead());
        assert_eq!(b.health, 0.0);
    }

    #[test]
    fn test_overlapping_bodies_separate_exactly() {
        let mut store = EntityStore::new();
        let a = spawn_at(&mut store, EntityKind::Enemy, 1000.0, 1000.0);
        let b = spawn_at(&mut store, EntityKind::Enemy, 1030.0, 1000.0);
        run(&mut store, None);
        let pa = store.get(a).unwrap().position;
        let pb = store.get(b).unwrap().position;
        assert!((pa.distance_to(pb) - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_bullet_ignores_owner() {
        let mut store = EntityStore::new();
        let owner = spawn_at(&mut store, EntityKind::Player, 1000.0, 1000.0);
        let bullet = spawn_at(&mut store, EntityKind::Bullet, 1010.0, 1000.0);
        store.get_mut(bullet).unwrap().owner = Some(owner);
        run(&mut store, None);
        assert_eq!(store.get(owner).unwrap().health, 100.0);
    }

    #[test]
    fn test_kill_awards_xp_and_score() {
        let mut store = EntityStore::new();
        let player = spawn_at(&mut store, EntityKind::Player, 1000.0, 1000.0);
        let food = {
            let id = store.allocate_id();
            let mut square =
                Entity::new(id, EntityKind::Food(FoodKind::Square), Vec2::new(1200.0, 1000.0), 0.0);
            square.health = 5.0;
            square.score_value = 10.0;
            square.xp_value = Some(10.0);
            store.insert(square)
        };
        let bullet = spawn_at(&mut store, EntityKind::Bullet, 1215.0, 1000.0);
        {
            let b = store.get_mut(bullet).unwrap();
            b.owner = Some(player);
            b.radius = 10.0;
            b.damage = 20.0;
            b.health = 10.0;
        }

        let (outcome, events) = run(&mut store, Some(player));
        assert_eq!(outcome.died, vec![food, bullet]);
        assert_eq!(outcome.score, 10.0);
        let p = store.get(player).unwrap();
        assert_eq!(p.level, 2);
        assert!(events
            .iter()
            .any(|e| matches!(e, SimEvent::Died { id, killer: Some(k), .. } if *id == food && *k == player)));
        assert!(events.iter().any(|e| matches!(e, SimEvent::LevelUp { .. })));
    }

    #[test]
    fn test_health_never_negative_after_step() {
        let mut store = EntityStore::new();
        let victim = spawn_at(&mut store, EntityKind::Enemy, 1000.0, 1000.0);
        let bullet = spawn_at(&mut store, EntityKind::Bullet, 1020.0, 1000.0);
        {
            let b = store.get_mut(bullet).unwrap();
            b.damage = 500.0;
            b.radius = 10.0;
        }
        run(&mut store, None);
        for e in store.iter() {
            assert!(e.health >= 0.0 && e.health <= e.max_health);
        }
        assert!(store.get(victim).unwrap().is_dead());
    }

    #[test]
    fn test_walls_are_static_and_block() {
        let mut store = EntityStore::new();
        let wall = spawn_at(&mut store, EntityKind::Wall, 1000.0, 1000.0);
        store.get_mut(wall).unwrap().radius = 50.0;
        let mover = spawn_at(&mut store, EntityKind::Player, 1060.0, 1000.0);
        store.get_mut(mover).unwrap().velocity = Vec2::new(-10.0, 0.0);
        run(&mut store, None);
        assert_eq!(store.get(wall).unwrap().position, Vec2::new(1000.0, 1000.0));
        assert!(store.get(mover).unwrap().position.x >= 1075.0 - 1e-3);
    }
}
