//! Host snapshots and client-side reconciliation
//!
//! The host sends the full entity set; a client replaces its view with every
//! snapshot and only smooths presentation between them.

use crate::game::classes::classes;
use crate::game::constants::combat::BARREL_RECOIL_DECAY;
use crate::game::constants::net::{HIT_FLASH_THRESHOLD, INTERPOLATION_FACTOR};
use crate::game::constants::physics::HIT_FLASH_DECAY;
use crate::game::entity::{Entity, EntityId, Stats};
use crate::game::state::EntityStore;
use crate::net::protocol::{SnapshotRecord, WorldSnapshot};
use crate::util::vec2::{wrap_angle, Vec2};

#[inline]
fn round_rotation(rotation: f32) -> f32 {
    (rotation * 100.0).round() / 100.0
}

fn record(entity: &Entity) -> SnapshotRecord {
    SnapshotRecord {
        id: entity.id,
        kind: entity.kind,
        x: entity.position.x.round() as i32,
        y: entity.position.y.round() as i32,
        rotation: round_rotation(entity.rotation),
        health: entity.health.round() as i32,
        max_health: entity.max_health.round() as i32,
        color: entity.color,
        radius: entity.radius,
        level: entity.level,
        class_index: entity.class_index as u16,
        hit_flash: entity.hit_flash > HIT_FLASH_THRESHOLD,
    }
}

/// Serialize every entity, ordered by id
pub fn build_snapshot(store: &EntityStore) -> WorldSnapshot {
    let entities = store
        .ids_sorted()
        .into_iter()
        .filter_map(|id| store.get(id))
        .map(record)
        .collect();
    WorldSnapshot { entities }
}

#[inline]
fn flash(on: bool) -> f32 {
    if on {
        1.0
    } else {
        0.0
    }
}

/// Local stand-in for a host entity; derived stats are never computed here
fn shell(data: &SnapshotRecord) -> Entity {
    let position = Vec2::new(data.x as f32, data.y as f32);
    let mut entity = Entity::new(data.id, data.kind, position, data.rotation);
    entity.radius = data.radius;
    entity.health = data.health as f32;
    entity.max_health = data.max_health as f32;
    entity.color = data.color;
    entity.score_value = 0.0;
    entity.damage = 0.0;
    entity.level = data.level.max(1);
    entity.class_index = usize::from(data.class_index);
    entity.hit_flash = flash(data.hit_flash);
    entity.stats = Stats::default();
    entity.reset_barrels(classes().barrel_count(entity.class_index));
    entity
}

fn overwrite(entity: &mut Entity, data: &SnapshotRecord) {
    entity.position = Vec2::new(data.x as f32, data.y as f32);
    entity.rotation = data.rotation;
    entity.health = data.health as f32;
    entity.max_health = data.max_health as f32;
    if data.level > 0 {
        entity.level = data.level;
    }
    entity.hit_flash = flash(data.hit_flash);

    let class_index = usize::from(data.class_index);
    if entity.class_index != class_index {
        entity.class_index = class_index;
        entity.reset_barrels(classes().barrel_count(class_index));
    }
}

/// Replace the local view with `snapshot`
///
/// Unknown ids become shells, known ones are overwritten in place, and anything
/// the snapshot no longer lists is removed. Returns the removed ids.
pub fn apply_snapshot(store: &mut EntityStore, snapshot: &WorldSnapshot) -> Vec<EntityId> {
    let mut listed = rustc_hash::FxHashSet::default();
    listed.reserve(snapshot.entities.len());

    for data in &snapshot.entities {
        listed.insert(data.id);
        match store.get_mut(data.id) {
            Some(entity) => overwrite(entity, data),
            None => {
                store.insert(shell(data));
            }
        }
    }

    let stale = store.ids_where(|e| !listed.contains(&e.id));
    for &id in &stale {
        store.remove(id);
    }
    stale
}

/// One presentation frame on a client: ease towards the authoritative pose
///
/// Rotation eases along the shorter arc; `prev_rotation` holds the displayed
/// angle.
pub fn interpolate(store: &mut EntityStore) {
    for entity in store.iter_mut() {
        let gap = entity.position - entity.render_position;
        entity.render_position += gap * INTERPOLATION_FACTOR;

        let turn = wrap_angle(entity.rotation - entity.prev_rotation);
        entity.prev_rotation += turn * INTERPOLATION_FACTOR;

        for recoil in entity.barrel_recoil.iter_mut() {
            if *recoil > 0.0 {
                *recoil *= BARREL_RECOIL_DECAY;
            }
        }
        if entity.hit_flash > 0.0 {
            entity.hit_flash *= HIT_FLASH_DECAY;
        }
    }
}
