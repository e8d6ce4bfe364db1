//! Canonical entity store
//!
//! Owns every entity of the running match. Owned by the game loop and passed by
//! reference into physics, AI, spawning and network sync.

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;
use smallvec::SmallVec;

use crate::game::entity::{Entity, EntityId, EntityKind};

/// Map of entity id to entity, plus identifier allocation
///
/// The map uses a fixed hasher so iteration order depends only on the sequence
/// of inserts and removals, which keeps seeded matches reproducible.
#[derive(Debug, Default, Clone)]
pub struct EntityStore {
    entities: HashMap<EntityId, Entity, FxBuildHasher>,
    next_id: EntityId,
    /// Live boss entries, maintained on insert/remove
    boss_count: usize,
}

impl EntityStore {
    pub fn new() -> Self {
        Self {
            entities: HashMap::with_hasher(FxBuildHasher),
            next_id: 1,
            boss_count: 0,
        }
    }

    /// Reserve a fresh identifier
    pub fn allocate_id(&mut self) -> EntityId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        id
    }

    /// Insert (or replace) an entity under its own id
    pub fn insert(&mut self, entity: Entity) -> EntityId {
        let id = entity.id;
        // Keep allocation ahead of ids chosen elsewhere (snapshot shells)
        if id >= self.next_id {
            self.next_id = id + 1;
        }
        if entity.kind.is_boss() {
            self.boss_count += 1;
        }
        if let Some(previous) = self.entities.insert(id, entity) {
            if previous.kind.is_boss() {
                self.boss_count -= 1;
            }
        }
        id
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let removed = self.entities.remove(&id)?;
        if removed.kind.is_boss() {
            self.boss_count -= 1;
        }
        Some(removed)
    }

    /// Drop every entity; identifiers keep increasing across matches
    pub fn clear(&mut self) {
        self.entities.clear();
        self.boss_count = 0;
    }

    #[inline]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    #[inline]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    #[inline]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    /// All ids in ascending (creation) order
    pub fn ids_sorted(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.entities.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Ids of entities matching `filter`, ascending
    pub fn ids_where(&self, filter: impl Fn(&Entity) -> bool) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .entities
            .values()
            .filter(|e| filter(e))
            .map(|e| e.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Ids of entities already marked dead
    pub fn dead_ids(&self) -> SmallVec<[EntityId; 16]> {
        let mut ids: SmallVec<[EntityId; 16]> = self
            .entities
            .values()
            .filter(|e| e.is_dead())
            .map(|e| e.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Whether a boss entry is currently in the store
    #[inline]
    pub fn boss_alive(&self) -> bool {
        self.boss_count > 0
    }

    pub fn count_kind(&self, kind: EntityKind) -> usize {
        self.entities.values().filter(|e| e.kind == kind).count()
    }

    /// Mutable access to two distinct entities at once
    ///
    /// Returns `None` when `a == b` or either id is missing.
    pub fn with_pair<R>(
        &mut self,
        a: EntityId,
        b: EntityId,
        f: impl FnOnce(&mut Entity, &mut Entity) -> R,
    ) -> Option<R> {
        if a == b || !self.entities.contains_key(&a) {
            return None;
        }
        let mut second = self.entities.remove(&b)?;
        let result = self.entities.get_mut(&a).map(|first| f(first, &mut second));
        self.entities.insert(b, second);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::vec2::Vec2;

    fn spawn(store: &mut EntityStore, kind: EntityKind) -> EntityId {
        let id = store.allocate_id();
        store.insert(Entity::new(id, kind, Vec2::ZERO, 0.0))
    }

    #[test]
    fn test_ids_are_unique_and_ordered() {
        let mut store = EntityStore::new();
        let a = spawn(&mut store, EntityKind::Player);
        let b = spawn(&mut store, EntityKind::Enemy);
        let c = spawn(&mut store, EntityKind::Wall);
        assert!(a < b && b < c);
        assert_eq!(store.ids_sorted(), vec![a, b, c]);
    }

    #[test]
    fn test_insert_foreign_id_bumps_allocation() {
        let mut store = EntityStore::new();
        store.insert(Entity::new(40, EntityKind::Enemy, Vec2::ZERO, 0.0));
        assert_eq!(store.allocate_id(), 41);
    }

    #[test]
    fn test_boss_counter() {
        let mut store = EntityStore::new();
        assert!(!store.boss_alive());
        let boss = spawn(&mut store, EntityKind::Boss);
        assert!(store.boss_alive());
        store.remove(boss);
        assert!(!store.boss_alive());

        spawn(&mut store, EntityKind::Boss);
        store.clear();
        assert!(!store.boss_alive());
        assert!(store.is_empty());
    }

    #[test]
    fn test_replacing_boss_keeps_count() {
        let mut store = EntityStore::new();
        let id = spawn(&mut store, EntityKind::Boss);
        store.insert(Entity::new(id, EntityKind::Boss, Vec2::ZERO, 0.0));
        assert_eq!(store.count_kind(EntityKind::Boss), 1);
        store.remove(id);
        assert!(!store.boss_alive());
    }

    #[test]
    fn test_with_pair() {
        let mut store = EntityStore::new();
        let a = spawn(&mut store, EntityKind::Player);
        let b = spawn(&mut store, EntityKind::Enemy);

        let sum = store.with_pair(a, b, |x, y| {
            x.health -= 10.0;
            y.health -= 20.0;
            x.health + y.health
        });
        assert_eq!(sum, Some(170.0));
        assert_eq!(store.get(b).unwrap().health, 80.0);
        assert_eq!(store.len(), 2);

        assert!(store.with_pair(a, a, |_, _| ()).is_none());
        assert!(store.with_pair(a, 999, |_, _| ()).is_none());
        assert!(store.contains(a));
    }

    #[test]
    fn test_dead_ids() {
        let mut store = EntityStore::new();
        let a = spawn(&mut store, EntityKind::Player);
        spawn(&mut store, EntityKind::Enemy);
        store.get_mut(a).unwrap().mark_dead();
        assert_eq!(store.dead_ids().as_slice(), &[a]);
    }
}
