//! Barrel firing and bullet creation

use std::f32::consts::FRAC_PI_2;

use rand::Rng;
use smallvec::SmallVec;

use crate::game::classes::classes;
use crate::game::constants::combat::{RECOIL_FORCE, RECOIL_SCALE};
use crate::game::entity::{Color, Entity, EntityId, EntityKind};
use crate::game::events::{Events, SimEvent};
use crate::game::state::EntityStore;
use crate::util::vec2::Vec2;

/// Bullet tint by shooter
fn bullet_color(shooter: &Entity, local_player: Option<EntityId>) -> Color {
    if Some(shooter.id) == local_player {
        Color::PLAYER
    } else if shooter.kind.is_boss() {
        Color::BOSS_BULLET
    } else if shooter.kind == EntityKind::Enemy {
        Color::ENEMY
    } else {
        Color::BULLET
    }
}

/// Fire every barrel of `shooter_id` whose cooldown has elapsed
///
/// Each shot resets the barrel cooldown, kicks the shooter backwards and spawns
/// one bullet at the muzzle. Returns the number of bullets created.
pub fn attempt_shoot(
    store: &mut EntityStore,
    shooter_id: EntityId,
    local_player: Option<EntityId>,
    rng: &mut impl Rng,
    events: &mut Events,
) -> usize {
    let Some(shooter) = store.get_mut(shooter_id) else {
        return 0;
    };
    let Some(class) = classes().get(shooter.class_index) else {
        return 0;
    };

    let color = bullet_color(shooter, local_player);
    let mut shots: SmallVec<[(Vec2, Vec2, f32, f32, f32); 4]> = SmallVec::new();

    for (i, barrel) in class.barrels.iter().enumerate() {
        // Barrel state may lag a class change applied elsewhere
        let (Some(&cooldown), Some(_)) = (shooter.barrel_cooldown.get(i), shooter.barrel_recoil.get(i))
        else {
            continue;
        };
        if cooldown > 0.0 {
            continue;
        }

        shooter.barrel_cooldown[i] = shooter.stats.reload * barrel.reload_multiplier;
        shooter.barrel_recoil[i] = barrel.recoil;

        let aim = shooter.rotation + barrel.angle;
        let facing = Vec2::from_angle(aim);
        shooter.velocity -= facing * (RECOIL_FORCE * barrel.recoil * RECOIL_SCALE);

        let spread = (rng.gen::<f32>() - 0.5) * barrel.spread;
        let heading = aim + spread;
        let muzzle = shooter.position
            + facing * barrel.length
            + Vec2::from_angle(aim + FRAC_PI_2) * barrel.offset_x;
        let velocity =
            Vec2::from_angle(heading) * (shooter.stats.bullet_speed * barrel.bullet_speed);

        shots.push((
            muzzle,
            velocity,
            heading,
            barrel.width / 2.0,
            shooter.stats.bullet_damage * barrel.damage_multiplier,
        ));
    }

    let penetration = shooter.stats.bullet_penetration;
    let at = shooter.position;
    let fired = shots.len();

    for (muzzle, velocity, heading, radius, damage) in shots {
        let id = store.allocate_id();
        let mut bullet = Entity::new(id, EntityKind::Bullet, muzzle, heading);
        bullet.owner = Some(shooter_id);
        bullet.velocity = velocity;
        bullet.radius = radius;
        bullet.damage = damage;
        bullet.health = penetration;
        bullet.max_health = penetration;
        bullet.color = color;
        store.insert(bullet);
    }
    if fired > 0 {
        events.push(SimEvent::Shot {
            at,
            shooter: shooter_id,
        });
    }
    fired
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::systems::progression::apply_class_change;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn setup(kind: EntityKind, class_index: usize) -> (EntityStore, EntityId) {
        let mut store = EntityStore::new();
        let id = store.allocate_id();
        let mut tank = Entity::new(id, kind, Vec2::new(1000.0, 1000.0), 0.0);
        apply_class_change(&mut tank, class_index);
        store.insert(tank);
        (store, id)
    }

    fn bullets(store: &EntityStore) -> Vec<&Entity> {
        store.iter().filter(|e| e.kind.is_bullet()).collect()
    }

    #[test]
    fn test_single_barrel_shot() {
        let (mut store, id) = setup(EntityKind::Player, 0);
        let mut rng = StdRng::seed_from_u64(1);
        let mut events = Events::new();

        assert_eq!(attempt_shoot(&mut store, id, Some(id), &mut rng, &mut events), 1);

        let shot = bullets(&store);
        assert_eq!(shot.len(), 1);
        let bullet = shot[0];
        assert_eq!(bullet.owner, Some(id));
        // Muzzle sits one barrel length ahead
        assert!(bullet.position.approx_eq(Vec2::new(1045.0, 1000.0), 1e-3));
        assert!(bullet.velocity.approx_eq(Vec2::new(12.0, 0.0), 1e-3));
        assert_eq!(bullet.radius, 10.0);
        assert_eq!(bullet.damage, 10.0);
        assert_eq!(bullet.health, 10.0);
        assert_eq!(bullet.color, Color::PLAYER);

        let tank = store.get(id).unwrap();
        assert_eq!(tank.barrel_cooldown[0], 50.0);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_cooldown_blocks_refire() {
        let (mut store, id) = setup(EntityKind::Enemy, 0);
        let mut rng = StdRng::seed_from_u64(1);
        let mut events = Events::new();
        attempt_shoot(&mut store, id, None, &mut rng, &mut events);
        assert_eq!(attempt_shoot(&mut store, id, None, &mut rng, &mut events), 0);
        assert_eq!(bullets(&store).len(), 1);
        assert_eq!(bullets(&store)[0].color, Color::ENEMY);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_recoil_pushes_shooter_back() {
        // Destroyer: recoil 6
        let (mut store, id) = setup(EntityKind::Enemy, 17);
        let mut rng = StdRng::seed_from_u64(1);
        attempt_shoot(&mut store, id, None, &mut rng, &mut Events::new());
        let tank = store.get(id).unwrap();
        assert!((tank.velocity.x + 1.2).abs() < 1e-4);
        assert_eq!(tank.barrel_recoil[0], 6.0);
    }

    #[test]
    fn test_multi_barrel_offsets() {
        // Twin: two barrels offset by +-12
        let (mut store, id) = setup(EntityKind::Boss, 1);
        let mut rng = StdRng::seed_from_u64(1);
        attempt_shoot(&mut store, id, None, &mut rng, &mut Events::new());
        let mut ys: Vec<f32> = bullets(&store).iter().map(|b| b.position.y).collect();
        ys.sort_by(f32::total_cmp);
        assert!((ys[0] - 988.0).abs() < 1e-3);
        assert!((ys[1] - 1012.0).abs() < 1e-3);
        assert!(bullets(&store).iter().all(|b| b.color == Color::BOSS_BULLET));
    }

    #[test]
    fn test_unknown_shooter() {
        let mut store = EntityStore::new();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(attempt_shoot(&mut store, 42, None, &mut rng, &mut Events::new()), 0);
    }
}
