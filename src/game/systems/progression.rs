//! XP, levels, stat upgrades and class evolution

use crate::game::classes::{classes, required_level};
use crate::game::constants::progression::{
    LEVEL_UP_GROWTH, LEVEL_XP, MAX_STAT_LEVEL, STAT_COUNT, XP_CAP_DISPLAY,
};
use crate::game::entity::{Entity, Stats};
use crate::game::events::{Events, SimEvent};

/// Rejected upgrade or evolution request
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgressionError {
    #[error("no stat points to spend")]
    NoStatPoints,
    #[error("stat {0} is already at the maximum level")]
    StatMaxed(usize),
    #[error("unknown stat index {0}")]
    UnknownStat(usize),
    #[error("unknown class index {0}")]
    UnknownClass(usize),
    #[error("class {from} cannot evolve into class {to}")]
    NotAnEvolution { from: usize, to: usize },
    #[error("class requires level {required}, entity is level {level}")]
    LevelTooLow { required: u32, level: u32 },
}

/// XP needed to leave `level`, or the display cap once the table runs out
pub fn xp_to_next(level: u32) -> f32 {
    LEVEL_XP.get(level as usize).copied().unwrap_or(XP_CAP_DISPLAY)
}

/// Add XP, levelling up as many times as the table allows
///
/// Each level grants one stat point. Any gain heals fully, grows the radius
/// once and emits a [`SimEvent::LevelUp`]. Returns whether a level was gained.
pub fn gain_xp(entity: &mut Entity, amount: f32, events: &mut Events) -> bool {
    let max_level = LEVEL_XP.len() as u32;
    if entity.level >= max_level {
        return false;
    }
    entity.xp += amount;

    let mut leveled_up = false;
    while entity.level < max_level && entity.xp >= LEVEL_XP[entity.level as usize] {
        entity.xp -= LEVEL_XP[entity.level as usize];
        entity.level += 1;
        entity.stat_points += 1;
        leveled_up = true;
    }

    if leveled_up {
        entity.health = entity.max_health;
        entity.radius += LEVEL_UP_GROWTH;
        events.push(SimEvent::LevelUp {
            entity: entity.id,
            level: entity.level,
        });
    }
    leveled_up
}

/// Evolutions of the current class whose level requirement is met
pub fn unlocked_evolutions(entity: &Entity) -> Vec<usize> {
    let table = classes();
    let Some(class) = table.get(entity.class_index) else {
        return Vec::new();
    };
    class
        .evolves_to
        .iter()
        .copied()
        .filter(|&target| {
            table
                .get(target)
                .is_some_and(|next| entity.level >= next.required_level())
        })
        .collect()
}

/// Spend one stat point on `stat`; a rejected request leaves the entity untouched
pub fn apply_upgrade(entity: &mut Entity, stat: usize) -> Result<(), ProgressionError> {
    if stat >= STAT_COUNT {
        return Err(ProgressionError::UnknownStat(stat));
    }
    if entity.stat_points == 0 {
        return Err(ProgressionError::NoStatPoints);
    }
    if entity.upgrades[stat] >= MAX_STAT_LEVEL {
        return Err(ProgressionError::StatMaxed(stat));
    }
    entity.stat_points -= 1;
    entity.upgrades[stat] += 1;
    recalculate_stats(entity);
    Ok(())
}

/// Derive stats from the upgrade vector and re-clamp health
pub fn recalculate_stats(entity: &mut Entity) {
    let (stats, max_health) = Stats::from_upgrades(&entity.upgrades);
    entity.stats = stats;
    entity.max_health = max_health;
    entity.health = entity.health.min(entity.max_health);
}

/// Switch class without checking the evolution graph
///
/// Barrel state is resized and zeroed and the body radius follows the class.
/// Unknown indices are ignored.
pub fn apply_class_change(entity: &mut Entity, class_index: usize) -> bool {
    let Some(class) = classes().get(class_index) else {
        return false;
    };
    entity.class_index = class_index;
    entity.reset_barrels(class.barrels.len());
    entity.radius = class.body_radius;
    true
}

/// Player-requested evolution, validated against the class graph and level
pub fn evolve(entity: &mut Entity, class_index: usize) -> Result<(), ProgressionError> {
    let table = classes();
    let target = table
        .get(class_index)
        .ok_or(ProgressionError::UnknownClass(class_index))?;
    let allowed = table
        .get(entity.class_index)
        .is_some_and(|current| current.evolves_to.contains(&class_index));
    if !allowed {
        return Err(ProgressionError::NotAnEvolution {
            from: entity.class_index,
            to: class_index,
        });
    }
    let required = required_level(target.tier);
    if entity.level < required {
        return Err(ProgressionError::LevelTooLow {
            required,
            level: entity.level,
        });
    }
    apply_class_change(entity, class_index);
    Ok(())
}
