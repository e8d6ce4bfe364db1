/// World geometry
pub mod world {
    /// Side length of the square arena (world units)
    pub const MAP_SIZE: f32 = 20_000.0;
    /// Arena centre on both axes
    pub const CENTER: f32 = MAP_SIZE / 2.0;
    /// Broad-phase cell size; independent of entity radius
    pub const GRID_CELL_SIZE: f32 = 150.0;
}

/// Integration and collision response
pub mod physics {
    /// Velocity retained per tick for ordinary entities
    pub const FRICTION: f32 = 0.92;
    /// Boss drifts far less than everything else
    pub const BOSS_FRICTION: f32 = 0.8;
    /// Bullets further than this outside the map are destroyed
    pub const BULLET_MARGIN: f32 = 100.0;
    /// Health a bullet loses every tick in flight
    pub const BULLET_DECAY: f32 = 0.01;
    /// Hit-flash multiplier per tick
    pub const HIT_FLASH_DECAY: f32 = 0.8;
    /// Share of the penetration depth each side of a body contact is moved
    pub const PUSH_SHARE: f32 = 0.5;
    /// The non-boss side of a boss contact absorbs twice the per-side overlap
    pub const BOSS_PUSH_MULTIPLIER: f32 = 2.0;
    /// Velocity nudge applied to whatever a bullet strikes
    pub const BULLET_NUDGE: f32 = 0.5;
    pub const BOSS_BULLET_NUDGE: f32 = 0.01;
    /// Fraction of the opponent's body damage taken per tick of body contact
    pub const BODY_CONTACT_FACTOR: f32 = 0.1;
}

/// Weapons
pub mod combat {
    /// Global scale for barrel recoil impulses
    pub const RECOIL_FORCE: f32 = 2.0;
    pub const RECOIL_SCALE: f32 = 0.1;
    /// Visual barrel recoil multiplier per tick
    pub const BARREL_RECOIL_DECAY: f32 = 0.8;
    /// Shots further than this from the listener are not voiced
    pub const SHOT_AUDIBLE_RANGE: f32 = 1000.0;
}

/// Levels, stat upgrades and class evolution
pub mod progression {
    /// XP required to leave each level (index = current level)
    pub const LEVEL_XP: [f32; 60] = [
        0.0, 10.0, 30.0, 60.0, 100.0, 150.0, 210.0, 280.0, 360.0, 450.0, 550.0, 660.0, 780.0,
        910.0, 1050.0, 1200.0, 1360.0, 1530.0, 1710.0, 1900.0, 2100.0, 2310.0, 2530.0, 2760.0,
        3000.0, 3250.0, 3510.0, 3780.0, 4060.0, 4350.0, 4650.0, 4960.0, 5280.0, 5610.0, 5950.0,
        6300.0, 6660.0, 7030.0, 7410.0, 7800.0, 8200.0, 8610.0, 9030.0, 9460.0, 9900.0,
        12_000.0, 15_000.0, 20_000.0, 30_000.0, 50_000.0, 75_000.0, 100_000.0, 150_000.0,
        200_000.0, 250_000.0, 300_000.0, 350_000.0, 400_000.0, 500_000.0, 1_000_000.0,
    ];
    /// Shown on the HUD once the table runs out
    pub const XP_CAP_DISPLAY: f32 = 999_999.0;
    pub const MAX_STAT_LEVEL: u8 = 10;
    pub const STAT_COUNT: usize = 8;
    pub const STAT_NAMES: [&str; STAT_COUNT] = [
        "Regen",
        "Max Health",
        "Body Dmg",
        "Bullet Spd",
        "Bullet Pen",
        "Bullet Dmg",
        "Reload",
        "Move Spd",
    ];
    /// Radius gained on every level-up call that gains at least one level
    pub const LEVEL_UP_GROWTH: f32 = 0.5;
    /// Level requirement per tier step: `(tier - 1) * EVOLUTION_LEVEL_STEP`
    pub const EVOLUTION_LEVEL_STEP: u32 = 5;
}

/// Spawn policy
pub mod spawn {
    /// Players appear in this annulus around the centre
    pub const PLAYER_RING_INNER: f32 = 6000.0;
    pub const PLAYER_RING_WIDTH: f32 = 3000.0;
    /// Random upgrade grants rolled for a fresh bot
    pub const BOT_UPGRADE_ROLLS: usize = 30;
    pub const BOT_MAX_LEVEL: u32 = 80;
    /// Food zone boundaries (distance from centre)
    pub const NEST_RADIUS: f32 = 2500.0;
    pub const MIDDLE_RADIUS: f32 = 7000.0;
    /// Wall lattice
    pub const WALL_START: f32 = 1000.0;
    pub const WALL_SPACING: f32 = 2000.0;
    pub const WALL_CLEAR_RADIUS: f32 = 3000.0;
    pub const WALL_CHANCE: f64 = 0.3;
    pub const WALL_EXTENSION_CHANCE: f64 = 0.5;
    /// Full side length of a wall block
    pub const WALL_SIZE: f32 = 100.0;
    pub const INITIAL_FOOD: usize = 1200;
    pub const INITIAL_BOTS: usize = 60;
    pub const FOOD_SPIN: f32 = 0.01;
}

/// Boss stat block and placement
pub mod boss {
    pub const LEVEL: u32 = 100;
    pub const SCORE_VALUE: u32 = 50_000;
    pub const REGEN: f32 = 2.0;
    pub const BODY_DAMAGE: f32 = 50.0;
    pub const BULLET_SPEED: f32 = 15.0;
    pub const BULLET_PENETRATION: f32 = 100.0;
    pub const BULLET_DAMAGE: f32 = 40.0;
    pub const RELOAD: f32 = 10.0;
    pub const MOVEMENT_SPEED: f32 = 0.8;
    /// Centre spawns are jittered by up to half of this on each axis
    pub const CENTER_JITTER: f32 = 4000.0;
    /// Edge spawns sit this far inside the map
    pub const EDGE_INSET: f32 = 200.0;
    pub const DEATH_SHAKE: f32 = 20.0;
    pub const EXPLOSION_SCALE: f32 = 5.0;
}

/// Behavior-tree AI
pub mod ai {
    pub const LOW_HEALTH_RATIO: f32 = 0.3;
    pub const BOSS_LOW_HEALTH_RATIO: f32 = 0.05;
    pub const PANIC_RADIUS: f32 = 600.0;
    pub const TARGET_RANGE: f32 = 1200.0;
    pub const BOSS_TARGET_RANGE: f32 = 3000.0;
    pub const SCAN_RADIUS: f32 = 1000.0;
    pub const BOSS_SCAN_RADIUS: f32 = 3000.0;
    /// Distance discount when scoring combatants as targets
    pub const COMBATANT_BONUS: f32 = 400.0;
    pub const PENTAGON_BONUS: f32 = 200.0;
    pub const STRAFE_RANGE: f32 = 300.0;
    pub const STRAFE_FACTOR: f32 = 0.8;
    pub const WANDER_TURN_CHANCE: f64 = 0.05;
    pub const WANDER_FACTOR: f32 = 0.5;
    pub const EDGE_MARGIN: f32 = 100.0;
}

/// Player autopilot
pub mod autopilot {
    pub const SCAN_RADIUS: f32 = 1500.0;
    pub const BULLET_THREAT_RADIUS: f32 = 300.0;
    pub const LOW_HEALTH_RATIO: f32 = 0.4;
    pub const THREAT_RADIUS: f32 = 600.0;
    pub const FLEE_WEIGHT: f32 = 2.0;
    pub const KITE_MIN: f32 = 300.0;
    pub const KITE_MAX: f32 = 500.0;
    pub const FOOD_REACH: f32 = 100.0;
    pub const EDGE_MARGIN: f32 = 100.0;
    /// Score assumed for food that declares none
    pub const DEFAULT_FOOD_VALUE: f32 = 10.0;
    pub const UPGRADE_THROTTLE_MS: f64 = 200.0;
    /// Penetration, bullet damage, reload, bullet speed, health, regen, body, move
    pub const UPGRADE_PRIORITY: [usize; 8] = [4, 5, 6, 3, 1, 0, 2, 7];
}

/// Local and remote control input
pub mod controls {
    /// Analog axes below this magnitude are ignored
    pub const AXIS_DEADZONE: f32 = 0.1;
    pub const AUTO_SPIN_RATE: f32 = 0.05;
}

/// Orchestrator timings (milliseconds)
pub mod timing {
    /// Fixed simulation step
    pub const STEP_MS: f64 = 1000.0 / 60.0;
    /// Accumulator cap after a stall
    pub const MAX_ACCUMULATOR_MS: f64 = 240.0;
    pub const BOSS_INTERVAL_MS: f64 = 60_000.0;
    pub const BOSS_ALERT_MS: f64 = 5000.0;
    pub const BROADCAST_INTERVAL_MS: f64 = 50.0;
    pub const INPUT_INTERVAL_MS: f64 = 33.0;
    pub const HUD_INTERVAL_MS: f64 = 100.0;
    pub const SPECTATOR_INTERVAL_MS: f64 = 100.0;
    pub const FOOD_RESPAWN_MS: f64 = 2000.0;
    pub const BOT_RESPAWN_MS: f64 = 5000.0;
    pub const SHAKE_DECAY: f32 = 0.9;
    pub const SHAKE_FLOOR: f32 = 0.1;
    pub const DEATH_SHAKE: f32 = 5.0;
}

/// Network constants
pub mod net {
    /// Client render position moves this fraction of the remaining gap per frame
    pub const INTERPOLATION_FACTOR: f32 = 0.2;
    /// Snapshot hit-flash flag threshold
    pub const HIT_FLASH_THRESHOLD: f32 = 0.1;
    /// Maximum framed message size (bytes); a full snapshot is well below this
    pub const MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;
    pub const JOIN_CODE_LEN: usize = 6;
    /// Frames buffered per peer writer before new ones are dropped
    pub const OUTBOUND_QUEUE_FRAMES: usize = 64;
    pub const CONNECT_TIMEOUT_MS: u64 = 5000;
}

/// Display colours (0xRRGGBB)
pub mod palette {
    pub const PLAYER: u32 = 0x00f3ff;
    pub const ENEMY: u32 = 0xff003c;
    pub const BOSS: u32 = 0x8000ff;
    pub const BULLET: u32 = 0xff003c;
    pub const BOSS_BULLET: u32 = 0xaa00ff;
    pub const WALL: u32 = 0x444444;
    pub const FOOD_SQUARE: u32 = 0xffe869;
    pub const FOOD_TRIANGLE: u32 = 0xff3838;
    pub const FOOD_PENTAGON: u32 = 0x548cff;
    pub const FOOD_ALPHA: u32 = 0x4444ff;
    pub const FOOD_HEXAGON: u32 = 0xb026ff;
    pub const FOOD_HEPTAGON: u32 = 0x00ffaa;
    pub const FOOD_OCTAGON: u32 = 0xff9100;
    pub const FOOD_NONAGON: u32 = 0xff00aa;
    pub const FOOD_STAR: u32 = 0xffd700;
    pub const FOOD_CROSS: u32 = 0x00ff00;
    pub const FOOD_OMEGA: u32 = 0xffffff;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_table_monotonic() {
        let table = progression::LEVEL_XP;
        assert_eq!(table[0], 0.0);
        for pair in table.windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn test_upgrade_priority_is_permutation() {
        let mut seen = [false; progression::STAT_COUNT];
        for &stat in &autopilot::UPGRADE_PRIORITY {
            assert!(!seen[stat]);
            seen[stat] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }
}
