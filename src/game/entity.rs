//! Entity data model
//!
//! Every simulated object (tanks, boss, walls, food, bullets) is an [`Entity`].
//! Kind-specific behaviour is driven by [`EntityKind`] rather than separate types.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::game::classes::classes;
use crate::game::constants::{boss, palette, progression::STAT_COUNT};
use crate::util::vec2::Vec2;

/// Entity identifier, unique for the lifetime of a match
pub type EntityId = u64;

/// Display colour (0xRRGGBB)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub const PLAYER: Color = Color(palette::PLAYER);
    pub const ENEMY: Color = Color(palette::ENEMY);
    pub const BOSS: Color = Color(palette::BOSS);
    pub const BULLET: Color = Color(palette::BULLET);
    pub const BOSS_BULLET: Color = Color(palette::BOSS_BULLET);
    pub const WALL: Color = Color(palette::WALL);
}

/// Consumable shape variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FoodKind {
    Square,
    Triangle,
    Pentagon,
    AlphaPentagon,
    Hexagon,
    Heptagon,
    Octagon,
    Nonagon,
    Star,
    Cross,
    Omega,
}

/// Spawn profile of a food variant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FoodProfile {
    pub radius: f32,
    pub health: f32,
    pub score: f32,
    pub body_damage: f32,
    pub xp: f32,
}

impl FoodKind {
    pub const ALL: [FoodKind; 11] = [
        FoodKind::Square,
        FoodKind::Triangle,
        FoodKind::Pentagon,
        FoodKind::AlphaPentagon,
        FoodKind::Hexagon,
        FoodKind::Heptagon,
        FoodKind::Octagon,
        FoodKind::Nonagon,
        FoodKind::Star,
        FoodKind::Cross,
        FoodKind::Omega,
    ];

    pub fn profile(self) -> FoodProfile {
        let (radius, health, score, body_damage, xp) = match self {
            FoodKind::Square => (15.0, 10.0, 10.0, 5.0, 10.0),
            FoodKind::Triangle => (20.0, 30.0, 25.0, 8.0, 25.0),
            FoodKind::Pentagon => (35.0, 100.0, 100.0, 15.0, 100.0),
            FoodKind::Hexagon => (45.0, 300.0, 300.0, 20.0, 300.0),
            FoodKind::Heptagon => (50.0, 600.0, 600.0, 25.0, 600.0),
            FoodKind::Octagon => (55.0, 1000.0, 1000.0, 30.0, 1000.0),
            FoodKind::Nonagon => (60.0, 2000.0, 2000.0, 35.0, 2000.0),
            FoodKind::AlphaPentagon => (80.0, 5000.0, 3000.0, 40.0, 3000.0),
            FoodKind::Cross => (30.0, 1500.0, 2500.0, 10.0, 2500.0),
            FoodKind::Star => (40.0, 4000.0, 5000.0, 50.0, 5000.0),
            FoodKind::Omega => (100.0, 50_000.0, 50_000.0, 100.0, 50_000.0),
        };
        FoodProfile {
            radius,
            health,
            score,
            body_damage,
            xp,
        }
    }

    pub fn color(self) -> Color {
        Color(match self {
            FoodKind::Square => palette::FOOD_SQUARE,
            FoodKind::Triangle => palette::FOOD_TRIANGLE,
            FoodKind::Pentagon => palette::FOOD_PENTAGON,
            FoodKind::AlphaPentagon => palette::FOOD_ALPHA,
            FoodKind::Hexagon => palette::FOOD_HEXAGON,
            FoodKind::Heptagon => palette::FOOD_HEPTAGON,
            FoodKind::Octagon => palette::FOOD_OCTAGON,
            FoodKind::Nonagon => palette::FOOD_NONAGON,
            FoodKind::Star => palette::FOOD_STAR,
            FoodKind::Cross => palette::FOOD_CROSS,
            FoodKind::Omega => palette::FOOD_OMEGA,
        })
    }
}

/// What an entity is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Enemy,
    Boss,
    Bullet,
    Wall,
    Food(FoodKind),
}

impl EntityKind {
    /// Players and bots: hostile to each other, earn XP, strafe and kite
    #[inline]
    pub fn is_combatant(self) -> bool {
        matches!(self, EntityKind::Player | EntityKind::Enemy)
    }

    /// Anything with a hull and barrels
    #[inline]
    pub fn is_tank(self) -> bool {
        matches!(self, EntityKind::Player | EntityKind::Enemy | EntityKind::Boss)
    }

    #[inline]
    pub fn is_food(self) -> bool {
        matches!(self, EntityKind::Food(_))
    }

    #[inline]
    pub fn is_bullet(self) -> bool {
        self == EntityKind::Bullet
    }

    #[inline]
    pub fn is_wall(self) -> bool {
        self == EntityKind::Wall
    }

    #[inline]
    pub fn is_boss(self) -> bool {
        self == EntityKind::Boss
    }

    /// Colour assigned at spawn
    pub fn default_color(self) -> Color {
        match self {
            EntityKind::Player => Color::PLAYER,
            EntityKind::Enemy => Color::ENEMY,
            EntityKind::Boss => Color::BOSS,
            EntityKind::Bullet => Color::BULLET,
            EntityKind::Wall => Color::WALL,
            EntityKind::Food(food) => food.color(),
        }
    }
}

/// Derived combat stats
///
/// Never edited directly except for the boss stat block; see
/// [`Stats::from_upgrades`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub regen: f32,
    pub body_damage: f32,
    pub bullet_speed: f32,
    pub bullet_penetration: f32,
    pub bullet_damage: f32,
    /// Ticks between shots of a barrel with reload multiplier 1
    pub reload: f32,
    pub movement_speed: f32,
}

impl Stats {
    /// Stat block of a freshly created entity
    pub const BASE: Stats = Stats {
        regen: 0.01,
        body_damage: 20.0,
        bullet_speed: 12.0,
        bullet_penetration: 10.0,
        bullet_damage: 10.0,
        reload: 50.0,
        movement_speed: 0.5,
    };

    /// Fixed stat block of the boss
    pub const BOSS: Stats = Stats {
        regen: boss::REGEN,
        body_damage: boss::BODY_DAMAGE,
        bullet_speed: boss::BULLET_SPEED,
        bullet_penetration: boss::BULLET_PENETRATION,
        bullet_damage: boss::BULLET_DAMAGE,
        reload: boss::RELOAD,
        movement_speed: boss::MOVEMENT_SPEED,
    };

    /// Closed-form stats for an upgrade vector, plus the resulting max health
    pub fn from_upgrades(levels: &[u8; STAT_COUNT]) -> (Stats, f32) {
        let l = levels.map(f32::from);
        let stats = Stats {
            regen: 0.05 + l[0] * 0.1,
            body_damage: 20.0 + l[2] * 5.0,
            bullet_speed: 12.0 + l[3] * 3.0,
            bullet_penetration: 10.0 + l[4] * 10.0,
            bullet_damage: 10.0 + l[5] * 5.0,
            reload: (50.0 - l[6] * 5.0).max(2.0),
            movement_speed: 0.5 + l[7] * 0.1,
        };
        (stats, 100.0 + l[1] * 50.0)
    }
}

/// Per-barrel state; most classes have four barrels or fewer
pub type BarrelState = SmallVec<[f32; 4]>;

/// Universal simulated object
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,

    // Physics
    pub position: Vec2,
    pub velocity: Vec2,
    pub rotation: f32,
    pub radius: f32,

    // Render history
    pub prev_position: Vec2,
    pub render_position: Vec2,
    pub prev_rotation: f32,

    // Combat
    pub health: f32,
    pub max_health: f32,
    pub damage: f32,
    pub color: Color,
    pub score_value: f32,
    pub xp_value: Option<f32>,
    pub owner: Option<EntityId>,
    /// Last attacker; written by the collision resolver, read by the death sweep
    pub last_hit_by: Option<EntityId>,
    pub hit_flash: f32,
    dead: bool,

    // Progression
    pub xp: f32,
    pub level: u32,
    pub class_index: usize,
    pub stats: Stats,
    pub stat_points: u32,
    pub upgrades: [u8; STAT_COUNT],

    pub barrel_recoil: BarrelState,
    pub barrel_cooldown: BarrelState,
}

impl Entity {
    /// New entity with the generic defaults: player-sized, base class, base stats
    pub fn new(id: EntityId, kind: EntityKind, position: Vec2, rotation: f32) -> Self {
        let barrels = classes().barrel_count(0);
        Self {
            id,
            kind,
            position,
            velocity: Vec2::ZERO,
            rotation,
            radius: 25.0,
            prev_position: position,
            render_position: position,
            prev_rotation: rotation,
            health: 100.0,
            max_health: 100.0,
            damage: 20.0,
            color: kind.default_color(),
            score_value: 100.0,
            xp_value: None,
            owner: None,
            last_hit_by: None,
            hit_flash: 0.0,
            dead: false,
            xp: 0.0,
            level: 1,
            class_index: 0,
            stats: Stats::BASE,
            stat_points: 0,
            upgrades: [0; STAT_COUNT],
            barrel_recoil: SmallVec::from_elem(0.0, barrels),
            barrel_cooldown: SmallVec::from_elem(0.0, barrels),
        }
    }

    #[inline]
    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// One-way transition; health is clamped so it never reads negative
    pub fn mark_dead(&mut self) {
        self.dead = true;
        self.health = self.health.max(0.0);
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        !self.dead
    }

    pub fn health_ratio(&self) -> f32 {
        if self.max_health > 0.0 {
            self.health / self.max_health
        } else {
            0.0
        }
    }

    /// Damage dealt to whatever this entity touches
    #[inline]
    pub fn contact_damage(&self) -> f32 {
        if self.kind.is_bullet() {
            self.damage
        } else {
            self.stats.body_damage
        }
    }

    /// Resize barrel state to `count` zeroed slots
    pub fn reset_barrels(&mut self, count: usize) {
        self.barrel_recoil.clear();
        self.barrel_recoil.resize(count, 0.0);
        self.barrel_cooldown.clear();
        self.barrel_cooldown.resize(count, 0.0);
    }

    /// Record the pre-tick pose for interpolated rendering
    #[inline]
    pub fn snapshot_pose(&mut self) {
        self.prev_position = self.position;
        self.prev_rotation = self.rotation;
    }
}
