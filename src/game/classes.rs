//! Tank class table
//!
//! Static reference data: every combat archetype an entity can be, its barrels,
//! and the classes it may evolve into. Built once on first use and validated so
//! that every evolution edge points at an existing, strictly higher-tier class.

use std::f32::consts::PI;
use std::sync::OnceLock;

use crate::game::constants::progression::EVOLUTION_LEVEL_STEP;

/// One gun on a tank hull
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Barrel {
    /// Lateral offset from the hull centre, perpendicular to the barrel
    pub offset_x: f32,
    pub offset_y: f32,
    pub width: f32,
    pub length: f32,
    pub recoil: f32,
    /// Fire delay as a fraction of the reload (0..1)
    pub delay: f32,
    pub reload_multiplier: f32,
    pub damage_multiplier: f32,
    /// Maximum random deviation of the firing angle (radians, full width)
    pub spread: f32,
    /// Mount angle relative to the hull rotation
    pub angle: f32,
    pub bullet_speed: f32,
}

impl Barrel {
    pub fn new(width: f32, length: f32) -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            width,
            length,
            recoil: 0.0,
            delay: 0.0,
            reload_multiplier: 1.0,
            damage_multiplier: 1.0,
            spread: 0.0,
            angle: 0.0,
            bullet_speed: 1.0,
        }
    }

    fn offset(mut self, offset_x: f32) -> Self {
        self.offset_x = offset_x;
        self
    }

    fn angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    fn recoil(mut self, recoil: f32) -> Self {
        self.recoil = recoil;
        self
    }

    fn delay(mut self, delay: f32) -> Self {
        self.delay = delay;
        self
    }

    fn reload(mut self, multiplier: f32) -> Self {
        self.reload_multiplier = multiplier;
        self
    }

    fn damage(mut self, multiplier: f32) -> Self {
        self.damage_multiplier = multiplier;
        self
    }

    fn spread(mut self, spread: f32) -> Self {
        self.spread = spread;
        self
    }

    fn speed(mut self, multiplier: f32) -> Self {
        self.bullet_speed = multiplier;
        self
    }
}

/// `count` identical barrels spaced evenly around the hull
fn radial(count: usize, width: f32, length: f32) -> Vec<Barrel> {
    (0..count)
        .map(|i| Barrel::new(width, length).angle(2.0 * PI / count as f32 * i as f32))
        .collect()
}

/// A combat archetype
#[derive(Debug, Clone, PartialEq)]
pub struct TankClass {
    pub index: usize,
    pub name: &'static str,
    pub tier: u32,
    pub body_radius: f32,
    pub barrels: Vec<Barrel>,
    pub evolves_to: Vec<usize>,
}

impl TankClass {
    /// Entity level needed before this class can be chosen
    pub fn required_level(&self) -> u32 {
        required_level(self.tier)
    }
}

/// `(tier - 1) * 5`
pub fn required_level(tier: u32) -> u32 {
    tier.saturating_sub(1) * EVOLUTION_LEVEL_STEP
}

/// Problems found while validating the table
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassTableError {
    #[error("class '{name}' sits at position {position} but declares index {index}")]
    MisplacedIndex {
        name: &'static str,
        position: usize,
        index: usize,
    },
    #[error("class '{name}' evolves into missing class {target}")]
    MissingTarget { name: &'static str, target: usize },
    #[error("class '{name}' (tier {tier}) evolves into '{target}' of tier {target_tier}")]
    TierNotIncreasing {
        name: &'static str,
        tier: u32,
        target: &'static str,
        target_tier: u32,
    },
}

/// Immutable, validated class table
#[derive(Debug, Clone)]
pub struct ClassTable {
    classes: Vec<TankClass>,
}

impl ClassTable {
    /// Build the standard table, dropping any evolution edge that fails validation
    pub fn load() -> Self {
        let mut table = Self {
            classes: standard_classes(),
        };
        for error in table.validate() {
            tracing::error!("Class table: {}", error);
        }
        table.prune_invalid_edges();
        table
    }

    /// Every structural problem in the table (empty when valid)
    pub fn validate(&self) -> Vec<ClassTableError> {
        let mut errors = Vec::new();
        for (position, class) in self.classes.iter().enumerate() {
            if class.index != position {
                errors.push(ClassTableError::MisplacedIndex {
                    name: class.name,
                    position,
                    index: class.index,
                });
            }
            for &target in &class.evolves_to {
                match self.classes.get(target) {
                    None => errors.push(ClassTableError::MissingTarget {
                        name: class.name,
                        target,
                    }),
                    Some(next) if next.tier <= class.tier => {
                        errors.push(ClassTableError::TierNotIncreasing {
                            name: class.name,
                            tier: class.tier,
                            target: next.name,
                            target_tier: next.tier,
                        })
                    }
                    Some(_) => {}
                }
            }
        }
        errors
    }

    fn prune_invalid_edges(&mut self) {
        let tiers: Vec<u32> = self.classes.iter().map(|c| c.tier).collect();
        for class in &mut self.classes {
            let tier = class.tier;
            class
                .evolves_to
                .retain(|&t| tiers.get(t).is_some_and(|&next| next > tier));
        }
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&TankClass> {
        self.classes.get(index)
    }

    /// Class used when an index is unknown
    pub fn base(&self) -> &TankClass {
        &self.classes[0]
    }

    /// Index of the final (top tier) class
    pub fn final_index(&self) -> usize {
        self.classes.len() - 1
    }

    /// Barrel count for a class, zero for an unknown index
    pub fn barrel_count(&self, index: usize) -> usize {
        self.get(index).map_or(0, |c| c.barrels.len())
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TankClass> {
        self.classes.iter()
    }
}

/// Shared class table
pub fn classes() -> &'static ClassTable {
    static TABLE: OnceLock<ClassTable> = OnceLock::new();
    TABLE.get_or_init(ClassTable::load)
}

fn class(
    index: usize,
    name: &'static str,
    tier: u32,
    body_radius: f32,
    barrels: Vec<Barrel>,
    evolves_to: &[usize],
) -> TankClass {
    TankClass {
        index,
        name,
        tier,
        body_radius,
        barrels,
        evolves_to: evolves_to.to_vec(),
    }
}

fn standard_classes() -> Vec<TankClass> {
    let b = Barrel::new;
    let half = PI / 2.0;
    let quarter = PI / 4.0;

    vec![
        // Tier 1
        class(0, "Tank", 1, 25.0, vec![b(20.0, 45.0)], &[1, 2, 3, 4]),
        // Tier 2
        class(
            1,
            "Twin",
            2,
            25.0,
            vec![b(18.0, 45.0).offset(-12.0), b(18.0, 45.0).offset(12.0).delay(0.5)],
            &[5, 6, 20],
        ),
        class(
            2,
            "Sniper",
            2,
            25.0,
            vec![b(22.0, 65.0).reload(1.5).speed(1.8).damage(1.2)],
            &[7, 8, 21],
        ),
        class(
            3,
            "Machine Gun",
            2,
            25.0,
            vec![b(22.0, 35.0).spread(0.4).reload(0.6).damage(0.7)],
            &[9, 10, 22],
        ),
        class(
            4,
            "Flank Guard",
            2,
            25.0,
            vec![b(20.0, 45.0), b(20.0, 35.0).angle(PI)],
            &[11, 12, 23],
        ),
        // Tier 3
        class(
            5,
            "Triple Shot",
            3,
            25.0,
            vec![b(18.0, 45.0), b(18.0, 45.0).angle(0.4), b(18.0, 45.0).angle(-0.4)],
            &[13],
        ),
        class(
            6,
            "Twin Flank",
            3,
            25.0,
            vec![
                b(18.0, 45.0).offset(-12.0),
                b(18.0, 45.0).offset(12.0).delay(0.5),
                b(18.0, 35.0).angle(PI).offset(-12.0),
                b(18.0, 35.0).angle(PI).offset(12.0).delay(0.5),
            ],
            &[14],
        ),
        class(
            7,
            "Assassin",
            3,
            28.0,
            vec![b(25.0, 75.0).reload(2.0).speed(2.0).damage(1.5)],
            &[15],
        ),
        class(
            8,
            "Hunter",
            3,
            26.0,
            vec![
                b(25.0, 55.0).reload(1.5),
                b(15.0, 65.0).reload(1.5).delay(0.1).damage(0.8),
            ],
            &[16],
        ),
        class(
            9,
            "Launcher",
            3,
            30.0,
            vec![b(35.0, 50.0).reload(2.0).damage(3.0).recoil(4.0).speed(0.8)],
            &[17],
        ),
        class(
            10,
            "Gunner",
            3,
            25.0,
            vec![
                b(12.0, 35.0).offset(10.0),
                b(12.0, 35.0).offset(-10.0),
                b(12.0, 45.0).offset(18.0).delay(0.5),
                b(12.0, 45.0).offset(-18.0).delay(0.5),
            ],
            &[18],
        ),
        class(
            11,
            "Quad Tank",
            3,
            30.0,
            vec![
                b(20.0, 45.0),
                b(20.0, 45.0).angle(half),
                b(20.0, 45.0).angle(PI),
                b(20.0, 45.0).angle(-half),
            ],
            &[19],
        ),
        class(
            12,
            "Tri-Angle",
            3,
            25.0,
            vec![
                b(20.0, 45.0),
                b(20.0, 35.0).angle(PI + 0.5).recoil(3.0),
                b(20.0, 35.0).angle(PI - 0.5).recoil(3.0),
            ],
            &[24],
        ),
        // Tier 4
        class(
            13,
            "Penta Shot",
            4,
            32.0,
            vec![
                b(18.0, 45.0),
                b(18.0, 42.0).angle(0.3),
                b(18.0, 42.0).angle(-0.3),
                b(18.0, 38.0).angle(0.6),
                b(18.0, 38.0).angle(-0.6),
            ],
            &[25],
        ),
        class(
            14,
            "Battleship",
            4,
            28.0,
            vec![
                b(10.0, 30.0).angle(half - 0.2),
                b(10.0, 30.0).angle(half + 0.2),
                b(10.0, 30.0).angle(-half - 0.2),
                b(10.0, 30.0).angle(-half + 0.2),
            ],
            &[26],
        ),
        class(
            15,
            "Ranger",
            4,
            28.0,
            vec![b(30.0, 90.0).reload(2.5).speed(2.5).damage(2.5)],
            &[27],
        ),
        class(
            16,
            "Predator",
            4,
            28.0,
            vec![b(28.0, 50.0), b(22.0, 65.0).delay(0.2), b(16.0, 80.0).delay(0.4)],
            &[28],
        ),
        class(
            17,
            "Destroyer",
            4,
            40.0,
            vec![b(50.0, 60.0).reload(3.0).damage(5.0).recoil(6.0).speed(0.7)],
            &[29],
        ),
        class(
            18,
            "Streamliner",
            4,
            28.0,
            vec![
                b(14.0, 70.0).damage(0.2),
                b(14.0, 60.0).damage(0.2).delay(0.2),
                b(14.0, 50.0).damage(0.2).delay(0.4),
                b(14.0, 40.0).damage(0.2).delay(0.6),
                b(14.0, 30.0).damage(0.2).delay(0.8),
            ],
            &[30],
        ),
        class(
            19,
            "Octo Tank",
            4,
            32.0,
            vec![
                b(18.0, 45.0),
                b(18.0, 45.0).angle(half),
                b(18.0, 45.0).angle(PI),
                b(18.0, 45.0).angle(-half),
                b(18.0, 45.0).angle(quarter).delay(0.5),
                b(18.0, 45.0).angle(3.0 * quarter).delay(0.5),
                b(18.0, 45.0).angle(-3.0 * quarter).delay(0.5),
                b(18.0, 45.0).angle(-quarter).delay(0.5),
            ],
            &[31],
        ),
        // Tier 5
        class(
            20,
            "Triplet",
            5,
            28.0,
            vec![
                b(18.0, 45.0),
                b(18.0, 40.0).offset(14.0).delay(0.5),
                b(18.0, 40.0).offset(-14.0).delay(0.5),
            ],
            &[32],
        ),
        class(
            21,
            "Stalker",
            5,
            28.0,
            vec![b(25.0, 75.0).reload(2.2).damage(1.8)],
            &[33],
        ),
        class(
            22,
            "Sprayer",
            5,
            28.0,
            vec![b(25.0, 45.0), b(15.0, 55.0).spread(0.2).reload(0.5).delay(0.5)],
            &[34],
        ),
        class(23, "Auto 3", 5, 28.0, radial(3, 15.0, 30.0), &[35]),
        class(
            24,
            "Booster",
            5,
            28.0,
            vec![
                b(20.0, 45.0),
                b(18.0, 35.0).angle(PI + 0.6).recoil(3.5),
                b(18.0, 35.0).angle(PI - 0.6).recoil(3.5),
                b(18.0, 45.0).angle(PI + 0.3).recoil(3.5).delay(0.2),
                b(18.0, 45.0).angle(PI - 0.3).recoil(3.5).delay(0.2),
            ],
            &[36],
        ),
        // Tier 6
        class(
            25,
            "Spread Shot",
            6,
            35.0,
            vec![
                b(20.0, 50.0),
                b(12.0, 45.0).angle(0.2).delay(0.1),
                b(12.0, 45.0).angle(-0.2).delay(0.1),
                b(12.0, 40.0).angle(0.4).delay(0.2),
                b(12.0, 40.0).angle(-0.4).delay(0.2),
                b(12.0, 35.0).angle(0.6).delay(0.3),
                b(12.0, 35.0).angle(-0.6).delay(0.3),
            ],
            &[37],
        ),
        class(26, "Overlord", 6, 30.0, radial(4, 30.0, 40.0), &[38]),
        // Tier 7
        class(
            27,
            "Executioner",
            7,
            30.0,
            vec![b(35.0, 110.0).reload(3.5).speed(3.0).damage(3.5)],
            &[39],
        ),
        class(
            28,
            "X-Hunter",
            7,
            30.0,
            vec![b(30.0, 50.0), b(25.0, 65.0), b(20.0, 80.0), b(15.0, 95.0)],
            &[40],
        ),
        class(
            29,
            "Annihilator",
            7,
            45.0,
            vec![b(70.0, 50.0).reload(4.0).damage(6.0).recoil(10.0).speed(0.6)],
            &[41],
        ),
        class(
            30,
            "Gatling",
            7,
            30.0,
            vec![
                b(12.0, 60.0).offset(6.0),
                b(12.0, 60.0).offset(-6.0).delay(0.25),
                b(12.0, 60.0).offset(12.0).delay(0.5),
                b(12.0, 60.0).offset(-12.0).delay(0.75),
            ],
            &[42],
        ),
        class(31, "Cyclone", 7, 35.0, radial(12, 15.0, 50.0), &[43]),
        // Tier 8
        class(
            32,
            "Quint",
            8,
            32.0,
            vec![
                b(18.0, 50.0),
                b(18.0, 45.0).offset(15.0),
                b(18.0, 45.0).offset(-15.0),
                b(18.0, 40.0).offset(30.0).angle(0.1),
                b(18.0, 40.0).offset(-30.0).angle(-0.1),
            ],
            &[44],
        ),
        class(
            33,
            "Ghost",
            8,
            28.0,
            vec![b(30.0, 80.0).reload(2.5).damage(2.0).speed(2.5)],
            &[44],
        ),
        class(
            34,
            "Shotgun",
            8,
            30.0,
            vec![
                b(30.0, 50.0),
                b(10.0, 50.0).angle(0.1),
                b(10.0, 50.0).angle(-0.1),
                b(10.0, 50.0).angle(0.2),
                b(10.0, 50.0).angle(-0.2),
            ],
            &[44],
        ),
        class(35, "Auto 5", 8, 32.0, radial(5, 15.0, 35.0), &[44]),
        class(
            36,
            "Fighter",
            8,
            30.0,
            vec![
                b(20.0, 50.0),
                b(18.0, 40.0).angle(half),
                b(18.0, 40.0).angle(-half),
                b(18.0, 35.0).angle(PI + 0.5).recoil(4.0),
                b(18.0, 35.0).angle(PI - 0.5).recoil(4.0),
            ],
            &[44],
        ),
        // Tiers 9 to 14
        class(
            37,
            "Master",
            9,
            38.0,
            vec![
                b(20.0, 50.0),
                b(20.0, 50.0).angle(0.2),
                b(20.0, 50.0).angle(-0.2),
                b(20.0, 40.0).angle(0.4),
                b(20.0, 40.0).angle(-0.4),
                b(20.0, 30.0).angle(0.6),
                b(20.0, 30.0).angle(-0.6),
            ],
            &[45],
        ),
        class(38, "Factory", 9, 35.0, radial(3, 25.0, 45.0), &[45]),
        class(
            39,
            "Railgun",
            10,
            32.0,
            vec![b(30.0, 130.0).reload(4.0).speed(4.0).damage(4.0)],
            &[45],
        ),
        class(
            40,
            "Sniper X",
            10,
            32.0,
            vec![b(35.0, 60.0), b(30.0, 80.0), b(25.0, 100.0), b(20.0, 120.0)],
            &[45],
        ),
        class(
            41,
            "Skimmer",
            11,
            42.0,
            vec![
                b(60.0, 60.0).recoil(8.0).speed(0.5).damage(3.0),
                b(20.0, 50.0).angle(PI).delay(0.5),
                b(20.0, 50.0).angle(half),
                b(20.0, 50.0).angle(-half),
            ],
            &[45],
        ),
        class(
            42,
            "Vulcan",
            12,
            35.0,
            (0..6)
                .map(|i| {
                    b(12.0, 70.0)
                        .offset((i as f32 - 2.5) * 8.0)
                        .delay(i as f32 * 0.1)
                })
                .collect(),
            &[45],
        ),
        class(43, "Black Hole", 13, 40.0, radial(16, 12.0, 55.0), &[45]),
        // Spikes only: zero-size barrels
        class(44, "Spike", 14, 35.0, radial(12, 0.0, 0.0), &[45]),
        // Tier 15 and beyond
        class(
            45,
            "Titan",
            15,
            50.0,
            vec![
                b(80.0, 70.0).reload(4.0).damage(6.0).recoil(10.0),
                b(30.0, 50.0).angle(quarter),
                b(30.0, 50.0).angle(-quarter),
            ],
            &[46],
        ),
        class(
            46,
            "Leviathan",
            16,
            55.0,
            vec![
                b(40.0, 80.0),
                b(40.0, 80.0).angle(PI),
                b(30.0, 60.0).angle(half),
                b(30.0, 60.0).angle(-half),
                b(20.0, 50.0).angle(quarter),
                b(20.0, 50.0).angle(-quarter),
                b(20.0, 50.0).angle(3.0 * quarter),
                b(20.0, 50.0).angle(-3.0 * quarter),
            ],
            &[47],
        ),
        class(
            47,
            "Behemoth",
            17,
            60.0,
            vec![
                b(100.0, 80.0).reload(5.0).damage(8.0),
                b(30.0, 60.0).angle(0.5),
                b(30.0, 60.0).angle(-0.5),
            ],
            &[48],
        ),
        class(
            48,
            "Colossus",
            18,
            65.0,
            radial(8, 30.0, 70.0)
                .into_iter()
                .map(|barrel| barrel.reload(1.5))
                .collect(),
            &[49],
        ),
        class(
            49,
            "Alpha",
            19,
            70.0,
            vec![
                b(60.0, 100.0),
                b(50.0, 110.0).delay(0.1),
                b(40.0, 120.0).delay(0.2),
                b(30.0, 130.0).delay(0.3),
            ],
            &[50],
        ),
        class(
            50,
            "OMEGA",
            20,
            80.0,
            vec![
                b(120.0, 100.0).reload(2.0).damage(10.0),
                b(40.0, 80.0).angle(quarter),
                b(40.0, 80.0).angle(-quarter),
                b(40.0, 80.0).angle(3.0 * quarter),
                b(40.0, 80.0).angle(-3.0 * quarter),
                b(30.0, 60.0).angle(half),
                b(30.0, 60.0).angle(-half),
                b(20.0, 50.0).angle(PI).recoil(5.0),
                b(15.0, 40.0).angle(0.1),
                b(15.0, 40.0).angle(-0.1),
                b(15.0, 40.0).angle(0.2),
                b(15.0, 40.0).angle(-0.2),
            ],
            &[],
        ),
    ]
}
