//! Behavior-tree control for bots and the boss
//!
//! One shared tree is interpreted per governed entity each tick. Nodes only
//! read the store; their output is an [`Intent`] the game loop applies after
//! every decision has been made, so evaluation order never matters and the
//! whole pass can run in parallel.

use std::f32::consts::{FRAC_PI_2, TAU};

use hashbrown::HashMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::game::constants::ai::*;
use crate::game::constants::world::{CENTER, MAP_SIZE};
use crate::game::entity::{Entity, EntityId, EntityKind, FoodKind};
use crate::game::state::EntityStore;
use crate::util::vec2::Vec2;

/// Result of ticking a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Failure,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// Health ratio under the flee threshold
    LowHealth,
    /// Remembered target still alive and within acquisition range
    HasTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    FindTarget,
    MoveToTarget,
    Shoot,
    Flee,
    Wander,
}

/// Behavior tree node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// First child that does not fail wins
    Priority(Vec<Node>),
    /// Children run in order until one does not succeed
    Sequence(Vec<Node>),
    Condition(Condition),
    Action(Action),
}

impl Node {
    /// Flee when hurt, otherwise hunt, otherwise wander
    pub fn bot_tree() -> Node {
        Node::Priority(vec![
            Node::Sequence(vec![
                Node::Condition(Condition::LowHealth),
                Node::Action(Action::Flee),
            ]),
            Node::Sequence(vec![
                Node::Priority(vec![
                    Node::Condition(Condition::HasTarget),
                    Node::Action(Action::FindTarget),
                ]),
                Node::Action(Action::MoveToTarget),
                Node::Action(Action::Shoot),
            ]),
            Node::Action(Action::Wander),
        ])
    }
}

/// Per-entity working memory
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Memory {
    pub target: Option<EntityId>,
    pub wander_angle: f32,
}

/// What a governed entity wants to do this tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Intent {
    /// New facing, if any node set one
    pub rotation: Option<f32>,
    /// Added to velocity
    pub thrust: Vec2,
    pub fire: bool,
}

impl Intent {
    /// Apply facing and thrust; returns whether the entity should fire
    pub fn apply(&self, entity: &mut Entity) -> bool {
        if let Some(rotation) = self.rotation {
            entity.rotation = rotation;
        }
        entity.velocity += self.thrust;
        self.fire
    }
}

struct Blackboard<'a, R> {
    store: &'a EntityStore,
    me: &'a Entity,
    memory: &'a mut Memory,
    intent: Intent,
    rng: &'a mut R,
}

fn tick<R: Rng>(node: &Node, bb: &mut Blackboard<'_, R>) -> Status {
    match node {
        Node::Priority(children) => {
            for child in children {
                let status = tick(child, bb);
                if status != Status::Failure {
                    return status;
                }
            }
            Status::Failure
        }
        Node::Sequence(children) => {
            for child in children {
                let status = tick(child, bb);
                if status != Status::Success {
                    return status;
                }
            }
            Status::Success
        }
        Node::Condition(condition) => check(*condition, bb),
        Node::Action(action) => act(*action, bb),
    }
}

fn status_of(ok: bool) -> Status {
    if ok {
        Status::Success
    } else {
        Status::Failure
    }
}

fn check<R: Rng>(condition: Condition, bb: &mut Blackboard<'_, R>) -> Status {
    let me = bb.me;
    let boss = me.kind.is_boss();
    match condition {
        Condition::LowHealth => {
            let threshold = if boss {
                BOSS_LOW_HEALTH_RATIO
            } else {
                LOW_HEALTH_RATIO
            };
            status_of(me.health_ratio() < threshold)
        }
        Condition::HasTarget => {
            let range = if boss { BOSS_TARGET_RANGE } else { TARGET_RANGE };
            let valid = bb
                .memory
                .target
                .and_then(|id| bb.store.get(id))
                .is_some_and(|t| t.is_alive() && t.position.distance_to(me.position) <= range);
            if !valid {
                bb.memory.target = None;
            }
            status_of(valid)
        }
    }
}

fn act<R: Rng>(action: Action, bb: &mut Blackboard<'_, R>) -> Status {
    match action {
        Action::FindTarget => find_target(bb),
        Action::MoveToTarget => move_to_target(bb),
        Action::Shoot => {
            bb.intent.fire = true;
            Status::Success
        }
        Action::Flee => flee(bb),
        Action::Wander => wander(bb),
    }
}

fn find_target<R: Rng>(bb: &mut Blackboard<'_, R>) -> Status {
    let me = bb.me;
    let boss = me.kind.is_boss();
    let scan = if boss { BOSS_SCAN_RADIUS } else { SCAN_RADIUS };

    let mut best: Option<(f32, EntityId)> = None;
    for other in bb.store.iter() {
        if other.id == me.id || other.is_dead() || other.kind.is_bullet() {
            continue;
        }
        if boss && other.kind != EntityKind::Player {
            continue;
        }
        let dist = other.position.distance_to(me.position);
        if dist > scan {
            continue;
        }
        let score = match other.kind {
            k if k.is_combatant() => dist - COMBATANT_BONUS,
            EntityKind::Food(FoodKind::Pentagon) => dist - PENTAGON_BONUS,
            _ => dist,
        };
        // Ties go to the lower id so the pick does not depend on map order
        let better = match best {
            None => true,
            Some((s, id)) => score < s || (score == s && other.id < id),
        };
        if better {
            best = Some((score, other.id));
        }
    }

    bb.memory.target = best.map(|(_, id)| id);
    status_of(best.is_some())
}

fn move_to_target<R: Rng>(bb: &mut Blackboard<'_, R>) -> Status {
    let me = bb.me;
    let Some(target) = bb.memory.target.and_then(|id| bb.store.get(id)) else {
        return Status::Failure;
    };
    let delta = target.position - me.position;
    let angle = delta.angle();
    let speed = me.stats.movement_speed;

    bb.intent.rotation = Some(angle);
    let strafe =
        !me.kind.is_boss() && target.kind.is_combatant() && delta.length() < STRAFE_RANGE;
    bb.intent.thrust += if strafe {
        Vec2::from_angle(angle + FRAC_PI_2) * (speed * STRAFE_FACTOR)
    } else {
        Vec2::from_angle(angle) * speed
    };
    Status::Success
}

fn flee<R: Rng>(bb: &mut Blackboard<'_, R>) -> Status {
    let me = bb.me;
    let threat = bb
        .store
        .iter()
        .filter(|o| o.id != me.id && o.is_alive() && o.kind.is_combatant())
        .map(|o| (o.position.distance_sq_to(me.position), o))
        .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.id.cmp(&b.1.id)));

    match threat {
        Some((dist_sq, threat)) if dist_sq < PANIC_RADIUS * PANIC_RADIUS => {
            let angle = (threat.position - me.position).angle();
            bb.intent.rotation = Some(angle);
            bb.intent.thrust += Vec2::from_angle(angle) * -me.stats.movement_speed;
            bb.intent.fire = true;
            Status::Running
        }
        _ => Status::Failure,
    }
}

fn wander<R: Rng>(bb: &mut Blackboard<'_, R>) -> Status {
    let me = bb.me;
    if bb.rng.gen_bool(WANDER_TURN_CHANCE) {
        bb.memory.wander_angle = bb.rng.gen::<f32>() * TAU;
    }
    let angle = bb.memory.wander_angle;
    bb.intent.thrust += Vec2::from_angle(angle) * (me.stats.movement_speed * WANDER_FACTOR);
    bb.intent.rotation = Some(angle);

    let p = me.position;
    let hi = MAP_SIZE - EDGE_MARGIN;
    if p.x < EDGE_MARGIN || p.x > hi || p.y < EDGE_MARGIN || p.y > hi {
        bb.memory.wander_angle = (Vec2::new(CENTER, CENTER) - p).angle();
    }
    Status::Running
}

/// Evaluate `tree` for one entity, updating its memory
pub fn think<R: Rng>(
    tree: &Node,
    store: &EntityStore,
    me: &Entity,
    memory: &mut Memory,
    rng: &mut R,
) -> Intent {
    let mut bb = Blackboard {
        store,
        me,
        memory,
        intent: Intent::default(),
        rng,
    };
    tick(tree, &mut bb);
    bb.intent
}

/// Tree plus the memory of every governed entity
#[derive(Debug, Clone)]
pub struct BotBrain {
    tree: Node,
    memory: HashMap<EntityId, Memory>,
}

impl BotBrain {
    pub fn new() -> Self {
        Self {
            tree: Node::bot_tree(),
            memory: HashMap::new(),
        }
    }

    /// Decide for every live bot and boss
    ///
    /// Decisions are computed in parallel against an immutable store, then the
    /// updated memories are written back. Output is in ascending id order.
    /// Each entity draws from its own generator derived from `seed` and its id,
    /// so the result does not depend on how rayon schedules the work.
    pub fn decide(&mut self, store: &EntityStore, seed: u64) -> Vec<(EntityId, Intent)> {
        self.memory.retain(|id, _| store.contains(*id));

        let governed =
            store.ids_where(|e| e.is_alive() && matches!(e.kind, EntityKind::Enemy | EntityKind::Boss));
        let tree = &self.tree;
        let memory = &self.memory;

        let decisions: Vec<(EntityId, Memory, Intent)> = governed
            .par_iter()
            .filter_map(|&id| {
                let me = store.get(id)?;
                let mut slot = memory.get(&id).copied().unwrap_or_default();
                let mut rng = StdRng::seed_from_u64(seed ^ id);
                let intent = think(tree, store, me, &mut slot, &mut rng);
                Some((id, slot, intent))
            })
            .collect();

        decisions
            .into_iter()
            .map(|(id, slot, intent)| {
                self.memory.insert(id, slot);
                (id, intent)
            })
            .collect()
    }

    pub fn memory(&self, id: EntityId) -> Option<&Memory> {
        self.memory.get(&id)
    }

    pub fn forget(&mut self, id: EntityId) {
        self.memory.remove(&id);
    }

    pub fn clear(&mut self) {
        self.memory.clear();
    }

    pub fn tracked(&self) -> usize {
        self.memory.len()
    }
}

impl Default for BotBrain {
    fn default() -> Self {
        Self::new()
    }
}
