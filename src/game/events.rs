//! Simulation side effects
//!
//! Systems never call renderer, audio or UI collaborators directly; they push
//! [`SimEvent`]s that the game loop routes after the step completes.

use crate::game::entity::{Color, EntityId, EntityKind};
use crate::util::vec2::Vec2;

#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    /// A barrel fired
    Shot { at: Vec2, shooter: EntityId },
    /// A bullet connected
    Hit { at: Vec2, color: Color },
    /// An entity was marked dead this tick
    Died {
        id: EntityId,
        kind: EntityKind,
        at: Vec2,
        color: Color,
        radius: f32,
        killer: Option<EntityId>,
    },
    /// One or more levels gained in a single award
    LevelUp { entity: EntityId, level: u32 },
}

/// Event sink threaded through a simulation step
pub type Events = Vec<SimEvent>;
