//! Collaborators the game loop drives but does not own
//!
//! Rendering, audio and the UI projection are injected as trait objects so the
//! simulation runs headless in the binary and in tests.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::game::entity::{Color, Entity, EntityId};
use crate::game::state::EntityStore;
use crate::util::vec2::Vec2;

/// Frame output
pub trait Renderer: Send {
    /// Advance the smoothed camera towards `target` and return its position
    fn update_camera(&mut self, target: Option<&Entity>, shake: f32) -> Vec2;

    /// Draw one frame; `alpha` is the fraction between the last two steps
    fn draw(&mut self, store: &EntityStore, camera: Vec2, alpha: f32, player: Option<EntityId>);

    fn spawn_particles(&mut self, at: Vec2, color: Color, count: usize);
}

/// Sound cue with its falloff parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SoundCue {
    Shoot { distance: f32 },
    Hit { distance: f32 },
    Explosion { distance: f32, scale: f32 },
    LevelUp,
    Spawn,
}

/// Fire-and-forget audio
pub trait AudioSink: Send {
    fn play(&mut self, cue: SoundCue);
    /// Silence everything (game over)
    fn stop(&mut self);
}

/// HUD projection of the local player
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HudSnapshot {
    pub score: u64,
    pub level: u32,
    pub xp: f32,
    /// XP needed to leave the current level
    pub xp_needed: f32,
    pub stat_points: u32,
    pub upgrades: [u8; 8],
    pub class_index: usize,
    pub health: f32,
    pub max_health: f32,
}

/// Toggles the UI lets the player flip
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Toggles {
    pub auto_fire: bool,
    pub auto_spin: bool,
    pub auto_pilot: bool,
    pub auto_level: bool,
}

/// Two-way UI state
///
/// Read each frame for toggles, the dead flag and the spectated entity; written
/// with HUD snapshots, evolution choices and the boss alert.
pub trait UiBridge: Send {
    fn toggles(&self) -> Toggles;
    fn is_dead(&self) -> bool;
    fn set_dead(&mut self, dead: bool);
    fn spectating(&self) -> Option<EntityId>;
    fn set_spectating(&mut self, target: Option<EntityId>);
    fn update_hud(&mut self, hud: HudSnapshot);
    fn set_available_upgrades(&mut self, classes: Vec<usize>);
    fn set_boss_alert(&mut self, active: bool);
}

/// Renderer that only tracks the camera
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    camera: Vec2,
    pub frames: u64,
    pub particles: u64,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for HeadlessRenderer {
    fn update_camera(&mut self, target: Option<&Entity>, _shake: f32) -> Vec2 {
        if let Some(target) = target {
            self.camera = target.render_position;
        }
        self.camera
    }

    fn draw(&mut self, _store: &EntityStore, _camera: Vec2, _alpha: f32, _player: Option<EntityId>) {
        self.frames += 1;
    }

    fn spawn_particles(&mut self, _at: Vec2, _color: Color, count: usize) {
        self.particles += count as u64;
    }
}

/// Audio sink that drops every cue, logging at trace level
#[derive(Debug, Default)]
pub struct SilentAudio;

impl AudioSink for SilentAudio {
    fn play(&mut self, cue: SoundCue) {
        tracing::trace!(?cue, "audio");
    }

    fn stop(&mut self) {}
}

/// Plain UI state record
#[derive(Debug, Clone, Default)]
pub struct UiState {
    pub toggles: Toggles,
    pub dead: bool,
    pub spectating: Option<EntityId>,
    pub hud: HudSnapshot,
    pub available_upgrades: Vec<usize>,
    pub boss_alert: bool,
}

/// UI state shared between the game loop and whoever presents it
#[derive(Debug, Clone, Default)]
pub struct SharedUi {
    inner: Arc<RwLock<UiState>>,
}

impl SharedUi {
    pub fn new(toggles: Toggles) -> Self {
        Self {
            inner: Arc::new(RwLock::new(UiState {
                toggles,
                ..Default::default()
            })),
        }
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> UiState {
        self.inner.read().clone()
    }

    pub fn set_toggles(&self, toggles: Toggles) {
        self.inner.write().toggles = toggles;
    }
}

impl UiBridge for SharedUi {
    fn toggles(&self) -> Toggles {
        self.inner.read().toggles
    }

    fn is_dead(&self) -> bool {
        self.inner.read().dead
    }

    fn set_dead(&mut self, dead: bool) {
        self.inner.write().dead = dead;
    }

    fn spectating(&self) -> Option<EntityId> {
        self.inner.read().spectating
    }

    fn set_spectating(&mut self, target: Option<EntityId>) {
        self.inner.write().spectating = target;
    }

    fn update_hud(&mut self, hud: HudSnapshot) {
        self.inner.write().hud = hud;
    }

    fn set_available_upgrades(&mut self, classes: Vec<usize>) {
        self.inner.write().available_upgrades = classes;
    }

    fn set_boss_alert(&mut self, active: bool) {
        self.inner.write().boss_alert = active;
    }
}
