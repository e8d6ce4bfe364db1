//! Match orchestration
//!
//! Owns the entity store and drives one frame at a time: fixed-step simulation
//! in solo and host modes, snapshot interpolation in client mode, plus network
//! traffic, camera, HUD projection and spectating.

use std::time::{SystemTime, UNIX_EPOCH};

use hashbrown::HashMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::game::constants::{boss, combat, spawn, timing};
use crate::game::entity::{EntityId, EntityKind};
use crate::game::events::{Events, SimEvent};
use crate::game::match_result::MatchRecord;
use crate::game::performance::PerformanceMonitor;
use crate::game::schedule::{Deferred, Scheduler};
use crate::game::spatial::SpatialGrid;
use crate::game::state::EntityStore;
use crate::game::systems::ai::BotBrain;
use crate::game::systems::autopilot::Autopilot;
use crate::game::systems::progression::{self, xp_to_next};
use crate::game::systems::{controls, physics, spawning, weapons};
use crate::net::protocol::{ClientMessage, PeerAction, PeerId, PlayerInput, ServerMessage};
use crate::net::sync;
use crate::net::transport::{ClientEvent, ClientTransport, HostEvent, HostTransport, JoinCode};
use crate::ports::{AudioSink, HudSnapshot, Renderer, SoundCue, UiBridge};
use crate::util::vec2::Vec2;

/// Timings and world population for a match
#[derive(Debug, Clone)]
pub struct GameLoopConfig {
    pub step_ms: f64,
    pub max_accumulator_ms: f64,
    pub boss_interval_ms: f64,
    pub boss_alert_ms: f64,
    pub broadcast_interval_ms: f64,
    pub input_interval_ms: f64,
    pub hud_interval_ms: f64,
    pub spectator_interval_ms: f64,
    pub food_respawn_ms: f64,
    pub bot_respawn_ms: f64,
    pub food_count: usize,
    pub bot_count: usize,
    /// Fixed world seed; fresh entropy every match when `None`
    pub seed: Option<u64>,
}

impl Default for GameLoopConfig {
    fn default() -> Self {
        Self {
            step_ms: timing::STEP_MS,
            max_accumulator_ms: timing::MAX_ACCUMULATOR_MS,
            boss_interval_ms: timing::BOSS_INTERVAL_MS,
            boss_alert_ms: timing::BOSS_ALERT_MS,
            broadcast_interval_ms: timing::BROADCAST_INTERVAL_MS,
            input_interval_ms: timing::INPUT_INTERVAL_MS,
            hud_interval_ms: timing::HUD_INTERVAL_MS,
            spectator_interval_ms: timing::SPECTATOR_INTERVAL_MS,
            food_respawn_ms: timing::FOOD_RESPAWN_MS,
            bot_respawn_ms: timing::BOT_RESPAWN_MS,
            food_count: spawn::INITIAL_FOOD,
            bot_count: spawn::INITIAL_BOTS,
            seed: None,
        }
    }
}

/// How a match is played
pub enum SessionMode {
    Solo,
    Host(Box<dyn HostTransport>),
    Client(Box<dyn ClientTransport>),
}

impl SessionMode {
    pub fn name(&self) -> &'static str {
        match self {
            SessionMode::Solo => "solo",
            SessionMode::Host(_) => "host",
            SessionMode::Client(_) => "client",
        }
    }
}

/// Match lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    Stopped,
    Alive,
    /// Local player gone; spectating until the next start
    Dead,
}

/// Host-side peer bookkeeping
#[derive(Default)]
struct Peers {
    entities: HashMap<PeerId, EntityId>,
    inputs: HashMap<PeerId, PlayerInput>,
}

impl Peers {
    fn peer_for(&self, entity: EntityId) -> Option<PeerId> {
        self.entities
            .iter()
            .find_map(|(&peer, &id)| (id == entity).then_some(peer))
    }
}

pub struct GameLoop {
    config: GameLoopConfig,
    store: EntityStore,
    grid: SpatialGrid,
    brain: BotBrain,
    autopilot: Autopilot,
    scheduler: Scheduler,
    monitor: PerformanceMonitor,
    rng: StdRng,
    events: Events,

    renderer: Box<dyn Renderer>,
    audio: Box<dyn AudioSink>,
    ui: Box<dyn UiBridge>,

    mode: SessionMode,
    peers: Peers,
    phase: MatchPhase,
    nickname: String,
    player_id: Option<EntityId>,
    input: PlayerInput,
    score: f32,

    accumulator: f64,
    started_ms: f64,
    last_frame_ms: f64,
    last_boss_ms: f64,
    last_net_ms: f64,
    last_hud_ms: f64,
    last_spectator_ms: f64,
    shake: f32,
    camera: Vec2,
}

impl GameLoop {
    pub fn new(
        config: GameLoopConfig,
        renderer: Box<dyn Renderer>,
        audio: Box<dyn AudioSink>,
        ui: Box<dyn UiBridge>,
    ) -> Self {
        let monitor = PerformanceMonitor::new(config.step_ms);
        let rng = seeded(config.seed);
        Self {
            config,
            store: EntityStore::new(),
            grid: SpatialGrid::default(),
            brain: BotBrain::new(),
            autopilot: Autopilot::new(),
            scheduler: Scheduler::new(),
            monitor,
            rng,
            events: Events::new(),
            renderer,
            audio,
            ui,
            mode: SessionMode::Solo,
            peers: Peers::default(),
            phase: MatchPhase::Stopped,
            nickname: String::new(),
            player_id: None,
            input: PlayerInput::default(),
            score: 0.0,
            accumulator: 0.0,
            started_ms: 0.0,
            last_frame_ms: 0.0,
            last_boss_ms: 0.0,
            last_net_ms: 0.0,
            last_hud_ms: 0.0,
            last_spectator_ms: 0.0,
            shake: 0.0,
            camera: Vec2::ZERO,
        }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn player_id(&self) -> Option<EntityId> {
        self.player_id
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.phase != MatchPhase::Stopped
    }

    pub fn score(&self) -> u64 {
        self.score.max(0.0) as u64
    }

    pub fn shake(&self) -> f32 {
        self.shake
    }

    pub fn mode_name(&self) -> &'static str {
        self.mode.name()
    }

    /// Join code while hosting
    pub fn join_code(&self) -> Option<&JoinCode> {
        match &self.mode {
            SessionMode::Host(transport) => Some(transport.join_code()),
            _ => None,
        }
    }

    /// Player entity of a connected peer
    pub fn peer_entity(&self, peer: PeerId) -> Option<EntityId> {
        self.peers.entities.get(&peer).copied()
    }

    pub fn performance(&self) -> &PerformanceMonitor {
        &self.monitor
    }

    /// Replace the local control state; toggles are re-read from the UI each frame
    pub fn set_input(&mut self, input: PlayerInput) {
        self.input = input;
    }

    /// Begin a match, stopping any current one first
    ///
    /// Solo and host modes seed the world and spawn the local player; a client
    /// waits for the host's welcome.
    pub fn start(&mut self, nickname: &str, mode: SessionMode, now_ms: f64) {
        if self.is_running() {
            self.stop();
        }

        self.store.clear();
        self.grid.clear();
        self.brain.clear();
        self.events.clear();
        self.peers = Peers::default();
        self.scheduler.next_generation();
        self.rng = seeded(self.config.seed);
        self.autopilot = Autopilot::new();

        self.mode = mode;
        self.phase = MatchPhase::Alive;
        self.nickname = nickname.to_string();
        self.player_id = None;
        self.score = 0.0;
        self.accumulator = 0.0;
        self.shake = 0.0;
        self.started_ms = now_ms;
        self.last_frame_ms = now_ms;
        self.last_boss_ms = now_ms;
        self.last_net_ms = now_ms;
        self.last_hud_ms = now_ms;
        self.last_spectator_ms = now_ms;

        self.ui.set_dead(false);
        self.ui.set_spectating(None);
        self.ui.set_available_upgrades(Vec::new());
        self.ui.set_boss_alert(false);

        if !matches!(self.mode, SessionMode::Client(_)) {
            spawning::generate_world(
                &mut self.store,
                &mut self.rng,
                self.config.food_count,
                self.config.bot_count,
            );
            self.player_id = Some(spawning::spawn_player(&mut self.store, &mut self.rng));
            self.audio.play(SoundCue::Spawn);
        }

        info!(
            mode = self.mode.name(),
            nickname = %self.nickname,
            entities = self.store.len(),
            "Match started"
        );
    }

    /// End the match and release the session
    ///
    /// Returns the match record, or `None` when nothing was running.
    pub fn stop(&mut self) -> Option<MatchRecord> {
        if !self.is_running() {
            return None;
        }
        self.phase = MatchPhase::Stopped;
        self.audio.stop();

        match std::mem::replace(&mut self.mode, SessionMode::Solo) {
            SessionMode::Solo => {}
            SessionMode::Host(mut transport) => transport.close(),
            SessionMode::Client(mut transport) => transport.close(),
        }
        self.peers = Peers::default();

        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        let record = MatchRecord {
            timestamp_ms,
            score: self.score(),
            nickname: self.nickname.clone(),
            duration_ms: (self.last_frame_ms - self.started_ms).max(0.0) as u64,
        };
        info!(
            score = record.score,
            duration_ms = record.duration_ms,
            "Match stopped"
        );
        Some(record)
    }

    /// Run one frame at monotonic time `now_ms`
    pub fn frame(&mut self, now_ms: f64) {
        if !self.is_running() {
            return;
        }
        let elapsed = (now_ms - self.last_frame_ms).max(0.0);
        self.last_frame_ms = now_ms;
        self.accumulator = (self.accumulator + elapsed).min(self.config.max_accumulator_ms);

        self.pull_toggles();
        self.drive_local_player(now_ms);
        self.poll_network();

        if matches!(self.mode, SessionMode::Client(_)) {
            sync::interpolate(&mut self.store);
        } else {
            self.maybe_spawn_boss(now_ms);
            while self.accumulator >= self.config.step_ms {
                self.tick(now_ms);
                self.accumulator -= self.config.step_ms;
            }
            self.run_deferred(now_ms);
        }
        self.detect_game_over();

        self.push_network(now_ms);
        self.render();

        if now_ms - self.last_hud_ms > self.config.hud_interval_ms {
            self.sync_hud();
            self.last_hud_ms = now_ms;
        }
        self.update_spectator(now_ms);

        if self.shake > 0.0 {
            self.shake *= timing::SHAKE_DECAY;
            if self.shake < timing::SHAKE_FLOOR {
                self.shake = 0.0;
            }
        }
    }

    /// Spend a stat point on the local player, or ask the host to
    pub fn upgrade_stat(&mut self, stat: usize) {
        let Some(player_id) = self.player_id else {
            return;
        };
        if let SessionMode::Client(transport) = &mut self.mode {
            transport.send_to_host(&ClientMessage::Action(PeerAction::Upgrade {
                stat_index: stat as u8,
            }));
            return;
        }
        let Some(player) = self.store.get_mut(player_id) else {
            return;
        };
        match progression::apply_upgrade(player, stat) {
            Ok(()) => self.sync_hud(),
            Err(e) => debug!(stat, error = %e, "Upgrade rejected"),
        }
    }

    /// Evolve the local player into `class_index`, or ask the host to
    pub fn upgrade_class(&mut self, class_index: usize) {
        let Some(player_id) = self.player_id else {
            return;
        };
        if let SessionMode::Client(transport) = &mut self.mode {
            transport.send_to_host(&ClientMessage::Action(PeerAction::ChangeClass {
                class_index: class_index as u16,
            }));
            self.ui.set_available_upgrades(Vec::new());
            return;
        }
        let Some(player) = self.store.get_mut(player_id) else {
            return;
        };
        match progression::evolve(player, class_index) {
            Ok(()) => {
                self.ui.set_available_upgrades(Vec::new());
                self.sync_hud();
            }
            Err(e) => debug!(class_index, error = %e, "Evolution rejected"),
        }
    }

    /// Follow the next (`direction > 0`) or previous live tank
    ///
    /// Candidates are ordered by id; a missing current target restarts at the
    /// first candidate.
    pub fn cycle_spectator(&mut self, direction: i32) {
        let candidates = self
            .store
            .ids_where(|e| e.is_alive() && e.kind.is_tank());
        if candidates.is_empty() {
            return;
        }
        let current = self
            .ui
            .spectating()
            .and_then(|id| candidates.iter().position(|&c| c == id));
        let index = match current {
            None => 0,
            Some(i) => (i as i64 + i64::from(direction.signum())).rem_euclid(candidates.len() as i64) as usize,
        };
        self.ui.set_spectating(Some(candidates[index]));
    }

    fn pull_toggles(&mut self) {
        let toggles = self.ui.toggles();
        self.input.auto_fire = toggles.auto_fire;
        self.input.auto_spin = toggles.auto_spin;
        self.input.auto_pilot = toggles.auto_pilot;
        self.input.auto_level = toggles.auto_level;
    }

    /// Autopilot steering and auto-leveling for a live local player
    fn drive_local_player(&mut self, now_ms: f64) {
        let Some(player) = self.player_id.and_then(|id| self.store.get(id)) else {
            return;
        };
        if player.is_dead() {
            return;
        }

        if self.input.auto_pilot {
            let steered = self.autopilot.steer(player, &self.store);
            self.input.move_vector = steered.move_vector;
            self.input.aim_vector = steered.aim_vector;
            self.input.shoot = steered.shoot || self.input.auto_fire;
        }

        let upgrade = if self.input.auto_level {
            self.autopilot
                .next_upgrade(&player.upgrades, player.stat_points, now_ms)
        } else {
            None
        };
        if let Some(stat) = upgrade {
            self.upgrade_stat(stat);
        }
    }

    fn poll_network(&mut self) {
        match &mut self.mode {
            SessionMode::Solo => {}
            SessionMode::Host(transport) => {
                for event in transport.poll() {
                    handle_host_event(
                        event,
                        transport.as_mut(),
                        &mut self.peers,
                        &mut self.store,
                        &mut self.rng,
                    );
                }
            }
            SessionMode::Client(transport) => {
                let me = transport.peer_id();
                for event in transport.poll() {
                    match event {
                        ClientEvent::Message(ServerMessage::Welcome { peer_id, entity_id }) => {
                            if peer_id == me {
                                info!(entity_id, "Welcomed by host");
                                self.player_id = Some(entity_id);
                                self.audio.play(SoundCue::Spawn);
                            }
                        }
                        ClientEvent::Message(ServerMessage::State(snapshot)) => {
                            sync::apply_snapshot(&mut self.store, &snapshot);
                        }
                        ClientEvent::Disconnected => {
                            warn!("Host connection lost");
                            if self.phase == MatchPhase::Alive {
                                self.phase = MatchPhase::Dead;
                                self.ui.set_dead(true);
                                self.audio.stop();
                            }
                        }
                    }
                }
            }
        }
    }

    fn maybe_spawn_boss(&mut self, now_ms: f64) {
        if now_ms - self.last_boss_ms <= self.config.boss_interval_ms || self.store.boss_alive() {
            return;
        }
        spawning::spawn_boss(&mut self.store, &mut self.rng);
        self.last_boss_ms = now_ms;
        self.ui.set_boss_alert(true);
        self.scheduler
            .schedule(Deferred::ClearBossAlert, now_ms, self.config.boss_alert_ms);
        self.audio.play(SoundCue::Spawn);
    }

    /// One fixed simulation step
    fn tick(&mut self, now_ms: f64) {
        self.monitor.step_start();
        let local = self.player_id;

        let ai_seed = self.rng.gen::<u64>();
        let mut intents: HashMap<EntityId, _> =
            self.brain.decide(&self.store, ai_seed).into_iter().collect();

        for id in self.store.ids_sorted() {
            let Some(entity) = self.store.get_mut(id) else {
                continue;
            };
            if entity.kind.is_wall() {
                continue;
            }

            let wants_fire = if let Some(intent) = intents.remove(&id) {
                intent.apply(entity)
            } else if Some(id) == local {
                controls::apply_input(entity, &self.input, true)
            } else if let Some(peer) = self.peers.peer_for(id) {
                let input = self.peers.inputs.get(&peer).cloned().unwrap_or_default();
                controls::apply_input(entity, &input, false)
            } else {
                false
            };

            if wants_fire {
                weapons::attempt_shoot(&mut self.store, id, local, &mut self.rng, &mut self.events);
            }
            let Some(entity) = self.store.get_mut(id) else {
                continue;
            };
            if entity.kind.is_tank() {
                controls::tick_barrels(entity);
            }
            controls::spin_food(entity);
            controls::regenerate(entity);
        }

        let outcome = physics::step(&mut self.store, &mut self.grid, local, &mut self.events);
        self.score += outcome.score;

        for id in outcome.died {
            let Some(dead) = self.store.remove(id) else {
                continue;
            };
            self.brain.forget(id);
            match dead.kind {
                EntityKind::Food(_) => {
                    self.scheduler
                        .schedule(Deferred::RespawnFood, now_ms, self.config.food_respawn_ms);
                }
                EntityKind::Enemy => {
                    self.scheduler
                        .schedule(Deferred::RespawnBot, now_ms, self.config.bot_respawn_ms);
                }
                _ => {}
            }
            self.shake = if dead.kind.is_boss() {
                info!(id, killer = ?dead.last_hit_by, "Boss destroyed");
                boss::DEATH_SHAKE
            } else {
                timing::DEATH_SHAKE
            };
        }

        self.route_events();

        if let Some(status) = self.monitor.step_end(self.store.len()) {
            warn!(?status, summary = %self.monitor.summary(), "Simulation step slowing down");
        }
    }

    /// Forward simulation side effects to audio, particles and the UI
    fn route_events(&mut self) {
        let listener = self.camera;
        let local = self.player_id;
        for event in self.events.drain(..) {
            match event {
                SimEvent::Shot { at, shooter } => {
                    if Some(shooter) == local {
                        self.audio.play(SoundCue::Shoot { distance: 0.0 });
                    } else {
                        let distance = at.distance_to(listener);
                        if distance < combat::SHOT_AUDIBLE_RANGE {
                            self.audio.play(SoundCue::Shoot { distance });
                        }
                    }
                }
                SimEvent::Hit { at, color } => {
                    self.renderer.spawn_particles(at, color, 3);
                    self.audio.play(SoundCue::Hit {
                        distance: at.distance_to(listener),
                    });
                }
                SimEvent::Died {
                    kind,
                    at,
                    color,
                    radius,
                    ..
                } => {
                    self.renderer
                        .spawn_particles(at, color, radius.max(0.0).floor() as usize);
                    let scale = if kind.is_boss() {
                        boss::EXPLOSION_SCALE
                    } else {
                        radius / 25.0
                    };
                    self.audio.play(SoundCue::Explosion {
                        distance: at.distance_to(listener),
                        scale,
                    });
                }
                SimEvent::LevelUp { entity, level } => {
                    if Some(entity) != local {
                        continue;
                    }
                    debug!(level, "Local player levelled up");
                    self.audio.play(SoundCue::LevelUp);
                    let unlocked = self
                        .store
                        .get(entity)
                        .map(progression::unlocked_evolutions)
                        .unwrap_or_default();
                    if !unlocked.is_empty() {
                        self.ui.set_available_upgrades(unlocked);
                    }
                }
            }
        }
    }

    fn run_deferred(&mut self, now_ms: f64) {
        for task in self.scheduler.take_due(now_ms) {
            match task {
                Deferred::RespawnFood => {
                    spawning::spawn_food(&mut self.store, &mut self.rng);
                }
                Deferred::RespawnBot => {
                    spawning::spawn_bot(&mut self.store, &mut self.rng);
                }
                Deferred::ClearBossAlert => self.ui.set_boss_alert(false),
            }
        }
    }

    /// Enter the dead state once the local player is gone
    fn detect_game_over(&mut self) {
        if self.phase != MatchPhase::Alive {
            return;
        }
        let Some(player_id) = self.player_id else {
            return;
        };
        let gone = self.store.get(player_id).map_or(true, |p| p.is_dead());
        if !gone {
            return;
        }
        self.phase = MatchPhase::Dead;
        if !self.ui.is_dead() {
            self.ui.set_dead(true);
            self.audio.stop();
        }
        self.store.remove(player_id);
        info!(score = self.score(), "Local player died");
    }

    fn push_network(&mut self, now_ms: f64) {
        match &mut self.mode {
            SessionMode::Solo => {}
            SessionMode::Host(transport) => {
                if now_ms - self.last_net_ms > self.config.broadcast_interval_ms {
                    transport.broadcast(&ServerMessage::State(sync::build_snapshot(&self.store)));
                    self.last_net_ms = now_ms;
                }
            }
            SessionMode::Client(transport) => {
                if now_ms - self.last_net_ms > self.config.input_interval_ms {
                    transport.send_to_host(&ClientMessage::Input(self.input.clone()));
                    self.last_net_ms = now_ms;
                }
            }
        }
    }

    fn render(&mut self) {
        let target_id = match self.ui.spectating() {
            Some(id) if self.ui.is_dead() => Some(id),
            _ => self.player_id,
        };
        let target = target_id.and_then(|id| self.store.get(id));
        self.camera = self.renderer.update_camera(target, self.shake);

        let alpha = if matches!(self.mode, SessionMode::Client(_)) {
            0.5
        } else {
            (self.accumulator / self.config.step_ms) as f32
        };
        self.renderer
            .draw(&self.store, self.camera, alpha, self.player_id);
    }

    fn sync_hud(&mut self) {
        let Some(player) = self.player_id.and_then(|id| self.store.get(id)) else {
            return;
        };
        self.ui.update_hud(HudSnapshot {
            score: self.score.max(0.0) as u64,
            level: player.level,
            xp: player.xp,
            xp_needed: xp_to_next(player.level),
            stat_points: player.stat_points,
            upgrades: player.upgrades,
            class_index: player.class_index,
            health: player.health,
            max_health: player.max_health,
        });
    }

    /// Drop a vanished spectator target and auto-pick one while dead
    fn update_spectator(&mut self, now_ms: f64) {
        if !self.ui.is_dead() {
            return;
        }
        match self.ui.spectating() {
            Some(id) if !self.store.get(id).is_some_and(|e| e.is_alive()) => {
                self.ui.set_spectating(None);
            }
            Some(_) => {}
            None => {
                if now_ms - self.last_spectator_ms >= self.config.spectator_interval_ms {
                    self.cycle_spectator(1);
                    self.last_spectator_ms = now_ms;
                }
            }
        }
    }
}

fn seeded(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn handle_host_event(
    event: HostEvent,
    transport: &mut dyn HostTransport,
    peers: &mut Peers,
    store: &mut EntityStore,
    rng: &mut StdRng,
) {
    match event {
        HostEvent::PeerConnected(peer) => {
            let entity_id = spawning::spawn_player(store, rng);
            peers.entities.insert(peer, entity_id);
            transport.send_to(
                peer,
                &ServerMessage::Welcome {
                    peer_id: peer,
                    entity_id,
                },
            );
            info!(%peer, entity_id, "Peer joined");
        }
        HostEvent::PeerMessage { peer, message } => match message {
            ClientMessage::Input(input) => {
                if peers.entities.contains_key(&peer) {
                    peers.inputs.insert(peer, input);
                }
            }
            ClientMessage::Action(action) => {
                let Some(entity) = peers
                    .entities
                    .get(&peer)
                    .and_then(|&id| store.get_mut(id))
                else {
                    return;
                };
                let result = match action {
                    PeerAction::Upgrade { stat_index } => {
                        progression::apply_upgrade(entity, usize::from(stat_index))
                    }
                    PeerAction::ChangeClass { class_index } => {
                        progression::evolve(entity, usize::from(class_index))
                    }
                };
                if let Err(e) = result {
                    debug!(%peer, ?action, error = %e, "Peer action rejected");
                }
            }
            ClientMessage::Hello { .. } | ClientMessage::Goodbye => {}
        },
        HostEvent::PeerDisconnected(peer) => {
            peers.inputs.remove(&peer);
            if let Some(entity_id) = peers.entities.remove(&peer) {
                store.remove(entity_id);
            }
            info!(%peer, "Peer left");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::classes::classes;
    use crate::net::loopback::LoopbackHub;
    use crate::ports::{HeadlessRenderer, SharedUi, SilentAudio, Toggles};

    fn small_config() -> GameLoopConfig {
        GameLoopConfig {
            food_count: 30,
            bot_count: 3,
            seed: Some(7),
            ..Default::default()
        }
    }

    fn create_loop(config: GameLoopConfig) -> (GameLoop, SharedUi) {
        let ui = SharedUi::new(Toggles::default());
        let game = GameLoop::new(
            config,
            Box::new(HeadlessRenderer::new()),
            Box::new(SilentAudio),
            Box::new(ui.clone()),
        );
        (game, ui)
    }

    #[test]
    fn test_solo_start_and_stop() {
        let (mut game, _ui) = create_loop(small_config());
        assert!(game.stop().is_none());

        game.start("tester", SessionMode::Solo, 1000.0);
        assert_eq!(game.phase(), MatchPhase::Alive);
        let player = game.player_id().unwrap();
        assert!(game.store().contains(player));
        assert_eq!(game.store().count_kind(EntityKind::Enemy), 3);

        for i in 1..=30 {
            game.frame(1000.0 + f64::from(i) * 17.0);
        }
        assert!(game.store().iter().all(|e| e.position.is_finite()));

        let record = game.stop().unwrap();
        assert_eq!(record.nickname, "tester");
        assert_eq!(record.duration_ms, 510);
        assert!(!game.is_running());
        assert!(game.stop().is_none());
    }

    #[test]
    fn test_same_seed_same_match() {
        let run = || {
            let config = GameLoopConfig {
                seed: Some(42),
                bot_count: 5,
                ..small_config()
            };
            let (mut game, _ui) = create_loop(config);
            game.start("seeded", SessionMode::Solo, 0.0);
            for i in 1..=300 {
                game.frame(f64::from(i) * 17.0);
            }
            let bots: Vec<_> = game
                .store()
                .ids_sorted()
                .into_iter()
                .filter_map(|id| game.store().get(id))
                .filter(|e| e.kind == EntityKind::Enemy)
                .map(|e| (e.id, e.position.x, e.position.y, e.health))
                .collect();
            bots
        };

        let first = run();
        assert!(!first.is_empty());
        assert_eq!(first, run());
    }

    #[test]
    fn test_restart_clears_world() {
        let (mut game, _ui) = create_loop(small_config());
        game.start("a", SessionMode::Solo, 0.0);
        let first_player = game.player_id().unwrap();
        game.start("b", SessionMode::Solo, 0.0);
        assert!(!game.store().contains(first_player));
        assert_eq!(game.store().count_kind(EntityKind::Player), 1);
    }

    #[test]
    fn test_accumulator_runs_fixed_steps() {
        let (mut game, _ui) = create_loop(small_config());
        game.start("a", SessionMode::Solo, 0.0);
        game.frame(10.0);
        assert!((game.accumulator - 10.0).abs() < 1e-9);
        game.frame(40.0);
        // 40 ms = two steps plus remainder
        assert!((game.accumulator - (40.0 - 2.0 * timing::STEP_MS)).abs() < 1e-9);

        // A long stall is capped
        game.frame(10_000.0);
        assert!(game.accumulator < game.config.step_ms);
    }

    #[test]
    fn test_upgrade_without_points_is_noop() {
        let (mut game, _ui) = create_loop(small_config());
        game.start("a", SessionMode::Solo, 0.0);
        let id = game.player_id().unwrap();
        let before = game.store().get(id).unwrap().clone();
        game.upgrade_stat(3);
        let after = game.store().get(id).unwrap();
        assert_eq!(after.upgrades, before.upgrades);
        assert_eq!(after.stats, before.stats);

        game.store.get_mut(id).unwrap().stat_points = 1;
        game.upgrade_stat(3);
        assert_eq!(game.store().get(id).unwrap().upgrades[3], 1);
    }

    #[test]
    fn test_upgrade_class_validated() {
        let (mut game, ui) = create_loop(small_config());
        game.start("a", SessionMode::Solo, 0.0);
        let id = game.player_id().unwrap();
        let target = classes().base().evolves_to[0];

        game.upgrade_class(target);
        assert_eq!(game.store().get(id).unwrap().class_index, 0);

        let required = classes().get(target).unwrap().required_level();
        game.store.get_mut(id).unwrap().level = required;
        game.ui.set_available_upgrades(vec![target]);
        game.upgrade_class(target);
        assert_eq!(game.store().get(id).unwrap().class_index, target);
        assert!(ui.snapshot().available_upgrades.is_empty());

        // Not reachable from the new class
        game.upgrade_class(0);
        assert_eq!(game.store().get(id).unwrap().class_index, target);
    }

    #[test]
    fn test_game_over_and_spectating() {
        let (mut game, ui) = create_loop(small_config());
        game.start("a", SessionMode::Solo, 0.0);
        let id = game.player_id().unwrap();
        game.store.remove(id);

        game.frame(17.0);
        assert_eq!(game.phase(), MatchPhase::Dead);
        assert!(ui.snapshot().dead);

        game.frame(200.0);
        let watched = ui.snapshot().spectating.expect("auto-selected target");
        let candidates = game.store().ids_where(|e| e.is_alive() && e.kind.is_tank());
        assert_eq!(watched, candidates[0]);

        game.cycle_spectator(-1);
        assert_eq!(ui.snapshot().spectating, candidates.last().copied());
        game.cycle_spectator(1);
        assert_eq!(ui.snapshot().spectating, Some(candidates[0]));
    }

    #[test]
    fn test_boss_spawn_and_alert() {
        let config = GameLoopConfig {
            boss_interval_ms: 100.0,
            boss_alert_ms: 500.0,
            ..small_config()
        };
        let (mut game, ui) = create_loop(config);
        game.start("a", SessionMode::Solo, 0.0);
        game.frame(50.0);
        assert!(!game.store().boss_alive());

        game.frame(120.0);
        assert!(game.store().boss_alive());
        assert!(ui.snapshot().boss_alert);

        game.frame(700.0);
        assert!(!ui.snapshot().boss_alert);
    }

    #[test]
    fn test_toggles_pulled_each_frame() {
        let (mut game, ui) = create_loop(small_config());
        game.start("a", SessionMode::Solo, 0.0);
        ui.set_toggles(Toggles {
            auto_fire: true,
            auto_pilot: true,
            ..Default::default()
        });
        game.frame(17.0);
        assert!(game.input.auto_fire);
        assert!(game.input.auto_pilot);
        assert!(game.input.shoot);
    }

    #[test]
    fn test_hud_projection() {
        let (mut game, ui) = create_loop(small_config());
        game.start("a", SessionMode::Solo, 0.0);
        game.frame(150.0);
        let hud = ui.snapshot().hud;
        assert_eq!(hud.level, 1);
        assert_eq!(hud.xp_needed, 10.0);
        assert!(hud.max_health > 0.0);
    }

    #[test]
    fn test_loopback_host_and_client() {
        let hub = LoopbackHub::new();
        let host_transport = hub.host().unwrap();
        let code = host_transport.join_code().clone();

        let (mut host, _host_ui) = create_loop(small_config());
        host.start("host", SessionMode::Host(Box::new(host_transport)), 0.0);
        assert_eq!(host.join_code(), Some(&code));

        let client_transport = hub.join(code.as_str()).unwrap();
        let peer = client_transport.peer_id();
        let (mut client, _client_ui) = create_loop(small_config());
        client.start("guest", SessionMode::Client(Box::new(client_transport)), 0.0);
        assert!(client.store().is_empty());

        // Connect, then broadcast once the interval has passed
        host.frame(17.0);
        let guest_entity = host.peer_entity(peer).unwrap();
        assert_eq!(
            host.store().get(guest_entity).unwrap().kind,
            EntityKind::Player
        );
        host.frame(60.0);

        client.frame(61.0);
        assert_eq!(client.player_id(), Some(guest_entity));
        assert_eq!(client.store().ids_sorted(), host.store().ids_sorted());

        // Upgrade requests go through the host
        host.store.get_mut(guest_entity).unwrap().stat_points = 1;
        client.upgrade_stat(2);
        host.frame(70.0);
        assert_eq!(host.store().get(guest_entity).unwrap().upgrades[2], 1);

        // Leaving removes the peer's tank
        client.stop();
        host.frame(80.0);
        assert!(host.peer_entity(peer).is_none());
        assert!(!host.store().contains(guest_entity));
    }
}
