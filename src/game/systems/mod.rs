pub mod ai;
pub mod autopilot;
pub mod collision;
pub mod controls;
pub mod physics;
pub mod progression;
pub mod spawning;
pub mod weapons;
