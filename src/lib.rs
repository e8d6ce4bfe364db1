//! Tank Arena simulation core
//!
//! A real-time 2D tank arena: entity store and spatial hash, fixed-step physics,
//! behavior-tree bots and the player autopilot, and host/client snapshot sync.
//!
//! # Features
//!
//! - `tcp` - Tokio TCP transport for host/client sessions (enabled by default)

pub mod config;
pub mod game;
pub mod net;
pub mod ports;
pub mod util;
