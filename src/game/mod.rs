pub mod classes;
pub mod constants;
pub mod entity;
pub mod events;
pub mod game_loop;
pub mod match_result;
pub mod performance;
pub mod schedule;
pub mod spatial;
pub mod state;
pub mod systems;
