//! # LiveSocket Bridge
//!
//! Turns host commands into client calls.

pub mod command_bridge;

pub use command_bridge::{parse_room_id, CommandBridge};
