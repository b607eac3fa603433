//! # LiveSocket Bus
//!
//! Default in-process implementation of the event bus seams.

pub mod channel_bus;

pub use channel_bus::ChannelBus;
