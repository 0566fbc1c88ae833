//! Terminal input module (engine-facing).
//!
//! This module is independent of any UI framework. It maps `crossterm` key events into
//! [`crate::types::GameAction`]s, for one player or for two sharing a keyboard, and
//! provides a [`RepeatGate`] that throttles terminal auto-repeat.

pub mod handler;
pub mod map;

pub use blockfall_types as types;

pub use handler::RepeatGate;
pub use map::{map_battle_key, map_solo_key, should_quit};
