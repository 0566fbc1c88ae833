//! Terminal renderer for the puzzle.
//!
//! Snapshots from `core` are turned into styled text lines by [`view`], then flushed to
//! the terminal by [`TerminalRenderer`], which only rewrites the lines that changed.
//!
//! Goals:
//! - Keep `core` deterministic and testable
//! - Keep views pure so they can be asserted on as plain text
//! - Two columns per board cell to compensate for glyph aspect ratio

pub mod renderer;
pub mod view;

pub use blockfall_core as core;
pub use blockfall_types as types;

pub use renderer::{encode_diff_into, encode_full_into, TerminalRenderer};
pub use view::{format_clock, render_battle_lines, render_lines, Line, Span};
