//! Core simulation module - pure, deterministic, and testable
//!
//! This crate contains the rules of the falling-block game: boards, the piece catalog,
//! the per-player controller, modifiers, scoring, and the two battle coordinators.
//! It performs no I/O and never reads a clock: time enters only through `tick(dt)`.
//!
//! - **Deterministic**: a seed (or an explicit piece sequence) fixes every random choice
//! - **Headless**: the terminal front end and the network adapter are separate crates
//! - **Configurable**: every tuning value lives in [`RuleConfig`]
//!
//! # Module Structure
//!
//! - [`board`]: fixed-size grid with collision, line clearing, garbage and the power-up edits
//! - [`catalog`]: tetromino and pentomino shapes as per-rotation matrices
//! - [`piece`]: the active [`Block`] and its owned wire form
//! - [`rng`]: seeded and sequence-driven piece sources
//! - [`scoring`]: line and drop points, levels, fall speed and garbage
//! - [`rules`]: the tunable rule set and how it is loaded
//! - [`modifiers`]: power-up/debuff inventory and timed effects
//! - [`controller`]: one player's falling-piece state machine
//! - [`battle`]: local two-player matches and the networked variant
//! - [`snapshot`]: owned read-only views for renderers
//!
//! # Game Modes
//!
//! | Mode | Grid | Pieces | Extras |
//! |------|------|--------|--------|
//! | Casual | 10x20 | tetrominoes | power-up blocks, 0.8x score |
//! | Classic | 10x20 | tetrominoes | none |
//! | Crazy | 12x22 | pentominoes | power-up blocks, 2x score |
//! | Battle | 10x20 | tetrominoes | garbage, debuffs, 3 minute clock |
//!
//! # Example
//!
//! ```
//! use blockfall_core::{Controller, RuleConfig};
//! use blockfall_types::{GameAction, GameMode};
//!
//! let mut game = Controller::new(GameMode::Classic, RuleConfig::default(), 12345);
//! game.start();
//!
//! game.apply_action(GameAction::MoveRight);
//! game.apply_action(GameAction::RotateCw);
//! game.apply_action(GameAction::HardDrop);
//!
//! assert!(game.score() > 0); // Hard drop awards points
//! ```
//!
//! # Timing
//!
//! Call [`Controller::tick`] (or [`BattleCoordinator::tick`]) every frame with the elapsed
//! milliseconds. Gravity steps once per fall interval; a grounded piece locks after the
//! lock delay unless a successful move or rotation restarts it.

pub mod battle;
pub mod board;
pub mod catalog;
pub mod controller;
pub mod modifiers;
pub mod piece;
pub mod rng;
pub mod rules;
pub mod scoring;
pub mod snapshot;

pub use blockfall_types as types;

// Re-export commonly used types for convenience
pub use battle::{BattleCoordinator, EndReason, MatchResult, OnlineBattle, OutboundEvent, RemoteEvent};
pub use board::Board;
pub use catalog::ShapeDef;
pub use controller::{Controller, ControllerEvent, Notice, Phase, PlayerState, RemoteUpdate};
pub use modifiers::ModifierManager;
pub use piece::{Block, PieceState, PieceUpdate};
pub use rng::{generate_sequence, PieceSource};
pub use rules::{RuleConfig, RulesError};
pub use snapshot::{GameSnapshot, PieceView};
