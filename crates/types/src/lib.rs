//! Shared data types and tuning constants.
//!
//! Everything here is plain data with no external dependencies so it can be used by the
//! simulation core, the wire adapter, and the terminal front end alike.
//!
//! # Board Dimensions
//!
//! | Mode | Width | Height |
//! |------|-------|--------|
//! | Casual / Classic / Battle | 10 | 20 |
//! | Crazy (pentominoes) | 12 | 22 |
//!
//! Coordinates are `(x, y)` with `x` growing to the right and `y` growing downward.
//! Pieces spawn at `y = 0`; rows above the board (`y < 0`) are legal for a falling piece.
//!
//! # Timing Constants
//!
//! All durations are milliseconds and are driven by the caller through `tick(dt)`:
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `TICK_MS` | 16 | Frame step used by the terminal driver (~60 FPS) |
//! | `BASE_FALL_MS` | 1000 | Fall interval at level 1 |
//! | `FALL_SPEED_FACTOR` | 0.9 | Interval multiplier per level |
//! | `FALL_INTERVAL_MIN_MS` | 50 | Interval floor |
//! | `LOCK_DELAY_MS` | 500 | Grounded time before a piece locks |
//! | `TIME_FREEZE_MS` | 5000 | Time-freeze power-up duration |
//! | `GRAVITY_REVERSE_MS` | 8000 | Gravity-reverse power-up duration |
//! | `DEBUFF_MS` | 5000 | Default battle debuff duration |
//! | `BATTLE_DURATION_MS` | 180000 | Battle countdown |
//! | `NOTICE_MS` | 2000 | How long a user notice stays on screen |
//!
//! # Scoring
//!
//! Clearing `k` lines awards `LINE_SCORES[k] * level * mode multiplier`.
//! Soft drop earns `SOFT_DROP_SCORE` per row, hard drop `HARD_DROP_SCORE` per row.
//!
//! # Examples
//!
//! ```
//! use blockfall_types::{GameAction, GameMode, PowerUpKind};
//!
//! assert_eq!(GameAction::from_str("hardDrop"), Some(GameAction::HardDrop));
//! assert_eq!(GameMode::from_str("CRAZY"), Some(GameMode::Crazy));
//! assert_eq!(PowerUpKind::from_str("ghost_mode"), Some(PowerUpKind::GhostMode));
//! ```

/// Width of the classic board (casual, classic, battle).
pub const CLASSIC_WIDTH: u8 = 10;

/// Height of the classic board.
pub const CLASSIC_HEIGHT: u8 = 20;

/// Width of the pentomino board.
pub const CRAZY_WIDTH: u8 = 12;

/// Height of the pentomino board.
pub const CRAZY_HEIGHT: u8 = 22;

/// Largest number of cells any catalog piece occupies.
pub const MAX_PIECE_CELLS: usize = 5;

/// Row checked after every lock; an occupied cell here ends the game.
///
/// One row below the spawn row, which leaves a row of grace for the incoming piece.
pub const TOP_OUT_ROW: i8 = 1;

/// Frame step used by the terminal driver (16ms ≈ 60 FPS).
pub const TICK_MS: u32 = 16;

/// Fall interval at level 1.
pub const BASE_FALL_MS: u32 = 1000;

/// Fall interval multiplier applied once per level above 1.
pub const FALL_SPEED_FACTOR: f64 = 0.9;

/// Fall interval floor.
pub const FALL_INTERVAL_MIN_MS: u32 = 50;

/// Grounded time before a piece locks.
pub const LOCK_DELAY_MS: u32 = 500;

/// Cumulative lines per level.
pub const LINES_PER_LEVEL: u32 = 10;

/// Base line clear score indexed by lines cleared (0-4).
pub const LINE_SCORES: [u32; 5] = [0, 100, 300, 500, 800];

/// Score per row of manual soft drop.
pub const SOFT_DROP_SCORE: u32 = 1;

/// Score per row of hard drop.
pub const HARD_DROP_SCORE: u32 = 2;

/// Chance that a spawned piece carries a power-up.
pub const POWERUP_CHANCE: f64 = 0.20;

/// Chance that a spawn grants a battle debuff.
pub const DEBUFF_CHANCE: f64 = 0.15;

/// Modifier inventory slots.
pub const INVENTORY_CAPACITY: usize = 2;

/// Blocks covered by one ghost-mode activation.
pub const GHOST_BLOCKS: u8 = 3;

/// Time-freeze duration.
pub const TIME_FREEZE_MS: u32 = 5_000;

/// Gravity-reverse duration.
pub const GRAVITY_REVERSE_MS: u32 = 8_000;

/// Default battle debuff duration.
pub const DEBUFF_MS: u32 = 5_000;

/// Battle countdown.
pub const BATTLE_DURATION_MS: u32 = 180_000;

/// How long a user notice (inventory full, item used, ...) stays on screen.
pub const NOTICE_MS: u32 = 2_000;

/// Garbage rows sent to the opponent, indexed by lines cleared (0-4).
pub const GARBAGE_TABLE: [u32; 5] = [0, 0, 1, 2, 4];

/// Outbound state snapshot cadence in ticks.
pub const STATE_SYNC_EVERY: u32 = 3;

/// Rotation kick offsets, tried in order after a rotation.
pub const KICK_OFFSETS: [(i8, i8); 7] = [(0, 0), (-1, 0), (1, 0), (-2, 0), (2, 0), (0, -1), (0, -2)];

/// Color of injected garbage rows.
pub const GARBAGE_COLOR: Rgb = Rgb::new(180, 180, 190);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_scores_are_strictly_increasing() {
        for w in LINE_SCORES.windows(2) {
            assert!(w[0] < w[1]);
        }
        assert!(LINE_SCORES[4] > 4 * LINE_SCORES[1]);
    }

    #[test]
    fn garbage_table_jumps_at_four_lines() {
        assert_eq!(GARBAGE_TABLE[1], 0);
        assert!(GARBAGE_TABLE[4] - GARBAGE_TABLE[3] > GARBAGE_TABLE[3] - GARBAGE_TABLE[2]);
    }

    #[test]
    fn first_kick_is_in_place() {
        assert_eq!(KICK_OFFSETS[0], (0, 0));
    }
}

/// RGB color of an occupied cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<[u8; 3]> for Rgb {
    fn from(v: [u8; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// A board cell.
///
/// - `None`: empty
/// - `Some(Rgb)`: occupied, with the color of the piece (or garbage) that filled it
pub type Cell = Option<Rgb>;

/// Piece family used by a game mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceFamily {
    /// Seven 4-cell pieces.
    Tetromino,
    /// Eighteen 5-cell pieces.
    Pentomino,
}

/// Game modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameMode {
    /// Tetrominoes with power-ups, reduced score multiplier.
    Casual,
    /// Tetrominoes, no modifiers.
    Classic,
    /// Pentominoes on a larger board with power-ups and doubled score.
    Crazy,
    /// Two-player battle rules (garbage and debuffs).
    Battle,
}

impl GameMode {
    /// Parse mode name (case-insensitive).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "casual" => Some(GameMode::Casual),
            "classic" => Some(GameMode::Classic),
            "crazy" => Some(GameMode::Crazy),
            "battle" => Some(GameMode::Battle),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Casual => "casual",
            GameMode::Classic => "classic",
            GameMode::Crazy => "crazy",
            GameMode::Battle => "battle",
        }
    }

    /// Board dimensions `(width, height)`.
    pub fn grid(&self) -> (u8, u8) {
        match self {
            GameMode::Crazy => (CRAZY_WIDTH, CRAZY_HEIGHT),
            _ => (CLASSIC_WIDTH, CLASSIC_HEIGHT),
        }
    }

    pub fn family(&self) -> PieceFamily {
        match self {
            GameMode::Crazy => PieceFamily::Pentomino,
            _ => PieceFamily::Tetromino,
        }
    }

    /// Multiplier applied to line clear scores.
    pub fn score_multiplier(&self) -> f64 {
        match self {
            GameMode::Casual => 0.8,
            GameMode::Classic | GameMode::Battle => 1.0,
            GameMode::Crazy => 2.0,
        }
    }

    /// What a player can collect while playing this mode.
    pub fn rewards(&self) -> RewardKind {
        match self {
            GameMode::Casual | GameMode::Crazy => RewardKind::PowerUps,
            GameMode::Classic => RewardKind::None,
            GameMode::Battle => RewardKind::Debuffs,
        }
    }
}

/// Source of collectible modifiers for a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RewardKind {
    None,
    /// Power-up blocks award self-targeted power-ups on lock.
    PowerUps,
    /// Spawns may grant debuffs to throw at the opponent.
    Debuffs,
}

/// Self-targeted power-ups (single player).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerUpKind {
    /// Clear a 3x3 area around the messiest region.
    Bomb,
    /// Settle every column's blocks to the floor.
    Magnet,
    /// Stop gravity and lock delay for a while.
    TimeFreeze,
    /// Pieces drift upward for a while.
    GravityReverse,
    /// Clear the bottom two rows.
    LineEraser,
    /// The next few pieces may overlap placed blocks.
    GhostMode,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 6] = [
        PowerUpKind::Bomb,
        PowerUpKind::Magnet,
        PowerUpKind::TimeFreeze,
        PowerUpKind::GravityReverse,
        PowerUpKind::LineEraser,
        PowerUpKind::GhostMode,
    ];

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "bomb" => Some(PowerUpKind::Bomb),
            "magnet" => Some(PowerUpKind::Magnet),
            "time_freeze" => Some(PowerUpKind::TimeFreeze),
            "gravity_reverse" => Some(PowerUpKind::GravityReverse),
            "line_eraser" => Some(PowerUpKind::LineEraser),
            "ghost_mode" => Some(PowerUpKind::GhostMode),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PowerUpKind::Bomb => "bomb",
            PowerUpKind::Magnet => "magnet",
            PowerUpKind::TimeFreeze => "time_freeze",
            PowerUpKind::GravityReverse => "gravity_reverse",
            PowerUpKind::LineEraser => "line_eraser",
            PowerUpKind::GhostMode => "ghost_mode",
        }
    }
}

/// Opponent-targeted debuffs (battle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebuffKind {
    /// Halves the receiver's fall interval.
    SpeedUp,
    /// Inverts the receiver's horizontal input.
    Reverse,
    /// Display-only: blots part of the receiver's board.
    Ink,
    /// Display-only: hides the receiver's next piece.
    Fog,
    /// Display-only: shakes the receiver's board.
    Earthquake,
}

impl DebuffKind {
    pub const ALL: [DebuffKind; 5] = [
        DebuffKind::SpeedUp,
        DebuffKind::Reverse,
        DebuffKind::Ink,
        DebuffKind::Fog,
        DebuffKind::Earthquake,
    ];

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "speed_up" => Some(DebuffKind::SpeedUp),
            "reverse" => Some(DebuffKind::Reverse),
            "ink" => Some(DebuffKind::Ink),
            "fog" => Some(DebuffKind::Fog),
            "earthquake" => Some(DebuffKind::Earthquake),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DebuffKind::SpeedUp => "speed_up",
            DebuffKind::Reverse => "reverse",
            DebuffKind::Ink => "ink",
            DebuffKind::Fog => "fog",
            DebuffKind::Earthquake => "earthquake",
        }
    }
}

/// Any modifier that can sit in an inventory or be active on a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifierKind {
    PowerUp(PowerUpKind),
    Debuff(DebuffKind),
}

impl ModifierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModifierKind::PowerUp(p) => p.as_str(),
            ModifierKind::Debuff(d) => d.as_str(),
        }
    }
}

impl From<PowerUpKind> for ModifierKind {
    fn from(v: PowerUpKind) -> Self {
        ModifierKind::PowerUp(v)
    }
}

impl From<DebuffKind> for ModifierKind {
    fn from(v: DebuffKind) -> Self {
        ModifierKind::Debuff(v)
    }
}

/// Player intents delivered by an input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameAction {
    /// Move piece one cell left
    MoveLeft,
    /// Move piece one cell right
    MoveRight,
    /// Move piece one cell down (scores per row)
    SoftDrop,
    /// Drop to the lowest valid position and lock
    HardDrop,
    /// Rotate to the next rotation state
    RotateCw,
    /// Rotate to the previous rotation state
    RotateCcw,
    /// Hold the current piece (once per lock)
    Hold,
    /// Spend the oldest modifier in the inventory
    UseModifier,
    /// Toggle pause
    Pause,
    /// Restart the game
    Restart,
}

impl GameAction {
    /// Parse action from its camelCase name (case-insensitive).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "moveleft" => Some(GameAction::MoveLeft),
            "moveright" => Some(GameAction::MoveRight),
            "softdrop" => Some(GameAction::SoftDrop),
            "harddrop" => Some(GameAction::HardDrop),
            "rotatecw" => Some(GameAction::RotateCw),
            "rotateccw" => Some(GameAction::RotateCcw),
            "hold" => Some(GameAction::Hold),
            "usemodifier" => Some(GameAction::UseModifier),
            "pause" => Some(GameAction::Pause),
            "restart" => Some(GameAction::Restart),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameAction::MoveLeft => "moveLeft",
            GameAction::MoveRight => "moveRight",
            GameAction::SoftDrop => "softDrop",
            GameAction::HardDrop => "hardDrop",
            GameAction::RotateCw => "rotateCw",
            GameAction::RotateCcw => "rotateCcw",
            GameAction::Hold => "hold",
            GameAction::UseModifier => "useModifier",
            GameAction::Pause => "pause",
            GameAction::Restart => "restart",
        }
    }
}

/// One of the two players in a battle.
///
/// On the wire a side is its role number: 1 or 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    One,
    Two,
}

impl Side {
    pub fn opponent(&self) -> Self {
        match self {
            Side::One => Side::Two,
            Side::Two => Side::One,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Side::One => 0,
            Side::Two => 1,
        }
    }

    pub fn role(&self) -> u8 {
        match self {
            Side::One => 1,
            Side::Two => 2,
        }
    }

    pub fn from_role(role: u8) -> Option<Self> {
        match role {
            1 => Some(Side::One),
            2 => Some(Side::Two),
            _ => None,
        }
    }
}

/// Emitted by a controller every time a piece locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockEvent {
    pub lines_cleared: u32,
    pub line_clear_score: u32,
    /// Garbage rows injected into this board after the lock.
    pub garbage_applied: u32,
    pub topped_out: bool,
}
