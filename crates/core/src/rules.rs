//! Rule configuration
//!
//! Every tunable of the simulation lives in [`RuleConfig`]: timing, score tables, modifier
//! odds and durations, the garbage table and the kick list. Defaults come from
//! `blockfall_types`; a JSON file named by `BLOCKFALL_RULES` may override any subset of
//! fields.
//!
//! ```
//! use blockfall_core::RuleConfig;
//!
//! let rules = RuleConfig::from_json_str(r#"{ "lock_delay_ms": 300 }"#).unwrap();
//! assert_eq!(rules.lock_delay_ms, 300);
//! assert_eq!(rules.base_fall_ms, 1000);
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::types::{
    DebuffKind, PowerUpKind, BASE_FALL_MS, BATTLE_DURATION_MS, DEBUFF_CHANCE, DEBUFF_MS,
    FALL_INTERVAL_MIN_MS, FALL_SPEED_FACTOR, GARBAGE_TABLE, GHOST_BLOCKS, GRAVITY_REVERSE_MS,
    HARD_DROP_SCORE, INVENTORY_CAPACITY, KICK_OFFSETS, LINES_PER_LEVEL, LINE_SCORES,
    LOCK_DELAY_MS, POWERUP_CHANCE, SOFT_DROP_SCORE, STATE_SYNC_EVERY, TIME_FREEZE_MS,
};

/// Environment variable naming a JSON rules file.
pub const RULES_ENV: &str = "BLOCKFALL_RULES";

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum RulesError {
    #[display("failed to read rules file: {_0}")]
    Io(std::io::Error),
    #[display("malformed rules: {_0}")]
    Parse(serde_json::Error),
    #[display("invalid rules: {reason}")]
    Invalid { reason: &'static str },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleConfig {
    pub lock_delay_ms: u32,
    pub base_fall_ms: u32,
    pub fall_speed_factor: f64,
    pub min_fall_ms: u32,
    pub lines_per_level: u32,
    /// Base points indexed by lines cleared (0..=4).
    pub line_scores: [u32; 5],
    pub soft_drop_score: u32,
    pub hard_drop_score: u32,
    pub inventory_capacity: usize,
    pub powerup_chance: f64,
    pub debuff_chance: f64,
    pub ghost_blocks: u8,
    pub time_freeze_ms: u32,
    pub gravity_reverse_ms: u32,
    pub debuff_ms: u32,
    /// Garbage rows indexed by lines cleared; longer clears use the last entry.
    pub garbage_table: Vec<u32>,
    pub battle_duration_ms: u32,
    /// Outbound state snapshot every N ticks.
    pub state_sync_every: u32,
    /// Ordered offsets tried after a blocked rotation.
    pub kick_offsets: Vec<(i8, i8)>,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            lock_delay_ms: LOCK_DELAY_MS,
            base_fall_ms: BASE_FALL_MS,
            fall_speed_factor: FALL_SPEED_FACTOR,
            min_fall_ms: FALL_INTERVAL_MIN_MS,
            lines_per_level: LINES_PER_LEVEL,
            line_scores: LINE_SCORES,
            soft_drop_score: SOFT_DROP_SCORE,
            hard_drop_score: HARD_DROP_SCORE,
            inventory_capacity: INVENTORY_CAPACITY,
            powerup_chance: POWERUP_CHANCE,
            debuff_chance: DEBUFF_CHANCE,
            ghost_blocks: GHOST_BLOCKS,
            time_freeze_ms: TIME_FREEZE_MS,
            gravity_reverse_ms: GRAVITY_REVERSE_MS,
            debuff_ms: DEBUFF_MS,
            garbage_table: GARBAGE_TABLE.to_vec(),
            battle_duration_ms: BATTLE_DURATION_MS,
            state_sync_every: STATE_SYNC_EVERY,
            kick_offsets: KICK_OFFSETS.to_vec(),
        }
    }
}

impl RuleConfig {
    pub fn from_json_str(json: &str) -> Result<Self, RulesError> {
        let rules: Self = serde_json::from_str(json).map_err(RulesError::Parse)?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RulesError> {
        let text = std::fs::read_to_string(path).map_err(RulesError::Io)?;
        Self::from_json_str(&text)
    }

    /// Rules from the file named by `BLOCKFALL_RULES`, or defaults when unset.
    pub fn from_env() -> Result<Self, RulesError> {
        match std::env::var(RULES_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim()),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), RulesError> {
        let invalid = |reason| Err(RulesError::Invalid { reason });
        if self.line_scores[1..].windows(2).any(|w| w[0] >= w[1]) {
            return invalid("line_scores must be strictly increasing");
        }
        if self.lock_delay_ms == 0 {
            return invalid("lock_delay_ms must be positive");
        }
        if self.inventory_capacity == 0 {
            return invalid("inventory_capacity must be positive");
        }
        if self.base_fall_ms == 0 || self.min_fall_ms == 0 {
            return invalid("fall intervals must be positive");
        }
        if !(0.0..=1.0).contains(&self.powerup_chance) || !(0.0..=1.0).contains(&self.debuff_chance) {
            return invalid("chances must be within 0..=1");
        }
        if self.state_sync_every == 0 {
            return invalid("state_sync_every must be positive");
        }
        if self.kick_offsets.is_empty() {
            return invalid("kick_offsets must not be empty");
        }
        Ok(())
    }

    /// Duration of a timed power-up, `None` for instant and counter kinds.
    pub fn powerup_duration_ms(&self, kind: PowerUpKind) -> Option<u32> {
        match kind {
            PowerUpKind::TimeFreeze => Some(self.time_freeze_ms),
            PowerUpKind::GravityReverse => Some(self.gravity_reverse_ms),
            _ => None,
        }
    }

    pub fn debuff_duration_ms(&self, _kind: DebuffKind) -> u32 {
        self.debuff_ms
    }
}
