//! Key repeat gate for terminal environments.
//!
//! Terminals deliver auto-repeat as a stream of press events with no release. The gate
//! lets the first press of an action through and drops repeats that arrive sooner than
//! the action's interval, so a held hard-drop key does not fire a volley of drops.

use arrayvec::ArrayVec;

use crate::types::GameAction;

/// Repeat interval for movement and soft drop.
pub const DEFAULT_MOVE_REPEAT_MS: u64 = 50;

/// Repeat interval for everything else.
pub const DEFAULT_ACTION_REPEAT_MS: u64 = 150;

const TRACKED: usize = 16;

#[derive(Debug, Clone)]
pub struct RepeatGate {
    move_interval_ms: u64,
    action_interval_ms: u64,
    last: ArrayVec<(GameAction, u64), TRACKED>,
}

impl Default for RepeatGate {
    fn default() -> Self {
        Self::new()
    }
}

impl RepeatGate {
    pub fn new() -> Self {
        Self::with_config(DEFAULT_MOVE_REPEAT_MS, DEFAULT_ACTION_REPEAT_MS)
    }

    pub fn with_config(move_interval_ms: u64, action_interval_ms: u64) -> Self {
        Self {
            move_interval_ms,
            action_interval_ms,
            last: ArrayVec::new(),
        }
    }

    fn interval_for(&self, action: GameAction) -> u64 {
        match action {
            GameAction::MoveLeft | GameAction::MoveRight | GameAction::SoftDrop => {
                self.move_interval_ms
            }
            _ => self.action_interval_ms,
        }
    }

    /// Record a press at `now_ms` and decide whether it should reach the game.
    pub fn allow(&mut self, action: GameAction, now_ms: u64) -> bool {
        let interval = self.interval_for(action);
        match self.last.iter_mut().find(|(a, _)| *a == action) {
            Some((_, at)) => {
                if now_ms.saturating_sub(*at) < interval {
                    return false;
                }
                *at = now_ms;
                true
            }
            None => {
                if self.last.is_full() {
                    self.last.remove(0);
                }
                self.last.push((action, now_ms));
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last.clear();
    }
}
