//! Modifier manager - inventory, activation and expiry
//!
//! Holds a bounded FIFO inventory of collected modifiers and the effects currently
//! active on one player. Timed effects carry an absolute expiry on the controller clock;
//! re-activating a running effect refreshes its expiry instead of stacking. Ghost mode
//! is a counter of pieces rather than a timer.

use std::collections::VecDeque;

use crate::types::{ModifierKind, PowerUpKind};

/// How a modifier takes effect when used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum Application {
    /// Applied to the board once.
    Instant,
    /// Active until an expiry time.
    Timed,
    /// Active for a number of piece locks.
    Counter,
}

impl Application {
    pub fn of(kind: ModifierKind) -> Self {
        match kind {
            ModifierKind::PowerUp(PowerUpKind::Bomb)
            | ModifierKind::PowerUp(PowerUpKind::Magnet)
            | ModifierKind::PowerUp(PowerUpKind::LineEraser) => Application::Instant,
            ModifierKind::PowerUp(PowerUpKind::GhostMode) => Application::Counter,
            ModifierKind::PowerUp(_) | ModifierKind::Debuff(_) => Application::Timed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("inventory full")]
pub struct InventoryFull;

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("inventory empty")]
pub struct InventoryEmpty;

/// A running timed effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveEffect {
    pub kind: ModifierKind,
    /// Controller clock (ms) at which the effect ends.
    pub expires_at_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ModifierManager {
    capacity: usize,
    inventory: VecDeque<ModifierKind>,
    active: Vec<ActiveEffect>,
    ghost_blocks: u8,
    now_ms: u64,
}

impl ModifierManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inventory: VecDeque::with_capacity(capacity),
            active: Vec::new(),
            ghost_blocks: 0,
            now_ms: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    pub fn inventory(&self) -> impl Iterator<Item = ModifierKind> + '_ {
        self.inventory.iter().copied()
    }

    pub fn inventory_len(&self) -> usize {
        self.inventory.len()
    }

    pub fn add(&mut self, kind: ModifierKind) -> Result<(), InventoryFull> {
        if self.inventory.len() >= self.capacity {
            return Err(InventoryFull);
        }
        self.inventory.push_back(kind);
        Ok(())
    }

    /// Remove and return the oldest entry.
    pub fn take_next(&mut self) -> Result<ModifierKind, InventoryEmpty> {
        self.inventory.pop_front().ok_or(InventoryEmpty)
    }

    /// Start or refresh a timed effect lasting `duration_ms` from `now_ms`.
    pub fn activate(&mut self, kind: ModifierKind, now_ms: u64, duration_ms: u32) {
        let expires_at_ms = now_ms + duration_ms as u64;
        match self.active.iter_mut().find(|e| e.kind == kind) {
            Some(effect) => effect.expires_at_ms = expires_at_ms,
            None => self.active.push(ActiveEffect {
                kind,
                expires_at_ms,
            }),
        }
    }

    /// Arm ghost mode for the next `blocks` locks.
    pub fn activate_ghost(&mut self, blocks: u8) {
        self.ghost_blocks = blocks;
    }

    /// Called once per lock.
    pub fn consume_ghost_block(&mut self) {
        self.ghost_blocks = self.ghost_blocks.saturating_sub(1);
    }

    pub fn ghost_blocks_remaining(&self) -> u8 {
        self.ghost_blocks
    }

    /// Drop effects that have expired by `now_ms`.
    pub fn update(&mut self, now_ms: u64) {
        self.now_ms = now_ms;
        self.active.retain(|e| e.expires_at_ms > now_ms);
    }

    pub fn is_active(&self, kind: ModifierKind) -> bool {
        if kind == ModifierKind::PowerUp(PowerUpKind::GhostMode) {
            return self.ghost_blocks > 0;
        }
        self.active
            .iter()
            .any(|e| e.kind == kind && e.expires_at_ms > self.now_ms)
    }

    /// Time left on a timed effect, as of the last update.
    pub fn remaining_ms(&self, kind: ModifierKind) -> Option<u64> {
        self.active
            .iter()
            .find(|e| e.kind == kind)
            .map(|e| e.expires_at_ms.saturating_sub(self.now_ms))
            .filter(|&ms| ms > 0)
    }

    pub fn effects(&self) -> &[ActiveEffect] {
        &self.active
    }

    pub fn clear(&mut self) {
        self.inventory.clear();
        self.active.clear();
        self.ghost_blocks = 0;
        self.now_ms = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DebuffKind;

    const FREEZE: ModifierKind = ModifierKind::PowerUp(PowerUpKind::TimeFreeze);
    const GHOST: ModifierKind = ModifierKind::PowerUp(PowerUpKind::GhostMode);
    const FOG: ModifierKind = ModifierKind::Debuff(DebuffKind::Fog);

    #[test]
    fn test_inventory_is_bounded_fifo() {
        let mut m = ModifierManager::new(2);
        assert_eq!(m.add(FREEZE), Ok(()));
        assert_eq!(m.add(GHOST), Ok(()));
        assert_eq!(m.add(FOG), Err(InventoryFull));
        assert_eq!(m.inventory_len(), 2);
        assert_eq!(m.take_next(), Ok(FREEZE));
        assert_eq!(m.take_next(), Ok(GHOST));
        assert_eq!(m.take_next(), Err(InventoryEmpty));
    }

    #[test]
    fn test_timed_effect_expires() {
        let mut m = ModifierManager::new(2);
        m.activate(FREEZE, 1_000, 5_000);
        m.update(5_999);
        assert!(m.is_active(FREEZE));
        assert_eq!(m.remaining_ms(FREEZE), Some(1));
        m.update(6_000);
        assert!(!m.is_active(FREEZE));
        assert!(m.effects().is_empty());
        assert_eq!(m.remaining_ms(FREEZE), None);
    }

    #[test]
    fn test_reactivation_refreshes_without_stacking() {
        let mut m = ModifierManager::new(2);
        m.activate(FOG, 0, 5_000);
        m.update(4_000);
        m.activate(FOG, 4_000, 5_000);
        assert_eq!(m.effects().len(), 1);
        assert_eq!(m.effects()[0].expires_at_ms, 9_000);
    }

    #[test]
    fn test_ghost_counter() {
        let mut m = ModifierManager::new(2);
        assert!(!m.is_active(GHOST));
        m.activate_ghost(3);
        for _ in 0..3 {
            assert!(m.is_active(GHOST));
            m.consume_ghost_block();
        }
        assert!(!m.is_active(GHOST));
        m.consume_ghost_block();
        assert_eq!(m.ghost_blocks_remaining(), 0);
    }

    #[test]
    fn test_application_kinds() {
        assert!(Application::of(ModifierKind::PowerUp(PowerUpKind::Bomb)).is_instant());
        assert!(Application::of(ModifierKind::PowerUp(PowerUpKind::Magnet)).is_instant());
        assert!(Application::of(GHOST).is_counter());
        assert!(Application::of(FREEZE).is_timed());
        assert!(Application::of(FOG).is_timed());
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut m = ModifierManager::new(2);
        m.add(FOG).unwrap();
        m.activate(FREEZE, 0, 100);
        m.activate_ghost(2);
        m.clear();
        assert_eq!(m.inventory_len(), 0);
        assert!(!m.is_active(FREEZE));
        assert!(!m.is_active(GHOST));
    }
}
