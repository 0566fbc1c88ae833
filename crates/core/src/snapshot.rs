//! Read-only view of a controller for renderers
//!
//! A snapshot is an owned copy; it never borrows the controller, so the renderer can hold it
//! while the simulation keeps ticking.

use crate::controller::{Controller, Notice, Phase};
use crate::types::{Cell, DebuffKind, ModifierKind, PowerUpKind, Rgb};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PieceView {
    pub cells: Vec<(i8, i8)>,
    pub color: Rgb,
    /// `None` for a remote piece known only by its matrix.
    pub symbol: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectView {
    pub kind: ModifierKind,
    /// Time left for timed effects.
    pub remaining_ms: Option<u64>,
    /// Pieces left for ghost mode.
    pub blocks_left: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSnapshot {
    pub width: u8,
    pub height: u8,
    /// Rows top to bottom.
    pub board: Vec<Vec<Cell>>,
    pub current: Option<PieceView>,
    /// Landing cells of the current piece.
    pub ghost: Option<Vec<(i8, i8)>>,
    /// Hidden while fogged.
    pub next: Option<&'static str>,
    pub held: Option<&'static str>,
    pub can_hold: bool,
    pub score: u32,
    pub level: u32,
    pub lines: u32,
    pub pending_garbage: u32,
    pub phase: Phase,
    pub paused: bool,
    pub powerup_block: bool,
    pub effects: Vec<EffectView>,
    /// Oldest first.
    pub inventory: Vec<ModifierKind>,
    /// Recent message for the player, if still showing.
    pub notice: Option<Notice>,
}

impl GameSnapshot {
    pub fn playable(&self) -> bool {
        !self.phase.is_topped_out() && !self.paused
    }

    pub fn has_effect(&self, kind: impl Into<ModifierKind>) -> bool {
        let kind = kind.into();
        self.effects.iter().any(|e| e.kind == kind)
    }
}

impl Controller {
    pub fn snapshot(&self) -> GameSnapshot {
        let current = match (self.current(), self.remote_piece()) {
            (Some(block), _) => Some(PieceView {
                cells: block.cells().to_vec(),
                color: block.color(),
                symbol: Some(block.symbol()),
            }),
            (None, Some(remote)) => Some(PieceView {
                cells: remote.cells(),
                color: remote.color,
                symbol: None,
            }),
            (None, None) => None,
        };

        let ghost = self.current().zip(self.ghost_y()).map(|(block, y)| {
            block
                .cells()
                .iter()
                .map(|&(x, cy)| (x, cy - block.y + y))
                .collect()
        });

        let modifiers = self.modifiers();
        let mut effects: Vec<EffectView> = modifiers
            .effects()
            .iter()
            .filter_map(|e| {
                modifiers.remaining_ms(e.kind).map(|ms| EffectView {
                    kind: e.kind,
                    remaining_ms: Some(ms),
                    blocks_left: None,
                })
            })
            .collect();
        if modifiers.ghost_blocks_remaining() > 0 {
            effects.push(EffectView {
                kind: PowerUpKind::GhostMode.into(),
                remaining_ms: None,
                blocks_left: Some(modifiers.ghost_blocks_remaining()),
            });
        }

        let fogged = self.is_modifier_active(DebuffKind::Fog);

        GameSnapshot {
            width: self.board().width(),
            height: self.board().height(),
            board: self.board().to_rows(),
            current,
            ghost,
            next: if fogged {
                None
            } else {
                self.next().map(|s| s.symbol)
            },
            held: self.held().map(|s| s.symbol),
            can_hold: self.can_hold(),
            score: self.score(),
            level: self.level(),
            lines: self.lines(),
            pending_garbage: self.pending_garbage(),
            phase: self.phase(),
            paused: self.paused(),
            powerup_block: self.is_powerup_block(),
            effects,
            inventory: modifiers.inventory().collect(),
            notice: self.notice(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::controller::Controller;
    use crate::rules::RuleConfig;
    use crate::types::{DebuffKind, GameMode, ModifierKind, PowerUpKind};

    #[test]
    fn test_snapshot_reflects_controller() {
        let mut ctl = Controller::new(GameMode::Classic, RuleConfig::default(), 11);
        ctl.start();
        let snap = ctl.snapshot();
        assert_eq!((snap.width, snap.height), (10, 20));
        assert_eq!(snap.board.len(), 20);
        assert!(snap.current.is_some());
        assert!(snap.next.is_some());
        assert!(snap.playable());
        let ghost = snap.ghost.unwrap();
        assert!(ghost.iter().any(|&(_, y)| y == 19));
    }

    #[test]
    fn test_fog_hides_next() {
        let mut ctl = Controller::new(GameMode::Battle, RuleConfig::default(), 3);
        ctl.start();
        ctl.apply_debuff(DebuffKind::Fog, 5000);
        let snap = ctl.snapshot();
        assert!(snap.next.is_none());
        assert!(snap.has_effect(DebuffKind::Fog));
        assert_eq!(snap.effects[0].remaining_ms, Some(5000));
    }

    #[test]
    fn test_ghost_mode_listed_with_blocks() {
        let mut ctl = Controller::new(GameMode::Casual, RuleConfig::default(), 3);
        ctl.start();
        ctl.modifiers_mut().activate_ghost(3);
        let snap = ctl.snapshot();
        let ghost = snap
            .effects
            .iter()
            .find(|e| e.kind == ModifierKind::PowerUp(PowerUpKind::GhostMode))
            .unwrap();
        assert_eq!(ghost.blocks_left, Some(3));
    }
}
