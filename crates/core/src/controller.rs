//! Falling-piece controller - the per-player simulation
//!
//! Owns one board, the current/next/held pieces, the fall and lock-delay accumulators,
//! score/level/lines, pending garbage and the player's modifiers. The caller drives it
//! with [`Controller::tick`] and [`Controller::apply_action`]; nothing here schedules
//! itself or performs I/O.
//!
//! Side effects that another party must react to (locks, debuffs thrown at the opponent,
//! top-out, user notices) are queued and drained with [`Controller::take_events`].
//!
//! A controller is either driven locally or, for the opponent in an online match, is a
//! display-only mirror updated wholesale from inbound snapshots.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::board::Board;
use crate::catalog::ShapeDef;
use crate::modifiers::{InventoryEmpty, InventoryFull, ModifierManager};
use crate::piece::{Block, PieceState, PieceUpdate};
use crate::rng::PieceSource;
use crate::rules::RuleConfig;
use crate::scoring::{drop_score, fall_interval_ms, level_for_lines, line_clear_score};
use crate::types::{
    Cell, DebuffKind, GameAction, GameMode, LockEvent, ModifierKind, PowerUpKind, RewardKind,
    NOTICE_MS, TOP_OUT_ROW,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum Phase {
    /// Not started yet.
    Ready,
    Falling,
    /// The last downward step failed; the lock timer runs.
    OnGround,
    /// Terminal.
    ToppedOut,
}

/// Who writes this controller's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum Authority {
    Local,
    /// Mirror of a remote player; only snapshots mutate it.
    Remote,
}

/// User-visible messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    InventoryFull,
    InventoryEmpty,
    PowerUpAwarded(PowerUpKind),
    DebuffGranted(DebuffKind),
    ModifierUsed(ModifierKind),
    DebuffReceived(DebuffKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerEvent {
    Locked(LockEvent),
    /// A debuff spent from the inventory, to be applied to the opponent.
    DebuffSent { kind: DebuffKind, duration_ms: u32 },
    ToppedOut,
    Notice(Notice),
}

/// Inbound opponent state; absent fields keep their previous values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteUpdate {
    /// Rows top to bottom.
    pub grid: Option<Vec<Vec<Cell>>>,
    pub score: Option<u32>,
    pub lines: Option<u32>,
    pub piece: Option<PieceUpdate>,
}

/// Outbound state of a local player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub grid: Vec<Vec<Cell>>,
    pub score: u32,
    pub lines: u32,
    pub piece: Option<PieceState>,
}

#[derive(Debug, Clone)]
pub struct Controller {
    mode: GameMode,
    rules: RuleConfig,
    board: Board,
    current: Option<Block>,
    next: Option<&'static ShapeDef>,
    held: Option<&'static ShapeDef>,
    source: PieceSource,
    rng: Pcg32,
    phase: Phase,
    authority: Authority,
    fall_acc_ms: u32,
    lock_acc_ms: u32,
    can_hold: bool,
    score: u32,
    level: u32,
    lines: u32,
    pending_garbage: u32,
    /// Milliseconds of unpaused simulation; the timebase of modifier expiry.
    clock_ms: u64,
    modifiers: ModifierManager,
    powerup_block: bool,
    paused: bool,
    remote_piece: Option<PieceState>,
    /// Latest notice and the clock time it stops showing.
    notice: Option<(Notice, u64)>,
    events: Vec<ControllerEvent>,
}

impl Controller {
    /// Locally driven controller with random pieces from the mode's family.
    pub fn new(mode: GameMode, rules: RuleConfig, seed: u64) -> Self {
        let source = PieceSource::random(mode.family(), seed);
        Self::with_source(mode, rules, source, seed)
    }

    /// Locally driven controller with an explicit piece source.
    pub fn with_source(mode: GameMode, rules: RuleConfig, source: PieceSource, seed: u64) -> Self {
        let capacity = rules.inventory_capacity;
        Self {
            mode,
            board: Board::for_mode(mode),
            current: None,
            next: None,
            held: None,
            source,
            rng: Pcg32::seed_from_u64(seed ^ 0x9e37_79b9_7f4a_7c15),
            phase: Phase::Ready,
            authority: Authority::Local,
            fall_acc_ms: 0,
            lock_acc_ms: 0,
            can_hold: true,
            score: 0,
            level: 1,
            lines: 0,
            pending_garbage: 0,
            clock_ms: 0,
            modifiers: ModifierManager::new(capacity),
            powerup_block: false,
            paused: false,
            remote_piece: None,
            notice: None,
            events: Vec::new(),
            rules,
        }
    }

    /// Display-only mirror of a remote player.
    pub fn remote(mode: GameMode, rules: RuleConfig) -> Self {
        let mut ctl = Self::new(mode, rules, 0);
        ctl.authority = Authority::Remote;
        ctl.phase = Phase::Falling;
        ctl
    }

    /// Draw the first pieces. Does nothing once started.
    pub fn start(&mut self) {
        if !self.phase.is_ready() || self.authority.is_remote() {
            return;
        }
        self.next = Some(self.source.next_shape());
        self.spawn();
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn rules(&self) -> &RuleConfig {
        &self.rules
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn current(&self) -> Option<&Block> {
        self.current.as_ref()
    }

    pub fn next(&self) -> Option<&'static ShapeDef> {
        self.next
    }

    pub fn held(&self) -> Option<&'static ShapeDef> {
        self.held
    }

    pub fn can_hold(&self) -> bool {
        self.can_hold
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn lines(&self) -> u32 {
        self.lines
    }

    pub fn pending_garbage(&self) -> u32 {
        self.pending_garbage
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn authority(&self) -> Authority {
        self.authority
    }

    pub fn is_topped_out(&self) -> bool {
        self.phase.is_topped_out()
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    pub fn lock_elapsed_ms(&self) -> u32 {
        self.lock_acc_ms
    }

    pub fn is_powerup_block(&self) -> bool {
        self.powerup_block
    }

    pub fn modifiers(&self) -> &ModifierManager {
        &self.modifiers
    }

    pub fn modifiers_mut(&mut self) -> &mut ModifierManager {
        &mut self.modifiers
    }

    pub fn remote_piece(&self) -> Option<&PieceState> {
        self.remote_piece.as_ref()
    }

    /// Notice to show the player, until [`NOTICE_MS`] of play has passed.
    pub fn notice(&self) -> Option<Notice> {
        self.notice
            .filter(|&(_, until)| self.clock_ms < until)
            .map(|(notice, _)| notice)
    }

    fn notify(&mut self, notice: Notice) {
        self.notice = Some((notice, self.clock_ms + NOTICE_MS as u64));
        self.events.push(ControllerEvent::Notice(notice));
    }

    pub fn is_modifier_active(&self, kind: impl Into<ModifierKind>) -> bool {
        self.modifiers.is_active(kind.into())
    }

    /// Current automatic fall interval.
    pub fn fall_interval_ms(&self) -> u32 {
        let speed_up = self.is_modifier_active(DebuffKind::SpeedUp);
        fall_interval_ms(&self.rules, self.level, speed_up)
    }

    /// Drain queued events.
    pub fn take_events(&mut self) -> Vec<ControllerEvent> {
        std::mem::take(&mut self.events)
    }

    fn ghost_active(&self) -> bool {
        self.is_modifier_active(PowerUpKind::GhostMode)
    }

    fn fits(&self, block: &Block) -> bool {
        self.board.fits(&block.cells(), self.ghost_active())
    }

    fn can_fall(&self, block: &Block) -> bool {
        self.fits(&block.moved(0, 1))
    }

    fn is_live(&self) -> bool {
        self.authority.is_local() && matches!(self.phase, Phase::Falling | Phase::OnGround)
    }

    /// Promote next to current and draw a fresh next.
    fn spawn(&mut self) -> bool {
        let shape = match self.next.take() {
            Some(shape) => shape,
            None => self.source.next_shape(),
        };
        self.next = Some(self.source.next_shape());
        self.fall_acc_ms = 0;
        self.lock_acc_ms = 0;
        self.can_hold = true;
        self.roll_spawn_rewards();

        let block = Block::spawn(shape, self.board.width());
        self.current = Some(block);
        if !self.fits(&block) {
            self.top_out();
            return false;
        }
        self.phase = Phase::Falling;
        true
    }

    fn roll_spawn_rewards(&mut self) {
        match self.mode.rewards() {
            RewardKind::PowerUps => {
                self.powerup_block = self.rng.random::<f64>() < self.rules.powerup_chance;
            }
            RewardKind::Debuffs => {
                if self.rng.random::<f64>() < self.rules.debuff_chance {
                    let kind = DebuffKind::ALL[self.rng.random_range(0..DebuffKind::ALL.len())];
                    if self.modifiers.add(kind.into()).is_ok() {
                        self.notify(Notice::DebuffGranted(kind));
                    }
                }
            }
            RewardKind::None => {}
        }
    }

    fn top_out(&mut self) {
        self.phase = Phase::ToppedOut;
        self.events.push(ControllerEvent::ToppedOut);
    }

    /// After a successful move: restart lock delay and re-check the ground.
    fn settle(&mut self) {
        self.lock_acc_ms = 0;
        if let Some(block) = self.current {
            self.phase = if self.can_fall(&block) {
                Phase::Falling
            } else {
                Phase::OnGround
            };
        }
    }

    pub(crate) fn try_shift(&mut self, dx: i8, dy: i8) -> bool {
        let Some(block) = self.current else {
            return false;
        };
        let candidate = block.moved(dx, dy);
        if !self.fits(&candidate) {
            return false;
        }
        self.current = Some(candidate);
        self.settle();
        true
    }

    pub(crate) fn try_rotate(&mut self, clockwise: bool) -> bool {
        let Some(block) = self.current else {
            return false;
        };
        let mut rotated = block;
        if clockwise {
            rotated.rotate_clockwise();
        } else {
            rotated.rotate_counterclockwise();
        }
        let kicked = self
            .rules
            .kick_offsets
            .iter()
            .map(|&(kx, ky)| rotated.moved(kx, ky))
            .find(|candidate| self.fits(candidate));
        match kicked {
            Some(candidate) => {
                self.current = Some(candidate);
                self.settle();
                true
            }
            None => false,
        }
    }

    /// One manual step down. A blocked step grounds the piece but does not lock it.
    pub(crate) fn soft_drop(&mut self) -> bool {
        if self.try_shift(0, 1) {
            self.score += drop_score(&self.rules, 1, false);
            true
        } else {
            self.phase = Phase::OnGround;
            false
        }
    }

    /// Drop to the lowest valid row and lock. Returns rows dropped.
    pub(crate) fn hard_drop(&mut self) -> u32 {
        let Some(block) = self.current else {
            return 0;
        };
        let distance = self.board.drop_distance(&block, self.ghost_active());
        self.current = Some(block.moved(0, distance));
        let rows = distance.max(0) as u32;
        self.score += drop_score(&self.rules, rows, true);
        self.lock();
        rows
    }

    /// Stash the current piece; available once per lock.
    pub fn hold(&mut self) -> bool {
        if !self.can_hold || !self.is_live() {
            return false;
        }
        let Some(block) = self.current else {
            return false;
        };

        match self.held.replace(block.shape()) {
            Some(shape) => {
                let swapped = Block::spawn(shape, self.board.width());
                self.current = Some(swapped);
                self.fall_acc_ms = 0;
                self.lock_acc_ms = 0;
                if !self.fits(&swapped) {
                    self.top_out();
                    return true;
                }
                self.settle();
            }
            None => {
                self.spawn();
            }
        }
        self.can_hold = false;
        true
    }

    /// Lock the current piece and resolve everything that follows.
    pub fn lock(&mut self) {
        let Some(block) = self.current.take() else {
            return;
        };
        self.board.place(&block);

        if std::mem::take(&mut self.powerup_block) {
            let kind = PowerUpKind::ALL[self.rng.random_range(0..PowerUpKind::ALL.len())];
            let notice = match self.modifiers.add(kind.into()) {
                Ok(()) => Notice::PowerUpAwarded(kind),
                Err(InventoryFull) => Notice::InventoryFull,
            };
            self.notify(notice);
        }
        self.modifiers.consume_ghost_block();

        let lines_cleared = self.board.clear_full_lines();
        let line_clear_score = self.award_lines(lines_cleared);

        let garbage_applied = std::mem::take(&mut self.pending_garbage);
        self.board.add_garbage(garbage_applied, &mut self.rng);

        let topped_out = self.board.is_topped_out(TOP_OUT_ROW);
        self.events.push(ControllerEvent::Locked(LockEvent {
            lines_cleared,
            line_clear_score,
            garbage_applied,
            topped_out,
        }));

        if topped_out {
            self.top_out();
        } else {
            self.spawn();
        }
    }

    fn award_lines(&mut self, lines_cleared: u32) -> u32 {
        if lines_cleared == 0 {
            return 0;
        }
        let points = line_clear_score(
            &self.rules,
            lines_cleared,
            self.level,
            self.mode.score_multiplier(),
        );
        self.score += points;
        self.lines += lines_cleared;
        self.level = self.level.max(level_for_lines(&self.rules, self.lines));
        points
    }

    /// Spend the oldest inventory entry.
    pub fn use_modifier(&mut self) -> bool {
        if !self.is_live() {
            return false;
        }
        let kind = match self.modifiers.take_next() {
            Ok(kind) => kind,
            Err(InventoryEmpty) => {
                self.notify(Notice::InventoryEmpty);
                return false;
            }
        };
        match kind {
            ModifierKind::PowerUp(powerup) => self.apply_powerup(powerup),
            ModifierKind::Debuff(debuff) => {
                let duration_ms = self.rules.debuff_duration_ms(debuff);
                self.events.push(ControllerEvent::DebuffSent {
                    kind: debuff,
                    duration_ms,
                });
            }
        }
        self.notify(Notice::ModifierUsed(kind));
        true
    }

    fn apply_powerup(&mut self, kind: PowerUpKind) {
        match kind {
            PowerUpKind::Bomb => {
                if let Some(region) = self.board.find_densest_mixed_region(1) {
                    self.board.clear_area(region.x, region.y, 1);
                }
            }
            PowerUpKind::Magnet => {
                self.board.compress_columns();
                let lines_cleared = self.board.clear_full_lines();
                self.award_lines(lines_cleared);
            }
            PowerUpKind::LineEraser => {
                self.board.clear_bottom_rows(2);
            }
            PowerUpKind::TimeFreeze | PowerUpKind::GravityReverse => {
                let duration = self.rules.powerup_duration_ms(kind).unwrap_or(0);
                self.modifiers.activate(kind.into(), self.clock_ms, duration);
            }
            PowerUpKind::GhostMode => {
                self.modifiers.activate_ghost(self.rules.ghost_blocks);
            }
        }
        if let Some(block) = self.current {
            self.phase = if self.can_fall(&block) {
                Phase::Falling
            } else {
                Phase::OnGround
            };
        }
    }

    /// Debuff thrown by the opponent.
    pub fn apply_debuff(&mut self, kind: DebuffKind, duration_ms: u32) {
        if self.authority.is_remote() || self.is_topped_out() {
            return;
        }
        self.modifiers.activate(kind.into(), self.clock_ms, duration_ms);
        self.notify(Notice::DebuffReceived(kind));
    }

    /// Garbage owed by the opponent; injected on this player's next lock.
    pub fn add_pending_garbage(&mut self, rows: u32) {
        self.pending_garbage = self.pending_garbage.saturating_add(rows);
    }

    /// Advance the simulation by `elapsed_ms`. Returns true if the piece moved or locked.
    pub fn tick(&mut self, elapsed_ms: u32) -> bool {
        if self.paused || !self.is_live() {
            return false;
        }
        self.clock_ms += elapsed_ms as u64;
        self.modifiers.update(self.clock_ms);

        if self.is_modifier_active(PowerUpKind::TimeFreeze) {
            return false;
        }
        let reversed = self.is_modifier_active(PowerUpKind::GravityReverse);
        let mut changed = false;

        self.fall_acc_ms += elapsed_ms;
        if self.fall_acc_ms >= self.fall_interval_ms() {
            self.fall_acc_ms = 0;
            if reversed {
                changed = self.drift_up();
            } else if self.try_shift(0, 1) {
                changed = true;
            } else {
                self.phase = Phase::OnGround;
            }
        }

        if self.phase.is_on_ground() && !reversed {
            self.lock_acc_ms += elapsed_ms;
            if self.lock_acc_ms >= self.rules.lock_delay_ms {
                self.lock();
                changed = true;
            }
        }
        changed
    }

    /// Reverse-gravity step: up while the piece stays on the board and clear of the stack.
    fn drift_up(&mut self) -> bool {
        let Some(block) = self.current else {
            return false;
        };
        if block.top() <= 0 {
            return false;
        }
        self.try_shift(0, -1)
    }

    /// Apply a player intent. Returns true if anything changed.
    pub fn apply_action(&mut self, action: GameAction) -> bool {
        if self.authority.is_remote() {
            return false;
        }
        match action {
            GameAction::Pause => {
                if self.phase.is_topped_out() {
                    return false;
                }
                self.paused = !self.paused;
                return true;
            }
            GameAction::Restart => {
                self.restart();
                return true;
            }
            _ => {}
        }
        if self.paused || !self.is_live() {
            return false;
        }

        let dx = if self.is_modifier_active(DebuffKind::Reverse) {
            -1
        } else {
            1
        };
        match action {
            GameAction::MoveLeft => self.try_shift(-dx, 0),
            GameAction::MoveRight => self.try_shift(dx, 0),
            GameAction::SoftDrop => self.soft_drop(),
            GameAction::HardDrop => {
                self.hard_drop();
                true
            }
            GameAction::RotateCw => self.try_rotate(true),
            GameAction::RotateCcw => self.try_rotate(false),
            GameAction::Hold => self.hold(),
            GameAction::UseModifier => self.use_modifier(),
            GameAction::Pause | GameAction::Restart => false,
        }
    }

    /// Fresh game with the same mode and rules.
    pub fn restart(&mut self) {
        let seed = self.rng.random::<u64>();
        *self = Self::new(self.mode, self.rules.clone(), seed);
        self.start();
    }

    /// State published to the opponent.
    pub fn player_state(&self) -> PlayerState {
        PlayerState {
            grid: self.board.to_rows(),
            score: self.score,
            lines: self.lines,
            piece: self.current.as_ref().map(PieceState::from),
        }
    }

    /// Overwrite mirror state from an opponent snapshot.
    ///
    /// Only meaningful for [`Authority::Remote`]. A grid whose dimensions do not match the
    /// board is ignored and the previous grid kept.
    pub fn apply_remote_update(&mut self, update: RemoteUpdate) {
        if self.authority.is_local() {
            return;
        }
        if let Some(grid) = update.grid {
            let width = self.board.width() as usize;
            let height = self.board.height();
            if grid.len() == height as usize && grid.iter().all(|row| row.len() == width) {
                let cells = grid.into_iter().flatten().collect();
                if let Some(board) = Board::from_cells(self.board.width(), height, cells) {
                    self.board = board;
                }
            } else {
                tracing::debug!(rows = grid.len(), "Ignored opponent grid with wrong dimensions");
            }
        }
        if let Some(score) = update.score {
            self.score = score;
        }
        if let Some(lines) = update.lines {
            self.lines = lines;
            self.level = level_for_lines(&self.rules, lines);
        }
        if let Some(piece) = update.piece {
            match piece.merge(self.remote_piece.as_ref()) {
                Some(merged) if merged.fits_board(self.board.width(), self.board.height()) => {
                    self.remote_piece = Some(merged);
                }
                Some(merged) => {
                    tracing::debug!(x = merged.x, y = merged.y, "Ignored opponent piece off the board");
                }
                None => {}
            }
        }
    }

    /// Mark the mirror as topped out (the opponent reported game over).
    pub fn mark_topped_out(&mut self) {
        if !self.phase.is_topped_out() {
            self.phase = Phase::ToppedOut;
        }
    }

    /// Landing row of the current piece.
    pub fn ghost_y(&self) -> Option<i8> {
        let block = self.current?;
        Some(block.y + self.board.drop_distance(&block, self.ghost_active()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::lookup;
    use crate::types::{PieceFamily, Rgb};

    fn sequence(symbols: &[&str]) -> Controller {
        let source = PieceSource::with_sequence(PieceFamily::Tetromino, symbols, 1).unwrap();
        let mut ctl = Controller::with_source(GameMode::Classic, RuleConfig::default(), source, 1);
        ctl.start();
        ctl
    }

    fn fill_row(ctl: &mut Controller, y: i8, gap: Option<i8>) {
        for x in 0..ctl.board().width() as i8 {
            if Some(x) != gap {
                ctl.board_mut().set(x, y, Some(Rgb::new(1, 1, 1)));
            }
        }
    }

    #[test]
    fn test_start_spawns_centered() {
        let ctl = sequence(&["T", "O"]);
        let cur = ctl.current().unwrap();
        assert_eq!(cur.symbol(), "T");
        assert_eq!((cur.x, cur.y, cur.rotation()), (3, 0, 0));
        assert_eq!(ctl.next().unwrap().symbol, "O");
        assert_eq!(ctl.phase(), Phase::Falling);
        assert_eq!(ctl.level(), 1);
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut ctl = sequence(&["T", "O", "I"]);
        ctl.start();
        assert_eq!(ctl.current().unwrap().symbol(), "T");
    }

    #[test]
    fn test_crazy_five_line_clear_scores() {
        let source = PieceSource::with_sequence(PieceFamily::Pentomino, &["I", "I"], 1).unwrap();
        let mut ctl = Controller::with_source(GameMode::Crazy, RuleConfig::default(), source, 1);
        ctl.start();
        let mut block = ctl.current.unwrap();
        block.rotate_clockwise();
        ctl.current = Some(block);
        let gap = block.x;
        for y in 17..22 {
            fill_row(&mut ctl, y, Some(gap));
        }

        assert!(ctl.apply_action(GameAction::HardDrop));
        assert_eq!(ctl.lines(), 5);
        assert_eq!(ctl.board().filled_count(), 0);
        // 17 rows of hard drop, then the top table entry at level 1 and the 2x crazy multiplier.
        assert_eq!(ctl.score(), 17 * 2 + 800 * 2);
    }

    #[test]
    fn test_gravity_steps_at_interval() {
        let mut ctl = sequence(&["T"]);
        assert!(!ctl.tick(999));
        assert_eq!(ctl.current().unwrap().y, 0);
        assert!(ctl.tick(1));
        assert_eq!(ctl.current().unwrap().y, 1);
    }

    #[test]
    fn test_lock_delay_after_landing() {
        let mut ctl = sequence(&["O", "T"]);
        ctl.current = Some(ctl.current.unwrap().moved(0, 18));
        assert!(!ctl.soft_drop());
        assert_eq!(ctl.phase(), Phase::OnGround);
        let lock_delay = ctl.rules().lock_delay_ms;
        assert!(!ctl.tick(lock_delay - 1));
        assert!(ctl.tick(1));
        assert_eq!(ctl.board().filled_count(), 4);
        assert_eq!(ctl.current().unwrap().symbol(), "T");
    }

    #[test]
    fn test_move_on_ground_resets_lock_timer() {
        let mut ctl = sequence(&["O", "T"]);
        ctl.current = Some(ctl.current.unwrap().moved(0, 18));
        ctl.soft_drop();
        ctl.tick(300);
        assert_eq!(ctl.lock_elapsed_ms(), 300);
        assert!(ctl.apply_action(GameAction::MoveLeft));
        assert_eq!(ctl.lock_elapsed_ms(), 0);
        assert_eq!(ctl.phase(), Phase::OnGround);
    }

    #[test]
    fn test_move_off_ledge_clears_ground() {
        let mut ctl = sequence(&["O", "T"]);
        // Ledge under the O at columns 4..=5, open floor to the right.
        ctl.board_mut().set(4, 10, Some(Rgb::new(1, 1, 1)));
        ctl.board_mut().set(5, 10, Some(Rgb::new(1, 1, 1)));
        ctl.current = Some(ctl.current.unwrap().moved(0, 8));
        assert!(!ctl.soft_drop());
        assert_eq!(ctl.phase(), Phase::OnGround);
        ctl.apply_action(GameAction::MoveRight);
        ctl.apply_action(GameAction::MoveRight);
        assert_eq!(ctl.phase(), Phase::Falling);
    }

    #[test]
    fn test_walls_reject_moves() {
        let mut ctl = sequence(&["O"]);
        for _ in 0..4 {
            assert!(ctl.apply_action(GameAction::MoveLeft));
        }
        assert!(!ctl.apply_action(GameAction::MoveLeft));
        assert_eq!(ctl.current().unwrap().x, 0);
    }

    #[test]
    fn test_hard_drop_lands_on_floor_and_scores() {
        let mut ctl = sequence(&["I", "O"]);
        let before = *ctl.current().unwrap();
        let landing = ctl.ghost_y().unwrap();
        let rows = ctl.hard_drop();
        assert_eq!(rows as i8, landing - before.y);
        assert_eq!(ctl.score(), rows * 2);
        assert!(!ctl.board().is_row_full(19));
        assert_eq!(ctl.board().filled_count(), 4);
        assert!(ctl.board().is_occupied(3, 19));
        assert_eq!(ctl.current().unwrap().symbol(), "O");
    }

    #[test]
    fn test_soft_drop_scores_one_per_row() {
        let mut ctl = sequence(&["T"]);
        assert!(ctl.apply_action(GameAction::SoftDrop));
        assert!(ctl.apply_action(GameAction::SoftDrop));
        assert_eq!(ctl.score(), 2);
        assert_eq!(ctl.current().unwrap().y, 2);
    }

    #[test]
    fn test_rotation_kicks_off_wall() {
        let mut ctl = sequence(&["I"]);
        ctl.apply_action(GameAction::RotateCw);
        for _ in 0..5 {
            ctl.apply_action(GameAction::MoveRight);
        }
        let vertical = *ctl.current().unwrap();
        assert_eq!(vertical.cells()[0].0, 9);
        // Horizontal I would poke past the right wall; a kick pulls it back in.
        assert!(ctl.apply_action(GameAction::RotateCw));
        let cur = ctl.current().unwrap();
        assert_eq!(cur.rotation(), 2);
        assert!(cur.cells().iter().all(|&(x, _)| x < 10));
    }

    #[test]
    fn test_rotation_fails_when_boxed_in() {
        let mut ctl = sequence(&["I"]);
        ctl.apply_action(GameAction::RotateCw);
        // Vertical I at column 5 in a one-wide well.
        ctl.current = Some(ctl.current.unwrap().moved(0, 16));
        for y in 10..20 {
            fill_row(&mut ctl, y, Some(5));
        }
        let before = *ctl.current().unwrap();
        assert!(!ctl.apply_action(GameAction::RotateCw));
        assert_eq!(*ctl.current().unwrap(), before);
    }

    #[test]
    fn test_hold_once_per_lock() {
        let mut ctl = sequence(&["T", "O", "I", "L"]);
        assert!(ctl.apply_action(GameAction::Hold));
        assert_eq!(ctl.held().unwrap().symbol, "T");
        assert_eq!(ctl.current().unwrap().symbol(), "O");
        assert_eq!(ctl.next().unwrap().symbol, "I");
        assert!(!ctl.apply_action(GameAction::Hold));

        ctl.apply_action(GameAction::HardDrop);
        assert!(ctl.can_hold());
        assert_eq!(ctl.current().unwrap().symbol(), "I");
        assert!(ctl.apply_action(GameAction::Hold));
        assert_eq!(ctl.current().unwrap().symbol(), "T");
        assert_eq!(ctl.current().unwrap().rotation(), 0);
        assert_eq!(ctl.held().unwrap().symbol, "I");
    }

    #[test]
    fn test_line_clear_scores_with_level() {
        let mut ctl = sequence(&["I", "O"]);
        for y in 16..20 {
            fill_row(&mut ctl, y, Some(5));
        }
        // Vertical I sits in column 5.
        ctl.apply_action(GameAction::RotateCw);
        let before = ctl.score();
        ctl.apply_action(GameAction::HardDrop);
        assert_eq!(ctl.lines(), 4);
        let events = ctl.take_events();
        let locked = events
            .iter()
            .find_map(|e| match e {
                ControllerEvent::Locked(l) => Some(*l),
                _ => None,
            })
            .unwrap();
        assert_eq!(locked.lines_cleared, 4);
        assert_eq!(locked.line_clear_score, 800);
        assert!(ctl.score() >= before + 800);
        assert_eq!(ctl.board().filled_count(), 0);
    }

    #[test]
    fn test_level_advances_every_ten_lines() {
        let mut ctl = sequence(&[]);
        assert_eq!(ctl.award_lines(4), 800);
        assert_eq!(ctl.award_lines(4), 800);
        assert_eq!(ctl.level(), 1);
        assert_eq!(ctl.award_lines(2), 300);
        assert_eq!(ctl.level(), 2);
        assert!(ctl.fall_interval_ms() < 1000);
        assert_eq!(ctl.award_lines(1), 200);
    }

    #[test]
    fn test_pending_garbage_applies_on_lock() {
        let mut ctl = sequence(&["O", "O"]);
        ctl.add_pending_garbage(2);
        assert_eq!(ctl.board().filled_count(), 0);
        ctl.apply_action(GameAction::HardDrop);
        assert_eq!(ctl.pending_garbage(), 0);
        assert_eq!(ctl.board().filled_count(), 4 + 18);
        assert!(ctl.board().is_occupied(4, 17));
    }

    #[test]
    fn test_top_out_after_stacking() {
        let mut ctl = sequence(&["O"; 12]);
        let mut drops = 0;
        while !ctl.is_topped_out() {
            ctl.apply_action(GameAction::HardDrop);
            drops += 1;
        }
        assert_eq!(drops, 10);
        assert!(ctl.take_events().contains(&ControllerEvent::ToppedOut));
        assert!(!ctl.tick(1000));
        assert!(!ctl.apply_action(GameAction::MoveLeft));
    }

    #[test]
    fn test_spawn_collision_tops_out() {
        let mut ctl = sequence(&["T", "T"]);
        for y in 0..2 {
            fill_row(&mut ctl, y, Some(0));
        }
        ctl.current = None;
        assert!(!ctl.spawn());
        assert!(ctl.is_topped_out());
    }

    #[test]
    fn test_pause_freezes_tick() {
        let mut ctl = sequence(&["T"]);
        ctl.apply_action(GameAction::Pause);
        assert!(!ctl.tick(5000));
        assert!(!ctl.apply_action(GameAction::MoveLeft));
        ctl.apply_action(GameAction::Pause);
        assert!(ctl.tick(1000));
    }

    #[test]
    fn test_time_freeze_halts_gravity_and_lock() {
        let mut ctl = sequence(&["O", "T"]);
        ctl.modifiers_mut()
            .add(PowerUpKind::TimeFreeze.into())
            .unwrap();
        assert!(ctl.use_modifier());
        assert!(!ctl.tick(4000));
        assert_eq!(ctl.current().unwrap().y, 0);
        assert!(ctl.tick(1000));
        assert!(!ctl.is_modifier_active(PowerUpKind::TimeFreeze));
        assert_eq!(ctl.current().unwrap().y, 1);
    }

    #[test]
    fn test_gravity_reverse_drifts_up_and_never_locks() {
        let mut ctl = sequence(&["O", "T"]);
        ctl.current = Some(ctl.current.unwrap().moved(0, 5));
        ctl.modifiers_mut()
            .add(PowerUpKind::GravityReverse.into())
            .unwrap();
        ctl.use_modifier();
        for _ in 0..7 {
            ctl.tick(1000);
        }
        assert_eq!(ctl.current().unwrap().y, 0);
        assert_eq!(ctl.board().filled_count(), 0);
    }

    #[test]
    fn test_ghost_mode_passes_through_blocks() {
        let mut ctl = sequence(&["O", "O", "O", "O", "T"]);
        fill_row(&mut ctl, 10, Some(0));
        ctl.modifiers_mut()
            .add(PowerUpKind::GhostMode.into())
            .unwrap();
        ctl.use_modifier();
        assert!(ctl.is_modifier_active(PowerUpKind::GhostMode));
        ctl.apply_action(GameAction::HardDrop);
        assert!(ctl.board().is_occupied(4, 19));
        assert_eq!(ctl.modifiers().ghost_blocks_remaining(), 2);
        ctl.apply_action(GameAction::HardDrop);
        ctl.apply_action(GameAction::HardDrop);
        assert!(!ctl.is_modifier_active(PowerUpKind::GhostMode));
    }

    #[test]
    fn test_line_eraser_and_bomb() {
        let mut ctl = sequence(&["T"]);
        fill_row(&mut ctl, 19, Some(0));
        fill_row(&mut ctl, 18, Some(0));
        ctl.modifiers_mut()
            .add(PowerUpKind::LineEraser.into())
            .unwrap();
        ctl.use_modifier();
        assert_eq!(ctl.board().filled_count(), 0);

        ctl.board_mut().set(5, 15, Some(Rgb::new(1, 1, 1)));
        ctl.modifiers_mut().add(PowerUpKind::Bomb.into()).unwrap();
        ctl.use_modifier();
        assert_eq!(ctl.board().filled_count(), 0);
    }

    #[test]
    fn test_magnet_compresses_and_scores() {
        let mut ctl = sequence(&["T"]);
        fill_row(&mut ctl, 19, Some(4));
        ctl.board_mut().set(4, 12, Some(Rgb::new(1, 1, 1)));
        ctl.modifiers_mut().add(PowerUpKind::Magnet.into()).unwrap();
        ctl.use_modifier();
        assert_eq!(ctl.lines(), 1);
        assert_eq!(ctl.score(), 100);
        assert_eq!(ctl.board().filled_count(), 0);
    }

    #[test]
    fn test_use_modifier_empty_inventory_notice() {
        let mut ctl = sequence(&["T"]);
        assert!(!ctl.use_modifier());
        assert_eq!(
            ctl.take_events(),
            vec![ControllerEvent::Notice(Notice::InventoryEmpty)]
        );
    }

    #[test]
    fn test_debuff_use_emits_event() {
        let mut ctl = sequence(&["T"]);
        ctl.modifiers_mut().add(DebuffKind::Ink.into()).unwrap();
        assert!(ctl.use_modifier());
        assert!(ctl.take_events().contains(&ControllerEvent::DebuffSent {
            kind: DebuffKind::Ink,
            duration_ms: 5000,
        }));
    }

    #[test]
    fn test_reverse_debuff_inverts_horizontal_input() {
        let mut ctl = sequence(&["T"]);
        ctl.apply_debuff(DebuffKind::Reverse, 5000);
        let x = ctl.current().unwrap().x;
        ctl.apply_action(GameAction::MoveLeft);
        assert_eq!(ctl.current().unwrap().x, x + 1);
    }

    #[test]
    fn test_speed_up_debuff_halves_interval() {
        let mut ctl = sequence(&["T"]);
        ctl.apply_debuff(DebuffKind::SpeedUp, 5000);
        assert_eq!(ctl.fall_interval_ms(), 500);
        assert!(ctl.tick(500));
    }

    #[test]
    fn test_remote_mirror_ignores_input_and_merges_updates() {
        let mut ctl = Controller::remote(GameMode::Battle, RuleConfig::default());
        assert!(!ctl.apply_action(GameAction::HardDrop));
        assert!(!ctl.tick(5000));

        let mut grid = vec![vec![None; 10]; 20];
        grid[19][0] = Some(Rgb::new(9, 9, 9));
        let t = lookup(PieceFamily::Tetromino, "T").unwrap();
        let piece = PieceState::from(&Block::spawn(t, 10));
        ctl.apply_remote_update(RemoteUpdate {
            grid: Some(grid),
            score: Some(300),
            lines: Some(12),
            piece: Some(PieceUpdate {
                x: Some(piece.x),
                y: Some(piece.y),
                rotation: Some(0),
                color: Some(piece.color),
                matrix: Some(piece.matrix.clone()),
            }),
        });
        assert!(ctl.board().is_occupied(0, 19));
        assert_eq!((ctl.score(), ctl.lines(), ctl.level()), (300, 12, 2));

        ctl.apply_remote_update(RemoteUpdate {
            grid: Some(vec![vec![None; 3]]),
            piece: Some(PieceUpdate {
                y: Some(7),
                ..Default::default()
            }),
            ..Default::default()
        });
        assert!(ctl.board().is_occupied(0, 19));
        assert_eq!(ctl.score(), 300);
        assert_eq!(ctl.remote_piece().unwrap().y, 7);
        assert_eq!(ctl.remote_piece().unwrap().x, piece.x);
    }

    #[test]
    fn test_remote_piece_far_off_board_is_ignored() {
        let mut ctl = Controller::remote(GameMode::Battle, RuleConfig::default());
        let color = Rgb::new(1, 2, 3);
        ctl.apply_remote_update(RemoteUpdate {
            piece: Some(PieceUpdate {
                x: Some(127),
                y: Some(0),
                rotation: None,
                color: Some(color),
                matrix: Some(vec![vec![false, true]]),
            }),
            ..Default::default()
        });
        assert!(ctl.remote_piece().is_none());
        assert!(ctl.snapshot().current.is_none());

        ctl.apply_remote_update(RemoteUpdate {
            piece: Some(PieceUpdate {
                x: Some(0),
                y: Some(0),
                rotation: None,
                color: Some(color),
                matrix: Some(vec![vec![true; 11]]),
            }),
            ..Default::default()
        });
        assert!(ctl.remote_piece().is_none());

        ctl.apply_remote_update(RemoteUpdate {
            piece: Some(PieceUpdate {
                x: Some(9),
                y: Some(19),
                rotation: None,
                color: Some(color),
                matrix: Some(vec![vec![true, true]; 2]),
            }),
            ..Default::default()
        });
        let view = ctl.snapshot().current.unwrap();
        assert_eq!(view.cells, vec![(9, 19), (10, 19), (9, 20), (10, 20)]);
    }

    #[test]
    fn test_notice_shows_for_a_while() {
        let mut ctl = sequence(&["T"]);
        assert_eq!(ctl.notice(), None);
        assert!(!ctl.apply_action(GameAction::UseModifier));
        assert_eq!(ctl.notice(), Some(Notice::InventoryEmpty));
        assert_eq!(ctl.snapshot().notice, Some(Notice::InventoryEmpty));

        ctl.tick(NOTICE_MS - 1);
        assert_eq!(ctl.notice(), Some(Notice::InventoryEmpty));
        ctl.tick(1);
        assert_eq!(ctl.notice(), None);
    }

    #[test]
    fn test_restart_resets_progress() {
        let mut ctl = sequence(&["T", "O"]);
        ctl.apply_action(GameAction::HardDrop);
        assert!(ctl.score() > 0);
        ctl.apply_action(GameAction::Restart);
        assert_eq!(ctl.score(), 0);
        assert_eq!(ctl.board().filled_count(), 0);
        assert!(ctl.current().is_some());
    }

    #[test]
    fn test_powerup_block_awards_on_lock() {
        let rules = RuleConfig {
            powerup_chance: 1.0,
            ..RuleConfig::default()
        };
        let mut ctl = Controller::new(GameMode::Casual, rules, 5);
        ctl.start();
        assert!(ctl.is_powerup_block());
        ctl.apply_action(GameAction::HardDrop);
        ctl.apply_action(GameAction::HardDrop);
        ctl.apply_action(GameAction::HardDrop);
        let notices: Vec<_> = ctl
            .take_events()
            .into_iter()
            .filter_map(|e| match e {
                ControllerEvent::Notice(n) => Some(n),
                _ => None,
            })
            .collect();
        assert!(matches!(notices[0], Notice::PowerUpAwarded(_)));
        assert!(matches!(notices[1], Notice::PowerUpAwarded(_)));
        assert_eq!(notices[2], Notice::InventoryFull);
        assert_eq!(ctl.modifiers().inventory_len(), 2);
    }

    #[test]
    fn test_classic_mode_never_rolls_rewards() {
        let rules = RuleConfig {
            powerup_chance: 1.0,
            debuff_chance: 1.0,
            ..RuleConfig::default()
        };
        let mut ctl = Controller::new(GameMode::Classic, rules, 5);
        ctl.start();
        assert!(!ctl.is_powerup_block());
        assert_eq!(ctl.modifiers().inventory_len(), 0);
    }
}
