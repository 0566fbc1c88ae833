//! Battle module - two players, one clock
//!
//! [`BattleCoordinator`] runs a local two-player match: both controllers tick
//! sequentially against a shared countdown, multi-line clears become garbage on the
//! opponent's pending counter, and spent debuffs land on the opponent.
//!
//! [`OnlineBattle`] is the networked variant. Only the local side is simulated; the
//! opponent is a display-only mirror fed by [`RemoteEvent`]s, and everything the local
//! side does that the opponent must see is queued as [`OutboundEvent`]s.
//!
//! In both, the outcome is decided exactly once. After that nothing mutates either board.

use crate::controller::{Controller, ControllerEvent, PlayerState, RemoteUpdate};
use crate::rng::PieceSource;
use crate::rules::RuleConfig;
use crate::scoring::garbage_for_clear;
use crate::snapshot::GameSnapshot;
use crate::types::{DebuffKind, GameAction, GameMode, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum EndReason {
    /// A player's stack reached the top.
    TopOut,
    /// The clock ran out.
    Timeout,
    OpponentDisconnected,
    /// The local link failed before the match was decided.
    ConnectionLost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchResult {
    /// `None` is a draw (or no decision, for a lost connection).
    pub winner: Option<Side>,
    pub reason: EndReason,
}

impl MatchResult {
    /// Higher score wins; equal scores draw.
    pub fn by_score(scores: [u32; 2], reason: EndReason) -> Self {
        let winner = match scores[0].cmp(&scores[1]) {
            std::cmp::Ordering::Greater => Some(Side::One),
            std::cmp::Ordering::Less => Some(Side::Two),
            std::cmp::Ordering::Equal => None,
        };
        Self { winner, reason }
    }

    /// Decide from top-out flags and scores.
    ///
    /// Exactly one topped out: the other wins. Both: score comparison.
    /// Neither: undecided unless the clock has run out.
    pub fn resolve(topped: [bool; 2], scores: [u32; 2], clock_done: bool) -> Option<Self> {
        match topped {
            [true, false] => Some(Self {
                winner: Some(Side::Two),
                reason: EndReason::TopOut,
            }),
            [false, true] => Some(Self {
                winner: Some(Side::One),
                reason: EndReason::TopOut,
            }),
            [true, true] => Some(Self::by_score(scores, EndReason::TopOut)),
            [false, false] if clock_done => Some(Self::by_score(scores, EndReason::Timeout)),
            [false, false] => None,
        }
    }
}

/// Local two-player match.
#[derive(Debug, Clone)]
pub struct BattleCoordinator {
    rules: RuleConfig,
    players: [Controller; 2],
    remaining_ms: u64,
    result: Option<MatchResult>,
    events: Vec<(Side, ControllerEvent)>,
}

impl BattleCoordinator {
    pub fn new(rules: RuleConfig, seed: u64) -> Self {
        let players = [
            Controller::new(GameMode::Battle, rules.clone(), seed),
            Controller::new(GameMode::Battle, rules.clone(), seed.wrapping_add(1)),
        ];
        Self::from_players(rules, players)
    }

    /// Both sides draw from the same symbol sequence.
    pub fn with_sequence(rules: RuleConfig, symbols: &[&str], seed: u64) -> Self {
        let players = [Side::One, Side::Two].map(|side| {
            let source = PieceSource::with_sequence(GameMode::Battle.family(), symbols, seed)
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Falling back to random pieces");
                    PieceSource::random(GameMode::Battle.family(), seed)
                });
            Controller::with_source(
                GameMode::Battle,
                rules.clone(),
                source,
                seed.wrapping_add(side.index() as u64),
            )
        });
        Self::from_players(rules, players)
    }

    fn from_players(rules: RuleConfig, mut players: [Controller; 2]) -> Self {
        for p in players.iter_mut() {
            p.start();
        }
        let mut battle = Self {
            remaining_ms: rules.battle_duration_ms as u64,
            rules,
            players,
            result: None,
            events: Vec::new(),
        };
        battle.route(Side::One);
        battle.route(Side::Two);
        battle
    }

    pub fn player(&self, side: Side) -> &Controller {
        &self.players[side.index()]
    }

    pub fn player_mut(&mut self, side: Side) -> &mut Controller {
        &mut self.players[side.index()]
    }

    pub fn snapshot(&self, side: Side) -> GameSnapshot {
        self.player(side).snapshot()
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn result(&self) -> Option<MatchResult> {
        self.result
    }

    pub fn is_over(&self) -> bool {
        self.result.is_some()
    }

    /// Drain routed events, tagged with the side that produced them.
    pub fn take_events(&mut self) -> Vec<(Side, ControllerEvent)> {
        std::mem::take(&mut self.events)
    }

    /// Advance both players and the clock.
    pub fn tick(&mut self, elapsed_ms: u32) -> bool {
        if self.result.is_some() {
            return false;
        }
        self.remaining_ms = self.remaining_ms.saturating_sub(elapsed_ms as u64);
        if self.remaining_ms == 0 {
            // Time is up: decide on the standing scores, no further piece may lock.
            self.resolve();
            return true;
        }

        let mut changed = false;
        for side in [Side::One, Side::Two] {
            changed |= self.players[side.index()].tick(elapsed_ms);
            self.route(side);
        }
        self.resolve();
        changed
    }

    /// Apply one player's intent. Pause and restart are match-level and ignored here.
    pub fn apply_action(&mut self, side: Side, action: GameAction) -> bool {
        if self.result.is_some() || matches!(action, GameAction::Pause | GameAction::Restart) {
            return false;
        }
        let changed = self.players[side.index()].apply_action(action);
        self.route(side);
        self.resolve();
        changed
    }

    /// Move side effects of `side` onto its opponent.
    fn route(&mut self, side: Side) {
        let opponent = side.opponent().index();
        for event in self.players[side.index()].take_events() {
            match event {
                ControllerEvent::Locked(lock) => {
                    let garbage = garbage_for_clear(&self.rules, lock.lines_cleared);
                    if garbage > 0 {
                        self.players[opponent].add_pending_garbage(garbage);
                    }
                }
                ControllerEvent::DebuffSent { kind, duration_ms } => {
                    self.players[opponent].apply_debuff(kind, duration_ms);
                }
                ControllerEvent::ToppedOut | ControllerEvent::Notice(_) => {}
            }
            self.events.push((side, event));
        }
    }

    fn resolve(&mut self) {
        if self.result.is_some() {
            return;
        }
        let topped = [self.players[0].is_topped_out(), self.players[1].is_topped_out()];
        let scores = [self.players[0].score(), self.players[1].score()];
        self.result = MatchResult::resolve(topped, scores, self.remaining_ms == 0);
        if let Some(result) = self.result {
            tracing::info!(winner = ?result.winner, reason = ?result.reason, "Battle decided");
        }
    }
}

/// Messages the local side must publish.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    State(PlayerState),
    Garbage(u32),
    Debuff { kind: DebuffKind, duration_ms: u32 },
    GameOver,
}

/// Inbound messages that affect a running match.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    OpponentState(RemoteUpdate),
    Garbage(u32),
    Debuff { kind: DebuffKind, duration_ms: u32 },
    /// Authoritative countdown.
    TimeSync { remaining_ms: u64 },
    GameEnd(MatchResult),
    OpponentDisconnected,
    ConnectionLost,
}

/// Networked match seen from one side.
#[derive(Debug, Clone)]
pub struct OnlineBattle {
    side: Side,
    rules: RuleConfig,
    local: Controller,
    remote: Controller,
    remaining_ms: u64,
    ticks: u32,
    result: Option<MatchResult>,
    outbox: Vec<OutboundEvent>,
    notices: Vec<ControllerEvent>,
}

impl OnlineBattle {
    /// `symbols` is the server-assigned piece sequence for the local side.
    pub fn new(side: Side, rules: RuleConfig, symbols: &[String], seed: u64) -> Self {
        let family = GameMode::Battle.family();
        let source = PieceSource::with_sequence(family, symbols, seed).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Server sequence rejected, using random pieces");
            PieceSource::random(family, seed)
        });
        let mut local = Controller::with_source(GameMode::Battle, rules.clone(), source, seed);
        local.start();
        let mut battle = Self {
            side,
            remaining_ms: rules.battle_duration_ms as u64,
            remote: Controller::remote(GameMode::Battle, rules.clone()),
            rules,
            local,
            ticks: 0,
            result: None,
            outbox: Vec::new(),
            notices: Vec::new(),
        };
        battle.route_local();
        battle
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn local(&self) -> &Controller {
        &self.local
    }

    pub fn remote(&self) -> &Controller {
        &self.remote
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn result(&self) -> Option<MatchResult> {
        self.result
    }

    /// Drain messages to send. Empty once the match is decided.
    pub fn take_outbox(&mut self) -> Vec<OutboundEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Drain local controller events (notices, locks) for the front end.
    pub fn take_notices(&mut self) -> Vec<ControllerEvent> {
        std::mem::take(&mut self.notices)
    }

    fn finish(&mut self, result: MatchResult) {
        if self.result.is_some() {
            return;
        }
        tracing::info!(winner = ?result.winner, reason = ?result.reason, "Online battle decided");
        self.result = Some(result);
    }

    fn route_local(&mut self) {
        for event in self.local.take_events() {
            match event {
                ControllerEvent::Locked(lock) => {
                    let garbage = garbage_for_clear(&self.rules, lock.lines_cleared);
                    if garbage > 0 {
                        self.outbox.push(OutboundEvent::Garbage(garbage));
                    }
                }
                ControllerEvent::DebuffSent { kind, duration_ms } => {
                    self.outbox.push(OutboundEvent::Debuff { kind, duration_ms });
                }
                ControllerEvent::ToppedOut => {
                    self.outbox.push(OutboundEvent::State(self.local.player_state()));
                    self.outbox.push(OutboundEvent::GameOver);
                    self.finish(MatchResult {
                        winner: Some(self.side.opponent()),
                        reason: EndReason::TopOut,
                    });
                }
                ControllerEvent::Notice(_) => {}
            }
            self.notices.push(event);
        }
    }

    pub fn tick(&mut self, elapsed_ms: u32) -> bool {
        if self.result.is_some() {
            return false;
        }
        self.remaining_ms = self.remaining_ms.saturating_sub(elapsed_ms as u64);
        if self.remaining_ms == 0 {
            let mut scores = [0; 2];
            scores[self.side.index()] = self.local.score();
            scores[self.side.opponent().index()] = self.remote.score();
            self.finish(MatchResult::by_score(scores, EndReason::Timeout));
            return true;
        }

        let changed = self.local.tick(elapsed_ms);
        self.ticks = self.ticks.wrapping_add(1);
        if self.ticks % self.rules.state_sync_every.max(1) == 0 && !self.local.is_topped_out() {
            self.outbox.push(OutboundEvent::State(self.local.player_state()));
        }
        self.route_local();
        changed
    }

    pub fn apply_action(&mut self, action: GameAction) -> bool {
        if self.result.is_some() || matches!(action, GameAction::Pause | GameAction::Restart) {
            return false;
        }
        let changed = self.local.apply_action(action);
        self.route_local();
        changed
    }

    /// Apply an inbound message. Ignored once the match is decided.
    pub fn handle(&mut self, event: RemoteEvent) {
        if self.result.is_some() {
            return;
        }
        match event {
            RemoteEvent::OpponentState(update) => self.remote.apply_remote_update(update),
            RemoteEvent::Garbage(rows) => self.local.add_pending_garbage(rows),
            RemoteEvent::Debuff { kind, duration_ms } => {
                self.local.apply_debuff(kind, duration_ms);
                self.route_local();
            }
            RemoteEvent::TimeSync { remaining_ms } => self.remaining_ms = remaining_ms,
            RemoteEvent::GameEnd(result) => {
                if result.winner == Some(self.side) && result.reason.is_top_out() {
                    self.remote.mark_topped_out();
                }
                self.finish(result);
            }
            RemoteEvent::OpponentDisconnected => self.finish(MatchResult {
                winner: Some(self.side),
                reason: EndReason::OpponentDisconnected,
            }),
            RemoteEvent::ConnectionLost => self.finish(MatchResult {
                winner: None,
                reason: EndReason::ConnectionLost,
            }),
        }
        if self.result.is_some() {
            self.outbox.clear();
        }
    }
}
