//! Online session - lobby, match and teardown around an [`OnlineBattle`]
//!
//! The session is driven from the game loop. [`OnlineSession::pump`] drains whatever the
//! link has buffered, [`OnlineSession::tick`] advances the match and ships its outbox.
//! Once an outcome exists the link is closed and every later event is discarded.

use crate::core::battle::{EndReason, MatchResult, OnlineBattle, RemoteEvent};
use crate::core::controller::ControllerEvent;
use crate::core::rules::RuleConfig;
use crate::protocol::{outbound_message, remote_event, Message};
use crate::runtime::{Link, LinkEvent};
use crate::types::{GameAction, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Connecting,
    /// Joined; no opponent yet.
    Waiting,
    Playing,
    Finished,
}

pub struct OnlineSession<L: Link> {
    link: L,
    rules: RuleConfig,
    seed: u64,
    phase: SessionPhase,
    battle: Option<OnlineBattle>,
    result: Option<MatchResult>,
    game_id: Option<String>,
    opponent_name: Option<String>,
}

impl<L: Link> OnlineSession<L> {
    pub fn new(link: L, rules: RuleConfig, seed: u64) -> Self {
        Self {
            link,
            rules,
            seed,
            phase: SessionPhase::Connecting,
            battle: None,
            result: None,
            game_id: None,
            opponent_name: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn battle(&self) -> Option<&OnlineBattle> {
        self.battle.as_ref()
    }

    pub fn result(&self) -> Option<MatchResult> {
        self.result
    }

    pub fn game_id(&self) -> Option<&str> {
        self.game_id.as_deref()
    }

    pub fn opponent_name(&self) -> Option<&str> {
        self.opponent_name.as_deref()
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    /// Drain buffered link events without blocking.
    pub fn pump(&mut self) {
        while self.phase != SessionPhase::Finished {
            let Some(event) = self.link.try_recv() else {
                break;
            };
            self.on_link_event(event);
        }
    }

    fn on_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Connected => tracing::debug!("Link connected"),
            LinkEvent::Disconnected { reason } => {
                tracing::info!(reason = %reason, "Link lost");
                match self.battle.as_mut() {
                    Some(battle) => battle.handle(RemoteEvent::ConnectionLost),
                    None => {
                        self.result = Some(MatchResult {
                            winner: None,
                            reason: EndReason::ConnectionLost,
                        })
                    }
                }
                self.settle();
            }
            LinkEvent::Message(msg) => self.on_message(msg),
        }
    }

    fn on_message(&mut self, msg: Message) {
        match msg {
            Message::Waiting => {
                if self.phase == SessionPhase::Connecting {
                    self.phase = SessionPhase::Waiting;
                }
            }
            Message::MatchStart {
                role,
                game_id,
                opponent_name,
                my_blocks,
                ..
            } => {
                if self.battle.is_some() {
                    tracing::debug!("Ignored second MATCH_START");
                    return;
                }
                let Some(side) = Side::from_role(role) else {
                    tracing::debug!(role, "Ignored MATCH_START with bad role");
                    return;
                };
                tracing::info!(game_id = %game_id, ?side, opponent = %opponent_name, "Match started");
                self.battle = Some(OnlineBattle::new(side, self.rules.clone(), &my_blocks, self.seed));
                self.game_id = Some(game_id);
                self.opponent_name = Some(opponent_name);
                self.phase = SessionPhase::Playing;
                self.flush();
            }
            other => {
                let Some(battle) = self.battle.as_mut() else {
                    tracing::debug!(msg_type = other.type_name(), "Ignored before match start");
                    return;
                };
                if let Some(event) = remote_event(other) {
                    battle.handle(event);
                }
                self.settle();
            }
        }
    }

    /// Advance the local player and publish the result.
    pub fn tick(&mut self, elapsed_ms: u32) -> bool {
        let Some(battle) = self.battle.as_mut() else {
            return false;
        };
        if self.phase != SessionPhase::Playing {
            return false;
        }
        let changed = battle.tick(elapsed_ms);
        self.flush();
        self.settle();
        changed
    }

    pub fn apply_action(&mut self, action: GameAction) -> bool {
        let Some(battle) = self.battle.as_mut() else {
            return false;
        };
        if self.phase != SessionPhase::Playing {
            return false;
        }
        let changed = battle.apply_action(action);
        self.flush();
        self.settle();
        changed
    }

    /// Local controller events since the last call.
    pub fn take_notices(&mut self) -> Vec<ControllerEvent> {
        self.battle
            .as_mut()
            .map(OnlineBattle::take_notices)
            .unwrap_or_default()
    }

    fn flush(&mut self) {
        let Some(battle) = self.battle.as_mut() else {
            return;
        };
        for event in battle.take_outbox() {
            self.link.send(outbound_message(&event));
        }
    }

    /// Close the link once the outcome is known.
    fn settle(&mut self) {
        if self.phase == SessionPhase::Finished {
            return;
        }
        if let Some(result) = self.battle.as_ref().and_then(OnlineBattle::result) {
            self.result = Some(result);
        }
        if self.result.is_some() {
            self.link.close();
            self.phase = SessionPhase::Finished;
        }
    }
}
