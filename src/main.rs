//! Blockfall runner (default binary).
//!
//! Subcommands cover the single-player modes, a two-player battle on one keyboard, an
//! online client and the matchmaking broker. Rendering uses crossterm through
//! `blockfall-term`; there is no widget toolkit.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use tracing_subscriber::EnvFilter;

use blockfall::adapter::{LinkConfig, NetLink, OnlineSession, ServerConfig, SessionPhase};
use blockfall::core::{BattleCoordinator, Controller, EndReason, MatchResult, RuleConfig};
use blockfall::input::{map_battle_key, map_solo_key, should_quit, RepeatGate};
use blockfall::term::{render_battle_lines, render_lines, Line, TerminalRenderer};
use blockfall::types::{GameMode, Side, TICK_MS};

#[derive(Parser, Debug)]
#[command(name = "blockfall", version, about = "Falling-block puzzle with local and online battle")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Single player game.
    Play {
        /// casual | classic | crazy
        #[arg(long, default_value = "classic")]
        mode: String,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Two players sharing one keyboard.
    Battle {
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Join a match through a broker.
    Online {
        /// Broker address (default: $BLOCKFALL_SERVER or 127.0.0.1:8765).
        #[arg(long)]
        server: Option<String>,
        /// Display name (default: $BLOCKFALL_PLAYER or "Player").
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Run the matchmaking broker.
    Broker {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        /// Append every wire line to this file as JSON lines.
        #[arg(long)]
        log_path: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Play {
        mode: "classic".to_string(),
        seed: None,
    });

    // Interactive modes share the terminal with stderr; keep them quiet by default.
    let default_filter = match command {
        Command::Broker { .. } => "info",
        _ => "warn",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    match command {
        Command::Broker {
            host,
            port,
            log_path,
        } => run_broker(host, port, log_path),
        Command::Play { mode, seed } => {
            let mode = GameMode::from_str(&mode)
                .filter(|m| *m != GameMode::Battle)
                .with_context(|| format!("unknown mode {mode:?} (casual, classic, crazy)"))?;
            let rules = load_rules()?;
            let mut ctl = Controller::new(mode, rules, seed.unwrap_or_else(entropy_seed));
            ctl.start();
            with_terminal(SoloScreen {
                ctl,
                gate: RepeatGate::new(),
            })
        }
        Command::Battle { seed } => {
            let rules = load_rules()?;
            with_terminal(BattleScreen {
                battle: BattleCoordinator::new(rules, seed.unwrap_or_else(entropy_seed)),
                gates: [RepeatGate::new(), RepeatGate::new()],
            })
        }
        Command::Online { server, name, seed } => {
            let rules = load_rules()?;
            let mut config = LinkConfig::from_env();
            if let Some(server) = server {
                config.server = server;
            }
            if let Some(name) = name {
                config.player_name = name;
            }
            let server = config.server.clone();
            let link = NetLink::start(config).context("failed to start network link")?;
            with_terminal(OnlineScreen {
                session: OnlineSession::new(link, rules, seed.unwrap_or_else(entropy_seed)),
                gate: RepeatGate::new(),
                server,
            })
        }
    }
}

fn run_broker(host: Option<String>, port: Option<u16>, log_path: Option<String>) -> Result<()> {
    let mut config = ServerConfig::from_env();
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if log_path.is_some() {
        config.log_path = log_path;
    }

    let rt = tokio::runtime::Runtime::new().context("failed to build tokio runtime")?;
    rt.block_on(blockfall::adapter::run_broker(config, None))
}

fn load_rules() -> Result<RuleConfig> {
    RuleConfig::from_env().context("failed to load rules")
}

fn entropy_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// One interactive view driven by the frame loop.
trait Screen {
    fn on_key(&mut self, key: KeyEvent, now_ms: u64);
    fn tick(&mut self, elapsed_ms: u32);
    fn lines(&self) -> Vec<Line>;
}

fn with_terminal(screen: impl Screen) -> Result<()> {
    let mut term = TerminalRenderer::new();
    term.enter()?;

    let result = run(&mut term, screen);

    // Always try to restore terminal state.
    let _ = term.exit();
    result
}

fn run(term: &mut TerminalRenderer, mut screen: impl Screen) -> Result<()> {
    let started = Instant::now();
    let mut last_tick = Instant::now();
    let tick_duration = Duration::from_millis(TICK_MS as u64);

    loop {
        term.draw(screen.lines())?;

        // Input with timeout until next tick.
        let timeout = tick_duration
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) => match key.kind {
                    KeyEventKind::Press | KeyEventKind::Repeat => {
                        if should_quit(key) {
                            return Ok(());
                        }
                        screen.on_key(key, started.elapsed().as_millis() as u64);
                    }
                    KeyEventKind::Release => {}
                },
                Event::Resize(..) => term.invalidate(),
                _ => {}
            }
        }

        if last_tick.elapsed() >= tick_duration {
            last_tick = Instant::now();
            screen.tick(TICK_MS);
        }
    }
}

struct SoloScreen {
    ctl: Controller,
    gate: RepeatGate,
}

impl Screen for SoloScreen {
    fn on_key(&mut self, key: KeyEvent, now_ms: u64) {
        if let Some(action) = map_solo_key(key) {
            if self.gate.allow(action, now_ms) {
                self.ctl.apply_action(action);
            }
        }
    }

    fn tick(&mut self, elapsed_ms: u32) {
        self.ctl.tick(elapsed_ms);
        for event in self.ctl.take_events() {
            tracing::debug!(?event, "Controller event");
        }
    }

    fn lines(&self) -> Vec<Line> {
        let mut lines = render_lines(&self.ctl.snapshot());
        lines.push(Line::new());
        lines.push(Line::plain(
            "arrows/wasd move  up/x/z rotate  space drop  c hold  e item  p pause  r restart  esc quit",
        ));
        lines
    }
}

struct BattleScreen {
    battle: BattleCoordinator,
    gates: [RepeatGate; 2],
}

impl Screen for BattleScreen {
    fn on_key(&mut self, key: KeyEvent, now_ms: u64) {
        if let Some((side, action)) = map_battle_key(key) {
            if self.gates[side.index()].allow(action, now_ms) {
                self.battle.apply_action(side, action);
            }
        }
    }

    fn tick(&mut self, elapsed_ms: u32) {
        self.battle.tick(elapsed_ms);
        for (side, event) in self.battle.take_events() {
            tracing::debug!(?side, ?event, "Battle event");
        }
    }

    fn lines(&self) -> Vec<Line> {
        let banner = self.battle.result().map(|result| match result.winner {
            Some(side) => format!("PLAYER {} WINS ({})", side.role(), reason_label(result.reason)),
            None => format!("DRAW ({})", reason_label(result.reason)),
        });
        render_battle_lines(
            &self.battle.snapshot(Side::One),
            &self.battle.snapshot(Side::Two),
            self.battle.remaining_ms(),
            banner.as_deref(),
        )
    }
}

struct OnlineScreen {
    session: OnlineSession<NetLink>,
    gate: RepeatGate,
    server: String,
}

impl Screen for OnlineScreen {
    fn on_key(&mut self, key: KeyEvent, now_ms: u64) {
        if let Some(action) = map_solo_key(key) {
            if self.gate.allow(action, now_ms) {
                self.session.apply_action(action);
            }
        }
    }

    fn tick(&mut self, elapsed_ms: u32) {
        self.session.pump();
        self.session.tick(elapsed_ms);
        for notice in self.session.take_notices() {
            tracing::debug!(?notice, "Local event");
        }
    }

    fn lines(&self) -> Vec<Line> {
        let Some(battle) = self.session.battle() else {
            let status = match (self.session.phase(), self.session.result()) {
                (SessionPhase::Connecting, _) => format!("Connecting to {}...", self.server),
                (SessionPhase::Waiting, _) => "Waiting for an opponent...".to_string(),
                (_, Some(result)) => format!("Disconnected ({})", reason_label(result.reason)),
                (_, None) => String::new(),
            };
            return vec![Line::plain(status), Line::plain("esc quit")];
        };

        let banner = self
            .session
            .result()
            .map(|result| online_banner(result, battle.side()));
        let mut lines = render_battle_lines(
            &battle.local().snapshot(),
            &battle.remote().snapshot(),
            battle.remaining_ms(),
            banner.as_deref(),
        );
        if let Some(name) = self.session.opponent_name() {
            lines.push(Line::new());
            lines.push(Line::plain(format!("you vs {name}")));
        }
        lines
    }
}

fn online_banner(result: MatchResult, me: Side) -> String {
    let outcome = match result.winner {
        Some(side) if side == me => "YOU WIN",
        Some(_) => "YOU LOSE",
        None => "DRAW",
    };
    format!("{outcome} ({})", reason_label(result.reason))
}

fn reason_label(reason: EndReason) -> &'static str {
    match reason {
        EndReason::TopOut => "top out",
        EndReason::Timeout => "time up",
        EndReason::OpponentDisconnected => "opponent left",
        EndReason::ConnectionLost => "connection lost",
    }
}
