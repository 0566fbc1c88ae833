//! Matchmaking broker
//!
//! Pairs clients two at a time and relays their traffic. A single waiting slot holds the
//! first `JOIN`; the next `JOIN` takes it and forms a match. Each match runs in its own task
//! with the authoritative clock: it sends `TIME_SYNC` every second and decides the match on
//! `GAME_OVER`, a disconnect, or the clock reaching zero.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use serde::Serialize;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::{interval_at, Duration, Instant};

use crate::core::generate_sequence;
use crate::protocol::{create_game_end, encode, GameEndReason, Message};
use crate::transport::{LineReader, LineWriter};
use crate::types::{PieceFamily, Side, BATTLE_DURATION_MS};

/// Broker configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Capacity of each match's inbound queue.
    pub max_pending: usize,
    pub log_path: Option<String>,
    pub match_duration_ms: u64,
    pub time_sync_ms: u64,
    /// Pieces generated per side at match start.
    pub sequence_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8765,
            max_pending: 256,
            log_path: None,
            match_duration_ms: BATTLE_DURATION_MS as u64,
            time_sync_ms: 1000,
            sequence_len: 1000,
        }
    }
}

impl ServerConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();
        let host = env::var("BLOCKFALL_HOST").unwrap_or(defaults.host);
        let port = env::var("BLOCKFALL_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);
        let max_pending = env::var("BLOCKFALL_MAX_PENDING")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_pending);
        let log_path = env::var("BLOCKFALL_LOG_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .and_then(|s| if s.is_empty() { None } else { Some(s) });

        Self {
            host,
            port,
            max_pending,
            log_path,
            ..defaults
        }
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid socket address {}:{}", self.host, self.port))
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
enum Direction {
    In,
    Out,
}

#[derive(Debug, Clone, Serialize)]
struct WireRecord {
    ts: u64,
    client_id: usize,
    dir: Direction,
    line: String,
}

type WireLog = Option<mpsc::UnboundedSender<WireRecord>>;

fn log_wire(log: &WireLog, client_id: usize, dir: Direction, line: &str) {
    if let Some(tx) = log.as_ref() {
        let _ = tx.send(WireRecord {
            ts: current_timestamp_ms(),
            client_id,
            dir,
            line: line.to_string(),
        });
    }
}

fn spawn_wire_log(path: String) -> mpsc::UnboundedSender<WireRecord> {
    let (tx, mut rx) = mpsc::unbounded_channel::<WireRecord>();
    tokio::spawn(async move {
        use tokio::fs::OpenOptions;
        use tokio::io::AsyncWriteExt;

        let mut file = match OpenOptions::new().create(true).append(true).open(&path).await {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Wire log disabled");
                return;
            }
        };

        let mut buf: Vec<u8> = Vec::with_capacity(4096);
        while let Some(rec) = rx.recv().await {
            buf.clear();
            if serde_json::to_writer(&mut buf, &rec).is_err() {
                continue;
            }
            buf.push(b'\n');
            if file.write_all(&buf).await.is_err() {
                break;
            }
        }
        let _ = file.flush().await;
    });
    tx
}

/// Outbound handle to one connected client.
#[derive(Debug, Clone)]
struct ClientHandle {
    id: usize,
    name: String,
    tx: mpsc::UnboundedSender<String>,
}

impl ClientHandle {
    fn send(&self, msg: &Message) {
        match encode(msg) {
            Ok(line) => {
                let _ = self.tx.send(line);
            }
            Err(e) => tracing::warn!(client_id = self.id, error = %e, "Encode failed"),
        }
    }
}

/// Input from a player's reader to its match.
#[derive(Debug)]
enum MatchInput {
    Message(Side, Message),
    Left(Side),
}

/// Delivered to a waiting client when an opponent arrives.
#[derive(Debug)]
struct Assignment {
    side: Side,
    match_tx: mpsc::Sender<MatchInput>,
}

struct Waiting {
    handle: ClientHandle,
    assign_tx: oneshot::Sender<Assignment>,
}

struct BrokerState {
    config: ServerConfig,
    waiting: Mutex<Option<Waiting>>,
}

/// Start the broker
pub async fn run_broker(
    config: ServerConfig,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<()> {
    let wire_log: WireLog = config.log_path.clone().map(spawn_wire_log);

    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let bound = listener.local_addr()?;
    tracing::info!(addr = %bound, "Broker listening");
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let state = Arc::new(BrokerState {
        config,
        waiting: Mutex::new(None),
    });
    let mut client_id_counter = 0usize;

    loop {
        let (socket, addr) = listener.accept().await?;
        client_id_counter += 1;
        let client_id = client_id_counter;
        tracing::info!(client_id, %addr, "Client connected");

        let state = Arc::clone(&state);
        let wire_log = wire_log.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_client(socket, client_id, state, wire_log).await {
                tracing::warn!(client_id, error = %e, "Client error");
            }
            tracing::info!(client_id, "Client disconnected");
        });
    }
}

async fn handle_client(
    socket: TcpStream,
    client_id: usize,
    state: Arc<BrokerState>,
    wire_log: WireLog,
) -> anyhow::Result<()> {
    let _ = socket.set_nodelay(true);
    let (read_half, write_half) = socket.into_split();
    let mut reader = LineReader::new(read_half);
    let mut writer = LineWriter::new(write_half);

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let wire_log_out = wire_log.clone();
    let write_task = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if writer.send_line(&line).await.is_err() {
                break;
            }
            log_wire(&wire_log_out, client_id, Direction::Out, &line);
        }
    });

    let result = serve_client(&mut reader, client_id, &state, &wire_log, tx).await;

    // Leaving the lobby frees the slot.
    {
        let mut waiting = state.waiting.lock().await;
        if waiting.as_ref().is_some_and(|w| w.handle.id == client_id) {
            *waiting = None;
        }
    }

    let _ = write_task.await;
    result
}

/// Read one line, record it and parse it. `None` at end of stream.
async fn read_message<R>(
    reader: &mut LineReader<R>,
    client_id: usize,
    wire_log: &WireLog,
) -> anyhow::Result<Option<Message>>
where
    R: tokio::io::AsyncRead + Unpin,
{
    use crate::protocol::{parse_message, ParsedMessage};

    while let Some(line) = reader.next_line().await? {
        log_wire(wire_log, client_id, Direction::In, &line);
        match parse_message(&line) {
            Ok(ParsedMessage::Known(msg)) => return Ok(Some(msg)),
            Ok(ParsedMessage::Unknown(msg_type)) => {
                tracing::debug!(client_id, msg_type = %msg_type, "Ignored unknown message type");
            }
            Err(e) => {
                tracing::debug!(client_id, error = %e, "Dropped malformed line");
            }
        }
    }
    Ok(None)
}

async fn serve_client<R>(
    reader: &mut LineReader<R>,
    client_id: usize,
    state: &Arc<BrokerState>,
    wire_log: &WireLog,
    tx: mpsc::UnboundedSender<String>,
) -> anyhow::Result<()>
where
    R: tokio::io::AsyncRead + Unpin,
{
    // Lobby: wait for JOIN.
    let name = loop {
        match read_message(reader, client_id, wire_log).await? {
            Some(Message::Join { player_name }) => break player_name,
            Some(other) => {
                tracing::debug!(client_id, msg_type = other.type_name(), "Ignored before JOIN");
            }
            None => return Ok(()),
        }
    };
    let handle = ClientHandle {
        id: client_id,
        name,
        tx,
    };

    let assignment = match join(state, handle).await {
        Joined::Matched(assignment) => assignment,
        Joined::Waiting(mut assign_rx) => {
            tracing::info!(client_id, "Waiting for opponent");
            loop {
                tokio::select! {
                    assigned = &mut assign_rx => match assigned {
                        Ok(assignment) => break assignment,
                        Err(_) => return Ok(()),
                    },
                    msg = read_message(reader, client_id, wire_log) => match msg? {
                        Some(other) => {
                            tracing::debug!(client_id, msg_type = other.type_name(), "Ignored while waiting");
                        }
                        None => return Ok(()),
                    },
                }
            }
        }
    };

    let Assignment { side, match_tx } = assignment;
    loop {
        match read_message(reader, client_id, wire_log).await {
            Ok(Some(msg)) => {
                if match_tx.send(MatchInput::Message(side, msg)).await.is_err() {
                    // Match over; keep draining until the client leaves.
                    continue;
                }
            }
            Ok(None) => break,
            Err(e) => {
                let _ = match_tx.send(MatchInput::Left(side)).await;
                return Err(e);
            }
        }
    }
    let _ = match_tx.send(MatchInput::Left(side)).await;
    Ok(())
}

enum Joined {
    Matched(Assignment),
    /// Took the slot; the receiver fires when an opponent arrives.
    Waiting(oneshot::Receiver<Assignment>),
}

/// Take the waiting client and form a match, or occupy the free slot.
async fn join(state: &Arc<BrokerState>, joiner: ClientHandle) -> Joined {
    let mut waiting = state.waiting.lock().await;

    let (match_tx, match_rx) = mpsc::channel::<MatchInput>(state.config.max_pending.max(1));
    let host = match waiting.take() {
        Some(host) => {
            let host_assignment = Assignment {
                side: Side::One,
                match_tx: match_tx.clone(),
            };
            match host.assign_tx.send(host_assignment) {
                Ok(()) => Some(host.handle),
                // The waiting client left between JOIN and now.
                Err(_) => None,
            }
        }
        None => None,
    };
    let Some(host) = host else {
        let (assign_tx, assign_rx) = oneshot::channel();
        joiner.send(&Message::Waiting);
        *waiting = Some(Waiting {
            handle: joiner,
            assign_tx,
        });
        return Joined::Waiting(assign_rx);
    };
    drop(waiting);

    let game_id = format!("{:016x}", rand::random::<u64>());
    let len = state.config.sequence_len;
    let blocks: [Vec<String>; 2] = [rand::random::<u64>(), rand::random::<u64>()].map(|seed| {
        generate_sequence(PieceFamily::Tetromino, len, seed)
            .into_iter()
            .map(str::to_string)
            .collect()
    });
    tracing::info!(game_id = %game_id, host = host.id, joiner = joiner.id, "Match formed");

    let players = [host, joiner];
    for side in [Side::One, Side::Two] {
        let me = side.index();
        let other = side.opponent().index();
        players[me].send(&Message::MatchStart {
            role: side.role(),
            game_id: game_id.clone(),
            opponent_name: players[other].name.clone(),
            my_blocks: blocks[me].clone(),
            opponent_blocks: blocks[other].clone(),
        });
    }

    tokio::spawn(run_match(state.config.clone(), game_id, players, match_rx));
    Joined::Matched(Assignment {
        side: Side::Two,
        match_tx,
    })
}

async fn run_match(
    config: ServerConfig,
    game_id: String,
    players: [ClientHandle; 2],
    mut rx: mpsc::Receiver<MatchInput>,
) {
    let period = Duration::from_millis(config.time_sync_ms.max(1));
    let mut ticker = interval_at(Instant::now() + period, period);
    let mut remaining_ms = config.match_duration_ms;
    let mut scores = [0u32; 2];

    let both = |msg: &Message| {
        for p in players.iter() {
            p.send(msg);
        }
    };

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                remaining_ms = remaining_ms.saturating_sub(period.as_millis() as u64);
                both(&Message::TimeSync { remaining: remaining_ms });
                if remaining_ms == 0 {
                    let winner = match scores[0].cmp(&scores[1]) {
                        std::cmp::Ordering::Greater => Some(Side::One),
                        std::cmp::Ordering::Less => Some(Side::Two),
                        std::cmp::Ordering::Equal => None,
                    };
                    both(&create_game_end(winner, GameEndReason::Timeout));
                    tracing::info!(game_id = %game_id, ?winner, "Match timed out");
                    break;
                }
            }
            input = rx.recv() => {
                let Some(input) = input else { break };
                match input {
                    MatchInput::Message(side, msg) => {
                        let other = &players[side.opponent().index()];
                        match msg {
                            Message::State(payload) => {
                                if let Some(score) = payload.score {
                                    scores[side.index()] = score;
                                }
                                other.send(&Message::OpponentState(payload));
                            }
                            msg @ (Message::Garbage { .. } | Message::Debuff { .. }) => {
                                other.send(&msg);
                            }
                            Message::GameOver => {
                                let winner = side.opponent();
                                both(&create_game_end(Some(winner), GameEndReason::OpponentToppedOut));
                                tracing::info!(game_id = %game_id, ?winner, "Match decided by top-out");
                                break;
                            }
                            other_msg => {
                                tracing::debug!(msg_type = other_msg.type_name(), "Ignored in match");
                            }
                        }
                    }
                    MatchInput::Left(side) => {
                        players[side.opponent().index()].send(&Message::OpponentDisconnected);
                        tracing::info!(game_id = %game_id, ?side, "Player left the match");
                        break;
                    }
                }
            }
        }
    }
}

/// Get current timestamp in milliseconds
fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_from_env() {
        // This test just ensures it doesn't panic
        let _config = ServerConfig::from_env();
    }

    #[test]
    fn test_socket_addr_rejects_garbage_host() {
        let config = ServerConfig {
            host: "not a host".to_string(),
            ..ServerConfig::default()
        };
        assert!(config.socket_addr().is_err());
        assert!(ServerConfig::default().socket_addr().is_ok());
    }

    #[test]
    fn test_wire_record_shape() {
        let rec = WireRecord {
            ts: 1,
            client_id: 2,
            dir: Direction::In,
            line: "{}".to_string(),
        };
        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["dir"], "in");
        assert_eq!(value["client_id"], 2);
    }
}
