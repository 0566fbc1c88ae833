//! Adapter module - online battle over TCP with a JSON line protocol
//!
//! This crate connects two players through a matchmaking broker. The simulation itself
//! stays in `blockfall-core`; this crate only moves messages and maps them onto core
//! events.
//!
//! # Protocol Overview
//!
//! The protocol is **line-delimited JSON** over TCP:
//!
//! 1. **Join**: Client connects and sends `JOIN`
//! 2. **Lobby**: The first client waits (`WAITING`); the second one forms a match
//! 3. **Match start**: Both receive `MATCH_START` with their role and piece sequence
//! 4. **Play**: Clients publish `STATE` every third tick, plus `GARBAGE` and `DEBUFF`
//! 5. **End**: The broker sends `GAME_END`, or `OPPONENT_DISCONNECTED` when a player leaves
//!
//! # Message Types
//!
//! ## Client -> Broker
//!
//! - **JOIN**: Enter matchmaking with a display name
//! - **STATE**: Grid, score, lines and falling piece (relayed as `OPPONENT_STATE`)
//! - **GARBAGE** / **DEBUFF**: Attacks, relayed verbatim to the opponent
//! - **GAME_OVER**: The sender topped out
//!
//! ## Broker -> Client
//!
//! - **WAITING**, **MATCH_START**, **OPPONENT_STATE**, **GARBAGE**, **DEBUFF**
//! - **TIME_SYNC**: Authoritative remaining match time in milliseconds, every second
//! - **GAME_END**: Winner role (0 for a draw) and reason
//! - **OPPONENT_DISCONNECTED**
//!
//! # Environment Variables
//!
//! - `BLOCKFALL_HOST` / `BLOCKFALL_PORT`: Broker bind address (default: 127.0.0.1:8765)
//! - `BLOCKFALL_LOG_PATH`: Append every wire line to this file as JSON lines
//! - `BLOCKFALL_MAX_PENDING`: Per-match inbound queue size
//! - `BLOCKFALL_SERVER` / `BLOCKFALL_PLAYER`: Client target and display name
//!
//! # Example Protocol Flow
//!
//! ```text
//! Client A -> Broker: {"type":"JOIN","player_name":"ann"}
//! Broker -> Client A: {"type":"WAITING"}
//! Client B -> Broker: {"type":"JOIN","player_name":"bob"}
//! Broker -> Client A: {"type":"MATCH_START","role":1,"game_id":"...","opponent_name":"bob",...}
//! Broker -> Client B: {"type":"MATCH_START","role":2,"game_id":"...","opponent_name":"ann",...}
//! Client A -> Broker: {"type":"STATE","grid":[[0,...],...],"score":0,"lines":0,"piece":{...}}
//! Broker -> Client B: {"type":"OPPONENT_STATE","grid":[[0,...],...],"score":0,...}
//! ```
//!
//! # Testing
//!
//! ```bash
//! nc 127.0.0.1 8765
//! {"type":"JOIN","player_name":"test"}
//! ```

pub mod broker;
pub mod protocol;
pub mod runtime;
pub mod session;
pub mod transport;

pub use blockfall_core as core;
pub use blockfall_types as types;

pub use broker::{run_broker, ServerConfig};
pub use protocol::{parse_message, Message, ParsedMessage};
pub use runtime::{Link, LinkConfig, LinkEvent, NetLink};
pub use session::{OnlineSession, SessionPhase};
pub use transport::TransportError;
