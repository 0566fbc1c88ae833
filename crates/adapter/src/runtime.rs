//! Link runtime integration.
//!
//! Bridges the synchronous game loop with the async TCP connection. The game loop never
//! blocks on the network: inbound messages are polled with [`Link::try_recv`] and
//! outbound ones are queued with [`Link::send`].

use anyhow::Context;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

use crate::protocol::{create_join, Message};
use crate::transport::connect;

/// What the game loop sees of the connection.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    Connected,
    Message(Message),
    /// Terminal; nothing follows.
    Disconnected { reason: String },
}

/// Non-blocking message pipe to the broker.
pub trait Link {
    /// Next inbound event, if one is ready.
    fn try_recv(&mut self) -> Option<LinkEvent>;
    /// Queue a message. Dropped silently once the link is closed.
    fn send(&mut self, msg: Message);
    /// Stop sending and discard anything not yet delivered.
    fn close(&mut self);
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// `host:port` of the broker.
    pub server: String,
    pub player_name: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            server: "127.0.0.1:8765".to_string(),
            player_name: "Player".to_string(),
        }
    }
}

impl LinkConfig {
    /// Read `BLOCKFALL_SERVER` and `BLOCKFALL_PLAYER`, falling back to the defaults.
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();
        let server = env::var("BLOCKFALL_SERVER")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.server);
        let player_name = env::var("BLOCKFALL_PLAYER")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.player_name);

        Self {
            server,
            player_name,
        }
    }
}

/// Production link: owns a tokio runtime running the connection task.
pub struct NetLink {
    _rt: Runtime,
    event_rx: mpsc::UnboundedReceiver<LinkEvent>,
    out_tx: Option<mpsc::UnboundedSender<Message>>,
    finished: bool,
}

impl NetLink {
    /// Start connecting in the background and join matchmaking once connected.
    pub fn start(config: LinkConfig) -> anyhow::Result<Self> {
        let rt = Runtime::new().context("failed to create tokio runtime")?;
        let (event_tx, event_rx) = mpsc::unbounded_channel::<LinkEvent>();
        let (out_tx, out_rx) = mpsc::unbounded_channel::<Message>();

        rt.spawn(async move {
            let reason = match run_link(config, event_tx.clone(), out_rx).await {
                Ok(()) => "connection closed".to_string(),
                Err(e) => {
                    tracing::warn!(error = %e, "Link failed");
                    e.to_string()
                }
            };
            let _ = event_tx.send(LinkEvent::Disconnected { reason });
        });

        Ok(Self {
            _rt: rt,
            event_rx,
            out_tx: Some(out_tx),
            finished: false,
        })
    }
}

async fn run_link(
    config: LinkConfig,
    event_tx: mpsc::UnboundedSender<LinkEvent>,
    mut out_rx: mpsc::UnboundedReceiver<Message>,
) -> anyhow::Result<()> {
    let (mut reader, mut writer) = connect(&config.server)
        .await
        .with_context(|| format!("failed to connect to {}", config.server))?;
    tracing::info!(server = %config.server, "Connected");
    let _ = event_tx.send(LinkEvent::Connected);

    writer.send(&create_join(&config.player_name)).await?;

    let write_task = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            if let Err(e) = writer.send(&msg).await {
                tracing::warn!(error = %e, "Send failed");
                break;
            }
        }
        let _ = writer.shutdown().await;
    });

    let result = loop {
        match reader.next_message().await {
            Ok(Some(msg)) => {
                if event_tx.send(LinkEvent::Message(msg)).is_err() {
                    break Ok(());
                }
            }
            Ok(None) => break Ok(()),
            Err(e) => break Err(e.into()),
        }
    };

    write_task.abort();
    result
}

impl Link for NetLink {
    fn try_recv(&mut self) -> Option<LinkEvent> {
        if self.finished {
            return None;
        }
        let event = self.event_rx.try_recv().ok()?;
        if matches!(event, LinkEvent::Disconnected { .. }) {
            self.finished = true;
            self.out_tx = None;
        }
        Some(event)
    }

    fn send(&mut self, msg: Message) {
        if let Some(tx) = self.out_tx.as_ref() {
            let _ = tx.send(msg);
        }
    }

    fn close(&mut self) {
        self.out_tx = None;
        self.finished = true;
        self.event_rx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_config_defaults() {
        let config = LinkConfig::default();
        assert_eq!(config.server, "127.0.0.1:8765");
        assert_eq!(config.player_name, "Player");
    }

    #[test]
    fn test_link_config_from_env() {
        // This test just ensures it doesn't panic
        let _config = LinkConfig::from_env();
    }

    #[test]
    fn test_unreachable_server_reports_disconnect() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut link = NetLink::start(LinkConfig {
            server: addr.to_string(),
            player_name: "solo".to_string(),
        })
        .unwrap();

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        let event = loop {
            if let Some(event) = link.try_recv() {
                break event;
            }
            assert!(std::time::Instant::now() < deadline, "no event from link");
            std::thread::sleep(std::time::Duration::from_millis(10));
        };
        assert!(matches!(event, LinkEvent::Disconnected { .. }));
        assert!(link.try_recv().is_none());
    }
}
