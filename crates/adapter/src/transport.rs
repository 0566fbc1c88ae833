//! Line-delimited JSON over any async byte stream.
//!
//! Used by both ends: the broker wraps each accepted socket, the client link wraps its
//! outgoing connection. Tests run the same code over `tokio::io::duplex`.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::protocol::{encode, parse_message, Message, ParsedMessage};

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum TransportError {
    #[display("i/o error: {_0}")]
    Io(std::io::Error),
    #[display("encode error: {_0}")]
    Encode(serde_json::Error),
}

pub struct LineReader<R> {
    lines: Lines<BufReader<R>>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            lines: BufReader::new(inner).lines(),
        }
    }

    /// Next non-blank line with the line ending stripped. `Ok(None)` at end of stream.
    ///
    /// Cancel safe: a partially read line stays buffered for the next call.
    pub async fn next_line(&mut self) -> Result<Option<String>, TransportError> {
        while let Some(line) = self.lines.next_line().await? {
            let line = line.trim();
            if !line.is_empty() {
                return Ok(Some(line.to_string()));
            }
        }
        Ok(None)
    }

    /// Next known message. Unknown types and malformed lines are logged and skipped.
    pub async fn next_message(&mut self) -> Result<Option<Message>, TransportError> {
        while let Some(line) = self.next_line().await? {
            match parse_message(&line) {
                Ok(ParsedMessage::Known(msg)) => return Ok(Some(msg)),
                Ok(ParsedMessage::Unknown(msg_type)) => {
                    tracing::debug!(msg_type = %msg_type, "Ignored unknown message type");
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Dropped malformed line");
                }
            }
        }
        Ok(None)
    }
}

pub struct LineWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write one already-encoded line and flush.
    pub async fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        self.inner.write_all(line.as_bytes()).await?;
        self.inner.write_all(b"\n").await?;
        self.inner.flush().await?;
        Ok(())
    }

    pub async fn send(&mut self, msg: &Message) -> Result<(), TransportError> {
        let line = encode(msg)?;
        self.send_line(&line).await
    }

    pub async fn shutdown(&mut self) -> Result<(), TransportError> {
        self.inner.shutdown().await?;
        Ok(())
    }
}

pub type TcpReader = LineReader<OwnedReadHalf>;
pub type TcpWriter = LineWriter<OwnedWriteHalf>;

/// Connect and split into a line reader and writer.
pub async fn connect(addr: &str) -> Result<(TcpReader, TcpWriter), TransportError> {
    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    let (read_half, write_half) = stream.into_split();
    Ok((LineReader::new(read_half), LineWriter::new(write_half)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_messages_cross_a_duplex_pipe() {
        let (a, b) = tokio::io::duplex(4096);
        let mut writer = LineWriter::new(a);
        let mut reader = LineReader::new(b);

        writer.send(&Message::Waiting).await.unwrap();
        writer.send(&Message::Garbage { lines: 2 }).await.unwrap();
        assert_eq!(reader.next_message().await.unwrap(), Some(Message::Waiting));
        assert_eq!(
            reader.next_message().await.unwrap(),
            Some(Message::Garbage { lines: 2 })
        );
    }

    #[tokio::test]
    async fn test_junk_lines_are_skipped() {
        let (a, b) = tokio::io::duplex(4096);
        let mut writer = LineWriter::new(a);
        let mut reader = LineReader::new(b);

        writer.send_line("{broken").await.unwrap();
        writer.send_line("").await.unwrap();
        writer.send_line(r#"{"type":"HELLO"}"#).await.unwrap();
        writer.send_line(r#"{"type":"GAME_OVER"}"#).await.unwrap();
        drop(writer);

        assert_eq!(reader.next_message().await.unwrap(), Some(Message::GameOver));
        assert_eq!(reader.next_message().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_line_split_across_reads() {
        let mock = tokio_test::io::Builder::new()
            .read(b"{\"type\":\"GARB")
            .read(b"AGE\",\"lines\":4}\r\n")
            .build();
        let mut reader = LineReader::new(mock);
        assert_eq!(
            reader.next_message().await.unwrap(),
            Some(Message::Garbage { lines: 4 })
        );
        assert_eq!(reader.next_message().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_writer_emits_one_line_per_message() {
        let mock = tokio_test::io::Builder::new()
            .write(b"{\"type\":\"WAITING\"}")
            .write(b"\n")
            .build();
        let mut writer = LineWriter::new(mock);
        writer.send(&Message::Waiting).await.unwrap();
    }
}
