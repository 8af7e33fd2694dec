//! JSON-lines TCP transport with reconnection and timeout resilience.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use async_trait::async_trait;

use crate::link::{decode_line, LinkCommand, LinkError, LinkEvent, StreamTransport};

/// Connect timeout per attempt (seconds).
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Read timeout per line (seconds). Telemetry arrives several times a second;
/// a long quiet spell means the server or link is wedged.
const READ_TIMEOUT_SECS: u64 = 30;

/// Maximum reconnection attempts before giving up.
const MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Initial reconnection delay (doubles each attempt).
const INITIAL_RECONNECT_DELAY_SECS: u64 = 1;

/// Maximum reconnection delay cap (seconds).
const MAX_RECONNECT_DELAY_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkPhase {
    /// Never connected yet.
    Idle,
    /// Session open, reading events.
    Open,
    /// Session lost; recover on next call.
    Lost,
}

/// Persistent telemetry stream over TCP, one JSON event per line.
pub struct TcpTransport {
    host: String,
    port: u16,
    stream: Option<BufReader<TcpStream>>,
    phase: LinkPhase,
    line_buffer: String,
    /// Total events yielded since creation.
    events_received: u64,
    /// Total reconnections performed.
    reconnections: u64,
}

impl TcpTransport {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            stream: None,
            phase: LinkPhase::Idle,
            line_buffer: String::with_capacity(4096),
            events_received: 0,
            reconnections: 0,
        }
    }

    fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// One connection attempt with timeout.
    async fn connect_once(&mut self) -> Result<(), LinkError> {
        let addr = self.address();
        tracing::info!(address = %addr, "Connecting to telemetry stream");

        let connect_timeout = tokio::time::Duration::from_secs(CONNECT_TIMEOUT_SECS);
        let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| LinkError::Timeout)?
            .map_err(|e| LinkError::ConnectionFailed(e.to_string()))?;

        self.stream = Some(BufReader::new(stream));
        self.phase = LinkPhase::Open;
        tracing::info!("Telemetry stream established");
        Ok(())
    }

    /// Connect with exponential backoff. Err when attempts are exhausted.
    async fn connect_with_backoff(&mut self) -> Result<(), LinkError> {
        if let Some(ref mut reader) = self.stream {
            let _ = reader.get_mut().shutdown().await;
        }
        self.stream = None;

        for attempt in 1..=MAX_RECONNECT_ATTEMPTS {
            match self.connect_once().await {
                Ok(()) => {
                    if attempt > 1 {
                        self.reconnections += 1;
                    }
                    return Ok(());
                }
                Err(e) => {
                    let delay_secs = (INITIAL_RECONNECT_DELAY_SECS
                        * 2u64.saturating_pow(attempt - 1))
                    .min(MAX_RECONNECT_DELAY_SECS);
                    tracing::warn!(
                        attempt = attempt,
                        max_attempts = MAX_RECONNECT_ATTEMPTS,
                        delay_secs = delay_secs,
                        "Stream connect failed: {e}"
                    );
                    tokio::time::sleep(tokio::time::Duration::from_secs(delay_secs)).await;
                }
            }
        }

        Err(LinkError::ConnectionFailed(format!(
            "gave up after {MAX_RECONNECT_ATTEMPTS} attempts"
        )))
    }

    /// Read one decoded event from the open session.
    async fn read_event(&mut self) -> Result<LinkEvent, LinkError> {
        loop {
            let Some(reader) = self.stream.as_mut() else {
                return Err(LinkError::ConnectionClosed);
            };
            self.line_buffer.clear();

            let read_timeout = tokio::time::Duration::from_secs(READ_TIMEOUT_SECS);
            let bytes = match tokio::time::timeout(
                read_timeout,
                reader.read_line(&mut self.line_buffer),
            )
            .await
            {
                Err(_) => {
                    self.phase = LinkPhase::Lost;
                    return Ok(LinkEvent::Fault(format!(
                        "no data for {READ_TIMEOUT_SECS}s, reconnecting"
                    )));
                }
                Ok(Err(e)) => {
                    self.phase = LinkPhase::Lost;
                    return Ok(LinkEvent::Fault(format!("stream read failed: {e}")));
                }
                Ok(Ok(bytes)) => bytes,
            };

            if bytes == 0 {
                self.phase = LinkPhase::Lost;
                return Ok(LinkEvent::Closed);
            }

            let line = self.line_buffer.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(event) = decode_line(line) {
                self.events_received += 1;
                return Ok(event);
            }
            // Malformed line already logged; keep reading.
        }
    }
}

#[async_trait]
impl StreamTransport for TcpTransport {
    async fn next_event(&mut self) -> Result<LinkEvent, LinkError> {
        match self.phase {
            LinkPhase::Idle => {
                self.connect_with_backoff().await?;
                Ok(LinkEvent::Opened {
                    message: format!("Connected to {}", self.address()),
                })
            }
            LinkPhase::Lost => {
                self.connect_with_backoff().await?;
                Ok(LinkEvent::Opened {
                    message: format!("Reconnected to {}", self.address()),
                })
            }
            LinkPhase::Open => self.read_event().await,
        }
    }

    async fn send(&mut self, command: LinkCommand) -> Result<(), LinkError> {
        let Some(reader) = self.stream.as_mut() else {
            return Err(LinkError::ConnectionClosed);
        };
        let mut wire = command.to_wire();
        wire.push('\n');
        reader
            .get_mut()
            .write_all(wire.as_bytes())
            .await
            .map_err(|e| LinkError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }

    fn transport_name(&self) -> &str {
        "tcp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt as _;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_opened_then_frames_then_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket
                .write_all(
                    b"{\"event\":\"data_update\",\"data\":{\"fft\":{\"m1\":[1.0]}}}\n\
                      {\"event\":\"status_message\",\"data\":{\"message\":\"ok\"}}\n",
                )
                .await
                .unwrap();
            // Drop closes the connection.
        });

        let mut transport = TcpTransport::new("127.0.0.1", addr.port());

        assert!(matches!(
            transport.next_event().await.unwrap(),
            LinkEvent::Opened { .. }
        ));
        assert!(matches!(
            transport.next_event().await.unwrap(),
            LinkEvent::Frame(_)
        ));
        assert!(matches!(
            transport.next_event().await.unwrap(),
            LinkEvent::Status { .. }
        ));
        assert!(matches!(
            transport.next_event().await.unwrap(),
            LinkEvent::Closed
        ));

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_send_without_session_fails() {
        let mut transport = TcpTransport::new("127.0.0.1", 1);
        let result = transport
            .send(LinkCommand::SetMotorFrequency { frequency: 20 })
            .await;
        assert!(matches!(result, Err(LinkError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_malformed_lines_are_skipped() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket
                .write_all(
                    b"garbage\n\n{\"event\":\"status_message\",\"data\":{\"message\":\"after\"}}\n",
                )
                .await
                .unwrap();
            socket
        });

        let mut transport = TcpTransport::new("127.0.0.1", addr.port());
        transport.next_event().await.unwrap(); // Opened
        match transport.next_event().await.unwrap() {
            LinkEvent::Status { message } => assert_eq!(message, "after"),
            other => panic!("unexpected event: {other:?}"),
        }
        drop(server.await.unwrap());
    }
}
