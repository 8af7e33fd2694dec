//! Stream transport abstraction for telemetry ingestion.
//!
//! Provides a unified trait for the persistent bidirectional channel to the
//! acquisition server: a JSON-lines TCP transport for production and a
//! synthetic generator for development without hardware.

pub mod synthetic;
pub mod tcp;

pub use synthetic::SyntheticTransport;
pub use tcp::TcpTransport;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::ConfigUpdate;
use crate::types::RawFrame;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("timeout waiting for data")]
    Timeout,

    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Events produced by a stream transport.
#[derive(Debug)]
pub enum LinkEvent {
    /// Session established (or re-established); message is the server
    /// greeting if one was sent.
    Opened { message: String },
    /// Session lost; the transport will try to recover on the next call.
    Closed,
    /// Transient fault worth surfacing to the operator.
    Fault(String),
    /// Server-pushed human-readable status line.
    Status { message: String },
    /// Server-pushed tunable change.
    ConfigPush(ConfigUpdate),
    /// One telemetry payload.
    Frame(Box<RawFrame>),
}

/// Commands the console sends upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkCommand {
    SetMotorFrequency { frequency: u32 },
}

impl LinkCommand {
    /// Wire encoding: one JSON object per line.
    pub fn to_wire(self) -> String {
        match self {
            LinkCommand::SetMotorFrequency { frequency } => {
                serde_json::json!({
                    "event": "set_motor_freq",
                    "data": { "frequency": frequency }
                })
                .to_string()
            }
        }
    }
}

/// Trait abstracting where telemetry events come from.
///
/// Implementations handle framing, reconnection, and pacing internally.
/// The ingest loop calls [`next_event`](StreamTransport::next_event) in a
/// select! with cancellation.
#[async_trait]
pub trait StreamTransport: Send + 'static {
    /// Wait for the next event. An `Err` means the transport has given up
    /// (reconnection exhausted); recoverable faults come back as events.
    async fn next_event(&mut self) -> Result<LinkEvent, LinkError>;

    /// Send a command upstream. Fails when no session is open.
    async fn send(&mut self, command: LinkCommand) -> Result<(), LinkError>;

    /// Human-readable name for logging (e.g. "tcp", "synthetic").
    fn transport_name(&self) -> &str;
}

// ============================================================================
// Wire envelope
// ============================================================================

#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MessagePayload {
    #[serde(default)]
    message: String,
}

/// Decode one wire line into a link event. `None` means the line was
/// malformed or carried an unknown event; callers skip and keep reading.
pub(crate) fn decode_line(line: &str) -> Option<LinkEvent> {
    let envelope: Envelope = match serde_json::from_str(line) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!("[link] failed to parse event: {e}");
            return None;
        }
    };

    match envelope.event.as_str() {
        "data_update" => match serde_json::from_value::<RawFrame>(envelope.data) {
            Ok(raw) => Some(LinkEvent::Frame(Box::new(raw))),
            Err(e) => {
                tracing::warn!("[link] malformed data_update payload: {e}");
                None
            }
        },
        "status_message" => {
            let payload: MessagePayload =
                serde_json::from_value(envelope.data).unwrap_or(MessagePayload {
                    message: String::new(),
                });
            Some(LinkEvent::Status {
                message: payload.message,
            })
        }
        "config_update" => match serde_json::from_value::<ConfigUpdate>(envelope.data) {
            Ok(update) => Some(LinkEvent::ConfigPush(update)),
            Err(e) => {
                tracing::warn!("[link] malformed config_update payload: {e}");
                None
            }
        },
        other => {
            tracing::debug!("[link] ignoring unknown event '{other}'");
            None
        }
    }
}
