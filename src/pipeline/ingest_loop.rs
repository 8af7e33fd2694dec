//! Ingest loop: drives a stream transport, folds events into shared state.
//!
//! The loop owns the decoder and the transport; everything else observes the
//! results through `Arc<RwLock<AppState>>`. Outbound commands arrive over a
//! channel so other tasks never need transport access.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

use crate::link::{LinkCommand, LinkEvent, StreamTransport};
use crate::notify::Notifier;
use crate::pipeline::decoder::{Decoded, TelemetryDecoder};
use crate::pipeline::state::{AppState, ConnectionStatus};

/// Summary returned when the loop exits.
#[derive(Debug, Default, Clone, Copy)]
pub struct IngestStats {
    pub frames_decoded: u64,
    pub frames_skipped: u64,
    pub sessions_opened: u64,
    pub sessions_lost: u64,
}

pub struct IngestLoop {
    state: Arc<RwLock<AppState>>,
    notifier: Arc<dyn Notifier>,
    cancel: CancellationToken,
    command_rx: mpsc::Receiver<LinkCommand>,
    decoder: TelemetryDecoder,
    stats: IngestStats,
}

impl IngestLoop {
    pub fn new(
        state: Arc<RwLock<AppState>>,
        notifier: Arc<dyn Notifier>,
        cancel: CancellationToken,
        command_rx: mpsc::Receiver<LinkCommand>,
    ) -> Self {
        Self {
            state,
            notifier,
            cancel,
            command_rx,
            decoder: TelemetryDecoder::new(),
            stats: IngestStats::default(),
        }
    }

    /// Run until cancellation, transport exhaustion, or command-channel
    /// closure plus transport EOF.
    pub async fn run<T: StreamTransport>(mut self, transport: &mut T) -> IngestStats {
        tracing::info!(transport = transport.transport_name(), "Ingest loop started");

        let mut commands_open = true;
        loop {
            // Biased: drain cancellation and pending commands before the
            // next read so outbound commands are never starved by a busy
            // stream.
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    tracing::info!("Ingest loop cancelled");
                    break;
                }
                command = self.command_rx.recv(), if commands_open => {
                    match command {
                        Some(command) => {
                            if let Err(e) = transport.send(command).await {
                                tracing::warn!("failed to send {command:?}: {e}");
                            }
                        }
                        // No more commands will come; stop polling the channel.
                        None => commands_open = false,
                    }
                }
                event = transport.next_event() => {
                    match event {
                        Ok(event) => self.handle_event(event).await,
                        Err(e) => {
                            tracing::error!("transport gave up: {e}");
                            self.notifier.notify(&format!("Connection lost: {e}"));
                            self.mark_disconnected("Connection lost").await;
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!(
            frames_decoded = self.stats.frames_decoded,
            frames_skipped = self.stats.frames_skipped,
            "Ingest loop finished"
        );
        self.stats
    }

    async fn handle_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Opened { message } => {
                self.stats.sessions_opened += 1;
                {
                    let mut state = self.state.write().await;
                    state.connection = ConnectionStatus::Connected;
                    state.status_message.clone_from(&message);
                }
                self.notifier.notify(&message);
            }
            LinkEvent::Closed => {
                self.stats.sessions_lost += 1;
                self.mark_disconnected("Connection closed by server").await;
                self.notifier.notify("Connection closed by server");
            }
            LinkEvent::Fault(message) => {
                self.notifier.notify(&format!("Stream error: {message}"));
            }
            LinkEvent::Status { message } => {
                self.notifier.notify(&message);
            }
            LinkEvent::ConfigPush(update) => {
                let mut state = self.state.write().await;
                match state.apply_config(&update.into()) {
                    Ok(_) => tracing::debug!("applied server config push"),
                    Err(e) => tracing::warn!("ignoring server config push: {e}"),
                }
            }
            LinkEvent::Frame(raw) => {
                let now = Instant::now();
                match self.decoder.decode(*raw, now) {
                    Decoded::Skip => self.stats.frames_skipped += 1,
                    Decoded::Frame(frame) => {
                        self.stats.frames_decoded += 1;
                        let mut guard = self.state.write().await;
                        let AppState {
                            config,
                            buffers,
                            link,
                            recorder,
                            ..
                        } = &mut *guard;

                        buffers.ingest(&frame, config.num_points(), config.main_axis);
                        link.total_samples = frame.total_samples;
                        link.buffer_usage = frame.buffer_usage;
                        link.collection_time = frame.collection_time;
                        link.noise_level = frame.noise_level;
                        link.data_rate = self.decoder.rate();
                        link.frames_received = self.decoder.frames_processed();

                        recorder.capture(buffers, link, tokio::time::Instant::now());
                    }
                }
            }
        }
    }

    async fn mark_disconnected(&self, message: &str) {
        let mut state = self.state.write().await;
        state.connection = ConnectionStatus::Disconnected;
        state.status_message = message.to_string();
        if state.recorder.is_active() {
            // Deliberate: the session keeps its phase across a link loss so
            // a reconnect can continue it. The operator decides what to do.
            tracing::warn!(
                phase = %state.recorder.phase(),
                "link lost while a recording session is active"
            );
        }
    }
}
