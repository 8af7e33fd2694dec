//! Render Scheduler
//!
//! Decoupled 100 ms redraw loop. Each tick snapshots the shared state into
//! an immutable `DisplayView` and pushes it to every registered display
//! surface, unconditionally; surfaces must be idempotent. Frames arriving
//! faster than the tick are coalesced (last wins), slower links simply
//! redraw the previous window.

pub mod format;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::pipeline::{AppState, ConnectionStatus};
use crate::recorder::RecorderPhase;
use crate::types::{HarmonicReading, PeakPair, RmsPair};

/// Redraw cadence.
pub const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

/// Harmonics shown per tick; detections beyond this stay in state but are
/// not displayed.
pub const MAX_DISPLAYED_HARMONICS: usize = 5;

/// Buffer occupancy above this renders as critical.
const BUFFER_CRITICAL_PERCENT: f64 = 90.0;
/// Buffer occupancy above this renders as a warning.
const BUFFER_WARNING_PERCENT: f64 = 70.0;
/// Fraction of the noise threshold that renders as a warning.
const NOISE_WARNING_FRACTION: f64 = 0.7;

// ============================================================================
// Severity
// ============================================================================

/// Display coloring for gauge-style readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Ok,
    Warning,
    Critical,
}

impl Severity {
    /// Noise gauge: critical above the configured threshold, warning at 70%
    /// of it.
    pub fn for_noise(noise_level: f64, threshold: f64) -> Self {
        if noise_level > threshold {
            Severity::Critical
        } else if noise_level > threshold * NOISE_WARNING_FRACTION {
            Severity::Warning
        } else {
            Severity::Ok
        }
    }

    /// Buffer gauge: fixed 70/90 percent steps.
    pub fn for_buffer(usage_percent: f64) -> Self {
        if usage_percent > BUFFER_CRITICAL_PERCENT {
            Severity::Critical
        } else if usage_percent > BUFFER_WARNING_PERCENT {
            Severity::Warning
        } else {
            Severity::Ok
        }
    }
}

// ============================================================================
// DisplayView
// ============================================================================

/// Immutable per-tick snapshot handed to display surfaces.
#[derive(Debug, Clone)]
pub struct DisplayView {
    pub spectrum_m1: Vec<f64>,
    pub spectrum_m2: Vec<f64>,
    pub wave_m1: Vec<f64>,
    pub wave_m2: Vec<f64>,
    pub peaks: PeakPair,
    pub rms: RmsPair,
    /// Capped at [`MAX_DISPLAYED_HARMONICS`].
    pub harmonics: Vec<HarmonicReading>,
    pub imbalance: f64,

    /// Hz per spectrum bin at snapshot time.
    pub frequency_resolution: f64,
    pub num_points: usize,
    pub noise_threshold: f64,

    pub total_samples: u64,
    pub buffer_usage: f64,
    pub collection_time: f64,
    pub noise_level: f64,
    pub data_rate: f64,
    pub noise_severity: Severity,
    pub buffer_severity: Severity,

    pub connection: ConnectionStatus,
    pub status_message: String,

    pub recorder_phase: RecorderPhase,
    pub session_timer: String,
    pub session_points: usize,
}

impl DisplayView {
    /// Project shared state into a view. Cheap relative to the tick: one
    /// pass over the bounded windows.
    pub fn snapshot(state: &AppState) -> Self {
        let num_points = state.config.num_points();
        let mut harmonics = state.buffers.harmonics.clone();
        harmonics.truncate(MAX_DISPLAYED_HARMONICS);

        Self {
            spectrum_m1: state.buffers.spectrum_m1_view(num_points).to_vec(),
            spectrum_m2: state.buffers.spectrum_m2_view(num_points).to_vec(),
            wave_m1: state.buffers.wave_m1().to_vec(),
            wave_m2: state.buffers.wave_m2().to_vec(),
            peaks: state.buffers.peaks,
            rms: state.buffers.rms,
            harmonics,
            imbalance: state.buffers.imbalance,
            frequency_resolution: state.config.frequency_resolution(),
            num_points,
            noise_threshold: state.config.noise_threshold,
            total_samples: state.link.total_samples,
            buffer_usage: state.link.buffer_usage,
            collection_time: state.link.collection_time,
            noise_level: state.link.noise_level,
            data_rate: state.link.data_rate,
            noise_severity: Severity::for_noise(
                state.link.noise_level,
                state.config.noise_threshold,
            ),
            buffer_severity: Severity::for_buffer(state.link.buffer_usage),
            connection: state.connection,
            status_message: state.status_message.clone(),
            recorder_phase: state.recorder.phase(),
            session_timer: state.recorder.timer_display(),
            session_points: state.recorder.points().len(),
        }
    }
}

// ============================================================================
// Surfaces and the render loop
// ============================================================================

/// Something that can draw a view. Draw must be idempotent: the scheduler
/// pushes every tick whether or not anything changed.
pub trait DisplaySurface: Send {
    fn draw(&mut self, view: &DisplayView);
}

/// Default surface: periodic one-line summaries to the log stream.
#[derive(Debug, Default)]
pub struct LogSurface {
    ticks: u64,
}

impl LogSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DisplaySurface for LogSurface {
    fn draw(&mut self, view: &DisplayView) {
        self.ticks += 1;
        // Full summary once a second, trace-level in between.
        if self.ticks % 10 == 0 {
            tracing::debug!(
                connection = %view.connection,
                peak_hz = %format::frequency(view.peaks.m1.frequency),
                peak_amp = %format::amplitude(view.peaks.m1.amplitude),
                rpm = %format::rpm(view.peaks.m1.rpm),
                noise = %format::amplitude(view.noise_level),
                buffer = %format::percent(view.buffer_usage),
                samples = %format::count(view.total_samples),
                session = %view.session_timer,
                "display refresh"
            );
        } else {
            tracing::trace!(tick = self.ticks, "display refresh");
        }
    }
}

/// Run the redraw loop until cancelled.
pub async fn run_render_loop(
    state: Arc<RwLock<AppState>>,
    mut surfaces: Vec<Box<dyn DisplaySurface>>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(REDRAW_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::debug!("render loop shutting down");
                return;
            }
            _ = interval.tick() => {}
        }

        let view = {
            let state = state.read().await;
            DisplayView::snapshot(&state)
        };
        for surface in &mut surfaces {
            surface.draw(&view);
        }
    }
}
