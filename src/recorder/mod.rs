//! Session Recorder
//!
//! Ordered log of derived sample points, gated by a three-phase lifecycle:
//! idle → running → paused ⇄ running → idle. The state machine here is
//! synchronous and clock-injected; the async orchestration around it (HTTP
//! notifications to the acquisition side, user notices) lives in [`ops`].

pub mod ops;

use std::time::Duration;

use thiserror::Error;
// tokio's Instant so the session clock follows the virtualized clock in
// paused-time tests.
use tokio::time::Instant;

use crate::pipeline::{DisplayBuffers, LinkStats};
use crate::types::{format_hms, RecordedPoint};

// ============================================================================
// Phases and outcomes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecorderPhase {
    #[default]
    Idle,
    Running,
    Paused,
}

impl std::fmt::Display for RecorderPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecorderPhase::Idle => write!(f, "idle"),
            RecorderPhase::Running => write!(f, "running"),
            RecorderPhase::Paused => write!(f, "paused"),
        }
    }
}

/// What `stop()` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Session frozen; this many points are held for export.
    Stopped { points: usize },
    /// Nothing was running and nothing is held; no notification owed.
    NoOp,
}

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("not connected to the acquisition server")]
    NotConnected,
}

// ============================================================================
// SessionRecorder
// ============================================================================

/// Recording session state machine. Clock values are injected so tests can
/// drive it deterministically.
#[derive(Debug, Default)]
pub struct SessionRecorder {
    phase: RecorderPhase,
    started_at: Option<Instant>,
    elapsed: Duration,
    points: Vec<RecordedPoint>,
}

impl SessionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> RecorderPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == RecorderPhase::Running
    }

    /// Whether a session exists in any non-idle phase.
    pub fn is_active(&self) -> bool {
        self.phase != RecorderPhase::Idle
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }

    /// `HH:MM:SS` readout of the session clock.
    pub fn timer_display(&self) -> String {
        format_hms(self.elapsed_ms())
    }

    pub fn points(&self) -> &[RecordedPoint] {
        &self.points
    }

    /// Begin a fresh session. Fails without state change when the link is
    /// down; otherwise clears any previously held points and anchors the
    /// session clock at `now`.
    pub fn start(&mut self, now: Instant, connected: bool) -> Result<(), RecorderError> {
        if !connected {
            return Err(RecorderError::NotConnected);
        }
        self.points.clear();
        self.elapsed = Duration::ZERO;
        self.started_at = Some(now);
        self.phase = RecorderPhase::Running;
        Ok(())
    }

    /// Freeze the session clock. Only meaningful while running.
    pub fn pause(&mut self, now: Instant) {
        if self.phase != RecorderPhase::Running {
            return;
        }
        self.tick(now);
        self.phase = RecorderPhase::Paused;
    }

    /// Continue a paused session. The anchor is moved to `now - elapsed` so
    /// the timer resumes seamlessly and paused time never counts.
    pub fn resume(&mut self, now: Instant) {
        if self.phase != RecorderPhase::Paused {
            return;
        }
        self.started_at = now.checked_sub(self.elapsed);
        self.phase = RecorderPhase::Running;
    }

    /// Refresh the elapsed readout from the anchor. No-op unless running.
    pub fn tick(&mut self, now: Instant) {
        if self.phase != RecorderPhase::Running {
            return;
        }
        if let Some(anchor) = self.started_at {
            self.elapsed = now.duration_since(anchor);
        }
    }

    /// End the session, freezing the point sequence for export. Idempotent:
    /// returns `NoOp` when idle with nothing held.
    pub fn stop(&mut self) -> StopOutcome {
        if self.phase == RecorderPhase::Idle && self.points.is_empty() {
            return StopOutcome::NoOp;
        }
        self.phase = RecorderPhase::Idle;
        self.started_at = None;
        StopOutcome::Stopped {
            points: self.points.len(),
        }
    }

    /// Drop any held points (session must be idle; callers stop first).
    pub fn clear(&mut self) {
        self.points.clear();
        self.elapsed = Duration::ZERO;
    }

    /// Project the current display state into a `RecordedPoint` and append
    /// it. Only running sessions capture; paused and idle are no-ops.
    pub fn capture(&mut self, buffers: &DisplayBuffers, stats: &LinkStats, now: Instant) {
        if self.phase != RecorderPhase::Running {
            return;
        }
        self.tick(now);
        let elapsed_ms = self.elapsed_ms();
        self.points.push(RecordedPoint {
            timestamp: chrono::Utc::now(),
            elapsed_ms,
            time_formatted: format_hms(elapsed_ms),
            dominant_freq: buffers.peaks.m1.frequency,
            peak_amplitude: buffers.peaks.m1.amplitude,
            imbalance: buffers.imbalance,
            rms1_x: buffers.rms.m1.x,
            rms1_y: buffers.rms.m1.y,
            rms1_z: buffers.rms.m1.z,
            rms2_x: buffers.rms.m2.x,
            rms2_y: buffers.rms.m2.y,
            rms2_z: buffers.rms.m2.z,
            buffer_usage: stats.buffer_usage,
            noise_level: stats.noise_level,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_start_fails_when_disconnected() {
        let mut recorder = SessionRecorder::new();
        let err = recorder.start(Instant::now(), false);
        assert!(matches!(err, Err(RecorderError::NotConnected)));
        assert_eq!(recorder.phase(), RecorderPhase::Idle);
        assert!(recorder.points().is_empty());
    }

    #[test]
    fn test_start_clears_previous_session() {
        let mut recorder = SessionRecorder::new();
        let t0 = Instant::now();
        recorder.start(t0, true).unwrap();
        recorder.capture(&DisplayBuffers::sized(8), &LinkStats::default(), t0 + secs(1));
        recorder.stop();
        assert_eq!(recorder.points().len(), 1);

        recorder.start(t0 + secs(10), true).unwrap();
        assert!(recorder.points().is_empty());
        assert_eq!(recorder.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_pause_resume_counts_running_time_only() {
        let mut recorder = SessionRecorder::new();
        let t0 = Instant::now();
        recorder.start(t0, true).unwrap();

        // Run 5s, pause for 60s, run 3s more.
        recorder.pause(t0 + secs(5));
        assert_eq!(recorder.elapsed(), secs(5));

        recorder.tick(t0 + secs(30));
        assert_eq!(recorder.elapsed(), secs(5), "paused clock must not advance");

        recorder.resume(t0 + secs(65));
        recorder.tick(t0 + secs(68));
        assert_eq!(recorder.elapsed(), secs(8));
        assert_eq!(recorder.timer_display(), "00:00:08");
    }

    #[test]
    fn test_pause_when_not_running_is_ignored() {
        let mut recorder = SessionRecorder::new();
        recorder.pause(Instant::now());
        assert_eq!(recorder.phase(), RecorderPhase::Idle);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut recorder = SessionRecorder::new();
        assert_eq!(recorder.stop(), StopOutcome::NoOp);

        let t0 = Instant::now();
        recorder.start(t0, true).unwrap();
        recorder.capture(&DisplayBuffers::sized(8), &LinkStats::default(), t0 + secs(1));
        assert_eq!(recorder.stop(), StopOutcome::Stopped { points: 1 });

        // Points are still held, so a second stop re-reports them.
        assert_eq!(recorder.stop(), StopOutcome::Stopped { points: 1 });
        recorder.clear();
        assert_eq!(recorder.stop(), StopOutcome::NoOp);
    }

    #[test]
    fn test_capture_gated_by_phase() {
        let mut recorder = SessionRecorder::new();
        let buffers = DisplayBuffers::sized(8);
        let stats = LinkStats::default();
        let t0 = Instant::now();

        recorder.capture(&buffers, &stats, t0);
        assert!(recorder.points().is_empty(), "idle must not capture");

        recorder.start(t0, true).unwrap();
        recorder.capture(&buffers, &stats, t0 + secs(1));
        assert_eq!(recorder.points().len(), 1);

        recorder.pause(t0 + secs(2));
        recorder.capture(&buffers, &stats, t0 + secs(3));
        assert_eq!(recorder.points().len(), 1, "paused must not capture");
    }

    #[test]
    fn test_capture_projects_display_state() {
        let mut recorder = SessionRecorder::new();
        let mut buffers = DisplayBuffers::sized(8);
        buffers.peaks.m1 = crate::types::PeakReading {
            frequency: 20.5,
            amplitude: 3.4,
            rpm: 597.3,
        };
        buffers.rms.m2.z = 1.25;
        buffers.imbalance = 6.0;
        let stats = LinkStats {
            buffer_usage: 75.0,
            noise_level: 42.0,
            ..LinkStats::default()
        };

        let t0 = Instant::now();
        recorder.start(t0, true).unwrap();
        recorder.capture(&buffers, &stats, t0 + Duration::from_millis(1500));

        let point = &recorder.points()[0];
        assert_eq!(point.elapsed_ms, 1500);
        assert_eq!(point.time_formatted, "00:00:01");
        assert_eq!(point.dominant_freq, 20.5);
        assert_eq!(point.peak_amplitude, 3.4);
        assert_eq!(point.rms2_z, 1.25);
        assert_eq!(point.imbalance, 6.0);
        assert_eq!(point.buffer_usage, 75.0);
        assert_eq!(point.noise_level, 42.0);
    }
}
