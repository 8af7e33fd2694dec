//! Application State and Connection Status
//!
//! Shared state for the telemetry console, accessible from the ingest loop,
//! the render scheduler, the timer refresh task, and session operations.

use std::time::Instant;

use crate::config::{AcquisitionConfig, ConfigError, ConfigPatch};
use crate::pipeline::buffers::DisplayBuffers;
use crate::recorder::SessionRecorder;

// ============================================================================
// Connection status
// ============================================================================

/// Coarse link state, mutated only by connection lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connected,
}

impl ConnectionStatus {
    pub fn is_connected(self) -> bool {
        self == ConnectionStatus::Connected
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "Disconnected"),
            ConnectionStatus::Connected => write!(f, "Connected"),
        }
    }
}

// ============================================================================
// Link statistics
// ============================================================================

/// Scalar readings carried alongside the frame payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkStats {
    /// Monotonic sample counter reported by the acquisition side.
    pub total_samples: u64,
    /// Acquisition buffer occupancy percent [0, 100].
    pub buffer_usage: f64,
    /// Acquisition-side collection time in seconds.
    pub collection_time: f64,
    /// Latest reported noise level.
    pub noise_level: f64,
    /// Instantaneous frame throughput estimate (frames/s).
    pub data_rate: f64,
    /// Frames accepted since startup.
    pub frames_received: u64,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state.
///
/// Wrapped in `Arc<RwLock<>>` for access across the async runtime. Writers
/// never hold the guard across an await.
#[derive(Debug)]
pub struct AppState {
    /// Current acquisition/display parameters.
    pub config: AcquisitionConfig,

    /// Rolling display windows.
    pub buffers: DisplayBuffers,

    /// Scalar link readings.
    pub link: LinkStats,

    /// Coarse connection state.
    pub connection: ConnectionStatus,

    /// Last human-readable status message from the server.
    pub status_message: String,

    /// Recording session state machine.
    pub recorder: SessionRecorder,

    /// Process start, for uptime reporting.
    pub started_at: Instant,
}

impl Default for AppState {
    /// Deterministic zero-value suitable for tests. Production startup uses
    /// [`AppState::new`] with a loaded config.
    fn default() -> Self {
        Self::new(AcquisitionConfig::default())
    }
}

impl AppState {
    pub fn new(config: AcquisitionConfig) -> Self {
        let buffers = DisplayBuffers::sized(config.num_points());
        Self {
            config,
            buffers,
            link: LinkStats::default(),
            connection: ConnectionStatus::Disconnected,
            status_message: String::new(),
            recorder: SessionRecorder::new(),
            started_at: Instant::now(),
        }
    }

    /// Apply a validated config patch. On success the new config is stored
    /// and returned so callers can push it to the acquisition peer; display
    /// windows are left as-is and truncate at the next render tick.
    pub fn apply_config(&mut self, patch: &ConfigPatch) -> Result<AcquisitionConfig, ConfigError> {
        let next = self.config.apply(patch)?;
        tracing::info!(
            motor_frequency = next.motor_frequency,
            noise_threshold = next.noise_threshold,
            fft_range = next.fft_range,
            main_axis = %next.main_axis,
            "Config updated"
        );
        self.config = next.clone();
        Ok(next)
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
