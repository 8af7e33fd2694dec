//! Vibrascope: Real-Time Vibration Telemetry Console
//!
//! Client-side pipeline for vibration analysis data streamed from an
//! acquisition server.
//!
//! ## Architecture
//!
//! - **Link**: persistent stream transport (TCP JSON-lines or synthetic)
//! - **Pipeline**: decoder, rolling display buffers, shared state, ingest loop
//! - **Render**: fixed-cadence redraw onto pluggable display surfaces
//! - **Recorder**: session point capture with pause/resume lifecycle
//! - **Acquisition**: typed client for the server's REST control surface

pub mod acquisition;
pub mod config;
pub mod link;
pub mod notify;
pub mod pipeline;
pub mod recorder;
pub mod render;
pub mod types;

// Re-export configuration
pub use config::{AcquisitionConfig, ConfigError, ConfigPatch, ConfigUpdate};

// Re-export commonly used types
pub use types::{
    Axis, HarmonicReading, PeakPair, PeakReading, RawFrame, RecordedPoint, RmsPair, RmsTriple,
    TelemetryFrame,
};

// Re-export pipeline components
pub use pipeline::{AppState, ConnectionStatus, DisplayBuffers, IngestLoop, TelemetryDecoder};

// Re-export the transport seam
pub use link::{LinkCommand, LinkError, LinkEvent, StreamTransport};

// Re-export recorder components
pub use recorder::{RecorderPhase, SessionRecorder, StopOutcome};

// Re-export notification seam
pub use notify::{LogNotifier, Notifier};
