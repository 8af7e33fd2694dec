//! Telemetry Processing Pipeline
//!
//! ```text
//! transport event ──► decoder ──► display buffers ──► render snapshot
//!                        │              │
//!                        │              └──► session recorder (if running)
//!                        └──► link stats / connection status
//! ```
//!
//! The ingest loop is the only writer on the frame path; periodic tasks
//! (render, timer refresh, status poll) take short independent locks.

pub mod buffers;
pub mod decoder;
pub mod ingest_loop;
mod state;

pub use buffers::{DisplayBuffers, TIME_WINDOW};
pub use decoder::{Decoded, TelemetryDecoder};
pub use ingest_loop::{IngestLoop, IngestStats};
pub use state::*;
