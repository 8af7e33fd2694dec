//! Shared data structures for the vibration telemetry pipeline
//!
//! - `frame`: inbound wire shape (`RawFrame`) and the canonical decoded
//!   `TelemetryFrame`, plus axis/peak/harmonic/RMS primitives
//! - `recording`: the `RecordedPoint` shape consumed by session export

mod frame;
mod recording;

pub use frame::*;
pub use recording::*;
