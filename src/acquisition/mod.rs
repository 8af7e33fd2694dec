//! Acquisition server REST surface
//!
//! Typed client for the control endpoints (port management, calibration,
//! config push, test lifecycle, export) plus the background status poll.

pub mod client;
pub mod poll;

pub use client::{AcquisitionClient, AcquisitionStatus, ClientError};
pub use poll::run_status_poll;
