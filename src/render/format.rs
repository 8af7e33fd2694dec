//! Fixed-precision display formatting.
//!
//! Presentation contract: one decimal for amplitudes and frequencies, zero
//! decimals for rotational speed and counts.

/// Amplitude readout, one decimal.
pub fn amplitude(value: f64) -> String {
    format!("{value:.1}")
}

/// Frequency readout in Hz, one decimal.
pub fn frequency(value: f64) -> String {
    format!("{value:.1}")
}

/// Rotational speed readout, whole number.
pub fn rpm(value: f64) -> String {
    format!("{value:.0}")
}

/// Counter readout, whole number.
pub fn count(value: u64) -> String {
    format!("{value}")
}

/// Percentage readout, whole number.
pub fn percent(value: f64) -> String {
    format!("{value:.0}%")
}
