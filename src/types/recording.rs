//! Recorded session point shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Format a millisecond duration as `HH:MM:SS`.
pub fn format_hms(elapsed_ms: u64) -> String {
    let total_secs = elapsed_ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// One derived sample appended to a recording session, in the exact shape
/// the export endpoint consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedPoint {
    /// UTC capture time.
    pub timestamp: DateTime<Utc>,
    /// Milliseconds since the session clock anchor.
    pub elapsed_ms: u64,
    /// `HH:MM:SS` rendering of `elapsed_ms`.
    pub time_formatted: String,
    /// Dominant peak frequency at capture (Hz), post validity filtering.
    pub dominant_freq: f64,
    pub peak_amplitude: f64,
    pub imbalance: f64,
    pub rms1_x: f64,
    pub rms1_y: f64,
    pub rms1_z: f64,
    pub rms2_x: f64,
    pub rms2_y: f64,
    pub rms2_z: f64,
    pub buffer_usage: f64,
    pub noise_level: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hms_zero() {
        assert_eq!(format_hms(0), "00:00:00");
    }

    #[test]
    fn test_format_hms_rounds_down_within_second() {
        assert_eq!(format_hms(999), "00:00:00");
        assert_eq!(format_hms(1000), "00:00:01");
    }

    #[test]
    fn test_format_hms_carries_into_hours() {
        // 1h 2m 3s
        assert_eq!(format_hms((3600 + 120 + 3) * 1000), "01:02:03");
    }

    #[test]
    fn test_recorded_point_serializes_flat() {
        let point = RecordedPoint {
            timestamp: Utc::now(),
            elapsed_ms: 1500,
            time_formatted: format_hms(1500),
            dominant_freq: 20.1,
            peak_amplitude: 44.0,
            imbalance: 3.2,
            rms1_x: 1.0,
            rms1_y: 2.0,
            rms1_z: 3.0,
            rms2_x: 4.0,
            rms2_y: 5.0,
            rms2_z: 6.0,
            buffer_usage: 62.5,
            noise_level: 18.0,
        };
        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(json["time_formatted"], "00:00:01");
        assert_eq!(json["rms2_z"], 6.0);
        assert_eq!(json["elapsed_ms"], 1500);
    }
}
