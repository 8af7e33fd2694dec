//! Telemetry frame types
//!
//! `RawFrame` is the untrusted wire shape: every field is optional and the
//! decoder fills defaults. `TelemetryFrame` is the canonical decoded frame
//! consumed by the buffer layer and the session recorder.

use serde::{Deserialize, Serialize};

/// Spectral peaks below this frequency are noise-floor artifacts and are
/// normalized to the zero peak before display or recording.
pub const MIN_VALID_PEAK_HZ: f64 = 1.0;

// ============================================================================
// Axes
// ============================================================================

/// Spatial axis of an accelerometer sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    #[default]
    X,
    Y,
    Z,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
            Axis::Z => write!(f, "z"),
        }
    }
}

impl std::str::FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" => Ok(Axis::Z),
            other => Err(format!("invalid axis '{other}' (expected x, y, or z)")),
        }
    }
}

/// One acceleration vector (mm/s² per axis).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Vec3 {
    /// Project the vector onto a single axis.
    pub fn along(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

/// One time-domain sample: a vector per monitored point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisSample {
    #[serde(default)]
    pub m1: Vec3,
    #[serde(default)]
    pub m2: Vec3,
}

// ============================================================================
// Peaks, harmonics, RMS
// ============================================================================

/// Dominant spectral peak for one monitored point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeakReading {
    pub frequency: f64,
    pub amplitude: f64,
    pub rpm: f64,
}

impl PeakReading {
    /// The absent/degenerate peak.
    pub const ZERO: PeakReading = PeakReading {
        frequency: 0.0,
        amplitude: 0.0,
        rpm: 0.0,
    };

    /// Apply the peak-validity invariant: sub-1 Hz peaks collapse to zero.
    pub fn validated(self) -> PeakReading {
        if self.frequency < MIN_VALID_PEAK_HZ {
            PeakReading::ZERO
        } else {
            self
        }
    }

    /// Whether this peak carries a meaningful detection.
    pub fn is_significant(&self) -> bool {
        self.frequency > 0.0
    }
}

/// Validated peak per monitored point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeakPair {
    pub m1: PeakReading,
    pub m2: PeakReading,
}

/// One detected harmonic of the fundamental peak.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HarmonicReading {
    /// Harmonic index (always ≥ 2; the fundamental is reported as the peak).
    pub harmonic: u32,
    pub frequency: f64,
    pub amplitude: f64,
    pub rpm: f64,
    /// Ratio of this harmonic's frequency to the fundamental.
    pub ratio: f64,
}

/// Root-mean-square magnitude per axis for one monitored point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RmsTriple {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

/// RMS triples for both monitored points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RmsPair {
    #[serde(default)]
    pub m1: RmsTriple,
    #[serde(default)]
    pub m2: RmsTriple,
}

// ============================================================================
// Raw (wire) frame
// ============================================================================

/// Inbound `data_update` payload. Untrusted: any field may be missing or
/// partially populated; the decoder never fails on absence.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFrame {
    pub total_samples: Option<u64>,
    /// Buffer occupancy percent [0, 100].
    pub buffer_status: Option<f64>,
    /// Collection elapsed time in seconds.
    pub collection_time: Option<f64>,
    pub current_noise: Option<f64>,
    pub fft: Option<RawSpectra>,
    pub time_data: Option<Vec<AxisSample>>,
    pub peaks: Option<RawPeakPair>,
    pub harmonics: Option<Vec<RawHarmonic>>,
    pub rms: Option<RmsPair>,
    pub imbalance: Option<f64>,
}

/// Per-point spectra; either channel may be absent independently.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSpectra {
    pub m1: Option<Vec<f64>>,
    pub m2: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RawPeak {
    pub frequency: Option<f64>,
    pub amplitude: Option<f64>,
    pub rpm: Option<f64>,
}

impl RawPeak {
    /// Fill defaults and apply the peak-validity invariant.
    pub fn normalized(self) -> PeakReading {
        PeakReading {
            frequency: self.frequency.unwrap_or(0.0),
            amplitude: self.amplitude.unwrap_or(0.0),
            rpm: self.rpm.unwrap_or(0.0),
        }
        .validated()
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RawPeakPair {
    pub m1: Option<RawPeak>,
    pub m2: Option<RawPeak>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RawHarmonic {
    pub harmonic: Option<u32>,
    pub frequency: Option<f64>,
    pub amplitude: Option<f64>,
    pub rpm: Option<f64>,
    pub ratio: Option<f64>,
}

// ============================================================================
// Canonical decoded frame
// ============================================================================

/// Canonical telemetry frame after default-filling and validity filtering.
///
/// Spectra, time samples, peaks, RMS, harmonics, and imbalance stay optional
/// so the buffer layer can retain the previous window when a channel is
/// absent from an update (stale-data-over-no-data).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryFrame {
    pub total_samples: u64,
    pub buffer_usage: f64,
    pub collection_time: f64,
    pub noise_level: f64,
    pub spectrum_m1: Option<Vec<f64>>,
    pub spectrum_m2: Option<Vec<f64>>,
    pub time_samples: Option<Vec<AxisSample>>,
    pub peaks: Option<PeakPair>,
    pub harmonics: Option<Vec<HarmonicReading>>,
    pub rms: Option<RmsPair>,
    pub imbalance: Option<f64>,
}
