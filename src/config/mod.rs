//! Acquisition Configuration Module
//!
//! Tunable acquisition and display parameters, validated on every update.
//! Defaults match the acquisition firmware's built-ins so a console started
//! with no file agrees with an unconfigured server.
//!
//! ## Loading Order
//!
//! 1. `--config <path>` CLI flag
//! 2. `VIBRASCOPE_CONFIG` environment variable (path to TOML file)
//! 3. `vibrascope.toml` in the current working directory
//! 4. Built-in defaults

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::types::Axis;

// ============================================================================
// Constants
// ============================================================================

/// Allowed motor drive frequency range (Hz).
pub const MOTOR_FREQUENCY_RANGE: (u32, u32) = (10, 60);
/// Allowed noise threshold range.
pub const NOISE_THRESHOLD_RANGE: (f64, f64) = (10.0, 200.0);
/// Allowed displayed spectrum range (Hz).
pub const FFT_RANGE_RANGE: (f64, f64) = (10.0, 100.0);

/// Hard cap on displayed spectrum bins regardless of configured range.
pub const MAX_SPECTRUM_POINTS: usize = 1024;

/// Frequency→RPM conversion factors per motor drive frequency, measured on
/// the reference rig. Keyed by drive frequency in Hz.
const RPM_FACTORS: &[(u32, f64)] = &[
    (10, 28.3),
    (20, 29.135),
    (30, 29.34),
    (40, 29.4),
    (50, 29.62),
    (60, 29.65),
];

/// Factor used for drive frequencies without a measured entry.
const RPM_FACTOR_FALLBACK: f64 = 29.3;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} = {value} is outside the allowed range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{field} must be positive (got {value})")]
    NotPositive { field: &'static str, value: f64 },

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

// ============================================================================
// AcquisitionConfig
// ============================================================================

/// Tunable acquisition/display parameters.
///
/// `frequency_resolution()` and `num_points()` are derived, never stored, so
/// they can never go stale relative to `sample_rate`/`fft_size`/`fft_range`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Sampling rate of the acquisition hardware (Hz).
    pub sample_rate: f64,
    /// FFT window size used by the acquisition side.
    pub fft_size: u32,
    /// Acquisition-side sample buffer capacity.
    pub buffer_size: u32,
    /// Motor drive frequency (Hz).
    pub motor_frequency: u32,
    /// Noise level above which readings are flagged.
    pub noise_threshold: f64,
    /// Upper bound of the displayed spectrum (Hz).
    pub fft_range: f64,
    /// Axis projected into the time-domain windows.
    pub main_axis: Axis,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 200.0,
            fft_size: 2048,
            buffer_size: 4096,
            motor_frequency: 20,
            noise_threshold: 50.0,
            fft_range: 100.0,
            main_axis: Axis::X,
        }
    }
}

impl AcquisitionConfig {
    /// Load configuration with the documented precedence. Falls back to
    /// built-in defaults on any failure, logging why.
    pub fn load(explicit_path: Option<&Path>) -> Self {
        let candidate = explicit_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("VIBRASCOPE_CONFIG").ok().map(Into::into))
            .unwrap_or_else(|| "vibrascope.toml".into());

        match Self::load_from_file(&candidate) {
            Ok(config) => {
                tracing::info!("📋 Loaded config from {}", candidate.display());
                config
            }
            Err(ConfigError::Io(_)) if explicit_path.is_none() => {
                tracing::info!("📋 No config file found, using built-in defaults");
                Self::default()
            }
            Err(e) => {
                tracing::warn!(
                    "⚠️  Failed to load {}: {e} (falling back to defaults)",
                    candidate.display()
                );
                Self::default()
            }
        }
    }

    /// Load and validate a TOML config file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Spectral bin width (Hz per bin).
    pub fn frequency_resolution(&self) -> f64 {
        self.sample_rate / f64::from(self.fft_size)
    }

    /// Number of spectrum bins covering `fft_range`, capped at
    /// [`MAX_SPECTRUM_POINTS`].
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn num_points(&self) -> usize {
        let bins = (self.fft_range / self.frequency_resolution()).floor() as usize;
        bins.min(MAX_SPECTRUM_POINTS)
    }

    /// Frequency→RPM factor for the current motor drive frequency.
    pub fn rpm_factor(&self) -> f64 {
        RPM_FACTORS
            .iter()
            .find(|(freq, _)| *freq == self.motor_frequency)
            .map_or(RPM_FACTOR_FALLBACK, |(_, factor)| *factor)
    }

    /// Convert a measured vibration frequency to rotational speed.
    pub fn frequency_to_rpm(&self, frequency_hz: f64) -> f64 {
        frequency_hz * self.rpm_factor()
    }

    /// Apply a partial update, returning the new config. The receiver is
    /// untouched on any validation failure.
    pub fn apply(&self, patch: &ConfigPatch) -> Result<Self, ConfigError> {
        let next = Self {
            sample_rate: patch.sample_rate.unwrap_or(self.sample_rate),
            fft_size: patch.fft_size.unwrap_or(self.fft_size),
            buffer_size: patch.buffer_size.unwrap_or(self.buffer_size),
            motor_frequency: patch.motor_frequency.unwrap_or(self.motor_frequency),
            noise_threshold: patch.noise_threshold.unwrap_or(self.noise_threshold),
            fft_range: patch.fft_range.unwrap_or(self.fft_range),
            main_axis: patch.main_axis.unwrap_or(self.main_axis),
        };
        next.validate()?;
        Ok(next)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate <= 0.0 {
            return Err(ConfigError::NotPositive {
                field: "sample_rate",
                value: self.sample_rate,
            });
        }
        if self.fft_size == 0 {
            return Err(ConfigError::NotPositive {
                field: "fft_size",
                value: 0.0,
            });
        }
        if self.buffer_size == 0 {
            return Err(ConfigError::NotPositive {
                field: "buffer_size",
                value: 0.0,
            });
        }
        check_range(
            "motor_frequency",
            f64::from(self.motor_frequency),
            f64::from(MOTOR_FREQUENCY_RANGE.0),
            f64::from(MOTOR_FREQUENCY_RANGE.1),
        )?;
        check_range(
            "noise_threshold",
            self.noise_threshold,
            NOISE_THRESHOLD_RANGE.0,
            NOISE_THRESHOLD_RANGE.1,
        )?;
        check_range(
            "fft_range",
            self.fft_range,
            FFT_RANGE_RANGE.0,
            FFT_RANGE_RANGE.1,
        )?;
        Ok(())
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

// ============================================================================
// Patches and wire updates
// ============================================================================

/// Partial config update; `None` fields keep their current value.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ConfigPatch {
    pub sample_rate: Option<f64>,
    pub fft_size: Option<u32>,
    pub buffer_size: Option<u32>,
    pub motor_frequency: Option<u32>,
    pub noise_threshold: Option<f64>,
    pub fft_range: Option<f64>,
    pub main_axis: Option<Axis>,
}

/// The `config_update` wire payload, shared by inbound server pushes and the
/// outbound POST /api/config body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    pub motor_frequency: u32,
    pub noise_threshold: f64,
    pub fft_range: f64,
    pub main_axis: Axis,
}

impl From<&AcquisitionConfig> for ConfigUpdate {
    fn from(config: &AcquisitionConfig) -> Self {
        Self {
            motor_frequency: config.motor_frequency,
            noise_threshold: config.noise_threshold,
            fft_range: config.fft_range,
            main_axis: config.main_axis,
        }
    }
}

impl From<ConfigUpdate> for ConfigPatch {
    fn from(update: ConfigUpdate) -> Self {
        Self {
            motor_frequency: Some(update.motor_frequency),
            noise_threshold: Some(update.noise_threshold),
            fft_range: Some(update.fft_range),
            main_axis: Some(update.main_axis),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_firmware() {
        let config = AcquisitionConfig::default();
        assert_eq!(config.sample_rate, 200.0);
        assert_eq!(config.fft_size, 2048);
        assert_eq!(config.buffer_size, 4096);
        assert_eq!(config.motor_frequency, 20);
        assert_eq!(config.noise_threshold, 50.0);
        assert_eq!(config.fft_range, 100.0);
        assert_eq!(config.main_axis, Axis::X);
    }

    #[test]
    fn test_derived_windowing_round_trip() {
        let config = AcquisitionConfig {
            fft_range: 50.0,
            ..AcquisitionConfig::default()
        };
        assert_eq!(config.frequency_resolution(), 0.09765625);
        assert_eq!(config.num_points(), 512);
    }

    #[test]
    fn test_num_points_is_capped() {
        // 100 Hz range at the default resolution would need 1024 bins exactly;
        // a finer resolution must not exceed the cap.
        let config = AcquisitionConfig {
            fft_size: 8192,
            ..AcquisitionConfig::default()
        };
        assert_eq!(config.num_points(), MAX_SPECTRUM_POINTS);
    }

    #[test]
    fn test_apply_partial_patch() {
        let config = AcquisitionConfig::default();
        let patch = ConfigPatch {
            motor_frequency: Some(40),
            ..ConfigPatch::default()
        };
        let next = config.apply(&patch).unwrap();
        assert_eq!(next.motor_frequency, 40);
        assert_eq!(next.noise_threshold, config.noise_threshold);
    }

    #[test]
    fn test_apply_rejects_out_of_range_motor_frequency() {
        let config = AcquisitionConfig::default();
        let patch = ConfigPatch {
            motor_frequency: Some(75),
            ..ConfigPatch::default()
        };
        let err = config.apply(&patch).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::OutOfRange {
                field: "motor_frequency",
                ..
            }
        ));
        // Receiver untouched.
        assert_eq!(config.motor_frequency, 20);
    }

    #[test]
    fn test_apply_rejects_out_of_range_noise_threshold() {
        let config = AcquisitionConfig::default();
        let patch = ConfigPatch {
            noise_threshold: Some(5.0),
            ..ConfigPatch::default()
        };
        assert!(config.apply(&patch).is_err());
    }

    #[test]
    fn test_apply_rejects_out_of_range_fft_range() {
        let config = AcquisitionConfig::default();
        let patch = ConfigPatch {
            fft_range: Some(150.0),
            ..ConfigPatch::default()
        };
        assert!(config.apply(&patch).is_err());
    }

    #[test]
    fn test_apply_recomputes_windowing() {
        let config = AcquisitionConfig::default();
        let patch = ConfigPatch {
            fft_range: Some(50.0),
            ..ConfigPatch::default()
        };
        let next = config.apply(&patch).unwrap();
        assert_eq!(next.num_points(), 512);
    }

    #[test]
    fn test_rpm_factor_table_and_fallback() {
        let mut config = AcquisitionConfig::default();
        assert_eq!(config.rpm_factor(), 29.135);
        config.motor_frequency = 10;
        // Documented reference point: 10 Hz peak at the 10 Hz drive = 283 RPM.
        assert_eq!(config.frequency_to_rpm(10.0), 283.0);
        config.motor_frequency = 35;
        assert_eq!(config.rpm_factor(), 29.3);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "sample_rate = 400.0\nmotor_frequency = 30\nmain_axis = \"z\""
        )
        .unwrap();
        let config = AcquisitionConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.sample_rate, 400.0);
        assert_eq!(config.motor_frequency, 30);
        assert_eq!(config.main_axis, Axis::Z);
        // Unspecified fields keep defaults.
        assert_eq!(config.fft_size, 2048);
    }

    #[test]
    fn test_load_from_file_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "motor_frequency = 5").unwrap();
        assert!(AcquisitionConfig::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_config_update_round_trip() {
        let config = AcquisitionConfig {
            motor_frequency: 50,
            fft_range: 80.0,
            ..AcquisitionConfig::default()
        };
        let update = ConfigUpdate::from(&config);
        let next = AcquisitionConfig::default()
            .apply(&ConfigPatch::from(update))
            .unwrap();
        assert_eq!(next.motor_frequency, 50);
        assert_eq!(next.fft_range, 80.0);
    }
}
