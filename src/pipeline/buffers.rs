//! Rolling display windows.
//!
//! Update policy per channel: replace wholesale when the inbound payload is
//! usable, retain the previous window otherwise. A stale window is preferred
//! over an empty one.

use crate::types::{Axis, HarmonicReading, PeakPair, RmsPair, TelemetryFrame};

/// Fixed length of the time-domain display windows.
pub const TIME_WINDOW: usize = 100;

/// Bounded display state fed by the ingest loop and snapshotted by the
/// render scheduler.
#[derive(Debug, Clone)]
pub struct DisplayBuffers {
    spectrum_m1: Vec<f64>,
    spectrum_m2: Vec<f64>,
    wave_m1: Vec<f64>,
    wave_m2: Vec<f64>,
    pub peaks: PeakPair,
    pub rms: RmsPair,
    pub harmonics: Vec<HarmonicReading>,
    pub imbalance: f64,
}

impl Default for DisplayBuffers {
    fn default() -> Self {
        Self::sized(crate::config::MAX_SPECTRUM_POINTS)
    }
}

impl DisplayBuffers {
    /// Zero-filled windows sized for the given spectrum length.
    pub fn sized(num_points: usize) -> Self {
        Self {
            spectrum_m1: vec![0.0; num_points],
            spectrum_m2: vec![0.0; num_points],
            wave_m1: vec![0.0; TIME_WINDOW],
            wave_m2: vec![0.0; TIME_WINDOW],
            peaks: PeakPair::default(),
            rms: RmsPair::default(),
            harmonics: Vec::new(),
            imbalance: 0.0,
        }
    }

    /// Fold one decoded frame into the windows.
    ///
    /// `num_points` is the config-implied spectrum length at ingest time;
    /// inbound spectra at least that long replace the window (truncated),
    /// shorter ones are discarded and the prior window survives.
    pub fn ingest(&mut self, frame: &TelemetryFrame, num_points: usize, main_axis: Axis) {
        if let Some(spectrum) = &frame.spectrum_m1 {
            if spectrum.len() >= num_points {
                self.spectrum_m1 = spectrum[..num_points].to_vec();
            }
        }
        if let Some(spectrum) = &frame.spectrum_m2 {
            if spectrum.len() >= num_points {
                self.spectrum_m2 = spectrum[..num_points].to_vec();
            }
        }

        if let Some(samples) = &frame.time_samples {
            if !samples.is_empty() {
                // Keep the most recent TIME_WINDOW samples, projected onto
                // the configured axis.
                let start = samples.len().saturating_sub(TIME_WINDOW);
                self.wave_m1 = samples[start..]
                    .iter()
                    .map(|s| s.m1.along(main_axis))
                    .collect();
                self.wave_m2 = samples[start..]
                    .iter()
                    .map(|s| s.m2.along(main_axis))
                    .collect();
            }
        }

        if let Some(peaks) = frame.peaks {
            self.peaks = peaks;
        }
        if let Some(rms) = frame.rms {
            self.rms = rms;
        }
        if let Some(harmonics) = &frame.harmonics {
            self.harmonics = harmonics.clone();
        }
        if let Some(imbalance) = frame.imbalance {
            self.imbalance = imbalance;
        }
    }

    /// Spectrum window for point 1, truncated to the current config-implied
    /// length. Never longer than requested, may be shorter right after a
    /// widening config change until the next full frame arrives.
    pub fn spectrum_m1_view(&self, num_points: usize) -> &[f64] {
        let len = self.spectrum_m1.len().min(num_points);
        &self.spectrum_m1[..len]
    }

    pub fn spectrum_m2_view(&self, num_points: usize) -> &[f64] {
        let len = self.spectrum_m2.len().min(num_points);
        &self.spectrum_m2[..len]
    }

    pub fn spectrum_m1(&self) -> &[f64] {
        &self.spectrum_m1
    }

    pub fn spectrum_m2(&self) -> &[f64] {
        &self.spectrum_m2
    }

    pub fn wave_m1(&self) -> &[f64] {
        &self.wave_m1
    }

    pub fn wave_m2(&self) -> &[f64] {
        &self.wave_m2
    }
}
