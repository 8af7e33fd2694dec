//! Telemetry Decoder
//!
//! Normalizes untrusted inbound frames into canonical `TelemetryFrame`s.
//! Decoding never fails: missing monotonic counters carry the prior value
//! forward, missing instantaneous readings default to zero, and payloads
//! without a spectral section are skipped outright.

use std::time::Instant;

use crate::types::{HarmonicReading, PeakPair, RawFrame, TelemetryFrame};

/// Outcome of decoding one inbound payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A usable frame for the buffer layer.
    Frame(TelemetryFrame),
    /// Payload carried no spectral data; nothing to display.
    Skip,
}

/// Stateful decoder. Carries the last-seen counters so sparse payloads do
/// not regress monotonic readings, plus a throughput estimate.
#[derive(Debug, Default)]
pub struct TelemetryDecoder {
    frames_processed: u64,
    last_frame_at: Option<Instant>,
    last_total_samples: u64,
    last_collection_time: f64,
    data_rate: f64,
}

impl TelemetryDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Instantaneous throughput estimate: frames processed divided by the
    /// gap to the previous frame. Recomputed every accepted frame; noisy.
    pub fn rate(&self) -> f64 {
        self.data_rate
    }

    /// Decode one raw payload observed at `now`.
    pub fn decode(&mut self, raw: RawFrame, now: Instant) -> Decoded {
        let Some(spectra) = raw.fft else {
            tracing::trace!("dropping payload without spectral section");
            return Decoded::Skip;
        };

        self.frames_processed += 1;
        if let Some(previous) = self.last_frame_at {
            let gap = now.duration_since(previous).as_secs_f64();
            if gap > 0.0 {
                #[allow(clippy::cast_precision_loss)]
                {
                    self.data_rate = self.frames_processed as f64 / gap;
                }
            }
        }
        self.last_frame_at = Some(now);

        // Monotonic counters never regress on sparse payloads.
        let total_samples = raw
            .total_samples
            .unwrap_or(self.last_total_samples)
            .max(self.last_total_samples);
        self.last_total_samples = total_samples;

        let collection_time = raw
            .collection_time
            .unwrap_or(self.last_collection_time)
            .max(self.last_collection_time);
        self.last_collection_time = collection_time;

        let peaks = raw.peaks.map(|pair| PeakPair {
            m1: pair.m1.unwrap_or_default().normalized(),
            m2: pair.m2.unwrap_or_default().normalized(),
        });

        let harmonics = raw.harmonics.map(|list| {
            list.into_iter()
                .filter_map(|h| {
                    let harmonic = h.harmonic.unwrap_or(0);
                    if harmonic < 2 {
                        return None;
                    }
                    Some(HarmonicReading {
                        harmonic,
                        frequency: h.frequency.unwrap_or(0.0),
                        amplitude: h.amplitude.unwrap_or(0.0),
                        rpm: h.rpm.unwrap_or(0.0),
                        ratio: h.ratio.unwrap_or(0.0),
                    })
                })
                .collect::<Vec<_>>()
        });

        Decoded::Frame(TelemetryFrame {
            total_samples,
            buffer_usage: raw.buffer_status.unwrap_or(0.0).clamp(0.0, 100.0),
            collection_time,
            noise_level: raw.current_noise.unwrap_or(0.0),
            spectrum_m1: spectra.m1,
            spectrum_m2: spectra.m2,
            time_samples: raw.time_data,
            peaks,
            harmonics,
            rms: raw.rms,
            imbalance: raw.imbalance,
        })
    }
}
