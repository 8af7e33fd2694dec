//! Synthetic frame generator for development without an acquisition server.
//!
//! Emits plausible telemetry at a fixed cadence: a spectral peak at the
//! motor drive frequency with a second harmonic, a sine-plus-noise time
//! window, and derived peak/RMS/imbalance readings. Honors
//! `set_motor_freq` so config round-trips behave like the real link.

use std::f64::consts::TAU;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::AcquisitionConfig;
use crate::link::{LinkCommand, LinkError, LinkEvent, StreamTransport};
use crate::types::{
    AxisSample, RawFrame, RawHarmonic, RawPeak, RawPeakPair, RawSpectra, RmsPair, RmsTriple, Vec3,
};

/// Frame cadence (roughly what the real server produces).
const FRAME_INTERVAL: Duration = Duration::from_millis(100);

/// Bins generated per spectrum; matches the display cap so any configured
/// range is satisfiable.
const SPECTRUM_BINS: usize = 1024;

/// Samples per time-domain window.
const TIME_SAMPLES: usize = 100;

pub struct SyntheticTransport {
    rng: StdRng,
    config: AcquisitionConfig,
    opened: bool,
    frames_emitted: u64,
    total_samples: u64,
}

impl SyntheticTransport {
    pub fn new(config: AcquisitionConfig) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            config,
            opened: false,
            frames_emitted: 0,
            total_samples: 0,
        }
    }

    /// Deterministic variant for tests.
    pub fn seeded(config: AcquisitionConfig, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ..Self::new(config)
        }
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn generate_frame(&mut self) -> RawFrame {
        let resolution = self.config.frequency_resolution();
        let fundamental = f64::from(self.config.motor_frequency);
        let peak_bin = (fundamental / resolution).round() as usize;
        let harmonic_bin = peak_bin * 2;

        let mut spectrum_m1 = vec![0.0; SPECTRUM_BINS];
        let mut spectrum_m2 = vec![0.0; SPECTRUM_BINS];
        for (bin, value) in spectrum_m1.iter_mut().enumerate() {
            *value = self.rng.gen_range(0.0..2.0);
            if bin == peak_bin {
                *value += self.rng.gen_range(40.0..60.0);
            } else if bin == harmonic_bin {
                *value += self.rng.gen_range(10.0..20.0);
            }
        }
        for (bin, value) in spectrum_m2.iter_mut().enumerate() {
            *value = self.rng.gen_range(0.0..2.0);
            if bin == peak_bin {
                *value += self.rng.gen_range(30.0..45.0);
            }
        }

        let peak_amplitude = spectrum_m1[peak_bin.min(SPECTRUM_BINS - 1)];
        let harmonic_amplitude = spectrum_m1[harmonic_bin.min(SPECTRUM_BINS - 1)];
        let rpm = self.config.frequency_to_rpm(fundamental);

        let time_data: Vec<AxisSample> = (0..TIME_SAMPLES)
            .map(|i| {
                let t = i as f64 / self.config.sample_rate;
                let base = (TAU * fundamental * t).sin();
                AxisSample {
                    m1: Vec3 {
                        x: base * 3.0 + self.rng.gen_range(-0.3..0.3),
                        y: base * 1.5 + self.rng.gen_range(-0.3..0.3),
                        z: base * 0.8 + self.rng.gen_range(-0.3..0.3),
                    },
                    m2: Vec3 {
                        x: base * 2.5 + self.rng.gen_range(-0.3..0.3),
                        y: base * 1.2 + self.rng.gen_range(-0.3..0.3),
                        z: base * 0.6 + self.rng.gen_range(-0.3..0.3),
                    },
                }
            })
            .collect();

        self.frames_emitted += 1;
        self.total_samples += self.config.sample_rate as u64 / 10;

        RawFrame {
            total_samples: Some(self.total_samples),
            buffer_status: Some(self.rng.gen_range(20.0..80.0)),
            collection_time: Some(self.frames_emitted as f64 * 0.1),
            current_noise: Some(self.rng.gen_range(10.0..30.0)),
            fft: Some(RawSpectra {
                m1: Some(spectrum_m1),
                m2: Some(spectrum_m2),
            }),
            time_data: Some(time_data),
            peaks: Some(RawPeakPair {
                m1: Some(RawPeak {
                    frequency: Some(fundamental),
                    amplitude: Some(peak_amplitude),
                    rpm: Some(rpm),
                }),
                m2: Some(RawPeak {
                    frequency: Some(fundamental),
                    amplitude: Some(peak_amplitude * 0.8),
                    rpm: Some(rpm),
                }),
            }),
            harmonics: Some(vec![RawHarmonic {
                harmonic: Some(2),
                frequency: Some(fundamental * 2.0),
                amplitude: Some(harmonic_amplitude),
                rpm: Some(rpm * 2.0),
                ratio: Some(harmonic_amplitude / peak_amplitude.max(f64::EPSILON)),
            }]),
            rms: Some(RmsPair {
                m1: RmsTriple {
                    x: 2.1 + self.rng.gen_range(-0.2..0.2),
                    y: 1.1 + self.rng.gen_range(-0.2..0.2),
                    z: 0.6 + self.rng.gen_range(-0.2..0.2),
                },
                m2: RmsTriple {
                    x: 1.8 + self.rng.gen_range(-0.2..0.2),
                    y: 0.9 + self.rng.gen_range(-0.2..0.2),
                    z: 0.5 + self.rng.gen_range(-0.2..0.2),
                },
            }),
            imbalance: Some(self.rng.gen_range(1.0..8.0)),
        }
    }
}

#[async_trait]
impl StreamTransport for SyntheticTransport {
    async fn next_event(&mut self) -> Result<LinkEvent, LinkError> {
        if !self.opened {
            self.opened = true;
            return Ok(LinkEvent::Opened {
                message: "Connected to synthetic frame generator".to_string(),
            });
        }
        tokio::time::sleep(FRAME_INTERVAL).await;
        Ok(LinkEvent::Frame(Box::new(self.generate_frame())))
    }

    async fn send(&mut self, command: LinkCommand) -> Result<(), LinkError> {
        match command {
            LinkCommand::SetMotorFrequency { frequency } => {
                tracing::info!(frequency = frequency, "synthetic generator retuned");
                self.config.motor_frequency = frequency;
            }
        }
        Ok(())
    }

    fn transport_name(&self) -> &str {
        "synthetic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_opens_then_streams_frames() {
        let mut transport = SyntheticTransport::seeded(AcquisitionConfig::default(), 7);
        assert!(matches!(
            transport.next_event().await.unwrap(),
            LinkEvent::Opened { .. }
        ));
        match transport.next_event().await.unwrap() {
            LinkEvent::Frame(raw) => {
                let fft = raw.fft.unwrap();
                assert_eq!(fft.m1.unwrap().len(), SPECTRUM_BINS);
                assert_eq!(raw.time_data.unwrap().len(), TIME_SAMPLES);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_peak_tracks_motor_frequency() {
        let mut transport = SyntheticTransport::seeded(AcquisitionConfig::default(), 7);
        transport
            .send(LinkCommand::SetMotorFrequency { frequency: 40 })
            .await
            .unwrap();
        transport.next_event().await.unwrap(); // Opened
        match transport.next_event().await.unwrap() {
            LinkEvent::Frame(raw) => {
                let peak = raw.peaks.unwrap().m1.unwrap();
                assert_eq!(peak.frequency, Some(40.0));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
