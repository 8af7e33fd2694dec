//! Config validation through the public API: file loading, patch rejection,
//! derived windowing.

use std::io::Write;

use vibrascope::config::{AcquisitionConfig, ConfigError, ConfigPatch};
use vibrascope::types::Axis;

#[test]
fn file_round_trip_preserves_derived_windowing() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "sample_rate = 200.0\nfft_size = 2048\nfft_range = 50.0"
    )
    .unwrap();

    let config = AcquisitionConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config.frequency_resolution(), 0.09765625);
    assert_eq!(config.num_points(), 512);
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "motor_frequency = \"twenty\"").unwrap();
    assert!(matches!(
        AcquisitionConfig::load_from_file(file.path()),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn out_of_range_file_values_are_rejected_with_bounds() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "noise_threshold = 500.0").unwrap();
    match AcquisitionConfig::load_from_file(file.path()) {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        }) => {
            assert_eq!(field, "noise_threshold");
            assert_eq!(value, 500.0);
            assert_eq!(min, 10.0);
            assert_eq!(max, 200.0);
        }
        other => panic!("expected OutOfRange, got {other:?}"),
    }
}

#[test]
fn rejected_patch_reports_field_and_leaves_config() {
    let config = AcquisitionConfig::default();
    let patch = ConfigPatch {
        fft_range: Some(5.0),
        main_axis: Some(Axis::Z),
        ..ConfigPatch::default()
    };
    let err = config.apply(&patch).unwrap_err();
    assert!(err.to_string().contains("fft_range"));
    // Even the valid part of a rejected patch must not apply.
    assert_eq!(config.main_axis, Axis::X);
}
