//! Tests for CompareConfig

use tracecompare::{CompareConfig, CompareError};

#[test]
fn test_defaults() {
    let config = CompareConfig::default();
    assert_eq!(config.rolling_duration_hours, 1.0);
    assert_eq!(config.trigger_meters, 8.0);
    assert_eq!(config.tolerance_meters, 80.0);
    assert_eq!(config.max_detour_meters, 20_000.0);
    assert_eq!(config.max_seg_length_meters, 200.0);
    assert!(config.validate().is_ok());
}

#[test]
fn test_tolerance_below_trigger_rejected() {
    let config = CompareConfig {
        trigger_meters: 20.0,
        tolerance_meters: 10.0,
        ..CompareConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(CompareError::Configuration { .. })
    ));
}

#[test]
fn test_tolerance_equal_to_trigger_accepted() {
    let config = CompareConfig {
        trigger_meters: 10.0,
        tolerance_meters: 10.0,
        ..CompareConfig::default()
    };
    assert!(config.validate().is_ok());
}

#[test]
fn test_non_finite_and_negative_rejected() {
    let cases = [
        CompareConfig {
            max_detour_meters: f64::NAN,
            ..CompareConfig::default()
        },
        CompareConfig {
            trigger_meters: -1.0,
            ..CompareConfig::default()
        },
        CompareConfig {
            max_seg_length_meters: f64::INFINITY,
            ..CompareConfig::default()
        },
        CompareConfig {
            rolling_duration_hours: 0.0,
            ..CompareConfig::default()
        },
    ];
    for config in cases {
        assert!(config.validate().is_err(), "{:?}", config);
    }
}

#[test]
fn test_deserialize_partial_json() {
    let config: CompareConfig =
        serde_json::from_str(r#"{"rollingDurationHours": 2.5, "triggerMeters": 12}"#).unwrap();
    assert_eq!(config.rolling_duration_hours, 2.5);
    assert_eq!(config.trigger_meters, 12.0);
    assert_eq!(config.tolerance_meters, 80.0);
    assert_eq!(config.max_seg_length_meters, 200.0);
}

#[test]
fn test_serialize_round_trip_keys() {
    let json = serde_json::to_value(CompareConfig::default()).unwrap();
    assert_eq!(json["maxDetourMeters"], 20_000.0);
    assert_eq!(json["maxSegLengthMeters"], 200.0);
    assert_eq!(json["toleranceMeters"], 80.0);
}
