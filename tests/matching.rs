//! Tests for matching module

use chrono::{DateTime, Duration, TimeZone, Utc};
use tracecompare::geo_utils::offset_meters;
use tracecompare::matching::match_tracks_observed;
use tracecompare::*;

fn origin() -> GpsPoint {
    GpsPoint::new(45.0, 6.0)
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
}

/// Untimed reference points at local (east, north) metre offsets.
fn reference(offsets: &[(f64, f64)]) -> Vec<TrackPoint> {
    offsets
        .iter()
        .map(|&(e, n)| TrackPoint::untimed(offset_meters(&origin(), e, n)))
        .collect()
}

/// Challenger points one second apart at local metre offsets.
fn challenger(offsets: &[(f64, f64)]) -> Vec<TrackPoint> {
    offsets
        .iter()
        .enumerate()
        .map(|(i, &(e, n))| {
            TrackPoint::timed(
                offset_meters(&origin(), e, n),
                t0() + Duration::seconds(i as i64),
            )
        })
        .collect()
}

fn north_line(from: i32, to: i32, step: i32) -> Vec<(f64, f64)> {
    (from..=to)
        .step_by(step as usize)
        .map(|n| (0.0, n as f64))
        .collect()
}

#[test]
fn test_exact_follow_matches_every_point() {
    let reference = reference(&north_line(0, 1000, 10));
    let challenger = challenger(&north_line(0, 1000, 1));
    let config = CompareConfig::default();

    let mut trace = CursorTrace::new();
    let matched = match_tracks_observed(&reference, &challenger, &config, &mut trace).unwrap();

    assert_eq!(matched.len(), reference.len());
    assert!(matched.iter().all(|m| m.closest_distance_meters <= config.trigger_meters));
    assert!(trace.matched.iter().all(|&m| m));
    assert!(trace.is_monotonic());

    // The first segment within trigger is reached up to trigger meters early.
    for (i, m) in matched.iter().enumerate() {
        let expected_ms = i as i64 * 10_000;
        assert!(m.elapsed_ms <= expected_ms);
        assert!(expected_ms - m.elapsed_ms <= 9_000, "point {i}: {}", m.elapsed_ms);
    }
    assert!(matched.windows(2).all(|w| w[0].elapsed_ms <= w[1].elapsed_ms));
}

#[test]
fn test_output_keeps_reference_coordinates() {
    let reference = reference(&north_line(0, 100, 10));
    let challenger = challenger(&north_line(0, 100, 1));
    let matched = match_tracks(&reference, &challenger, &CompareConfig::default()).unwrap();

    for (m, r) in matched.iter().zip(&reference) {
        assert_eq!(m.latitude, r.latitude);
        assert_eq!(m.longitude, r.longitude);
    }
}

#[test]
fn test_skipped_stretch_is_not_matched() {
    // Challenger leaves at 75 m, loops 300 m east and rejoins at 125 m.
    let reference = reference(&north_line(0, 200, 1));
    let mut path = north_line(0, 75, 1);
    path.extend([(300.0, 75.0), (300.0, 125.0), (0.0, 125.0)]);
    path.extend(north_line(126, 200, 1));
    let challenger = challenger(&path);

    let config = CompareConfig {
        trigger_meters: 0.5,
        tolerance_meters: 5.0,
        ..CompareConfig::default()
    };

    let mut trace = CursorTrace::new();
    let matched = match_tracks_observed(&reference, &challenger, &config, &mut trace).unwrap();

    for (i, &hit) in trace.matched.iter().enumerate() {
        let skipped = (76..=124).contains(&i);
        assert_eq!(hit, !skipped, "reference point {i}");
    }
    assert!(trace.is_monotonic());

    // Best distance inside the gap is the way back to either junction.
    assert!((matched[100].closest_distance_meters - 25.0).abs() < 0.5);
    assert!((matched[76].closest_distance_meters - 1.0).abs() < 0.1);
}

#[test]
fn test_detour_budget_limits_search() {
    // The challenger goes 3 km east and back before carrying on north.
    let reference = reference(&north_line(0, 200, 10));
    let mut path = north_line(0, 100, 10);
    path.extend([
        (1000.0, 100.0),
        (2000.0, 100.0),
        (3000.0, 100.0),
        (2000.0, 100.0),
        (1000.0, 100.0),
    ]);
    path.extend(north_line(100, 200, 10));
    let challenger = challenger(&path);

    let tight = CompareConfig {
        max_detour_meters: 1000.0,
        ..CompareConfig::default()
    };
    let mut trace = CursorTrace::new();
    let matched = match_tracks_observed(&reference, &challenger, &tight, &mut trace).unwrap();
    assert!(trace.matched[..=10].iter().all(|&m| m));
    assert!(trace.matched[11..].iter().all(|&m| !m));
    assert!((matched[20].closest_distance_meters - 100.0).abs() < 0.5);

    let segments = missed_segments(&annotate_missed(&matched, &tight));
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].len(), 10);

    let mut trace = CursorTrace::new();
    match_tracks_observed(&reference, &challenger, &CompareConfig::default(), &mut trace)
        .unwrap();
    assert!(trace.matched.iter().all(|&m| m));
    assert!(trace.is_monotonic());
}

#[test]
fn test_first_point_search_is_unbounded() {
    // 3 km of lead-in before the reference start, with a 500 m budget.
    let reference = reference(&north_line(0, 200, 10));
    let challenger = challenger(&north_line(-3000, 200, 10));
    let config = CompareConfig {
        max_detour_meters: 500.0,
        ..CompareConfig::default()
    };

    let matched = match_tracks(&reference, &challenger, &config).unwrap();
    assert!(matched[0].closest_distance_meters <= config.trigger_meters);
    assert_eq!(matched[0].elapsed_ms, 299_000);
    assert!(missed_segments(&annotate_missed(&matched, &config)).is_empty());
}

#[test]
fn test_outlier_reference_point_keeps_cursor() {
    let mut offsets = north_line(0, 100, 10);
    offsets[5] = (500.0, 50.0);
    let reference = reference(&offsets);
    let challenger = challenger(&north_line(0, 100, 1));
    let config = CompareConfig::default();

    let mut trace = CursorTrace::new();
    let matched = match_tracks_observed(&reference, &challenger, &config, &mut trace).unwrap();

    assert!(!trace.matched[5]);
    assert_eq!(trace.cursors[5], trace.cursors[4]);
    assert!(trace.matched[6]);
    assert!(trace.is_monotonic());
    assert!(matched[5].closest_distance_meters > 490.0);

    let annotated = annotate_missed(&matched, &config);
    let missed: Vec<usize> = (0..annotated.len())
        .filter(|&i| annotated[i].is_missed())
        .collect();
    assert_eq!(missed, vec![5]);
}

#[test]
fn test_long_segments_use_point_distance() {
    let reference = reference(&[(0.0, 150.0)]);
    let challenger = challenger(&[(0.0, 0.0), (0.0, 300.0)]);

    let matched = match_tracks(&reference, &challenger, &CompareConfig::default()).unwrap();
    assert!((matched[0].closest_distance_meters - 150.0).abs() < 0.1);

    let config = CompareConfig {
        max_seg_length_meters: 1000.0,
        ..CompareConfig::default()
    };
    let matched = match_tracks(&reference, &challenger, &config).unwrap();
    assert!(matched[0].closest_distance_meters < 0.01);
}

#[test]
fn test_challenger_too_short() {
    let reference = reference(&north_line(0, 100, 10));
    let challenger = challenger(&[(0.0, 0.0)]);

    assert_eq!(
        match_tracks(&reference, &challenger, &CompareConfig::default()),
        Err(CompareError::InsufficientPoints {
            track: TrackRole::Challenger,
            point_count: 1,
            minimum_required: 2,
        })
    );
}

#[test]
fn test_challenger_without_timestamps() {
    let reference = reference(&north_line(0, 100, 10));
    let mut challenger = challenger(&north_line(0, 100, 1));
    challenger[3].time = None;

    match match_tracks(&reference, &challenger, &CompareConfig::default()) {
        Err(CompareError::MissingTimestamps { origin, index }) => {
            assert_eq!(origin, "challenger");
            assert_eq!(index, 3);
        }
        other => panic!("expected MissingTimestamps, got {:?}", other),
    }
}

#[test]
fn test_invalid_config_rejected_before_matching() {
    let config = CompareConfig {
        trigger_meters: 100.0,
        tolerance_meters: 10.0,
        ..CompareConfig::default()
    };
    assert!(matches!(
        match_tracks(&[], &[], &config),
        Err(CompareError::Configuration { .. })
    ));
}

#[test]
fn test_empty_reference_gives_empty_output() {
    let challenger = challenger(&north_line(0, 10, 1));
    let matched = match_tracks(&[], &challenger, &CompareConfig::default()).unwrap();
    assert!(matched.is_empty());
}

#[test]
fn test_noop_observer_matches_plain_call() {
    let reference = reference(&north_line(0, 300, 25));
    let challenger = challenger(&north_line(0, 300, 3));
    let config = CompareConfig::default();

    let plain = match_tracks(&reference, &challenger, &config).unwrap();
    let observed =
        match_tracks_observed(&reference, &challenger, &config, &mut NoopObserver).unwrap();
    assert_eq!(plain, observed);
}
