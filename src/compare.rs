//! Comparison pipeline and result composition.
//!
//! `compare_tracks` runs every stage in order (matching, missed segment
//! detection, progress accounting, worst window) and assembles the
//! [`ComparisonResult`] handed to renderers.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use chrono::Duration;
use log::{debug, info};

use crate::geo_utils::{path_length, positions};
use crate::kpi::{WorstWindow, find_worst_window, progress_table};
use crate::matching::match_tracks;
use crate::segmentation::{annotate_missed, missed_segments};
use crate::{
    Accuracy, CompareConfig, CompareError, ComparisonResult, GpsPoint, Result, ResultTracks,
    RollingKpi, TrackPoint, TrackRole,
};

/// Compare a challenger track against the reference track.
///
/// The configuration is validated before any matching work starts. A
/// challenger too short for one rolling window is not an error: the result
/// then has no KPI and an empty worst-window track.
pub fn compare_tracks(
    reference: &[TrackPoint],
    challenger: &[TrackPoint],
    config: &CompareConfig,
) -> Result<ComparisonResult> {
    config.validate()?;

    if reference.is_empty() {
        return Err(CompareError::InsufficientPoints {
            track: TrackRole::Reference,
            point_count: 0,
            minimum_required: 1,
        });
    }

    info!(
        "[Compare] {} reference points vs {} challenger points",
        reference.len(),
        challenger.len()
    );

    debug!("[Compare] Matching reference points to challenger");
    let matched = match_tracks(reference, challenger, config)?;

    debug!("[Compare] Labelling missed segments");
    let annotated = annotate_missed(&matched, config);
    let missed = missed_segments(&annotated);
    let accuracy = calculate_accuracy(reference, &missed);

    debug!("[Compare] Computing rolling window KPI");
    let progress = progress_table(&annotated);
    let worst = find_worst_window(&progress, config.rolling_duration_hours);

    let result = compose_result(reference, challenger, missed, accuracy, worst, config);

    info!(
        "[Compare] {} missed segment(s), {:.2}% of reference missed, KPI {}",
        result.tracks.missed_segments.len(),
        result.accuracy.missed_ratio * 100.0,
        match &result.kpi {
            Some(kpi) => format!("{:.2} km/h", kpi.mean_speed_kmh),
            None => "undefined".to_string(),
        }
    );

    Ok(result)
}

/// Compare many challengers against one reference.
///
/// Each run works on its own data; results keep the input order. Runs in
/// parallel with the `parallel` feature.
pub fn compare_batch(
    reference: &[TrackPoint],
    challengers: &[Vec<TrackPoint>],
    config: &CompareConfig,
) -> Vec<Result<ComparisonResult>> {
    #[cfg(feature = "parallel")]
    let results: Vec<Result<ComparisonResult>> = challengers
        .par_iter()
        .map(|challenger| compare_tracks(reference, challenger, config))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let results: Vec<Result<ComparisonResult>> = challengers
        .iter()
        .map(|challenger| compare_tracks(reference, challenger, config))
        .collect();

    results
}

/// Reference length, missed length and their ratio.
pub fn calculate_accuracy(reference: &[TrackPoint], missed: &[Vec<GpsPoint>]) -> Accuracy {
    let reference_length_meters = path_length(&positions(reference));
    let missed_length_meters: f64 = missed.iter().map(|segment| path_length(segment)).sum();
    let missed_ratio = if reference_length_meters > 0.0 {
        missed_length_meters / reference_length_meters
    } else {
        0.0
    };

    Accuracy {
        reference_length_meters,
        missed_length_meters,
        missed_ratio,
    }
}

fn compose_result(
    reference: &[TrackPoint],
    challenger: &[TrackPoint],
    missed: Vec<Vec<GpsPoint>>,
    accuracy: Accuracy,
    worst: Option<WorstWindow>,
    config: &CompareConfig,
) -> ComparisonResult {
    let first_time = challenger.first().and_then(|p| p.time);
    let challenger_duration_ms = match (first_time, challenger.last().and_then(|p| p.time)) {
        (Some(first), Some(last)) => (last - first).num_milliseconds(),
        _ => 0,
    };

    let worst_window = worst
        .map(|w| reference[w.start.index..=w.end.index].to_vec())
        .unwrap_or_default();

    let kpi = worst.map(|w| RollingKpi {
        rolling_duration_hours: config.rolling_duration_hours,
        window_start: w.start,
        window_end: w.end,
        window_start_time: first_time.map(|t| t + Duration::milliseconds(w.start.elapsed_ms)),
        window_distance_meters: w.distance_meters,
        mean_speed_kmh: w.mean_speed_kmh,
    });

    ComparisonResult {
        tracks: ResultTracks {
            reference: reference.to_vec(),
            challenger: challenger.to_vec(),
            missed_segments: missed,
            worst_window,
        },
        accuracy,
        kpi,
        rolling_duration_hours: config.rolling_duration_hours,
        challenger_duration_ms,
    }
}
