//! Missed segment detection.
//!
//! Consecutive reference points farther than `trigger_meters` from the
//! challenger form a deviation run. A run is only a missed segment if at
//! least one of its points is also beyond `tolerance_meters`; shallower runs
//! are GPS noise and stay unlabelled.

use crate::{AnnotatedPoint, CompareConfig, GpsPoint, MatchedPoint};

/// Label each matched point with its missed segment id (1, 2, 3, ...).
pub fn annotate_missed(matched: &[MatchedPoint], config: &CompareConfig) -> Vec<AnnotatedPoint> {
    let mut ids: Vec<Option<u32>> = vec![None; matched.len()];
    let mut next_id = 1u32;
    let mut i = 0;

    while i < matched.len() {
        if matched[i].closest_distance_meters <= config.trigger_meters {
            i += 1;
            continue;
        }

        let start = i;
        let mut beyond_tolerance = false;
        while i < matched.len() && matched[i].closest_distance_meters > config.trigger_meters {
            if matched[i].closest_distance_meters > config.tolerance_meters {
                beyond_tolerance = true;
            }
            i += 1;
        }

        if beyond_tolerance {
            ids[start..i].fill(Some(next_id));
            next_id += 1;
        }
    }

    matched
        .iter()
        .zip(ids)
        .map(|(m, missed_segment_id)| AnnotatedPoint {
            latitude: m.latitude,
            longitude: m.longitude,
            elapsed_ms: m.elapsed_ms,
            closest_distance_meters: m.closest_distance_meters,
            missed_segment_id,
        })
        .collect()
}

/// Positions of each missed segment, in ascending id order.
pub fn missed_segments(annotated: &[AnnotatedPoint]) -> Vec<Vec<GpsPoint>> {
    annotated
        .chunk_by(|a, b| a.missed_segment_id == b.missed_segment_id)
        .filter(|run| run[0].is_missed())
        .map(|run| run.iter().map(AnnotatedPoint::position).collect())
        .collect()
}
