//! Reference-to-challenger point matching.
//!
//! For every reference point, the challenger track is scanned forward from
//! a cursor that never moves backwards, so a full pass stays close to
//! linear in the size of both tracks:
//! - each challenger segment is scored by cross-track distance, or by
//!   distance to its start point when the segment is too long to trust
//! - the scan stops at the first segment within `trigger_meters`, which
//!   then becomes the new cursor
//! - otherwise it gives up once `max_detour_meters` of challenger track
//!   have been scanned, keeping the best distance seen
//!
//! Until the first reference point has been reached the detour budget is
//! unbounded, so a challenger that starts well before the reference start
//! still locks on.

use log::debug;

use crate::geo_utils::{distance_from_segment, haversine_distance};
use crate::{CompareConfig, CompareError, GpsPoint, MatchedPoint, Result, TrackPoint, TrackRole};

/// Receives the matcher's cursor after each reference point.
///
/// Useful to check that the cursor only ever moves forward.
pub trait MatchObserver {
    /// Called once per reference point, in order. `matched` is true when a
    /// challenger segment came within `trigger_meters`.
    fn on_point(&mut self, reference_index: usize, cursor: usize, matched: bool);
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl MatchObserver for NoopObserver {
    fn on_point(&mut self, _reference_index: usize, _cursor: usize, _matched: bool) {}
}

/// Observer that records every cursor position.
#[derive(Debug, Default, Clone)]
pub struct CursorTrace {
    pub cursors: Vec<usize>,
    pub matched: Vec<bool>,
}

impl CursorTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the cursor never decreased.
    pub fn is_monotonic(&self) -> bool {
        self.cursors.windows(2).all(|w| w[0] <= w[1])
    }
}

impl MatchObserver for CursorTrace {
    fn on_point(&mut self, _reference_index: usize, cursor: usize, matched: bool) {
        self.cursors.push(cursor);
        self.matched.push(matched);
    }
}

/// Find the challenger's best corresponding instant for each reference point.
///
/// Returns one [`MatchedPoint`] per reference point, in reference order.
pub fn match_tracks(
    reference: &[TrackPoint],
    challenger: &[TrackPoint],
    config: &CompareConfig,
) -> Result<Vec<MatchedPoint>> {
    match_tracks_observed(reference, challenger, config, &mut NoopObserver)
}

/// [`match_tracks`] with a cursor observer.
pub fn match_tracks_observed(
    reference: &[TrackPoint],
    challenger: &[TrackPoint],
    config: &CompareConfig,
    observer: &mut dyn MatchObserver,
) -> Result<Vec<MatchedPoint>> {
    config.validate()?;

    if challenger.len() < 2 {
        return Err(CompareError::InsufficientPoints {
            track: TrackRole::Challenger,
            point_count: challenger.len(),
            minimum_required: 2,
        });
    }

    let elapsed = elapsed_times(challenger)?;
    let positions: Vec<GpsPoint> = challenger.iter().map(TrackPoint::position).collect();
    let segment_lengths: Vec<f64> = positions
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .collect();

    let mut cursor = 0usize;
    let mut first_found = false;
    let mut matched_count = 0usize;
    let mut result = Vec::with_capacity(reference.len());

    for (reference_index, ref_point) in reference.iter().enumerate() {
        let target = ref_point.position();
        let budget = if first_found {
            config.max_detour_meters
        } else {
            f64::INFINITY
        };

        let mut index = cursor;
        let mut detour = 0.0;
        let mut best_index = cursor;
        let mut best_distance = f64::INFINITY;
        let mut matched = false;

        while index + 1 < positions.len() && detour <= budget {
            let segment_length = segment_lengths[index];
            let distance = if segment_length < config.max_seg_length_meters {
                distance_from_segment(&target, &positions[index], &positions[index + 1])
            } else {
                haversine_distance(&target, &positions[index])
            };

            if distance < best_distance {
                best_distance = distance;
                best_index = index;
            }

            if best_distance <= config.trigger_meters {
                cursor = index;
                first_found = true;
                matched = true;
                break;
            }

            detour += segment_length;
            index += 1;
        }

        if matched {
            matched_count += 1;
        }
        observer.on_point(reference_index, cursor, matched);

        result.push(MatchedPoint {
            latitude: ref_point.latitude,
            longitude: ref_point.longitude,
            elapsed_ms: elapsed[best_index],
            closest_distance_meters: best_distance,
        });
    }

    debug!(
        "[Matching] {}/{} reference points within {} m, cursor ended at {}/{}",
        matched_count,
        reference.len(),
        config.trigger_meters,
        cursor,
        challenger.len()
    );

    Ok(result)
}

/// Milliseconds since the challenger's first timestamp, per point.
fn elapsed_times(challenger: &[TrackPoint]) -> Result<Vec<i64>> {
    let missing = |index: usize| CompareError::MissingTimestamps {
        origin: TrackRole::Challenger.to_string(),
        index,
    };

    let start = challenger.first().and_then(|p| p.time).ok_or_else(|| missing(0))?;

    challenger
        .iter()
        .enumerate()
        .map(|(i, p)| {
            p.time
                .map(|t| (t - start).num_milliseconds())
                .ok_or_else(|| missing(i))
        })
        .collect()
}
