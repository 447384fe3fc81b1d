//! Progress accounting and the worst rolling window.
//!
//! The progress table turns annotated points into elapsed challenger time
//! and distance covered along the reference, leaving out every gap that
//! touches a missed segment. The worst window is the smallest distance
//! covered in any span of the rolling duration; it is the fairness KPI.

use log::debug;
use serde::Serialize;

use crate::geo_utils::haversine_distance;
use crate::{AnnotatedPoint, ProgressEntry};

/// One end of a rolling window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowBound {
    /// Index into the reference track.
    pub index: usize,
    pub elapsed_ms: i64,
    /// Distance covered on the reference (missed segments excluded).
    pub distance_meters: f64,
}

/// Distance covered by a window starting at some reference point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowDistance {
    pub end_index: usize,
    pub distance_meters: f64,
}

/// The slowest window of the rolling duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorstWindow {
    pub start: WindowBound,
    pub end: WindowBound,
    pub distance_meters: f64,
    pub mean_speed_kmh: f64,
}

/// Build the progress table, one entry per annotated point.
pub fn progress_table(annotated: &[AnnotatedPoint]) -> Vec<ProgressEntry> {
    let mut table = Vec::with_capacity(annotated.len());
    let mut cumulative = 0.0;

    for (i, point) in annotated.iter().enumerate() {
        if i == 0 {
            table.push(ProgressEntry {
                elapsed_ms: Some(0),
                cumulative_distance_meters: Some(0.0),
            });
            continue;
        }

        let previous = &annotated[i - 1];
        if point.is_missed() || previous.is_missed() {
            table.push(ProgressEntry {
                elapsed_ms: None,
                cumulative_distance_meters: None,
            });
        } else {
            cumulative += haversine_distance(&previous.position(), &point.position());
            table.push(ProgressEntry {
                elapsed_ms: Some(point.elapsed_ms),
                cumulative_distance_meters: Some(cumulative),
            });
        }
    }

    table
}

/// Distance covered by the window starting at each reference point.
///
/// A window starting at `i` ends at the first index `j >= i` whose elapsed
/// time exceeds `elapsed[i] + duration_ms`. The end cursor is shared across
/// all starts, so the whole table is a single sweep. `None` when the start
/// has no progress entry or the challenger never completes the window.
pub fn rolling_window_distances(
    progress: &[ProgressEntry],
    duration_ms: i64,
) -> Vec<Option<WindowDistance>> {
    let mut end = 0usize;

    progress
        .iter()
        .enumerate()
        .map(|(start, entry)| {
            let (Some(start_elapsed), Some(start_distance)) =
                (entry.elapsed_ms, entry.cumulative_distance_meters)
            else {
                return None;
            };

            // Durations beyond the i64 range never complete.
            let limit = start_elapsed.saturating_add(duration_ms);
            end = end.max(start);
            while end < progress.len() {
                if progress[end].elapsed_ms.is_some_and(|e| e > limit) {
                    break;
                }
                end += 1;
            }

            let end_distance = progress.get(end)?.cumulative_distance_meters?;
            Some(WindowDistance {
                end_index: end,
                distance_meters: end_distance - start_distance,
            })
        })
        .collect()
}

/// Find the window of `rolling_duration_hours` with the least distance.
///
/// Ties go to the earliest start. `None` when no window is ever complete.
pub fn find_worst_window(
    progress: &[ProgressEntry],
    rolling_duration_hours: f64,
) -> Option<WorstWindow> {
    let duration_ms = (rolling_duration_hours * 3_600_000.0).round() as i64;
    let windows = rolling_window_distances(progress, duration_ms);

    let mut worst: Option<(usize, WindowDistance)> = None;
    for (start, window) in windows.into_iter().enumerate() {
        let Some(window) = window else { continue };
        if worst.is_none_or(|(_, w)| window.distance_meters < w.distance_meters) {
            worst = Some((start, window));
        }
    }

    let (start_index, window) = worst?;
    let bound = |index: usize| -> Option<WindowBound> {
        let entry = progress.get(index)?;
        Some(WindowBound {
            index,
            elapsed_ms: entry.elapsed_ms?,
            distance_meters: entry.cumulative_distance_meters?,
        })
    };

    let start = bound(start_index)?;
    let end = bound(window.end_index)?;
    let mean_speed_kmh = (window.distance_meters / 1000.0) / rolling_duration_hours;

    debug!(
        "[Kpi] worst {} h window: points {}..{}, {:.0} m, {:.2} km/h",
        rolling_duration_hours, start.index, end.index, window.distance_meters, mean_speed_kmh
    );

    Some(WorstWindow {
        start,
        end,
        distance_meters: window.distance_meters,
        mean_speed_kmh,
    })
}
