//! # Track Compare
//!
//! Measures how faithfully a challenger GPS recording follows a fixed
//! reference track, and how slow the challenger's worst stretch was.
//!
//! This library provides:
//! - GPX decoding of one or many files into a single ordered track
//! - Point matching between the reference and the challenger track
//! - Detection of the reference stretches the challenger missed
//! - The worst rolling-window distance (the fairness KPI)
//! - Parallel processing for batches of challengers
//!
//! ## Features
//!
//! - **`parallel`** - Compare batches of challengers with rayon
//! - **`synthetic`** - Deterministic synthetic tracks for tests and benchmarks
//! - **`cli`** - The `tracecompare-cli` binary
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{Duration, TimeZone, Utc};
//! use tracecompare::{CompareConfig, GpsPoint, TrackPoint, compare_tracks};
//! use tracecompare::geo_utils::offset_meters;
//!
//! let origin = GpsPoint::new(45.0, 6.0);
//! let reference: Vec<TrackPoint> = (0..=100)
//!     .map(|i| TrackPoint::untimed(offset_meters(&origin, 0.0, i as f64 * 10.0)))
//!     .collect();
//!
//! let start = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
//! let challenger: Vec<TrackPoint> = (0..=1000)
//!     .map(|i| {
//!         TrackPoint::timed(
//!             offset_meters(&origin, 0.0, i as f64),
//!             start + Duration::seconds(i),
//!         )
//!     })
//!     .collect();
//!
//! let config = CompareConfig {
//!     rolling_duration_hours: 0.05,
//!     ..CompareConfig::default()
//! };
//! let result = compare_tracks(&reference, &challenger, &config).unwrap();
//! assert!(result.tracks.missed_segments.is_empty());
//! assert!(result.kpi.is_some());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{CompareError, FileError, Result, TrackRole};

// Geographic primitives (distance, cross-track distance, path length)
pub mod geo_utils;

// GPX decoding into ordered track points
pub mod gpx_decode;
pub use gpx_decode::{DecodeOptions, DecodedGpx, GpxInput, decode_gpx, decode_track};

// Reference-to-challenger point matching
pub mod matching;
pub use matching::{CursorTrace, MatchObserver, NoopObserver, match_tracks};

// Missed segment detection
pub mod segmentation;
pub use segmentation::{annotate_missed, missed_segments};

// Progress table and worst rolling window
pub mod kpi;
pub use kpi::{WindowBound, WorstWindow, find_worst_window, progress_table};

// Result composition and pipeline entry points
pub mod compare;
pub use compare::{compare_batch, compare_tracks};

// Synthetic reference/challenger pairs
#[cfg(feature = "synthetic")]
pub mod synthetic;

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use tracecompare::GpsPoint;
/// let point = GpsPoint::new(44.1237, 3.5821); // Millau
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// A decoded track point: position plus optional timestamp.
///
/// Timestamps are mandatory on challenger tracks and optional on the
/// reference track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

impl TrackPoint {
    pub fn untimed(position: GpsPoint) -> Self {
        Self {
            latitude: position.latitude,
            longitude: position.longitude,
            time: None,
        }
    }

    pub fn timed(position: GpsPoint, time: DateTime<Utc>) -> Self {
        Self {
            latitude: position.latitude,
            longitude: position.longitude,
            time: Some(time),
        }
    }

    pub fn position(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }
}

/// Configuration for a comparison run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompareConfig {
    /// Width of the worst-window KPI in hours.
    /// Default: 1.0
    pub rolling_duration_hours: f64,

    /// Distance under which the challenger is "on" a reference point.
    /// Default: 8.0 meters
    pub trigger_meters: f64,

    /// A deviation run only counts as missed if one of its points is
    /// farther than this. Must be >= `trigger_meters`.
    /// Default: 80.0 meters
    pub tolerance_meters: f64,

    /// Challenger distance scanned before giving up on a reference point.
    /// Default: 20_000.0 meters
    pub max_detour_meters: f64,

    /// Challenger segments at least this long are compared by point
    /// distance instead of cross-track distance.
    /// Default: 200.0 meters
    pub max_seg_length_meters: f64,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            rolling_duration_hours: 1.0,
            trigger_meters: 8.0,
            tolerance_meters: 80.0,
            max_detour_meters: 20_000.0,
            max_seg_length_meters: 200.0,
        }
    }
}

impl CompareConfig {
    /// Check the settings before any matching work starts.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("rollingDurationHours", self.rolling_duration_hours),
            ("triggerMeters", self.trigger_meters),
            ("toleranceMeters", self.tolerance_meters),
            ("maxDetourMeters", self.max_detour_meters),
            ("maxSegLengthMeters", self.max_seg_length_meters),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(CompareError::Configuration {
                    reason: format!("{name} must be a finite, non-negative number (got {value})"),
                });
            }
        }

        if self.tolerance_meters < self.trigger_meters {
            return Err(CompareError::Configuration {
                reason: format!(
                    "tolerance ({} m) must be greater than or equal to trigger ({} m)",
                    self.tolerance_meters, self.trigger_meters
                ),
            });
        }

        if self.rolling_duration_hours <= 0.0 {
            return Err(CompareError::Configuration {
                reason: "rollingDurationHours must be positive".to_string(),
            });
        }

        Ok(())
    }
}

/// A reference point with the challenger's best corresponding instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Challenger time at the match minus the challenger's first timestamp.
    pub elapsed_ms: i64,
    /// Best distance found between this reference point and the challenger.
    pub closest_distance_meters: f64,
}

impl MatchedPoint {
    pub fn position(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }
}

/// A matched point labelled with the missed segment it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub elapsed_ms: i64,
    pub closest_distance_meters: f64,
    /// `None` when reached, otherwise the 1-based id of the missed run.
    pub missed_segment_id: Option<u32>,
}

impl AnnotatedPoint {
    pub fn position(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }

    pub fn is_missed(&self) -> bool {
        self.missed_segment_id.is_some()
    }
}

/// Elapsed time and distance covered on the reference at a given point.
///
/// Both fields are `None` when the point or its predecessor is missed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntry {
    pub elapsed_ms: Option<i64>,
    pub cumulative_distance_meters: Option<f64>,
}

/// How much of the reference the challenger covered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Accuracy {
    pub reference_length_meters: f64,
    pub missed_length_meters: f64,
    /// `missed_length_meters / reference_length_meters`, 0 for a zero-length reference.
    pub missed_ratio: f64,
}

/// The worst rolling-window KPI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollingKpi {
    pub rolling_duration_hours: f64,
    pub window_start: WindowBound,
    pub window_end: WindowBound,
    /// Absolute challenger time at which the worst window starts.
    pub window_start_time: Option<DateTime<Utc>>,
    pub window_distance_meters: f64,
    pub mean_speed_kmh: f64,
}

/// The four-track partition handed to renderers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultTracks {
    pub reference: Vec<TrackPoint>,
    pub challenger: Vec<TrackPoint>,
    pub missed_segments: Vec<Vec<GpsPoint>>,
    /// Reference slice covered by the worst window; empty without a KPI.
    pub worst_window: Vec<TrackPoint>,
}

/// Output of a comparison run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub tracks: ResultTracks,
    pub accuracy: Accuracy,
    /// `None` when the challenger never completed a full rolling window.
    pub kpi: Option<RollingKpi>,
    pub rolling_duration_hours: f64,
    /// Challenger duration from first to last timestamp.
    pub challenger_duration_ms: i64,
}

impl ComparisonResult {
    /// The KPI, or `UndefinedWorstWindow` if the track was too short.
    pub fn kpi(&self) -> Result<&RollingKpi> {
        self.kpi
            .as_ref()
            .ok_or(CompareError::UndefinedWorstWindow {
                rolling_duration_hours: self.rolling_duration_hours,
                track_duration_ms: self.challenger_duration_ms,
            })
    }
}
