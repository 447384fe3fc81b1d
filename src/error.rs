//! Unified error handling for track comparison.
//!
//! Every failure the comparison pipeline can report is a variant of
//! [`CompareError`]. Per-file GPX decoding problems are gathered into
//! [`CompareError::InvalidFiles`] so that a batch of uploads can be reported
//! in one go instead of stopping at the first bad file.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Which side of the comparison a track belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackRole {
    Reference,
    Challenger,
}

impl fmt::Display for TrackRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackRole::Reference => write!(f, "reference"),
            TrackRole::Challenger => write!(f, "challenger"),
        }
    }
}

/// A problem with a single GPX document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileError {
    /// The document could not be parsed as GPX at all.
    #[error("{filename}: not a valid GPX document ({reason})")]
    InvalidXml { filename: String, reason: String },

    /// The document holds a route (`<rte>`) but no track (`<trk>`).
    #[error("{filename}: contains a route but no track")]
    RouteOnly { filename: String },

    /// The document parsed but holds no track points.
    #[error("{filename}: contains no track points")]
    Empty { filename: String },
}

impl FileError {
    /// Name of the offending file.
    pub fn filename(&self) -> &str {
        match self {
            FileError::InvalidXml { filename, .. }
            | FileError::RouteOnly { filename }
            | FileError::Empty { filename } => filename,
        }
    }
}

/// Errors raised while decoding tracks or comparing them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompareError {
    /// One or more GPX documents could not be turned into track points.
    #[error("{} invalid GPX file(s): {}", .0.len(), join_file_errors(.0))]
    InvalidFiles(Vec<FileError>),

    /// No GPX document was supplied.
    #[error("no GPX file supplied")]
    NoInput,

    /// Timestamps are required but missing.
    ///
    /// `origin` is the file name (and `index` the track line) when raised by
    /// the decoder, or the track role (and `index` the point) when raised on
    /// an in-memory track.
    #[error("{origin}: no timestamp at index {index}")]
    MissingTimestamps { origin: String, index: usize },

    /// Two challenger files cover the same time span.
    #[error("files {earlier} and {later} overlap in time")]
    OverlappingFiles { earlier: String, later: String },

    /// The comparison settings are inconsistent.
    #[error("invalid configuration: {reason}")]
    Configuration { reason: String },

    /// A track is too short to be compared.
    #[error("{track} track has {point_count} points, need at least {minimum_required}")]
    InsufficientPoints {
        track: TrackRole,
        point_count: usize,
        minimum_required: usize,
    },

    /// The challenger never covered a full rolling window.
    #[error(
        "no complete {rolling_duration_hours} h window: challenger recorded {track_duration_ms} ms"
    )]
    UndefinedWorstWindow {
        rolling_duration_hours: f64,
        track_duration_ms: i64,
    },
}

fn join_file_errors(errors: &[FileError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CompareError>;
