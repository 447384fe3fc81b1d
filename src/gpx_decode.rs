//! GPX decoding.
//!
//! Turns one or more GPX documents into ordered track points. Each
//! `<trkseg>` becomes one "line"; lines keep document order, and when
//! several files are supplied the files are ordered by their first
//! timestamp and checked for time overlap.

use std::io::Cursor;

use chrono::{DateTime, Utc};
use gpx::Gpx;
use log::debug;

use crate::{CompareError, FileError, Result, TrackPoint};

/// A raw GPX document and the name it was uploaded under.
#[derive(Debug, Clone)]
pub struct GpxInput {
    pub filename: String,
    pub contents: Vec<u8>,
}

impl GpxInput {
    pub fn new(filename: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            contents: contents.into(),
        }
    }
}

/// Decoder settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Reject lines whose first point carries no `<time>`.
    pub timestamps_required: bool,
}

impl DecodeOptions {
    /// Options for challenger uploads.
    pub fn challenger() -> Self {
        Self {
            timestamps_required: true,
        }
    }

    /// Options for the reference track.
    pub fn reference() -> Self {
        Self {
            timestamps_required: false,
        }
    }
}

/// Decoded lines, one per track segment, in final order.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedGpx {
    pub lines: Vec<Vec<TrackPoint>>,
}

impl DecodedGpx {
    pub fn point_count(&self) -> usize {
        self.lines.iter().map(Vec::len).sum()
    }

    /// Concatenate all lines into one track.
    pub fn into_track(self) -> Vec<TrackPoint> {
        self.lines.into_iter().flatten().collect()
    }
}

/// The lines of one file, kept together for chronological ordering.
struct FileLines {
    filename: String,
    lines: Vec<Vec<TrackPoint>>,
}

impl FileLines {
    fn first_time(&self) -> Option<DateTime<Utc>> {
        self.lines.first().and_then(|l| l.first()).and_then(|p| p.time)
    }

    fn last_time(&self) -> Option<DateTime<Utc>> {
        self.lines.last().and_then(|l| l.last()).and_then(|p| p.time)
    }
}

/// Decode GPX documents into ordered lines.
///
/// Per-file failures (invalid XML, route-only file, no points) are
/// collected for the whole batch and returned together as
/// [`CompareError::InvalidFiles`].
pub fn decode_gpx(inputs: &[GpxInput], options: DecodeOptions) -> Result<DecodedGpx> {
    if inputs.is_empty() {
        return Err(CompareError::NoInput);
    }

    let mut files = Vec::with_capacity(inputs.len());
    let mut failures = Vec::new();

    for input in inputs {
        match read_file_lines(input) {
            Ok(lines) => files.push(FileLines {
                filename: input.filename.clone(),
                lines,
            }),
            Err(failure) => failures.push(failure),
        }
    }

    if !failures.is_empty() {
        return Err(CompareError::InvalidFiles(failures));
    }

    if options.timestamps_required {
        for file in &files {
            if let Some(index) = file
                .lines
                .iter()
                .position(|line| line.first().is_some_and(|p| p.time.is_none()))
            {
                return Err(CompareError::MissingTimestamps {
                    origin: file.filename.clone(),
                    index,
                });
            }
        }
    }

    if files.len() > 1 {
        order_files(&mut files)?;
    }

    let decoded = DecodedGpx {
        lines: files.into_iter().flat_map(|f| f.lines).collect(),
    };

    debug!(
        "[Decode] {} file(s) -> {} lines, {} points",
        inputs.len(),
        decoded.lines.len(),
        decoded.point_count()
    );

    Ok(decoded)
}

/// Decode GPX documents straight into a single flattened track.
pub fn decode_track(inputs: &[GpxInput], options: DecodeOptions) -> Result<Vec<TrackPoint>> {
    decode_gpx(inputs, options).map(DecodedGpx::into_track)
}

/// Parse one document into its non-empty segments.
fn read_file_lines(input: &GpxInput) -> std::result::Result<Vec<Vec<TrackPoint>>, FileError> {
    let gpx: Gpx = match gpx::read(Cursor::new(input.contents.as_slice())) {
        Ok(gpx) => gpx,
        Err(e) => {
            let invalid = |reason: String| FileError::InvalidXml {
                filename: input.filename.clone(),
                reason,
            };
            // Some exporters omit the mandatory `version` attribute.
            let patched =
                with_default_version(&input.contents).ok_or_else(|| invalid(e.to_string()))?;
            debug!("[Decode] {}: no GPX version, reading as 1.1", input.filename);
            gpx::read(Cursor::new(patched.as_slice())).map_err(|e| invalid(e.to_string()))?
        }
    };

    if gpx.tracks.is_empty() {
        return Err(if gpx.routes.is_empty() {
            FileError::Empty {
                filename: input.filename.clone(),
            }
        } else {
            FileError::RouteOnly {
                filename: input.filename.clone(),
            }
        });
    }

    let mut lines = Vec::new();
    for track in &gpx.tracks {
        for segment in &track.segments {
            if segment.points.is_empty() {
                continue;
            }
            let mut line = Vec::with_capacity(segment.points.len());
            for waypoint in &segment.points {
                let point = waypoint.point();
                let time = match &waypoint.time {
                    Some(t) => Some(parse_time(t, &input.filename)?),
                    None => None,
                };
                line.push(TrackPoint {
                    latitude: point.y(),
                    longitude: point.x(),
                    time,
                });
            }
            lines.push(line);
        }
    }

    if lines.is_empty() {
        return Err(FileError::Empty {
            filename: input.filename.clone(),
        });
    }

    Ok(lines)
}

/// Copy of `contents` with `version="1.1"` added to the root `<gpx>` tag, or
/// `None` when there is no root tag or it already carries a version.
fn with_default_version(contents: &[u8]) -> Option<Vec<u8>> {
    let tag_start = contents.windows(5).position(|w| {
        w.starts_with(b"<gpx") && (w[4] == b'>' || w[4].is_ascii_whitespace())
    })?;
    let name_end = tag_start + 4;
    let tag_len = contents[name_end..].iter().position(|&b| b == b'>')?;
    let attributes = &contents[name_end..name_end + tag_len];
    if attributes.windows(7).any(|w| w == b"version") {
        return None;
    }

    let mut patched = Vec::with_capacity(contents.len() + 16);
    patched.extend_from_slice(&contents[..name_end]);
    patched.extend_from_slice(b" version=\"1.1\"");
    patched.extend_from_slice(&contents[name_end..]);
    Some(patched)
}

fn parse_time(time: &gpx::Time, filename: &str) -> std::result::Result<DateTime<Utc>, FileError> {
    let invalid = |reason: String| FileError::InvalidXml {
        filename: filename.to_string(),
        reason,
    };
    let iso = time.format().map_err(|e| invalid(e.to_string()))?;
    let parsed = DateTime::parse_from_rfc3339(&iso).map_err(|e| invalid(e.to_string()))?;
    Ok(parsed.with_timezone(&Utc))
}

/// Sort files by their first timestamp and reject time overlaps.
///
/// Only meaningful when every file is timed; untimed files keep their
/// upload order.
fn order_files(files: &mut [FileLines]) -> Result<()> {
    if files.iter().all(|f| f.first_time().is_some()) {
        files.sort_by_key(|f| f.first_time());
    }

    for pair in files.windows(2) {
        let (current, next) = (&pair[0], &pair[1]);
        if let (Some(end), Some(start)) = (current.last_time(), next.first_time()) {
            if end > start {
                return Err(CompareError::OverlappingFiles {
                    earlier: current.filename.clone(),
                    later: next.filename.clone(),
                });
            }
        }
    }

    Ok(())
}
