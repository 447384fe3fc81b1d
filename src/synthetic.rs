//! Synthetic reference/challenger pairs for testing and benchmarking.
//!
//! Generates a reference path and a challenger recording that follows it
//! at constant speed, with known detours, so the expected missed segments
//! and rolling-window distances are known in advance.
//!
//! Feature-gated behind `synthetic`; not part of production builds.
//!
//! # Example
//!
//! ```rust
//! use tracecompare::synthetic::{ReferenceShape, SyntheticPair};
//!
//! let pair = SyntheticPair {
//!     shape: ReferenceShape::Straight,
//!     length_meters: 5_000.0,
//!     speed_kmh: 10.0,
//!     ..SyntheticPair::default()
//! };
//!
//! let tracks = pair.generate();
//! assert_eq!(tracks.reference.len(), 501);
//! assert!(tracks.challenger.iter().all(|p| p.time.is_some()));
//! ```

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

use crate::geo_utils::offset_meters;
use crate::{GpsPoint, TrackPoint};

// ============================================================================
// Types
// ============================================================================

/// Shape of the reference path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceShape {
    /// Due north.
    Straight,
    /// North for the first half, then east.
    LShape,
}

/// A stretch where the challenger leaves the reference.
#[derive(Debug, Clone, Copy)]
pub struct DetourSpan {
    /// Distance along the reference where the detour starts.
    pub from_meters: f64,
    /// Distance along the reference where the challenger rejoins.
    pub to_meters: f64,
    /// Lateral distance kept from the reference while detouring.
    pub offset_meters: f64,
}

/// Scenario for one reference/challenger pair.
#[derive(Debug, Clone)]
pub struct SyntheticPair {
    pub origin: GpsPoint,
    pub shape: ReferenceShape,
    pub length_meters: f64,
    pub reference_spacing_meters: f64,
    /// Constant challenger speed.
    pub speed_kmh: f64,
    /// Time between challenger samples.
    pub sample_interval_secs: f64,
    /// Challenger distance recorded before the reference start.
    pub lead_in_meters: f64,
    pub detours: Vec<DetourSpan>,
    /// GPS noise standard deviation applied to challenger samples.
    pub gps_noise_sigma_meters: f64,
    pub start_time: DateTime<Utc>,
    /// RNG seed for deterministic reproduction.
    pub seed: u64,
}

impl Default for SyntheticPair {
    fn default() -> Self {
        Self {
            origin: GpsPoint::new(44.1, 3.08),
            shape: ReferenceShape::Straight,
            length_meters: 10_000.0,
            reference_spacing_meters: 10.0,
            speed_kmh: 10.0,
            sample_interval_secs: 1.0,
            lead_in_meters: 0.0,
            detours: Vec::new(),
            gps_noise_sigma_meters: 0.0,
            start_time: Utc
                .timestamp_opt(1_717_225_200, 0)
                .single()
                .unwrap_or_default(),
            seed: 42,
        }
    }
}

/// A generated pair.
#[derive(Debug, Clone)]
pub struct SyntheticTracks {
    /// Untimed reference points.
    pub reference: Vec<TrackPoint>,
    /// Timed challenger samples.
    pub challenger: Vec<TrackPoint>,
}

// ============================================================================
// Generation
// ============================================================================

impl SyntheticPair {
    pub fn generate(&self) -> SyntheticTracks {
        let mut rng = StdRng::seed_from_u64(self.seed);

        let ref_count = (self.length_meters / self.reference_spacing_meters).round() as usize;
        let reference = (0..=ref_count)
            .map(|i| {
                let s = (i as f64 * self.reference_spacing_meters).min(self.length_meters);
                let (east, north) = self.along(s, 0.0);
                TrackPoint::untimed(offset_meters(&self.origin, east, north))
            })
            .collect();

        let speed_mps = self.speed_kmh / 3.6;
        let step = speed_mps * self.sample_interval_secs;
        let interval_ms = (self.sample_interval_secs * 1000.0).round() as i64;
        let total = self.lead_in_meters + self.length_meters;
        let sample_count = (total / step).floor() as usize;

        let challenger = (0..=sample_count)
            .map(|k| {
                let s = k as f64 * step - self.lead_in_meters;
                let lateral = self.lateral_offset(s);
                let (mut east, mut north) = self.along(s, lateral);
                if self.gps_noise_sigma_meters > 0.0 {
                    east += gaussian(&mut rng) * self.gps_noise_sigma_meters;
                    north += gaussian(&mut rng) * self.gps_noise_sigma_meters;
                }
                TrackPoint::timed(
                    offset_meters(&self.origin, east, north),
                    self.start_time + Duration::milliseconds(k as i64 * interval_ms),
                )
            })
            .collect();

        SyntheticTracks {
            reference,
            challenger,
        }
    }

    /// Local (east, north) position at distance `s` along the path, pushed
    /// `lateral` meters to the right of the direction of travel.
    fn along(&self, s: f64, lateral: f64) -> (f64, f64) {
        match self.shape {
            ReferenceShape::Straight => (lateral, s),
            ReferenceShape::LShape => {
                let corner = self.length_meters / 2.0;
                if s <= corner {
                    (lateral, s)
                } else {
                    (s - corner, corner - lateral)
                }
            }
        }
    }

    fn lateral_offset(&self, s: f64) -> f64 {
        self.detours
            .iter()
            .find(|d| s > d.from_meters && s < d.to_meters)
            .map_or(0.0, |d| d.offset_meters)
    }
}

/// Standard normal sample (Box-Muller).
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(0.0001..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}
