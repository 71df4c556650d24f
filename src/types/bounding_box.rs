//! Geographic rectangles and the minimum-size normalisation applied before a
//! rectangle is sent to the archive.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of decimals coordinates are rounded to.
pub const DEFAULT_COORDINATE_PRECISION: u32 = 2;

/// A rectangle expressed as north/south/east/west limits in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

/// The archive's `area` ordering: `[north, west, south, east]`.
pub type AdjustedBoundingBox = [f64; 4];

impl BoundingBox {
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    pub fn lon_span(&self) -> f64 {
        self.east - self.west
    }

    pub fn lat_midpoint(&self) -> f64 {
        (self.north + self.south) / 2.0
    }

    pub fn lon_midpoint(&self) -> f64 {
        (self.east + self.west) / 2.0
    }

    /// Rounds every edge to `precision` decimals.
    pub fn rounded(&self, precision: u32) -> Self {
        Self {
            north: round_to(self.north, precision),
            south: round_to(self.south, precision),
            east: round_to(self.east, precision),
            west: round_to(self.west, precision),
        }
    }

    /// Grows every axis narrower than `min_size` symmetrically about its
    /// midpoint until it is exactly `min_size` wide. Axes that are already wide
    /// enough keep their edges.
    pub fn expanded_to_min_size(&self, min_size: f64, precision: u32) -> Self {
        let mut expanded = *self;
        let half = min_size / 2.0;
        if self.lat_span() < min_size {
            let mid = self.lat_midpoint();
            expanded.north = round_to(mid + half, precision);
            expanded.south = round_to(mid - half, precision);
        }
        if self.lon_span() < min_size {
            let mid = self.lon_midpoint();
            expanded.east = round_to(mid + half, precision);
            expanded.west = round_to(mid - half, precision);
        }
        expanded
    }

    pub fn as_area(&self) -> AdjustedBoundingBox {
        [self.north, self.west, self.south, self.east]
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "N {:.2} W {:.2} S {:.2} E {:.2}",
            self.north, self.west, self.south, self.east
        )
    }
}

/// The geocoded rectangle for one location together with its archive-ready,
/// minimum-size version.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedArea {
    pub original: BoundingBox,
    pub adjusted: AdjustedBoundingBox,
}

impl ResolvedArea {
    pub fn from_original(original: BoundingBox, min_size: f64, precision: u32) -> Self {
        let original = original.rounded(precision);
        Self {
            original,
            adjusted: original.expanded_to_min_size(min_size, precision).as_area(),
        }
    }
}

pub(crate) fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}
