//! Coarse compass classification of azimuths.
//!
//! Both classifiers are driven by ordered `(lower, upper, label)` sector
//! tables. A sector with `lower > upper` wraps through north.

use crate::core::geometry::normalize_azimuth;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Four-way propagation axis; opposite bearings share an axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Axis {
    NorthSouth,
    NortheastSouthwest,
    EastWest,
    SoutheastNorthwest,
}

impl Axis {
    pub const ALL: [Axis; 4] = [
        Axis::NorthSouth,
        Axis::NortheastSouthwest,
        Axis::EastWest,
        Axis::SoutheastNorthwest,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Axis::NorthSouth => "N-S",
            Axis::NortheastSouthwest => "NE-SW",
            Axis::EastWest => "E-W",
            Axis::SoutheastNorthwest => "SE-NW",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Axis::NorthSouth => "North-South",
            Axis::NortheastSouthwest => "Northeast-Southwest",
            Axis::EastWest => "East-West",
            Axis::SoutheastNorthwest => "Southeast-Northwest",
        }
    }

    /// Centre of the primary (first-named) half of the axis
    pub fn primary_center(&self) -> f64 {
        match self {
            Axis::NorthSouth => 0.0,
            Axis::NortheastSouthwest => 45.0,
            Axis::EastWest => 90.0,
            Axis::SoutheastNorthwest => 135.0,
        }
    }

    /// Whether `azimuth` points into the primary half of the axis, i.e. lies
    /// within 90 degrees of the primary centre.
    pub fn in_primary_half(&self, azimuth: f64) -> bool {
        angular_distance(azimuth, self.primary_center()) < 90.0
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Eight-way compass point
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Octant {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Octant {
    pub fn label(&self) -> &'static str {
        match self {
            Octant::N => "N",
            Octant::NE => "NE",
            Octant::E => "E",
            Octant::SE => "SE",
            Octant::S => "S",
            Octant::SW => "SW",
            Octant::W => "W",
            Octant::NW => "NW",
        }
    }
}

impl fmt::Display for Octant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classification convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DirectionScheme {
    #[default]
    FourWay,
    EightWay,
}

/// Which azimuth of a record is used as the classification or binning key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AzimuthKey {
    Forward,
    #[default]
    Back,
}

/// Result of classifying under either scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Axis(Axis),
    Octant(Octant),
}

impl Direction {
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Axis(axis) => axis.label(),
            Direction::Octant(octant) => octant.label(),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const AXIS_SECTORS: [(f64, f64, Axis); 8] = [
    (337.5, 22.5, Axis::NorthSouth),
    (22.5, 67.5, Axis::NortheastSouthwest),
    (67.5, 112.5, Axis::EastWest),
    (112.5, 157.5, Axis::SoutheastNorthwest),
    (157.5, 202.5, Axis::NorthSouth),
    (202.5, 247.5, Axis::NortheastSouthwest),
    (247.5, 292.5, Axis::EastWest),
    (292.5, 337.5, Axis::SoutheastNorthwest),
];

const OCTANT_SECTORS: [(f64, f64, Octant); 8] = [
    (337.5, 22.5, Octant::N),
    (22.5, 67.5, Octant::NE),
    (67.5, 112.5, Octant::E),
    (112.5, 157.5, Octant::SE),
    (157.5, 202.5, Octant::S),
    (202.5, 247.5, Octant::SW),
    (247.5, 292.5, Octant::W),
    (292.5, 337.5, Octant::NW),
];

fn lookup<T: Copy>(table: &[(f64, f64, T)], azimuth: f64) -> T {
    let az = normalize_azimuth(azimuth);
    table
        .iter()
        .find(|(lower, upper, _)| {
            if lower > upper {
                az >= *lower || az < *upper
            } else {
                *lower <= az && az < *upper
            }
        })
        .map(|(_, _, label)| *label)
        // The tables tile [0, 360); only NaN falls through
        .unwrap_or(table[0].2)
}

/// Smallest angle between two bearings, in [0, 180]
pub fn angular_distance(a: f64, b: f64) -> f64 {
    let d = normalize_azimuth(a - b);
    d.min(360.0 - d)
}

/// Four-way axis of a back azimuth
pub fn classify_4way(back_azimuth: f64) -> Axis {
    lookup(&AXIS_SECTORS, back_azimuth)
}

/// Eight-way compass point of an azimuth
pub fn classify_8way(azimuth: f64) -> Octant {
    lookup(&OCTANT_SECTORS, azimuth)
}

pub fn classify(azimuth: f64, scheme: DirectionScheme) -> Direction {
    match scheme {
        DirectionScheme::FourWay => Direction::Axis(classify_4way(azimuth)),
        DirectionScheme::EightWay => Direction::Octant(classify_8way(azimuth)),
    }
}
