use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Real-valued cross-correlation amplitudes
pub type Amplitude = f64;

/// 1D waveform array (lag samples)
pub type Trace = Array1<Amplitude>;

/// Relative tolerance used when comparing sample grids
const GRID_TOLERANCE: f64 = 1e-9;

/// Time axis of a waveform: start lag, end lag and sample spacing (seconds)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleGrid {
    pub b: f64,
    pub e: f64,
    pub delta: f64,
}

impl SampleGrid {
    pub fn new(b: f64, e: f64, delta: f64) -> EgfResult<Self> {
        if !(delta.is_finite() && delta > 0.0) {
            return Err(EgfError::InvalidRecord(format!(
                "sample spacing must be positive, got {}",
                delta
            )));
        }
        if !(b.is_finite() && e.is_finite()) || e < b {
            return Err(EgfError::InvalidRecord(format!(
                "invalid lag range [{}, {}]",
                b, e
            )));
        }
        Ok(Self { b, e, delta })
    }

    /// Symmetric two-sided grid `[-half_span, half_span]`
    pub fn two_sided(half_span: f64, delta: f64) -> EgfResult<Self> {
        Self::new(-half_span, half_span, delta)
    }

    /// Number of samples covered by the grid
    pub fn npts(&self) -> usize {
        ((self.e - self.b) / self.delta).round() as usize + 1
    }

    /// Lag time of sample `index`
    pub fn time_at(&self, index: usize) -> f64 {
        self.b + index as f64 * self.delta
    }

    /// True when the grid is symmetric about zero lag
    pub fn is_two_sided(&self) -> bool {
        (self.b + self.e).abs() <= GRID_TOLERANCE * self.delta.max(self.e.abs())
    }

    /// Index of the zero-lag sample, if zero lag lies on the grid
    pub fn zero_lag_index(&self) -> Option<usize> {
        if self.b > 0.0 || self.e < 0.0 {
            return None;
        }
        let index = (-self.b / self.delta).round();
        let offset = (self.b + index * self.delta).abs();
        if offset <= GRID_TOLERANCE * self.delta.max(1.0) {
            Some(index as usize)
        } else {
            None
        }
    }

    /// The non-negative half `[0, e]` of a two-sided grid
    pub fn causal_half(&self) -> Self {
        Self {
            b: 0.0,
            e: self.e,
            delta: self.delta,
        }
    }

    /// Whether two grids describe the same sample positions
    pub fn matches(&self, other: &SampleGrid) -> bool {
        let tol = GRID_TOLERANCE * self.delta.max(1.0);
        (self.delta - other.delta).abs() <= GRID_TOLERANCE * self.delta
            && (self.b - other.b).abs() <= tol
            && (self.e - other.e).abs() <= tol
    }
}

impl fmt::Display for SampleGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}] @ {}s", self.b, self.e, self.delta)
    }
}

/// Seismic station identity and location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub name: String,
    pub lon: f64,
    pub lat: f64,
}

impl Station {
    pub fn new(name: impl Into<String>, lon: f64, lat: f64) -> Self {
        Self {
            name: name.into(),
            lon,
            lat,
        }
    }
}

/// Ordered station pair key; (A, B) and (B, A) are different pairs
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairKey {
    pub station_a: String,
    pub station_b: String,
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.station_a, self.station_b)
    }
}

/// One cross-correlation or stacked waveform between two stations.
///
/// The positive-lag (causal) half represents a virtual source at `station_a`
/// recorded at `station_b`. Records are treated as immutable values: stacking,
/// symmetrization and reversal all return new records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveformRecord {
    pub samples: Trace,
    pub grid: SampleGrid,
    pub station_a: Station,
    pub station_b: Station,
    /// Inter-station distance in km
    pub distance_km: f64,
    /// Bearing from A to B, degrees in [0, 360)
    pub forward_azimuth: f64,
    /// Bearing from B to A, degrees in [0, 360)
    pub back_azimuth: f64,
    /// Number of elementary correlations folded into this record
    pub stack_count: usize,
}

impl WaveformRecord {
    /// Build a single (unstacked) record, resolving the pair geometry from
    /// the station coordinates.
    pub fn new(
        samples: Trace,
        grid: SampleGrid,
        station_a: Station,
        station_b: Station,
    ) -> EgfResult<Self> {
        let geometry = crate::core::geometry::resolve(
            station_a.lat,
            station_a.lon,
            station_b.lat,
            station_b.lon,
        );
        Self::with_geometry(
            samples,
            grid,
            station_a,
            station_b,
            geometry.distance_km,
            geometry.forward_azimuth,
            geometry.back_azimuth,
        )
    }

    /// Build a record with supplied distance and azimuths
    pub fn with_geometry(
        samples: Trace,
        grid: SampleGrid,
        station_a: Station,
        station_b: Station,
        distance_km: f64,
        forward_azimuth: f64,
        back_azimuth: f64,
    ) -> EgfResult<Self> {
        let record = Self {
            samples,
            grid,
            station_a,
            station_b,
            distance_km,
            forward_azimuth,
            back_azimuth,
            stack_count: 1,
        };
        record.validate()?;
        Ok(record)
    }

    pub fn pair_key(&self) -> PairKey {
        PairKey {
            station_a: self.station_a.name.clone(),
            station_b: self.station_b.name.clone(),
        }
    }

    /// Check the record invariants
    pub fn validate(&self) -> EgfResult<()> {
        let expected = self.grid.npts();
        if self.samples.len() != expected {
            return Err(EgfError::InvalidRecord(format!(
                "{}: {} samples on grid {} (expected {})",
                self.pair_key(),
                self.samples.len(),
                self.grid,
                expected
            )));
        }
        if !(self.distance_km.is_finite() && self.distance_km >= 0.0) {
            return Err(EgfError::InvalidRecord(format!(
                "{}: invalid distance {} km",
                self.pair_key(),
                self.distance_km
            )));
        }
        for (name, value) in [
            ("forward azimuth", self.forward_azimuth),
            ("back azimuth", self.back_azimuth),
        ] {
            if !(0.0..360.0).contains(&value) {
                return Err(EgfError::InvalidRecord(format!(
                    "{}: {} {} outside [0, 360)",
                    self.pair_key(),
                    name,
                    value
                )));
            }
        }
        if self.stack_count == 0 {
            return Err(EgfError::InvalidRecord(format!(
                "{}: stack count must be at least 1",
                self.pair_key()
            )));
        }
        Ok(())
    }

    /// Same metadata, new samples and grid
    pub(crate) fn derive(&self, samples: Trace, grid: SampleGrid) -> Self {
        Self {
            samples,
            grid,
            station_a: self.station_a.clone(),
            station_b: self.station_b.clone(),
            distance_km: self.distance_km,
            forward_azimuth: self.forward_azimuth,
            back_azimuth: self.back_azimuth,
            stack_count: self.stack_count,
        }
    }

    /// The record seen from the other station: stations, coordinates and
    /// azimuths swapped, samples time-reversed.
    pub fn reversed(&self) -> EgfResult<Self> {
        if !self.grid.is_two_sided() {
            return Err(EgfError::GridMismatch(format!(
                "{}: reversal needs a grid symmetric about zero lag, got {}",
                self.pair_key(),
                self.grid
            )));
        }
        Ok(Self {
            samples: self.samples.iter().rev().copied().collect(),
            grid: self.grid,
            station_a: self.station_b.clone(),
            station_b: self.station_a.clone(),
            distance_km: self.distance_km,
            forward_azimuth: self.back_azimuth,
            back_azimuth: self.forward_azimuth,
            stack_count: self.stack_count,
        })
    }
}

/// Error types for EGF processing
#[derive(Debug, thiserror::Error)]
pub enum EgfError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Empty stack: no records supplied")]
    EmptyStack,

    #[error("Sample grid mismatch: {0}")]
    GridMismatch(String),

    #[error("Station pair mismatch: expected {expected}, found {found}")]
    PairMismatch { expected: String, found: String },

    #[error("Insufficient data: need {needed} samples, have {available}")]
    InsufficientData { needed: usize, available: usize },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Unknown station: {0}")]
    UnknownStation(String),

    #[error("Invalid day label: {0}")]
    InvalidDayLabel(String),
}

/// Result type for EGF operations
pub type EgfResult<T> = Result<T, EgfError>;
