//! egfkit: stacking, symmetrization and directionality analysis of
//! ambient-noise empirical Green's functions (EGFs).
//!
//! Station-pair cross-correlations are stacked, split into causal and
//! acausal halves, scored with a velocity-windowed SNR, corrected for path
//! length and stack count, and aggregated into azimuthal, regional,
//! per-station and seasonal statistics ready for external rendering.

pub mod types;
pub mod core;
pub mod config;

// Re-export main types and functions for easier access
pub use types::{
    Amplitude, EgfError, EgfResult, PairKey, SampleGrid, Station, Trace, WaveformRecord,
};

pub use config::AnalysisConfig;
pub use crate::core::{
    DirectionalityAnalyzer, DirectionalityParams, SeasonalityAnalyzer, SeasonalityParams,
};
