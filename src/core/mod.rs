//! Core EGF processing modules

pub mod geometry;
pub mod angle_bins;
pub mod direction;
pub mod symmetrize;
pub mod snr;
pub mod stacking;
pub mod seasons;
pub mod statistics;
pub mod directionality;
pub mod seasonality;

// Re-export main types
pub use geometry::{resolve, normalize_azimuth, PairGeometry};
pub use angle_bins::{generate_bins, AngleBin, AngleBinWidth, AngleBins};
pub use direction::{classify, classify_4way, classify_8way, Axis, AzimuthKey, Direction, DirectionScheme, Octant};
pub use symmetrize::{symmetrize, symmetrize_full, SymmetrizedRecord};
pub use snr::{NormalizationConstants, PathSnr, SnrCorrection, SnrCorrector, SnrEstimator, SnrField, VelocityWindow};
pub use stacking::{group_by_pair, stack, stack_by_pair};
pub use seasons::{parse_day_label, partition, stack_seasons, DatedRecord, Season, SeasonPartition, SeasonStack, SeasonWidth};
pub use statistics::{BinStatistics, SummaryStats};
pub use directionality::{DirectionalDataset, DirectionalEntry, DirectionalityAnalyzer, DirectionalityParams, FanDiagram, RegionSummary};
pub use seasonality::{split_by_axis, PairSeasonality, SeasonEntry, SeasonalityAnalyzer, SeasonalityParams, SeasonalityReport};
