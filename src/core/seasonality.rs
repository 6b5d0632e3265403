//! Seasonal variation of EGF signal quality.
//!
//! Daily records are stacked into sliding calendar seasons, then each
//! season stack is scored with the windowed SNR estimator. The report keeps
//! one slot per season for every station pair; a season in which the pair
//! has no data stays `None` instead of being dropped.

use crate::core::direction::{classify_4way, Axis};
use crate::core::seasons::{stack_seasons, DatedRecord, Season, SeasonPartition, SeasonStack, SeasonWidth};
use crate::core::snr::{
    NormalizationConstants, PathSnr, SnrCorrection, SnrCorrector, SnrEstimator, SnrField,
    VelocityWindow,
};
use crate::core::statistics::BinStatistics;
use crate::types::{EgfError, EgfResult, PairKey, WaveformRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Seasonality analysis parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalityParams {
    pub season_width: SeasonWidth,
    pub velocity: VelocityWindow,
    pub correction: SnrCorrection,
    /// SNR view summarized per pair and per season
    pub snr_field: SnrField,
}

impl Default for SeasonalityParams {
    fn default() -> Self {
        Self {
            season_width: SeasonWidth::default(),
            velocity: VelocityWindow {
                v_min: 2.0,
                v_max: 5.0,
            },
            correction: SnrCorrection::StackCount,
            snr_field: SnrField::Symmetric,
        }
    }
}

/// SNR of one pair in one season
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeasonEntry {
    pub stack_count: usize,
    pub raw_snr: PathSnr,
    pub corrected_snr: PathSnr,
}

/// Season-by-season SNR of one station pair
#[derive(Debug, Clone, PartialEq)]
pub struct PairSeasonality {
    pub pair: PairKey,
    pub distance_km: f64,
    pub back_azimuth: f64,
    pub axis: Axis,
    /// One slot per season, in partition order
    pub seasons: Vec<Option<SeasonEntry>>,
    /// Statistics over the seasons with data
    pub summary: BinStatistics,
}

impl PairSeasonality {
    pub fn available_seasons(&self) -> usize {
        self.seasons.iter().filter(|s| s.is_some()).count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalityReport {
    pub seasons: Vec<Season>,
    pub constants: NormalizationConstants,
    /// Ordered by station pair
    pub pairs: Vec<PairSeasonality>,
    /// Per-season statistics across every pair
    pub regional: Vec<BinStatistics>,
    /// Per-season statistics across the pairs of each axis
    pub by_axis: BTreeMap<Axis, Vec<BinStatistics>>,
}

impl SeasonalityReport {
    pub fn season_index(&self, label: &str) -> Option<usize> {
        self.seasons.iter().position(|s| s.label() == label)
    }

    pub fn pair(&self, key: &PairKey) -> Option<&PairSeasonality> {
        self.pairs.iter().find(|p| &p.pair == key)
    }
}

/// Distribute season stacks over the four propagation axes by the back
/// azimuth of each stack. Every axis is present, each with all seasons.
pub fn split_by_axis(season_stacks: &[SeasonStack]) -> BTreeMap<Axis, Vec<SeasonStack>> {
    let mut split: BTreeMap<Axis, Vec<SeasonStack>> = Axis::ALL
        .iter()
        .map(|axis| {
            let empty = season_stacks
                .iter()
                .map(|s| SeasonStack {
                    season: s.season.clone(),
                    stacks: Vec::new(),
                })
                .collect();
            (*axis, empty)
        })
        .collect();

    for (index, season_stack) in season_stacks.iter().enumerate() {
        for stack in &season_stack.stacks {
            let axis = classify_4way(stack.back_azimuth);
            if let Some(seasons) = split.get_mut(&axis) {
                seasons[index].stacks.push(stack.clone());
            }
        }
    }
    split
}

pub struct SeasonalityAnalyzer {
    params: SeasonalityParams,
    estimator: SnrEstimator,
    partition: SeasonPartition,
}

impl SeasonalityAnalyzer {
    pub fn new(params: SeasonalityParams) -> EgfResult<Self> {
        let estimator = SnrEstimator::new(params.velocity)?;
        let partition = SeasonPartition::new(params.season_width);
        Ok(Self {
            params,
            estimator,
            partition,
        })
    }

    pub fn params(&self) -> &SeasonalityParams {
        &self.params
    }

    pub fn partition(&self) -> &SeasonPartition {
        &self.partition
    }

    /// Stack daily records into this analyzer's seasons
    pub fn stack(&self, dated: &[DatedRecord]) -> EgfResult<Vec<SeasonStack>> {
        stack_seasons(dated, &self.partition)
    }

    /// Stack and analyze in one step
    pub fn run(&self, dated: &[DatedRecord]) -> EgfResult<SeasonalityReport> {
        let season_stacks = self.stack(dated)?;
        self.analyze(&season_stacks)
    }

    /// Score every season stack and summarize per pair and per season.
    ///
    /// Correction constants are computed once over every stack of every
    /// season before any SNR is corrected.
    pub fn analyze(&self, season_stacks: &[SeasonStack]) -> EgfResult<SeasonalityReport> {
        let all_stacks = season_stacks.iter().flat_map(|s| s.stacks.iter());
        let constants = NormalizationConstants::from_records(all_stacks, self.params.correction)?;
        let corrector = SnrCorrector::new(constants, self.params.correction);
        log::info!(
            "Seasonality analysis over {} seasons (mean stack count {:.2})",
            season_stacks.len(),
            constants.mean_stack_count
        );

        let jobs: Vec<(usize, &WaveformRecord)> = season_stacks
            .iter()
            .enumerate()
            .flat_map(|(index, s)| s.stacks.iter().map(move |stack| (index, stack)))
            .collect();

        #[cfg(feature = "parallel")]
        let scored = jobs
            .par_iter()
            .map(|(index, stack)| self.score(*index, *stack, &corrector))
            .collect::<EgfResult<Vec<_>>>()?;

        #[cfg(not(feature = "parallel"))]
        let scored = jobs
            .iter()
            .map(|(index, stack)| self.score(*index, *stack, &corrector))
            .collect::<EgfResult<Vec<_>>>()?;

        let season_count = season_stacks.len();
        let mut pairs: BTreeMap<PairKey, PairSeasonality> = BTreeMap::new();
        for (index, stack, entry) in scored {
            let pair = pairs.entry(stack.pair_key()).or_insert_with(|| PairSeasonality {
                pair: stack.pair_key(),
                distance_km: stack.distance_km,
                back_azimuth: stack.back_azimuth,
                axis: classify_4way(stack.back_azimuth),
                seasons: vec![None; season_count],
                summary: BinStatistics::NoData,
            });
            if pair.seasons[index].is_some() {
                return Err(EgfError::InvalidRecord(format!(
                    "{} has more than one stack in season {}",
                    pair.pair, season_stacks[index].season
                )));
            }
            pair.seasons[index] = Some(entry);
        }

        let field = self.params.snr_field;
        let mut pairs: Vec<PairSeasonality> = pairs.into_values().collect();
        for pair in &mut pairs {
            pair.summary = BinStatistics::from_values(
                pair.seasons.iter().flatten().map(|e| e.corrected_snr.get(field)),
            );
            log::debug!(
                "{}: data in {}/{} seasons",
                pair.pair,
                pair.available_seasons(),
                season_count
            );
        }

        let per_season = |members: &[&PairSeasonality]| -> Vec<BinStatistics> {
            (0..season_count)
                .map(|index| {
                    BinStatistics::from_values(
                        members
                            .iter()
                            .filter_map(|p| p.seasons[index].as_ref())
                            .map(|e| e.corrected_snr.get(field)),
                    )
                })
                .collect()
        };

        let everyone: Vec<&PairSeasonality> = pairs.iter().collect();
        let regional = per_season(&everyone);
        let by_axis = Axis::ALL
            .iter()
            .map(|axis| {
                let members: Vec<&PairSeasonality> =
                    pairs.iter().filter(|p| p.axis == *axis).collect();
                (*axis, per_season(&members))
            })
            .collect();

        Ok(SeasonalityReport {
            seasons: season_stacks.iter().map(|s| s.season.clone()).collect(),
            constants,
            pairs,
            regional,
            by_axis,
        })
    }

    fn score<'a>(
        &self,
        index: usize,
        stack: &'a WaveformRecord,
        corrector: &SnrCorrector,
    ) -> EgfResult<(usize, &'a WaveformRecord, SeasonEntry)> {
        let raw_snr = self.estimator.estimate(stack)?;
        let corrected_snr = corrector.correct_path(&raw_snr, stack.distance_km, stack.stack_count);
        Ok((
            index,
            stack,
            SeasonEntry {
                stack_count: stack.stack_count,
                raw_snr,
                corrected_snr,
            },
        ))
    }
}
