//! Directionality analysis of ambient-noise EGFs.
//!
//! A batch of two-sided EGFs is first turned into a [`DirectionalDataset`]:
//! batch-level normalization constants are computed once, then every record
//! gets raw and corrected SNRs for its symmetric, causal and acausal views.
//! Each record also contributes a reversed twin (the same path seen from
//! the other station) so per-station views see every partner.
//!
//! The dataset feeds three analyses:
//! * region-based: four propagation axes with causal/acausal reversal so
//!   each axis has a consistent polarity,
//! * fan diagrams: per-azimuth-bin SNR statistics,
//! * station-based and subset summaries.

use crate::core::angle_bins::{AngleBin, AngleBinWidth, AngleBins};
use crate::core::direction::{
    classify, classify_4way, classify_8way, Axis, AzimuthKey, Direction, DirectionScheme, Octant,
};
use crate::core::snr::{
    NormalizationConstants, PathSnr, SnrCorrection, SnrCorrector, SnrEstimator, SnrField,
    VelocityWindow,
};
use crate::core::statistics::BinStatistics;
use crate::types::{EgfError, EgfResult, Station, WaveformRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Directionality analysis parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionalityParams {
    /// Signal window velocity range
    pub velocity: VelocityWindow,
    /// Fan-diagram bin width
    pub bin_width: AngleBinWidth,
    /// Azimuth used to place records in fan-diagram bins
    pub fan_key: AzimuthKey,
    /// SNR view aggregated into fan diagrams
    pub snr_field: SnrField,
    pub correction: SnrCorrection,
    /// Convention for the per-record direction label
    pub direction_scheme: DirectionScheme,
    /// Azimuth classified into the per-record direction label
    pub direction_key: AzimuthKey,
}

impl Default for DirectionalityParams {
    fn default() -> Self {
        Self {
            velocity: VelocityWindow::default(),
            bin_width: AngleBinWidth::default(),
            fan_key: AzimuthKey::Back,
            snr_field: SnrField::Causal,
            correction: SnrCorrection::DistanceAndStackCount,
            direction_scheme: DirectionScheme::FourWay,
            direction_key: AzimuthKey::Back,
        }
    }
}

/// One record of the directionality dataset
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalEntry {
    pub record: WaveformRecord,
    pub raw_snr: PathSnr,
    pub corrected_snr: PathSnr,
    /// Four-way axis of the back azimuth
    pub axis: Axis,
    /// Compass point of the back azimuth
    pub back_azimuth_octant: Octant,
    /// Label under the configured scheme and key
    pub direction: Direction,
    /// True for the station-swapped copy of an input record
    pub is_reversed_twin: bool,
}

impl DirectionalEntry {
    pub fn azimuth(&self, key: AzimuthKey) -> f64 {
        match key {
            AzimuthKey::Forward => self.record.forward_azimuth,
            AzimuthKey::Back => self.record.back_azimuth,
        }
    }

    pub fn station_a(&self) -> &str {
        &self.record.station_a.name
    }
}

/// Prepared records plus the constants their SNRs were corrected with
#[derive(Debug, Clone)]
pub struct DirectionalDataset {
    pub constants: NormalizationConstants,
    /// Each input record followed by its reversed twin
    pub entries: Vec<DirectionalEntry>,
}

impl DirectionalDataset {
    /// Entries as recorded, without reversed twins
    pub fn recorded(&self) -> impl Iterator<Item = &DirectionalEntry> {
        self.entries.iter().filter(|e| !e.is_reversed_twin)
    }

    /// Names of every first station in the dataset
    pub fn stations(&self) -> BTreeSet<&str> {
        self.entries.iter().map(DirectionalEntry::station_a).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A record oriented so that its causal half points along the primary
/// direction of its axis
#[derive(Debug, Clone, PartialEq)]
pub struct OrientedRecord {
    pub record: WaveformRecord,
    pub causal_snr: f64,
    pub acausal_snr: f64,
    pub reversed: bool,
}

/// Records of one propagation axis
#[derive(Debug, Clone, PartialEq)]
pub struct RegionSummary {
    pub axis: Axis,
    /// Sorted by distance, nearest first
    pub members: Vec<OrientedRecord>,
    pub causal: BinStatistics,
    pub acausal: BinStatistics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanBin {
    pub bin: AngleBin,
    pub stats: BinStatistics,
}

/// Per-azimuth-bin SNR statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanDiagram {
    pub key: AzimuthKey,
    pub field: SnrField,
    pub bins: Vec<FanBin>,
}

impl FanDiagram {
    /// Largest bin mean, used as the colour-scale maximum by renderers
    pub fn max_mean(&self) -> Option<f64> {
        self.bins
            .iter()
            .filter_map(|b| b.stats.mean())
            .fold(None, |acc, m| Some(acc.map_or(m, |a: f64| a.max(m))))
    }

    pub fn populated_bins(&self) -> usize {
        self.bins.iter().filter(|b| !b.stats.is_empty()).count()
    }
}

/// One partner of a station in the station-based analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerEntry {
    pub station: String,
    pub distance_km: f64,
    pub back_azimuth: f64,
    pub causal_snr: f64,
    pub acausal_snr: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StationDirectionality {
    pub station: Station,
    /// Sorted by distance, nearest first
    pub partners: Vec<PartnerEntry>,
    pub causal: BinStatistics,
    pub acausal: BinStatistics,
    pub fan: FanDiagram,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubsetDirectionality {
    pub stations: Vec<String>,
    pub mean_lon: f64,
    pub mean_lat: f64,
    pub causal: BinStatistics,
    pub regions: Vec<RegionSummary>,
    pub fan_back: FanDiagram,
    pub fan_forward: FanDiagram,
}

/// Directionality analyzer
pub struct DirectionalityAnalyzer {
    params: DirectionalityParams,
    estimator: SnrEstimator,
    bins: AngleBins,
}

impl DirectionalityAnalyzer {
    pub fn new(params: DirectionalityParams) -> EgfResult<Self> {
        let estimator = SnrEstimator::new(params.velocity)?;
        let bins = AngleBins::generate(params.bin_width);
        Ok(Self {
            params,
            estimator,
            bins,
        })
    }

    /// Analyzer with default parameters
    pub fn standard() -> EgfResult<Self> {
        Self::new(DirectionalityParams::default())
    }

    pub fn params(&self) -> &DirectionalityParams {
        &self.params
    }

    pub fn bins(&self) -> &AngleBins {
        &self.bins
    }

    /// Build the directionality dataset from two-sided (non-symmetrized)
    /// EGFs.
    pub fn prepare(&self, records: &[WaveformRecord]) -> EgfResult<DirectionalDataset> {
        log::info!("Preparing directionality dataset from {} EGFs", records.len());

        let constants = NormalizationConstants::from_records(records, self.params.correction)?;
        let corrector = SnrCorrector::new(constants, self.params.correction);

        #[cfg(feature = "parallel")]
        let pairs = records
            .par_iter()
            .map(|record| self.prepare_record(record, &corrector))
            .collect::<EgfResult<Vec<_>>>()?;

        #[cfg(not(feature = "parallel"))]
        let pairs = records
            .iter()
            .map(|record| self.prepare_record(record, &corrector))
            .collect::<EgfResult<Vec<_>>>()?;

        let entries: Vec<DirectionalEntry> = pairs
            .into_iter()
            .flat_map(|(recorded, twin)| [recorded, twin])
            .collect();

        log::info!(
            "Directionality dataset ready: {} entries, distance {:.1} km minimum, mean stack count {:.1}",
            entries.len(),
            constants.min_distance_km,
            constants.mean_stack_count
        );

        Ok(DirectionalDataset { constants, entries })
    }

    fn prepare_record(
        &self,
        record: &WaveformRecord,
        corrector: &SnrCorrector,
    ) -> EgfResult<(DirectionalEntry, DirectionalEntry)> {
        let raw_snr = self.estimator.estimate(record)?;
        let corrected_snr = corrector.correct_path(&raw_snr, record.distance_km, record.stack_count);
        if !corrected_snr.symmetric.is_finite() {
            log::warn!("{}: non-finite symmetric SNR", record.pair_key());
        }

        let twin_record = record.reversed()?;
        let recorded = self.entry(record.clone(), raw_snr, corrected_snr, false);
        let twin = self.entry(twin_record, raw_snr.swapped(), corrected_snr.swapped(), true);
        Ok((recorded, twin))
    }

    fn entry(
        &self,
        record: WaveformRecord,
        raw_snr: PathSnr,
        corrected_snr: PathSnr,
        is_reversed_twin: bool,
    ) -> DirectionalEntry {
        let key_azimuth = match self.params.direction_key {
            AzimuthKey::Forward => record.forward_azimuth,
            AzimuthKey::Back => record.back_azimuth,
        };
        DirectionalEntry {
            axis: classify_4way(record.back_azimuth),
            back_azimuth_octant: classify_8way(record.back_azimuth),
            direction: classify(key_azimuth, self.params.direction_scheme),
            record,
            raw_snr,
            corrected_snr,
            is_reversed_twin,
        }
    }

    /// Orient an entry within its axis: a forward azimuth in the opposite
    /// half of the axis swaps causal and acausal, azimuths and waveform.
    pub fn orient(&self, entry: &DirectionalEntry) -> EgfResult<OrientedRecord> {
        let snr = entry.corrected_snr;
        if entry.axis.in_primary_half(entry.record.forward_azimuth) {
            Ok(OrientedRecord {
                record: entry.record.clone(),
                causal_snr: snr.causal,
                acausal_snr: snr.acausal,
                reversed: false,
            })
        } else {
            Ok(OrientedRecord {
                record: entry.record.reversed()?,
                causal_snr: snr.acausal,
                acausal_snr: snr.causal,
                reversed: true,
            })
        }
    }

    fn region_summaries<'a, I>(&self, entries: I) -> EgfResult<Vec<RegionSummary>>
    where
        I: IntoIterator<Item = &'a DirectionalEntry>,
    {
        let mut grouped: BTreeMap<Axis, Vec<OrientedRecord>> =
            Axis::ALL.iter().map(|axis| (*axis, Vec::new())).collect();
        for entry in entries {
            let oriented = self.orient(entry)?;
            grouped.entry(entry.axis).or_default().push(oriented);
        }

        Ok(grouped
            .into_iter()
            .map(|(axis, mut members)| {
                members.sort_by(|a, b| a.record.distance_km.total_cmp(&b.record.distance_km));
                let causal = BinStatistics::from_values(members.iter().map(|m| m.causal_snr));
                let acausal = BinStatistics::from_values(members.iter().map(|m| m.acausal_snr));
                log::debug!(
                    "Region {}: {} records ({} reversed)",
                    axis,
                    members.len(),
                    members.iter().filter(|m| m.reversed).count()
                );
                RegionSummary {
                    axis,
                    members,
                    causal,
                    acausal,
                }
            })
            .collect())
    }

    /// Region-based analysis over the records as recorded
    pub fn regions(&self, dataset: &DirectionalDataset) -> EgfResult<Vec<RegionSummary>> {
        log::info!("Region-based directionality analysis");
        self.region_summaries(dataset.recorded())
    }

    /// Fan diagram with explicit key and SNR field
    pub fn fan_diagram_with<'a, I>(&self, entries: I, key: AzimuthKey, field: SnrField) -> FanDiagram
    where
        I: IntoIterator<Item = &'a DirectionalEntry>,
    {
        let mut members: Vec<Vec<f64>> = vec![Vec::new(); self.bins.len()];
        for entry in entries {
            match self.bins.locate(entry.azimuth(key)) {
                Some(index) => members[index].push(entry.corrected_snr.get(field)),
                None => log::warn!(
                    "{}: azimuth {} has no bin",
                    entry.record.pair_key(),
                    entry.azimuth(key)
                ),
            }
        }

        let bins = self
            .bins
            .bins()
            .iter()
            .zip(members)
            .map(|(bin, values)| FanBin {
                bin: *bin,
                stats: BinStatistics::from_values(values),
            })
            .collect();

        FanDiagram { key, field, bins }
    }

    /// Fan diagram using the configured key and SNR field
    pub fn fan_diagram<'a, I>(&self, entries: I) -> FanDiagram
    where
        I: IntoIterator<Item = &'a DirectionalEntry>,
    {
        self.fan_diagram_with(entries, self.params.fan_key, self.params.snr_field)
    }

    /// Statistics of the configured SNR field per direction label
    pub fn directions(&self, dataset: &DirectionalDataset) -> BTreeMap<String, BinStatistics> {
        let mut grouped: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for entry in dataset.recorded() {
            grouped
                .entry(entry.direction.label().to_string())
                .or_default()
                .push(entry.corrected_snr.get(self.params.snr_field));
        }
        grouped
            .into_iter()
            .map(|(label, values)| (label, BinStatistics::from_values(values)))
            .collect()
    }

    /// Station-based analysis: one summary per first station, by name
    pub fn stations(&self, dataset: &DirectionalDataset) -> Vec<StationDirectionality> {
        let mut grouped: BTreeMap<&str, Vec<&DirectionalEntry>> = BTreeMap::new();
        for entry in &dataset.entries {
            grouped.entry(entry.station_a()).or_default().push(entry);
        }
        log::info!("Station-based directionality analysis for {} stations", grouped.len());

        grouped
            .into_values()
            .map(|mut entries| {
                entries.sort_by(|a, b| a.record.distance_km.total_cmp(&b.record.distance_km));
                let partners = entries
                    .iter()
                    .map(|e| PartnerEntry {
                        station: e.record.station_b.name.clone(),
                        distance_km: e.record.distance_km,
                        back_azimuth: e.record.back_azimuth,
                        causal_snr: e.corrected_snr.causal,
                        acausal_snr: e.corrected_snr.acausal,
                    })
                    .collect::<Vec<_>>();
                StationDirectionality {
                    station: entries[0].record.station_a.clone(),
                    causal: BinStatistics::from_values(partners.iter().map(|p| p.causal_snr)),
                    acausal: BinStatistics::from_values(partners.iter().map(|p| p.acausal_snr)),
                    fan: self.fan_diagram(entries.iter().copied()),
                    partners,
                }
            })
            .collect()
    }

    /// Analysis restricted to records whose first station is in `stations`
    pub fn subset<S: AsRef<str>>(
        &self,
        dataset: &DirectionalDataset,
        stations: &[S],
    ) -> EgfResult<SubsetDirectionality> {
        let known = dataset.stations();
        let mut names: Vec<String> = Vec::with_capacity(stations.len());
        for name in stations {
            let name = name.as_ref();
            if !known.contains(name) {
                return Err(EgfError::UnknownStation(name.to_string()));
            }
            names.push(name.to_string());
        }
        if names.is_empty() {
            return Err(EgfError::Config("station subset is empty".to_string()));
        }

        let members: Vec<&DirectionalEntry> = dataset
            .entries
            .iter()
            .filter(|e| names.iter().any(|n| n == e.station_a()))
            .collect();
        log::info!("Subset analysis: {} stations, {} entries", names.len(), members.len());

        let count = members.len() as f64;
        let mean_lon = members.iter().map(|e| e.record.station_a.lon).sum::<f64>() / count;
        let mean_lat = members.iter().map(|e| e.record.station_a.lat).sum::<f64>() / count;

        Ok(SubsetDirectionality {
            mean_lon,
            mean_lat,
            causal: BinStatistics::from_values(members.iter().map(|e| e.corrected_snr.causal)),
            regions: self.region_summaries(members.iter().copied())?,
            fan_back: self.fan_diagram_with(members.iter().copied(), AzimuthKey::Back, SnrField::Causal),
            fan_forward: self.fan_diagram_with(
                members.iter().copied(),
                AzimuthKey::Forward,
                SnrField::Causal,
            ),
            stations: names,
        })
    }
}
