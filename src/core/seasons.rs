use crate::core::stacking::{group_by_pair, stack_refs};
use crate::types::{EgfError, EgfResult, WaveformRecord};
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Season lengths (months) that tile the year evenly
pub const ALLOWED_SEASON_MONTHS: [u32; 5] = [1, 2, 3, 4, 6];

/// Validated season length in months
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct SeasonWidth(u32);

impl SeasonWidth {
    pub fn new(months: u32) -> EgfResult<Self> {
        if ALLOWED_SEASON_MONTHS.contains(&months) {
            Ok(Self(months))
        } else {
            Err(EgfError::Config(format!(
                "season width {} months is not one of {:?}",
                months, ALLOWED_SEASON_MONTHS
            )))
        }
    }

    pub fn months(&self) -> u32 {
        self.0
    }
}

impl Default for SeasonWidth {
    fn default() -> Self {
        Self(3)
    }
}

impl TryFrom<u32> for SeasonWidth {
    type Error = EgfError;

    fn try_from(value: u32) -> EgfResult<Self> {
        Self::new(value)
    }
}

impl From<SeasonWidth> for u32 {
    fn from(width: SeasonWidth) -> u32 {
        width.0
    }
}

/// Run of consecutive calendar months, wrapping December -> January
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Season {
    months: Vec<u32>,
}

impl Season {
    fn starting_at(start_month: u32, width: SeasonWidth) -> Self {
        let months = (0..width.months())
            .map(|offset| (start_month - 1 + offset) % 12 + 1)
            .collect();
        Self { months }
    }

    pub fn months(&self) -> &[u32] {
        &self.months
    }

    pub fn first_month(&self) -> u32 {
        self.months[0]
    }

    pub fn last_month(&self) -> u32 {
        self.months[self.months.len() - 1]
    }

    pub fn contains(&self, month: u32) -> bool {
        self.months.contains(&month)
    }

    /// `"MM1-MM2"` label, zero padded
    pub fn label(&self) -> String {
        format!("{:02}-{:02}", self.first_month(), self.last_month())
    }

    /// Three-letter month names, e.g. `"Jan-Mar"`
    pub fn short_name(&self) -> String {
        const NAMES: [&str; 12] = [
            "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
        ];
        format!(
            "{}-{}",
            NAMES[(self.first_month() - 1) as usize],
            NAMES[(self.last_month() - 1) as usize]
        )
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// The 12 sliding seasons of one width, starting at January..December.
///
/// Seasons overlap when the width exceeds one month, so a month belongs to
/// `width` seasons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonPartition {
    width: SeasonWidth,
    seasons: Vec<Season>,
}

impl SeasonPartition {
    pub fn new(width: SeasonWidth) -> Self {
        let seasons = (1..=12).map(|m| Season::starting_at(m, width)).collect();
        Self { width, seasons }
    }

    pub fn width(&self) -> SeasonWidth {
        self.width
    }

    pub fn seasons(&self) -> &[Season] {
        &self.seasons
    }

    /// Indices of every season containing `month` (1..=12)
    pub fn seasons_for_month(&self, month: u32) -> impl Iterator<Item = usize> + '_ {
        self.seasons
            .iter()
            .enumerate()
            .filter(move |(_, season)| season.contains(month))
            .map(|(i, _)| i)
    }
}

/// Partition the year into seasons of `num_months` months
pub fn partition(num_months: u32) -> EgfResult<SeasonPartition> {
    Ok(SeasonPartition::new(SeasonWidth::new(num_months)?))
}

/// Parse a daily chunk label of the form `YYJJJhhmmss` (two-digit year,
/// day of year, time of day) into its acquisition date.
///
/// Two-digit years follow the POSIX `%y` pivot: 00-68 map to 20xx and
/// 69-99 to 19xx.
pub fn parse_day_label(label: &str) -> EgfResult<NaiveDate> {
    let pattern = Regex::new(r"^(\d{2})(\d{3})\d{6}$")
        .map_err(|e| EgfError::InvalidDayLabel(format!("Regex error: {}", e)))?;
    let captures = pattern
        .captures(label)
        .ok_or_else(|| EgfError::InvalidDayLabel(label.to_string()))?;

    let yy: i32 = captures[1]
        .parse()
        .map_err(|_| EgfError::InvalidDayLabel(label.to_string()))?;
    let ordinal: u32 = captures[2]
        .parse()
        .map_err(|_| EgfError::InvalidDayLabel(label.to_string()))?;
    let year = if yy < 69 { 2000 + yy } else { 1900 + yy };

    NaiveDate::from_yo_opt(year, ordinal).ok_or_else(|| {
        EgfError::InvalidDayLabel(format!("{}: day {} does not exist in {}", label, ordinal, year))
    })
}

/// A daily (unstacked) record tagged with its acquisition date
#[derive(Debug, Clone, PartialEq)]
pub struct DatedRecord {
    pub day: NaiveDate,
    pub record: WaveformRecord,
}

impl DatedRecord {
    pub fn new(day: NaiveDate, record: WaveformRecord) -> Self {
        Self { day, record }
    }

    /// Tag a record using a daily chunk label
    pub fn from_day_label(label: &str, record: WaveformRecord) -> EgfResult<Self> {
        Ok(Self::new(parse_day_label(label)?, record))
    }

    pub fn month(&self) -> u32 {
        self.day.month()
    }
}

/// Per-pair stacks of one season; empty when no record fell in the season
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonStack {
    pub season: Season,
    pub stacks: Vec<WaveformRecord>,
}

/// Stack daily records into every season of `partition`.
///
/// A record contributes to each season containing its month. All 12
/// seasons are returned in partition order, each with its stacks ordered by
/// station pair.
pub fn stack_seasons(dated: &[DatedRecord], partition: &SeasonPartition) -> EgfResult<Vec<SeasonStack>> {
    log::info!(
        "Season stacking {} daily records into {}-month seasons",
        dated.len(),
        partition.width().months()
    );

    let mut members: Vec<Vec<&WaveformRecord>> = vec![Vec::new(); partition.seasons().len()];
    for entry in dated {
        for index in partition.seasons_for_month(entry.month()) {
            members[index].push(&entry.record);
        }
    }

    let jobs: Vec<(&Season, Vec<&WaveformRecord>)> =
        partition.seasons().iter().zip(members).collect();

    #[cfg(feature = "parallel")]
    let iter = jobs.into_par_iter();
    #[cfg(not(feature = "parallel"))]
    let iter = jobs.into_iter();

    iter.map(|(season, records)| {
        let stacks = group_by_pair(records.iter().copied())
            .values()
            .map(|group| stack_refs(group))
            .collect::<EgfResult<Vec<_>>>()?;
        log::debug!("Season {}: {} records -> {} stacks", season, records.len(), stacks.len());
        Ok(SeasonStack {
            season: season.clone(),
            stacks,
        })
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_width() {
        for months in [0, 5, 7, 12] {
            assert!(matches!(partition(months), Err(EgfError::Config(_))));
        }
    }

    #[test]
    fn test_labels_wrap_year_end() {
        let p = partition(3).unwrap();
        let labels: Vec<String> = p.seasons().iter().map(Season::label).collect();
        assert_eq!(labels[0], "01-03");
        assert_eq!(labels[10], "11-01");
        assert_eq!(labels[11], "12-02");
        assert_eq!(p.seasons()[11].months(), &[12, 1, 2]);
        assert_eq!(p.seasons()[10].short_name(), "Nov-Jan");
    }

    #[test]
    fn test_march_in_three_seasons() {
        let p = partition(3).unwrap();
        let labels: Vec<String> = p.seasons_for_month(3).map(|i| p.seasons()[i].label()).collect();
        assert_eq!(labels, vec!["01-03", "02-04", "03-05"]);
    }

    #[test]
    fn test_every_month_in_width_seasons() {
        for months in ALLOWED_SEASON_MONTHS {
            let p = partition(months).unwrap();
            assert_eq!(p.seasons().len(), 12);
            for month in 1..=12 {
                assert_eq!(p.seasons_for_month(month).count(), months as usize);
            }
        }
    }

    #[test]
    fn test_single_month_labels() {
        let p = partition(1).unwrap();
        assert_eq!(p.seasons()[4].label(), "05-05");
    }

    #[test]
    fn test_parse_day_label() {
        assert_eq!(
            parse_day_label("20060000000").unwrap(),
            NaiveDate::from_ymd_opt(2020, 2, 29).unwrap()
        );
        assert_eq!(
            parse_day_label("99365000000").unwrap(),
            NaiveDate::from_ymd_opt(1999, 12, 31).unwrap()
        );
        assert!(parse_day_label("19366000000").is_err());
        assert!(parse_day_label("2006000000").is_err());
        assert!(parse_day_label("20a60000000").is_err());
    }
}
