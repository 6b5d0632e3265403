use crate::types::{EgfError, EgfResult, PairKey, WaveformRecord};
use std::collections::BTreeMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Stack records of one station pair by elementwise summation.
///
/// The sum is not normalized; `stack_count` becomes the number of records
/// folded in and every other field is copied from the first record.
pub fn stack(records: &[WaveformRecord]) -> EgfResult<WaveformRecord> {
    let refs: Vec<&WaveformRecord> = records.iter().collect();
    stack_refs(&refs)
}

pub(crate) fn stack_refs(records: &[&WaveformRecord]) -> EgfResult<WaveformRecord> {
    let first = *records.first().ok_or(EgfError::EmptyStack)?;
    let key = first.pair_key();

    let mut sum = first.samples.clone();
    for record in &records[1..] {
        if record.pair_key() != key {
            return Err(EgfError::PairMismatch {
                expected: key.to_string(),
                found: record.pair_key().to_string(),
            });
        }
        if !record.grid.matches(&first.grid) || record.samples.len() != sum.len() {
            return Err(EgfError::GridMismatch(format!(
                "{}: cannot stack {} onto {}",
                key, record.grid, first.grid
            )));
        }
        sum += &record.samples;
    }

    let mut stacked = first.derive(sum, first.grid);
    stacked.stack_count = records.len();
    log::debug!("Stacked {} records for {}", records.len(), key);
    Ok(stacked)
}

/// Group records by ordered station pair, preserving input order within
/// each group
pub fn group_by_pair<'a, I>(records: I) -> BTreeMap<PairKey, Vec<&'a WaveformRecord>>
where
    I: IntoIterator<Item = &'a WaveformRecord>,
{
    let mut groups: BTreeMap<PairKey, Vec<&'a WaveformRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.pair_key()).or_default().push(record);
    }
    groups
}

/// Stack every station pair in a batch; the result is ordered by pair
pub fn stack_by_pair<'a, I>(records: I) -> EgfResult<Vec<WaveformRecord>>
where
    I: IntoIterator<Item = &'a WaveformRecord>,
{
    let groups: Vec<(PairKey, Vec<&WaveformRecord>)> = group_by_pair(records).into_iter().collect();
    log::info!("Stacking {} station pairs", groups.len());

    #[cfg(feature = "parallel")]
    let stacks = groups
        .par_iter()
        .map(|(_, group)| stack_refs(group))
        .collect::<EgfResult<Vec<_>>>()?;

    #[cfg(not(feature = "parallel"))]
    let stacks = groups
        .iter()
        .map(|(_, group)| stack_refs(group))
        .collect::<EgfResult<Vec<_>>>()?;

    Ok(stacks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SampleGrid, Station};
    use ndarray::array;

    fn record(a: &str, b: &str, samples: ndarray::Array1<f64>) -> WaveformRecord {
        WaveformRecord::with_geometry(
            samples,
            SampleGrid::two_sided(1.0, 1.0).unwrap(),
            Station::new(a, 10.0, 50.0),
            Station::new(b, 11.0, 50.0),
            71.7,
            89.6,
            270.4,
        )
        .unwrap()
    }

    #[test]
    fn test_single_record_stack_is_identity() {
        let a = record("S1", "S2", array![1.0, 2.0, 3.0]);
        let stacked = stack(std::slice::from_ref(&a)).unwrap();
        assert_eq!(stacked, a);
        assert_eq!(stacked.stack_count, 1);
    }

    #[test]
    fn test_two_record_sum() {
        let a = record("S1", "S2", array![1.0, 2.0, 3.0]);
        let mut b = record("S1", "S2", array![4.0, 5.0, 6.0]);
        b.distance_km = 99.0;
        let stacked = stack(&[a.clone(), b]).unwrap();
        assert_eq!(stacked.samples, array![5.0, 7.0, 9.0]);
        assert_eq!(stacked.stack_count, 2);
        assert_eq!(stacked.distance_km, a.distance_km);
    }

    #[test]
    fn test_empty_stack_is_error() {
        assert!(matches!(stack(&[]), Err(EgfError::EmptyStack)));
    }

    #[test]
    fn test_grid_mismatch_is_error() {
        let a = record("S1", "S2", array![1.0, 2.0, 3.0]);
        let mut b = record("S1", "S2", array![1.0, 2.0, 3.0]);
        b.grid = SampleGrid::new(-2.0, 2.0, 2.0).unwrap();
        assert!(matches!(stack(&[a, b]), Err(EgfError::GridMismatch(_))));
    }

    #[test]
    fn test_pair_mismatch_is_error() {
        let a = record("S1", "S2", array![1.0, 2.0, 3.0]);
        let b = record("S2", "S1", array![1.0, 2.0, 3.0]);
        assert!(matches!(stack(&[a, b]), Err(EgfError::PairMismatch { .. })));
    }

    #[test]
    fn test_stack_by_pair() {
        let records = vec![
            record("S2", "S3", array![1.0, 1.0, 1.0]),
            record("S1", "S2", array![1.0, 0.0, 0.0]),
            record("S2", "S3", array![2.0, 2.0, 2.0]),
            record("S1", "S2", array![0.0, 0.0, 1.0]),
            record("S1", "S2", array![0.0, 1.0, 0.0]),
        ];
        let stacks = stack_by_pair(&records).unwrap();
        assert_eq!(stacks.len(), 2);
        assert_eq!(stacks[0].pair_key().to_string(), "S1_S2");
        assert_eq!(stacks[0].samples, array![1.0, 1.0, 1.0]);
        assert_eq!(stacks[0].stack_count, 3);
        assert_eq!(stacks[1].samples, array![3.0, 3.0, 3.0]);
        assert_eq!(stacks[1].stack_count, 2);
    }
}
