use crate::types::{EgfError, EgfResult, Trace, WaveformRecord};
use ndarray::s;

/// Derived one-sided views of a two-sided cross-correlation, all on `[0, T]`
#[derive(Debug, Clone, PartialEq)]
pub struct SymmetrizedRecord {
    /// Mean of the causal half and the time-reversed acausal half
    pub symmetrized: WaveformRecord,
    /// Samples at lag >= 0
    pub causal_only: WaveformRecord,
    /// Negative-lag samples, time-reversed so lag runs from 0 to T
    pub acausal_only: WaveformRecord,
}

fn zero_lag(record: &WaveformRecord) -> EgfResult<usize> {
    if record.samples.len() != record.grid.npts() {
        return Err(EgfError::GridMismatch(format!(
            "{}: {} samples do not fit grid {} ({} points)",
            record.pair_key(),
            record.samples.len(),
            record.grid,
            record.grid.npts()
        )));
    }
    if !record.grid.is_two_sided() {
        return Err(EgfError::GridMismatch(format!(
            "{}: symmetrization needs a grid symmetric about zero lag, got {}",
            record.pair_key(),
            record.grid
        )));
    }
    record.grid.zero_lag_index().ok_or_else(|| {
        EgfError::GridMismatch(format!(
            "{}: zero lag does not fall on a sample of {}",
            record.pair_key(),
            record.grid
        ))
    })
}

/// Split a two-sided record into symmetrized, causal and acausal halves
pub fn symmetrize(record: &WaveformRecord) -> EgfResult<SymmetrizedRecord> {
    let zero = zero_lag(record)?;

    let causal: Trace = record.samples.slice(s![zero..]).to_owned();
    let acausal: Trace = record.samples.slice(s![..=zero;-1]).to_owned();
    let symmetrized = (&causal + &acausal) / 2.0;

    let grid = record.grid.causal_half();
    log::debug!(
        "Symmetrized {} onto {} ({} samples)",
        record.pair_key(),
        grid,
        causal.len()
    );

    Ok(SymmetrizedRecord {
        symmetrized: record.derive(symmetrized, grid),
        causal_only: record.derive(causal, grid),
        acausal_only: record.derive(acausal, grid),
    })
}

/// Average of a two-sided record and its time reverse over the full
/// `[-T, T]` grid
pub fn symmetrize_full(record: &WaveformRecord) -> EgfResult<WaveformRecord> {
    zero_lag(record)?;
    let reversed = record.samples.slice(s![..;-1]);
    let samples = (&record.samples + &reversed) / 2.0;
    Ok(record.derive(samples, record.grid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SampleGrid, Station};
    use ndarray::array;

    fn record(samples: Trace, half_span: f64) -> WaveformRecord {
        WaveformRecord::with_geometry(
            samples,
            SampleGrid::two_sided(half_span, 1.0).unwrap(),
            Station::new("S1", 0.0, 0.0),
            Station::new("S2", 1.0, 0.0),
            111.0,
            90.0,
            270.0,
        )
        .unwrap()
    }

    #[test]
    fn test_halves() {
        let halves = symmetrize(&record(array![1.0, 2.0, 3.0, 4.0, 5.0], 2.0)).unwrap();
        assert_eq!(halves.causal_only.samples, array![3.0, 4.0, 5.0]);
        assert_eq!(halves.acausal_only.samples, array![3.0, 2.0, 1.0]);
        assert_eq!(halves.symmetrized.samples, array![3.0, 3.0, 3.0]);
        assert_eq!(halves.symmetrized.grid, SampleGrid::new(0.0, 2.0, 1.0).unwrap());
        halves.symmetrized.validate().unwrap();
        halves.acausal_only.validate().unwrap();
    }

    #[test]
    fn test_symmetric_trace_returns_causal_half() {
        let halves = symmetrize(&record(array![0.5, -1.0, 2.0, 7.0, 2.0, -1.0, 0.5], 3.0)).unwrap();
        assert_eq!(halves.symmetrized.samples, halves.causal_only.samples);
        assert_eq!(halves.symmetrized.samples, array![7.0, 2.0, -1.0, 0.5]);
    }

    #[test]
    fn test_full_symmetrization() {
        let full = symmetrize_full(&record(array![1.0, 0.0, 2.0, 4.0, 3.0], 2.0)).unwrap();
        assert_eq!(full.samples, array![2.0, 2.0, 2.0, 2.0, 2.0]);
        assert_eq!(full.grid, SampleGrid::two_sided(2.0, 1.0).unwrap());
    }

    #[test]
    fn test_one_sided_grid_rejected() {
        let mut one_sided = record(array![1.0, 2.0, 3.0, 4.0, 5.0], 2.0);
        one_sided.grid = SampleGrid::new(0.0, 4.0, 1.0).unwrap();
        assert!(matches!(symmetrize(&one_sided), Err(EgfError::GridMismatch(_))));
    }

    #[test]
    fn test_sample_count_off_grid_rejected() {
        let grid = SampleGrid::two_sided(200.0, 1.0).unwrap();
        let mut padded = record(Trace::zeros(grid.npts()), 200.0);
        padded.samples = Trace::zeros(grid.npts() + 1);

        assert!(matches!(symmetrize(&padded), Err(EgfError::GridMismatch(_))));
        assert!(matches!(symmetrize_full(&padded), Err(EgfError::GridMismatch(_))));
    }
}
