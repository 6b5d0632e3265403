use crate::core::symmetrize::{symmetrize, SymmetrizedRecord};
use crate::types::{EgfError, EgfResult, WaveformRecord};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Group-velocity range (km/s) bounding the surface-wave signal window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityWindow {
    pub v_min: f64,
    pub v_max: f64,
}

impl VelocityWindow {
    pub fn new(v_min: f64, v_max: f64) -> EgfResult<Self> {
        let window = Self { v_min, v_max };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> EgfResult<()> {
        if !(self.v_min.is_finite() && self.v_max.is_finite()) || self.v_min <= 0.0 {
            return Err(EgfError::Config(format!(
                "velocity range [{}, {}] must be finite and positive",
                self.v_min, self.v_max
            )));
        }
        if self.v_min >= self.v_max {
            return Err(EgfError::Config(format!(
                "velocity range requires v_min < v_max, got [{}, {}]",
                self.v_min, self.v_max
            )));
        }
        Ok(())
    }

    /// Arrival-time window `[t1, t2]` (seconds from zero lag) for a path
    pub fn arrival_window(&self, distance_km: f64) -> (f64, f64) {
        (distance_km / self.v_max, distance_km / self.v_min)
    }
}

impl Default for VelocityWindow {
    fn default() -> Self {
        Self {
            v_min: 2.0,
            v_max: 4.5,
        }
    }
}

/// SNR of the three views of one path (dB)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathSnr {
    pub symmetric: f64,
    pub causal: f64,
    pub acausal: f64,
}

impl PathSnr {
    /// Causal and acausal swapped, as seen from the other station
    pub fn swapped(&self) -> Self {
        Self {
            symmetric: self.symmetric,
            causal: self.acausal,
            acausal: self.causal,
        }
    }

    pub fn get(&self, field: SnrField) -> f64 {
        match field {
            SnrField::Symmetric => self.symmetric,
            SnrField::Causal => self.causal,
            SnrField::Acausal => self.acausal,
        }
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            symmetric: f(self.symmetric),
            causal: f(self.causal),
            acausal: f(self.acausal),
        }
    }
}

/// Which SNR view feeds per-bin statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SnrField {
    Symmetric,
    #[default]
    Causal,
    Acausal,
}

/// Velocity-windowed SNR estimator
#[derive(Debug, Clone)]
pub struct SnrEstimator {
    window: VelocityWindow,
}

impl SnrEstimator {
    pub fn new(window: VelocityWindow) -> EgfResult<Self> {
        window.validate()?;
        Ok(Self { window })
    }

    pub fn window(&self) -> VelocityWindow {
        self.window
    }

    /// SNR in dB of a one-sided trace whose first sample is at zero lag.
    ///
    /// The signal is every sample with `t1 <= t <= t2`; the noise is the
    /// same number of samples immediately after `t2`. A zero noise RMS
    /// yields `+inf`.
    pub fn snr_db(&self, trace: ArrayView1<f64>, delta: f64, distance_km: f64) -> EgfResult<f64> {
        let (t1, t2) = self.window.arrival_window(distance_km);

        let mut signal_start = None;
        let mut signal_end = 0;
        for i in 0..trace.len() {
            let t = i as f64 * delta;
            if t >= t1 && t <= t2 {
                signal_start.get_or_insert(i);
                signal_end = i + 1;
            } else if t > t2 {
                break;
            }
        }

        let signal_start = signal_start.ok_or_else(|| {
            EgfError::Config(format!(
                "signal window [{:.2}, {:.2}] s holds no samples (delta {} s, {} samples)",
                t1,
                t2,
                delta,
                trace.len()
            ))
        })?;
        let signal_len = signal_end - signal_start;
        let noise_end = signal_end + signal_len;
        if noise_end > trace.len() {
            return Err(EgfError::InsufficientData {
                needed: noise_end,
                available: trace.len(),
            });
        }

        let srms = rms(trace.slice(ndarray::s![signal_start..signal_end]));
        let nrms = rms(trace.slice(ndarray::s![signal_end..noise_end]));

        if nrms == 0.0 {
            log::warn!(
                "Zero noise RMS in window [{:.2}, {:.2}] s; SNR is infinite",
                t2,
                t2 + signal_len as f64 * delta
            );
            return Ok(f64::INFINITY);
        }

        Ok(10.0 * ((srms * srms) / (nrms * nrms)).log10())
    }

    /// Symmetric, causal and acausal SNR of a two-sided record
    pub fn estimate(&self, record: &WaveformRecord) -> EgfResult<PathSnr> {
        let halves = symmetrize(record)?;
        self.estimate_halves(&halves, record.distance_km)
    }

    /// SNR of already-symmetrized halves
    pub fn estimate_halves(
        &self,
        halves: &SymmetrizedRecord,
        distance_km: f64,
    ) -> EgfResult<PathSnr> {
        let delta = halves.symmetrized.grid.delta;
        Ok(PathSnr {
            symmetric: self.snr_db(halves.symmetrized.samples.view(), delta, distance_km)?,
            causal: self.snr_db(halves.causal_only.samples.view(), delta, distance_km)?,
            acausal: self.snr_db(halves.acausal_only.samples.view(), delta, distance_km)?,
        })
    }
}

fn rms(values: ArrayView1<f64>) -> f64 {
    values.mapv(|v| v * v).mean().unwrap_or(0.0).sqrt()
}

/// How raw SNRs are rescaled before aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SnrCorrection {
    /// Raw SNR
    None,
    /// Stack-count factor only
    StackCount,
    /// Distance and stack-count factors
    #[default]
    DistanceAndStackCount,
}

/// Batch-level normalization constants for SNR correction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizationConstants {
    pub min_distance_km: f64,
    pub mean_stack_count: f64,
}

impl NormalizationConstants {
    /// Compute the constants over a whole batch. Must run once, before any
    /// corrected SNR is produced.
    ///
    /// Coincident stations (zero distance) are rejected only under
    /// [`SnrCorrection::DistanceAndStackCount`], where the distance factor
    /// would be undefined. In the other modes they take part in the mean
    /// stack count and are skipped for `min_distance_km`, which is then the
    /// smallest positive distance (0 when there is none).
    pub fn from_records<'a, I>(records: I, mode: SnrCorrection) -> EgfResult<Self>
    where
        I: IntoIterator<Item = &'a WaveformRecord>,
    {
        let mut count = 0usize;
        let mut coincident = 0usize;
        let mut min_distance_km = f64::INFINITY;
        let mut stack_sum = 0.0;
        for record in records {
            count += 1;
            stack_sum += record.stack_count as f64;
            if record.distance_km > 0.0 {
                min_distance_km = min_distance_km.min(record.distance_km);
            } else {
                coincident += 1;
            }
        }

        if count == 0 {
            return Err(EgfError::InsufficientData {
                needed: 1,
                available: 0,
            });
        }
        if coincident > 0 {
            if mode == SnrCorrection::DistanceAndStackCount {
                return Err(EgfError::InvalidRecord(format!(
                    "batch contains {} zero inter-station distance(s); distance correction is undefined",
                    coincident
                )));
            }
            log::warn!(
                "{} coincident-station record(s) excluded from the minimum distance",
                coincident
            );
        }
        if !min_distance_km.is_finite() {
            min_distance_km = 0.0;
        }

        let constants = Self {
            min_distance_km,
            mean_stack_count: stack_sum / count as f64,
        };
        log::debug!(
            "Normalization constants over {} records: min distance {:.3} km, mean stack count {:.3}",
            count,
            constants.min_distance_km,
            constants.mean_stack_count
        );
        Ok(constants)
    }
}

/// Rescales raw SNRs for path length and stack count
#[derive(Debug, Clone, Copy)]
pub struct SnrCorrector {
    constants: NormalizationConstants,
    mode: SnrCorrection,
}

impl SnrCorrector {
    pub fn new(constants: NormalizationConstants, mode: SnrCorrection) -> Self {
        Self { constants, mode }
    }

    pub fn constants(&self) -> NormalizationConstants {
        self.constants
    }

    pub fn distance_factor(&self, distance_km: f64) -> f64 {
        distance_km.sqrt() / self.constants.min_distance_km.sqrt()
    }

    pub fn stack_factor(&self, stack_count: usize) -> f64 {
        self.constants.mean_stack_count.sqrt() / (stack_count as f64).sqrt()
    }

    pub fn correct(&self, raw_snr: f64, distance_km: f64, stack_count: usize) -> f64 {
        match self.mode {
            SnrCorrection::None => raw_snr,
            SnrCorrection::StackCount => raw_snr * self.stack_factor(stack_count),
            SnrCorrection::DistanceAndStackCount => {
                raw_snr * self.distance_factor(distance_km) * self.stack_factor(stack_count)
            }
        }
    }

    pub fn correct_path(&self, raw: &PathSnr, distance_km: f64, stack_count: usize) -> PathSnr {
        raw.map(|snr| self.correct(snr, distance_km, stack_count))
    }
}
