use crate::core::geometry::normalize_azimuth;
use crate::types::{EgfError, EgfResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bin widths (degrees) accepted for azimuthal binning
pub const ALLOWED_BIN_WIDTHS: [u32; 9] = [5, 10, 15, 20, 30, 45, 60, 90, 180];

/// Validated azimuth bin width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct AngleBinWidth(u32);

impl AngleBinWidth {
    pub fn new(degrees: u32) -> EgfResult<Self> {
        if ALLOWED_BIN_WIDTHS.contains(&degrees) {
            Ok(Self(degrees))
        } else {
            Err(EgfError::Config(format!(
                "angle bin width {} is not one of {:?}",
                degrees, ALLOWED_BIN_WIDTHS
            )))
        }
    }

    pub fn degrees(&self) -> u32 {
        self.0
    }

    /// Number of bins covering the full circle
    pub fn bin_count(&self) -> usize {
        (360 / self.0) as usize
    }
}

impl Default for AngleBinWidth {
    fn default() -> Self {
        Self(15)
    }
}

impl TryFrom<u32> for AngleBinWidth {
    type Error = EgfError;

    fn try_from(value: u32) -> EgfResult<Self> {
        Self::new(value)
    }
}

impl From<AngleBinWidth> for u32 {
    fn from(width: AngleBinWidth) -> u32 {
        width.0
    }
}

/// Half-open azimuth interval `[start, end)` in degrees.
///
/// When `start > end` the bin wraps through north and contains
/// `az >= start || az < end`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleBin {
    pub start: f64,
    pub end: f64,
}

impl AngleBin {
    pub fn is_wrapping(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, azimuth: f64) -> bool {
        if self.is_wrapping() {
            azimuth >= self.start || azimuth < self.end
        } else {
            self.start <= azimuth && azimuth < self.end
        }
    }

    /// Bin centre in [0, 360)
    pub fn center(&self) -> f64 {
        let width = if self.is_wrapping() {
            self.end + 360.0 - self.start
        } else {
            self.end - self.start
        };
        normalize_azimuth(self.start + width / 2.0)
    }
}

impl fmt::Display for AngleBin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03.0}-{:03.0}", self.start, self.end)
    }
}

/// Circular partition of [0, 360) into equal-width bins, bin 0 centred on north
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngleBins {
    width: AngleBinWidth,
    bins: Vec<AngleBin>,
}

impl AngleBins {
    /// Generate the bins for `width`.
    ///
    /// Bins start at `-width/2` and advance by `width`; negative bounds are
    /// shifted by 360 so bin 0 is `[360 - width/2, width/2)` and the last bin
    /// closes the circle at `360 - width/2`.
    pub fn generate(width: AngleBinWidth) -> Self {
        let w = width.degrees() as f64;
        let start = -w / 2.0;
        let bins = (0..width.bin_count())
            .map(|i| AngleBin {
                start: normalize_azimuth(start + i as f64 * w),
                end: normalize_azimuth(start + (i + 1) as f64 * w),
            })
            .collect();

        Self { width, bins }
    }

    pub fn width(&self) -> AngleBinWidth {
        self.width
    }

    pub fn bins(&self) -> &[AngleBin] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Index of the bin containing `azimuth`; the azimuth is wrapped into
    /// [0, 360) first. Non-finite azimuths have no bin.
    pub fn locate(&self, azimuth: f64) -> Option<usize> {
        if !azimuth.is_finite() {
            return None;
        }
        let az = normalize_azimuth(azimuth);
        self.bins.iter().position(|bin| bin.contains(az))
    }
}

/// Generate bins for a width given in degrees, rejecting widths outside
/// [`ALLOWED_BIN_WIDTHS`].
pub fn generate_bins(width: u32) -> EgfResult<AngleBins> {
    Ok(AngleBins::generate(AngleBinWidth::new(width)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_width() {
        for width in [0, 7, 25, 50, 120, 360] {
            assert!(matches!(generate_bins(width), Err(EgfError::Config(_))));
        }
    }

    #[test]
    fn test_bin_0_wraps_through_north() {
        let bins = generate_bins(15).unwrap();
        assert_eq!(bins.len(), 24);
        let first = bins.bins()[0];
        assert_eq!(first.start, 352.5);
        assert_eq!(first.end, 7.5);
        assert!(first.is_wrapping());
        assert_eq!(first.center(), 0.0);
        assert_eq!(bins.bins()[23], AngleBin { start: 337.5, end: 352.5 });
        assert_eq!(first.to_string(), "352-008");
    }

    #[test]
    fn test_half_circle_bins() {
        let bins = generate_bins(180).unwrap();
        assert_eq!(
            bins.bins(),
            &[
                AngleBin { start: 270.0, end: 90.0 },
                AngleBin { start: 90.0, end: 270.0 }
            ]
        );
    }

    #[test]
    fn test_every_azimuth_in_exactly_one_bin() {
        for width in ALLOWED_BIN_WIDTHS {
            let bins = generate_bins(width).unwrap();
            assert_eq!(bins.len(), (360 / width) as usize);

            let mut az = 0.0;
            while az < 360.0 {
                let hits = bins.bins().iter().filter(|b| b.contains(az)).count();
                assert_eq!(hits, 1, "width {} azimuth {}", width, az);
                az += 0.25;
            }
        }
    }

    #[test]
    fn test_locate_centres() {
        let bins = generate_bins(30).unwrap();
        for (i, bin) in bins.bins().iter().enumerate() {
            assert_eq!(bin.center(), (i * 30) as f64);
            assert_eq!(bins.locate(bin.center()), Some(i));
        }
        assert_eq!(bins.locate(359.99), Some(0));
        assert_eq!(bins.locate(-10.0), Some(0));
        assert_eq!(bins.locate(f64::NAN), None);
    }
}
