//! Analysis configuration.
//!
//! Every knob is passed explicitly; there is no process-wide state. The
//! aggregate [`AnalysisConfig`] can be (de)serialized with serde so callers
//! can keep it in whatever file format they use.

use crate::core::directionality::DirectionalityParams;
use crate::core::seasonality::SeasonalityParams;
use crate::types::{EgfError, EgfResult};
use serde::{Deserialize, Serialize};

/// Directionality and seasonality parameters of one analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub directionality: DirectionalityParams,
    pub seasonality: SeasonalityParams,
}

impl AnalysisConfig {
    /// Check every parameter and report all problems at once
    pub fn validate(&self) -> EgfResult<()> {
        let mut problems = Vec::new();

        if let Err(e) = self.directionality.velocity.validate() {
            problems.push(format!("directionality: {}", e));
        }
        if let Err(e) = self.seasonality.velocity.validate() {
            problems.push(format!("seasonality: {}", e));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            for problem in &problems {
                log::error!("Invalid configuration: {}", problem);
            }
            Err(EgfError::Config(problems.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::angle_bins::AngleBinWidth;
    use crate::core::snr::VelocityWindow;

    #[test]
    fn test_defaults_are_valid() {
        let config = AnalysisConfig::default();
        config.validate().unwrap();
        assert_eq!(config.directionality.bin_width, AngleBinWidth::new(15).unwrap());
        assert_eq!(config.seasonality.season_width.months(), 3);
        assert_eq!(config.seasonality.velocity.v_max, 5.0);
    }

    #[test]
    fn test_all_problems_reported() {
        let mut config = AnalysisConfig::default();
        config.directionality.velocity = VelocityWindow { v_min: 4.0, v_max: 2.0 };
        config.seasonality.velocity = VelocityWindow { v_min: -1.0, v_max: 2.0 };
        match config.validate() {
            Err(EgfError::Config(message)) => {
                assert!(message.contains("directionality"));
                assert!(message.contains("seasonality"));
            }
            other => panic!("expected a configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"seasonality": {"season_width": 6, "velocity": {"v_min": 1.5, "v_max": 4.0}, "correction": "None", "snr_field": "Causal"}}"#)
                .unwrap();
        assert_eq!(config.seasonality.season_width.months(), 6);
        assert_eq!(config.directionality, DirectionalityParams::default());
    }

    #[test]
    fn test_bad_widths_rejected_on_deserialize() {
        let bad_season = r#"{"seasonality": {"season_width": 5, "velocity": {"v_min": 2.0, "v_max": 5.0}, "correction": "None", "snr_field": "Causal"}}"#;
        assert!(serde_json::from_str::<AnalysisConfig>(bad_season).is_err());
        assert!(serde_json::from_str::<AngleBinWidth>("7").is_err());
        assert_eq!(serde_json::from_str::<AngleBinWidth>("45").unwrap().degrees(), 45);
    }
}
