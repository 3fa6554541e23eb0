//! Outlier scoring over transaction amounts with an isolation ensemble.

mod detector;
mod isolation;

pub use detector::AnomalyDetector;
pub use isolation::{average_path_length, FittedEnsemble, IsolationForest};

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Tuning knobs for the isolation ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    /// Expected share of anomalous records, in `(0, 0.5)`.
    pub contamination: f64,
    pub n_trees: usize,
    /// Upper bound on each tree's subsample size.
    pub max_samples: usize,
    pub seed: u64,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            contamination: 0.05,
            n_trees: 100,
            max_samples: 256,
            seed: 42,
        }
    }
}

impl DetectorSettings {
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(self.contamination > 0.0 && self.contamination < 0.5) {
            return Err(CoreError::invalid_parameter(
                "contamination",
                format!("must lie in (0, 0.5), got {}", self.contamination),
            ));
        }
        if self.n_trees == 0 {
            return Err(CoreError::invalid_parameter(
                "n_trees",
                "ensemble needs at least one tree",
            ));
        }
        if self.max_samples < 2 {
            return Err(CoreError::invalid_parameter(
                "max_samples",
                "subsamples need at least two points",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        DetectorSettings::default().validate().unwrap();
    }

    #[test]
    fn contamination_outside_range_is_rejected() {
        for contamination in [0.0, 0.5, 0.9, -0.1, f64::NAN] {
            let settings = DetectorSettings {
                contamination,
                ..DetectorSettings::default()
            };
            assert!(matches!(
                settings.validate(),
                Err(CoreError::InvalidParameter { .. })
            ));
        }
    }

    #[test]
    fn partial_settings_fill_defaults() {
        let settings: DetectorSettings = serde_json::from_str(r#"{"n_trees": 25}"#).unwrap();
        assert_eq!(settings.n_trees, 25);
        assert_eq!(settings.contamination, 0.05);
        assert_eq!(settings.seed, 42);
    }
}
