use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use spendwatch_core::{DetectorSettings, ForecastSettings};

use crate::ConfigError;

const DEFAULT_DATA_FILE: &str = "expenses.json";
const DEFAULT_OUTBOX_FILE: &str = "outbox.jsonl";

/// User configuration. Every field falls back to its default when absent, so
/// older or hand-trimmed files keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub detector: DetectorSettings,
    pub forecast: ForecastSettings,
    pub alerts: AlertConfig,
    /// Expense file; relative paths resolve against the application directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_file: Option<PathBuf>,
    /// Deadline for one background fit.
    pub fit_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            detector: DetectorSettings::default(),
            forecast: ForecastSettings::default(),
            alerts: AlertConfig::default(),
            data_file: None,
            fit_timeout_secs: 120,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detector.validate()?;
        self.forecast.validate()?;
        self.alerts.validate()?;
        if self.fit_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "fit_timeout_secs must be at least one second".into(),
            ));
        }
        Ok(())
    }

    pub fn resolve_data_file(&self, base: &Path) -> PathBuf {
        resolve(base, self.data_file.as_deref(), DEFAULT_DATA_FILE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    pub monthly_budget: f64,
    pub currency_symbol: String,
    pub sender_address: String,
    /// Messages are appended here, one JSON object per line, for a relay to send.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outbox_path: Option<PathBuf>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            recipient: None,
            monthly_budget: 25_000.0,
            currency_symbol: "₹".into(),
            sender_address: "alerts@spendwatch.local".into(),
            outbox_path: None,
        }
    }
}

impl AlertConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.monthly_budget > 0.0 && self.monthly_budget.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "monthly_budget must be a positive amount, got {}",
                self.monthly_budget
            )));
        }
        if let Some(recipient) = &self.recipient {
            if !looks_like_address(recipient) {
                return Err(ConfigError::Invalid(format!(
                    "recipient `{recipient}` is not an email address"
                )));
            }
        }
        if !looks_like_address(&self.sender_address) {
            return Err(ConfigError::Invalid(format!(
                "sender_address `{}` is not an email address",
                self.sender_address
            )));
        }
        Ok(())
    }

    pub fn resolve_outbox(&self, base: &Path) -> PathBuf {
        resolve(base, self.outbox_path.as_deref(), DEFAULT_OUTBOX_FILE)
    }
}

fn resolve(base: &Path, configured: Option<&Path>, default_name: &str) -> PathBuf {
    match configured {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => base.join(path),
        None => base.join(default_name),
    }
}

fn looks_like_address(value: &str) -> bool {
    match value.trim().split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        Config::default().validate().expect("defaults are valid");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let cfg: Config =
            serde_json::from_str(r#"{"alerts": {"monthly_budget": 18000}}"#).expect("parse");
        assert_eq!(cfg.alerts.monthly_budget, 18_000.0);
        assert_eq!(cfg.alerts.currency_symbol, "₹");
        assert_eq!(cfg.detector, DetectorSettings::default());
        assert_eq!(cfg.fit_timeout_secs, 120);
    }

    #[test]
    fn rejects_bad_recipient() {
        let mut cfg = Config::default();
        cfg.alerts.recipient = Some("not-an-address".into());
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn invalid_detector_settings_surface_as_invalid() {
        let mut cfg = Config::default();
        cfg.detector.contamination = 0.7;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn paths_resolve_against_base() {
        let base = Path::new("/srv/spendwatch");
        let mut cfg = Config::default();
        assert_eq!(cfg.resolve_data_file(base), base.join("expenses.json"));
        assert_eq!(cfg.alerts.resolve_outbox(base), base.join("outbox.jsonl"));

        cfg.data_file = Some(PathBuf::from("archive/2025.json"));
        assert_eq!(cfg.resolve_data_file(base), base.join("archive/2025.json"));
    }
}
