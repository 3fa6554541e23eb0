//! spendwatch-core
//!
//! Analytics services for SpendWatch: isolation-ensemble outlier scoring, additive
//! trend/seasonality forecasting, budget alert decisions and spending summaries.
//! Depends on spendwatch-domain. No CLI, no terminal I/O, no direct file access.

pub mod alert_service;
pub mod anomaly;
pub mod error;
pub mod forecast;
pub mod store;
mod stats;
pub mod summary_service;
pub mod task;

pub use alert_service::*;
pub use anomaly::{AnomalyDetector, DetectorSettings, FittedEnsemble, IsolationForest};
pub use error::CoreError;
pub use forecast::{FittedModel, ForecastModel, ForecastSettings, Forecaster, SeasonalityMode};
pub use store::*;
pub use summary_service::*;
pub use task::*;

/// Both the detector and the forecaster refuse to train on fewer records than this.
pub const MIN_HISTORY_RECORDS: usize = 10;

#[cfg(test)]
mod tests;
