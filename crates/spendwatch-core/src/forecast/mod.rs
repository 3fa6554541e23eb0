//! Additive trend + seasonality forecasting of daily spend.
//!
//! The model is `y(t) = trend(t) + seasonality(t) + noise`:
//!
//! - `trend` is piecewise linear with changepoints spread over the first part of the
//!   history; a Laplace prior of scale `changepoint_prior_scale` keeps rate changes sparse.
//! - `seasonality` sums Fourier series for daily, weekly and yearly cycles under a
//!   Gaussian prior of scale `seasonality_prior_scale`.
//!
//! Fitting is one batch MAP optimisation ([`ForecastModel::fit`]); the resulting
//! [`FittedModel`] can be asked for any number of horizons without refitting.

mod forecaster;
mod linalg;
mod model;
mod seasonality;
mod uncertainty;

pub use forecaster::{round_currency, Forecaster, MONTHLY_HORIZON_DAYS};
pub use model::{FittedModel, ForecastModel};
pub use seasonality::Seasonality;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Histories are aggregated to one point per calendar day.
const SAMPLING_INTERVAL_DAYS: f64 = 1.0;

/// Whether a seasonal component is fitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalityMode {
    /// Fitted once the history covers at least two full periods. Cycles no longer
    /// than the one-day sampling interval are unobservable and stay off.
    #[default]
    Auto,
    Enabled,
    Disabled,
}

impl SeasonalityMode {
    pub fn is_active(self, history_days: f64, period_days: f64) -> bool {
        match self {
            SeasonalityMode::Auto => {
                period_days > SAMPLING_INTERVAL_DAYS && history_days >= 2.0 * period_days
            }
            SeasonalityMode::Enabled => true,
            SeasonalityMode::Disabled => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastSettings {
    /// Scale of the Laplace prior on trend rate changes; larger is more flexible.
    pub changepoint_prior_scale: f64,
    pub n_changepoints: usize,
    /// Share of the history, from the start, in which changepoints may be placed.
    pub changepoint_range: f64,
    pub seasonality_prior_scale: f64,
    pub daily_seasonality: SeasonalityMode,
    pub weekly_seasonality: SeasonalityMode,
    /// Fitted on any history by default; `Auto` waits for two full years.
    pub yearly_seasonality: SeasonalityMode,
    /// Coverage of the uncertainty interval, in `(0, 1)`.
    pub interval_width: f64,
    /// Simulated future trends per forecast; `0` disables intervals.
    pub uncertainty_samples: usize,
    pub seed: u64,
    pub max_iterations: usize,
    /// Relative objective change below which the optimiser stops.
    pub tolerance: f64,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            changepoint_prior_scale: 0.05,
            n_changepoints: 25,
            changepoint_range: 0.8,
            seasonality_prior_scale: 10.0,
            daily_seasonality: SeasonalityMode::Auto,
            weekly_seasonality: SeasonalityMode::Auto,
            yearly_seasonality: SeasonalityMode::Enabled,
            interval_width: 0.8,
            uncertainty_samples: 1000,
            seed: 42,
            max_iterations: 500,
            tolerance: 1e-9,
        }
    }
}

impl ForecastSettings {
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(self.changepoint_prior_scale > 0.0 && self.changepoint_prior_scale.is_finite()) {
            return Err(CoreError::invalid_parameter(
                "changepoint_prior_scale",
                "must be a positive number",
            ));
        }
        if !(self.changepoint_range > 0.0 && self.changepoint_range <= 1.0) {
            return Err(CoreError::invalid_parameter(
                "changepoint_range",
                "must lie in (0, 1]",
            ));
        }
        if !(self.seasonality_prior_scale > 0.0 && self.seasonality_prior_scale.is_finite()) {
            return Err(CoreError::invalid_parameter(
                "seasonality_prior_scale",
                "must be a positive number",
            ));
        }
        if !(self.interval_width > 0.0 && self.interval_width < 1.0) {
            return Err(CoreError::invalid_parameter(
                "interval_width",
                "must lie in (0, 1)",
            ));
        }
        if self.max_iterations == 0 {
            return Err(CoreError::invalid_parameter(
                "max_iterations",
                "optimiser needs at least one iteration",
            ));
        }
        if !(self.tolerance > 0.0) {
            return Err(CoreError::invalid_parameter(
                "tolerance",
                "must be positive",
            ));
        }
        Ok(())
    }
}
