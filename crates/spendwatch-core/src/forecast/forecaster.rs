use spendwatch_domain::{aggregate_daily, DailyAggregate, Forecast};
use tracing::debug;

use super::{FittedModel, ForecastModel, ForecastSettings};
use crate::{CancelToken, CoreError, ExpenseStore, MIN_HISTORY_RECORDS};

/// Horizon summed by [`Forecaster::get_monthly_prediction`].
pub const MONTHLY_HORIZON_DAYS: usize = 30;

/// Rounds to two decimal places, half away from zero.
pub fn round_currency(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Forecasts daily spend from the store's full history. Each call refits.
#[derive(Debug, Clone)]
pub struct Forecaster<S> {
    store: S,
    model: ForecastModel,
}

impl<S: ExpenseStore> Forecaster<S> {
    pub fn new(store: S) -> Self {
        Self::with_settings(store, ForecastSettings::default())
    }

    pub fn with_settings(store: S, settings: ForecastSettings) -> Self {
        Self {
            store,
            model: ForecastModel::new(settings),
        }
    }

    pub fn settings(&self) -> &ForecastSettings {
        self.model.settings()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Daily totals of the current history, checked against the record minimum.
    pub fn prepare_history(&self) -> Result<Vec<DailyAggregate>, CoreError> {
        let records = self.store.get_all_expenses()?;
        if records.len() < MIN_HISTORY_RECORDS {
            return Err(CoreError::InsufficientData {
                required: MIN_HISTORY_RECORDS,
                found: records.len(),
            });
        }
        Ok(aggregate_daily(&records))
    }

    pub fn fit(&self) -> Result<FittedModel, CoreError> {
        self.fit_with_cancel(&CancelToken::new())
    }

    pub fn fit_with_cancel(&self, token: &CancelToken) -> Result<FittedModel, CoreError> {
        let history = self.prepare_history()?;
        self.model.fit_with_cancel(&history, token)
    }

    /// Projects the `days` calendar days after the last recorded date.
    pub fn predict_future(&self, days: usize) -> Result<Forecast, CoreError> {
        self.predict_future_with_cancel(days, &CancelToken::new())
    }

    pub fn predict_future_with_cancel(
        &self,
        days: usize,
        token: &CancelToken,
    ) -> Result<Forecast, CoreError> {
        if days == 0 {
            return Err(CoreError::invalid_parameter(
                "days",
                "forecast horizon must be at least one day",
            ));
        }
        let model = self.fit_with_cancel(token)?;
        let forecast = model.predict_with_cancel(days, token)?;
        debug!(
            days,
            total = forecast.total_predicted(),
            "forecast produced"
        );
        Ok(forecast)
    }

    /// Predicted spend over the next thirty days, rounded to cents.
    pub fn get_monthly_prediction(&self) -> Result<f64, CoreError> {
        self.get_monthly_prediction_with_cancel(&CancelToken::new())
    }

    pub fn get_monthly_prediction_with_cancel(
        &self,
        token: &CancelToken,
    ) -> Result<f64, CoreError> {
        let forecast = self.predict_future_with_cancel(MONTHLY_HORIZON_DAYS, token)?;
        Ok(round_currency(forecast.total_predicted()))
    }
}
