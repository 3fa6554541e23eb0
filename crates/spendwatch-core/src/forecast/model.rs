use std::ops::Range;

use chrono::{Datelike, Days, NaiveDate};
use spendwatch_domain::{is_valid_amount, DailyAggregate, Forecast, ForecastPoint};
use tracing::debug;

use super::{
    linalg::{cholesky_solve, dot, normal_equations},
    seasonality::{active_seasonalities, Seasonality},
    uncertainty::TrendUncertainty,
    ForecastSettings,
};
use crate::{stats::variance, CancelToken, CoreError};

/// 1970-01-01 counted from 0001-01-01 (proleptic Gregorian, day one = 1).
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;
/// Noise variance floor on the scaled series, so priors never vanish on exact fits.
const SIGMA2_FLOOR: f64 = 1e-6;
/// Smallest rate change magnitude used when reweighting the Laplace prior.
const DELTA_EPSILON: f64 = 1e-6;
/// Normal(0, 5) prior on the base slope and offset.
const TREND_PRIOR_PRECISION: f64 = 1.0 / 25.0;

fn epoch_days(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
}

/// Column layout of the design matrix:
/// `[offset, slope, rate changes per changepoint..., seasonal harmonics...]`.
#[derive(Debug, Clone)]
struct Layout {
    changepoints: Vec<f64>,
    seasonalities: Vec<Seasonality>,
}

impl Layout {
    fn width(&self) -> usize {
        2 + self.changepoints.len()
            + self
                .seasonalities
                .iter()
                .map(Seasonality::feature_count)
                .sum::<usize>()
    }

    fn delta_columns(&self) -> Range<usize> {
        2..2 + self.changepoints.len()
    }

    fn push_row(&self, t: f64, epoch_days: f64, row: &mut Vec<f64>) {
        row.push(1.0);
        row.push(t);
        for &changepoint in &self.changepoints {
            row.push((t - changepoint).max(0.0));
        }
        for seasonality in &self.seasonalities {
            seasonality.push_features(epoch_days, row);
        }
    }
}

/// Spreads changepoints over evenly spaced history points inside the first
/// `changepoint_range` share of the history. `ts` is sorted scaled time.
fn place_changepoints(ts: &[f64], settings: &ForecastSettings) -> Vec<f64> {
    let history_size = (ts.len() as f64 * settings.changepoint_range).floor() as usize;
    let count = settings
        .n_changepoints
        .min(history_size.saturating_sub(1));
    if count == 0 {
        return Vec::new();
    }
    let last_index = (history_size - 1) as f64;
    (1..=count)
        .map(|i| {
            let index = (i as f64 * last_index / count as f64).round() as usize;
            ts[index]
        })
        .collect()
}

struct Solution {
    params: Vec<f64>,
    sigma2: f64,
    iterations: usize,
}

/// MAP estimate under Gaussian noise, Normal priors on offset/slope/seasonality and a
/// Laplace prior on rate changes. The Laplace term is handled by iteratively
/// reweighted ridge solves, alternating with the closed-form noise update.
fn optimise(
    design: &[f64],
    ys: &[f64],
    layout: &Layout,
    settings: &ForecastSettings,
    token: &CancelToken,
) -> Result<Solution, CoreError> {
    let width = layout.width();
    let n = ys.len() as f64;
    let tau = settings.changepoint_prior_scale;
    let deltas = layout.delta_columns();
    let (gram, xty) = normal_equations(design, ys, width);

    let mut precision = vec![1.0 / settings.seasonality_prior_scale.powi(2); width];
    precision[0] = TREND_PRIOR_PRECISION;
    precision[1] = TREND_PRIOR_PRECISION;
    for column in deltas.clone() {
        precision[column] = 1.0 / (tau * tau);
    }

    let mut sigma2 = variance(ys).max(SIGMA2_FLOOR);
    let mut previous = f64::INFINITY;
    let mut system = vec![0.0; width * width];

    for iteration in 1..=settings.max_iterations {
        token.check()?;

        system.copy_from_slice(&gram);
        for column in 0..width {
            system[column * width + column] += sigma2 * precision[column];
        }
        let params = cholesky_solve(&system, &xty).ok_or_else(|| {
            CoreError::TrainingFailure("normal equations are not positive definite".into())
        })?;
        if params.iter().any(|value| !value.is_finite()) {
            return Err(CoreError::TrainingFailure(
                "optimiser produced non-finite parameters".into(),
            ));
        }

        let rss: f64 = design
            .chunks_exact(width)
            .zip(ys)
            .map(|(row, &y)| (y - dot(row, &params)).powi(2))
            .sum();
        sigma2 = (rss / n).max(SIGMA2_FLOOR);

        let mut penalty = 0.0;
        for (column, &value) in params.iter().enumerate() {
            if deltas.contains(&column) {
                penalty += value.abs() / tau;
                precision[column] = 1.0 / (tau * value.abs().max(DELTA_EPSILON));
            } else {
                penalty += 0.5 * precision[column] * value * value;
            }
        }
        let objective = rss / (2.0 * sigma2) + 0.5 * n * sigma2.ln() + penalty;
        if !objective.is_finite() {
            return Err(CoreError::TrainingFailure(
                "objective became non-finite".into(),
            ));
        }

        if (previous - objective).abs() <= settings.tolerance * objective.abs().max(1.0) {
            return Ok(Solution {
                params,
                sigma2,
                iterations: iteration,
            });
        }
        previous = objective;
    }

    Err(CoreError::TrainingFailure(format!(
        "optimiser did not converge within {} iterations",
        settings.max_iterations
    )))
}

/// Fits the additive model to a daily history.
#[derive(Debug, Clone, Default)]
pub struct ForecastModel {
    settings: ForecastSettings,
}

impl ForecastModel {
    pub fn new(settings: ForecastSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ForecastSettings {
        &self.settings
    }

    pub fn fit(&self, history: &[DailyAggregate]) -> Result<FittedModel, CoreError> {
        self.fit_with_cancel(history, &CancelToken::new())
    }

    /// `history` must be sorted by date with one entry per date, as produced by
    /// `aggregate_daily`. The token is checked between optimiser iterations.
    pub fn fit_with_cancel(
        &self,
        history: &[DailyAggregate],
        token: &CancelToken,
    ) -> Result<FittedModel, CoreError> {
        self.settings.validate()?;
        let (first, last) = match (history.first(), history.last()) {
            (Some(first), Some(last)) if last.date > first.date => (first, last),
            _ => {
                return Err(CoreError::TrainingFailure(
                    "daily history must span at least two distinct dates".into(),
                ))
            }
        };
        if history.windows(2).any(|pair| pair[1].date <= pair[0].date) {
            return Err(CoreError::Validation(
                "daily history must be sorted with one entry per date".into(),
            ));
        }
        if let Some(bad) = history.iter().find(|day| !is_valid_amount(day.total_amount)) {
            return Err(CoreError::Validation(format!(
                "daily total on {} is not a non-negative amount",
                bad.date
            )));
        }

        let start = first.date;
        let span_days = (last.date - start).num_days() as f64;
        let y_scale = history
            .iter()
            .map(|day| day.total_amount)
            .fold(0.0, f64::max);
        let y_scale = if y_scale > 0.0 { y_scale } else { 1.0 };

        let ts: Vec<f64> = history
            .iter()
            .map(|day| (day.date - start).num_days() as f64 / span_days)
            .collect();
        let ys: Vec<f64> = history.iter().map(|day| day.total_amount / y_scale).collect();

        let layout = Layout {
            changepoints: place_changepoints(&ts, &self.settings),
            seasonalities: active_seasonalities(&self.settings, span_days),
        };
        let mut design = Vec::with_capacity(history.len() * layout.width());
        for (day, &t) in history.iter().zip(&ts) {
            layout.push_row(t, epoch_days(day.date), &mut design);
        }

        let solution = optimise(&design, &ys, &layout, &self.settings, token)?;
        debug!(
            days = history.len(),
            changepoints = layout.changepoints.len(),
            seasonalities = layout.seasonalities.len(),
            iterations = solution.iterations,
            "forecast model fitted"
        );

        Ok(FittedModel {
            start,
            last_date: last.date,
            span_days,
            y_scale,
            layout,
            params: solution.params,
            sigma: solution.sigma2.sqrt(),
            iterations: solution.iterations,
            history_len: history.len(),
            settings: self.settings.clone(),
        })
    }
}

/// A fitted model. Predicting does not refit, so one fit can serve many horizons.
#[derive(Debug, Clone)]
pub struct FittedModel {
    start: NaiveDate,
    last_date: NaiveDate,
    span_days: f64,
    y_scale: f64,
    layout: Layout,
    params: Vec<f64>,
    sigma: f64,
    iterations: usize,
    history_len: usize,
    settings: ForecastSettings,
}

impl FittedModel {
    pub fn predict(&self, days: usize) -> Result<Forecast, CoreError> {
        self.predict_with_cancel(days, &CancelToken::new())
    }

    /// Projects the `days` calendar days after the last observed date.
    pub fn predict_with_cancel(
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

        let mut dates = Vec::with_capacity(days);
        for offset in 1..=days as u64 {
            let date = self
                .last_date
                .checked_add_days(Days::new(offset))
                .ok_or_else(|| {
                    CoreError::invalid_parameter("days", "horizon runs past the supported calendar")
                })?;
            dates.push(date);
        }

        let ts: Vec<f64> = dates.iter().map(|&date| self.scaled_time(date)).collect();
        let mut row = Vec::with_capacity(self.layout.width());
        let predictions: Vec<f64> = dates
            .iter()
            .zip(&ts)
            .map(|(&date, &t)| {
                row.clear();
                self.layout.push_row(t, epoch_days(date), &mut row);
                dot(&row, &self.params)
            })
            .collect();

        let half_widths = self.trend_uncertainty().half_widths(&ts, token)?;

        let points = dates
            .into_iter()
            .zip(predictions)
            .zip(half_widths)
            .map(|((date, yhat), half_width)| {
                ForecastPoint::from_raw(
                    date,
                    yhat * self.y_scale,
                    (yhat - half_width) * self.y_scale,
                    (yhat + half_width) * self.y_scale,
                )
            })
            .collect();
        Ok(Forecast::new(points))
    }

    fn scaled_time(&self, date: NaiveDate) -> f64 {
        (date - self.start).num_days() as f64 / self.span_days
    }

    fn trend_uncertainty(&self) -> TrendUncertainty {
        let deltas = &self.params[self.layout.delta_columns()];
        let delta_scale = if deltas.is_empty() {
            0.0
        } else {
            deltas.iter().map(|d| d.abs()).sum::<f64>() / deltas.len() as f64 + 1e-8
        };
        TrendUncertainty {
            change_probability: (self.layout.changepoints.len() as f64 / self.span_days).min(1.0),
            delta_scale,
            sigma: self.sigma,
            interval_width: self.settings.interval_width,
            samples: self.settings.uncertainty_samples,
            seed: self.settings.seed,
        }
    }

    pub fn last_observed_date(&self) -> NaiveDate {
        self.last_date
    }

    pub fn history_len(&self) -> usize {
        self.history_len
    }

    pub fn changepoint_count(&self) -> usize {
        self.layout.changepoints.len()
    }

    /// Fitted rate changes at each changepoint, on the scaled series.
    pub fn changepoint_deltas(&self) -> &[f64] {
        &self.params[self.layout.delta_columns()]
    }

    pub fn seasonality_names(&self) -> Vec<&'static str> {
        self.layout.seasonalities.iter().map(|s| s.name).collect()
    }

    /// Residual noise scale in currency units.
    pub fn noise_scale(&self) -> f64 {
        self.sigma * self.y_scale
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::SeasonalityMode;

    fn day(offset: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .checked_add_days(Days::new(offset))
            .unwrap()
    }

    fn history(totals: impl IntoIterator<Item = f64>) -> Vec<DailyAggregate> {
        totals
            .into_iter()
            .enumerate()
            .map(|(i, total_amount)| DailyAggregate {
                date: day(i as u64),
                total_amount,
            })
            .collect()
    }

    #[test]
    fn epoch_days_counts_from_unix_epoch() {
        assert_eq!(epoch_days(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()), 0.0);
        assert_eq!(epoch_days(NaiveDate::from_ymd_opt(1970, 1, 8).unwrap()), 7.0);
    }

    #[test]
    fn changepoints_stay_in_leading_history() {
        let ts: Vec<f64> = (0..100).map(|i| i as f64 / 99.0).collect();
        let changepoints = place_changepoints(&ts, &ForecastSettings::default());
        assert_eq!(changepoints.len(), 25);
        assert!(changepoints.iter().all(|&c| c > 0.0 && c <= 0.8));
        assert!(changepoints.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn short_history_gets_fewer_changepoints() {
        let ts: Vec<f64> = (0..10).map(|i| i as f64 / 9.0).collect();
        let changepoints = place_changepoints(&ts, &ForecastSettings::default());
        assert_eq!(changepoints.len(), 7);
    }

    #[test]
    fn recovers_linear_trend() {
        let data = history((0..40).map(|i| 100.0 + 5.0 * i as f64));
        let settings = ForecastSettings {
            uncertainty_samples: 0,
            yearly_seasonality: SeasonalityMode::Disabled,
            ..ForecastSettings::default()
        };
        let model = ForecastModel::new(settings).fit(&data).unwrap();
        let forecast = model.predict(5).unwrap();

        for (i, point) in forecast.iter().enumerate() {
            let expected = 100.0 + 5.0 * (40 + i) as f64;
            assert!(
                (point.predicted - expected).abs() < 0.05 * expected,
                "day {i}: predicted {} expected {expected}",
                point.predicted
            );
        }
    }

    #[test]
    fn single_day_history_is_a_training_failure() {
        let data = vec![DailyAggregate {
            date: day(0),
            total_amount: 40.0,
        }];
        assert!(matches!(
            ForecastModel::default().fit(&data),
            Err(CoreError::TrainingFailure(_))
        ));
    }

    #[test]
    fn unsorted_history_is_rejected() {
        let mut data = history([10.0, 20.0, 30.0]);
        data.swap(0, 1);
        assert!(matches!(
            ForecastModel::default().fit(&data),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn zero_day_horizon_is_invalid() {
        let model = ForecastModel::default()
            .fit(&history((0..20).map(|i| 50.0 + i as f64)))
            .unwrap();
        assert!(matches!(
            model.predict(0),
            Err(CoreError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn one_fit_serves_several_horizons() {
        let model = ForecastModel::default()
            .fit(&history((0..30).map(|i| 80.0 + (i % 5) as f64 * 10.0)))
            .unwrap();
        let short = model.predict(7).unwrap();
        let long = model.predict(21).unwrap();
        assert_eq!(short.len(), 7);
        assert_eq!(long.len(), 21);
        for (a, b) in short.iter().zip(long.iter()) {
            assert_eq!(a.date, b.date);
            assert!((a.predicted - b.predicted).abs() < 1e-9);
        }
    }

    #[test]
    fn cancelled_fit_reports_cancellation() {
        let token = CancelToken::new();
        token.cancel();
        let err = ForecastModel::default()
            .fit_with_cancel(&history((0..20).map(|i| i as f64)), &token)
            .unwrap_err();
        assert!(matches!(err, CoreError::Cancelled));
    }

    #[test]
    fn all_zero_history_forecasts_zero() {
        let model = ForecastModel::default()
            .fit(&history(std::iter::repeat(0.0).take(15)))
            .unwrap();
        for point in model.predict(3).unwrap().iter() {
            assert!(point.predicted.abs() < 1e-6);
            assert!(point.lower_bound >= 0.0);
        }
    }
}
