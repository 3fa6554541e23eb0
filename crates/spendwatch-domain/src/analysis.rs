//! Output types produced by the outlier detector and the forecaster.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::record::TransactionRecord;

/// A record scored by one fitted isolation ensemble.
///
/// `anomaly_score` is the negated isolation score: lower means more abnormal, so
/// sorting ascending lists the most anomalous records first. Scores are only
/// comparable within the run that produced them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnomalyResult {
    pub record: TransactionRecord,
    pub anomaly_score: f64,
    pub is_anomaly: bool,
}

impl AnomalyResult {
    /// The raw isolation score in `(0, 1]`; values near 1 are highly anomalous.
    pub fn isolation_score(&self) -> f64 {
        -self.anomaly_score
    }
}

/// Projected spend for one future day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl ForecastPoint {
    /// Clips each field to zero independently. A negative raw lower bound therefore
    /// collapses to zero even when the prediction does not, so `lower_bound` can
    /// coincide with `predicted` near zero; this is kept as-is.
    pub fn from_raw(date: NaiveDate, predicted: f64, lower_bound: f64, upper_bound: f64) -> Self {
        Self {
            date,
            predicted: predicted.max(0.0),
            lower_bound: lower_bound.max(0.0),
            upper_bound: upper_bound.max(0.0),
        }
    }
}

/// Ordered daily projections for a forecast horizon.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Forecast {
    points: Vec<ForecastPoint>,
}

impl Forecast {
    pub fn new(points: Vec<ForecastPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ForecastPoint> {
        self.points.iter()
    }

    /// Sum of the point predictions over the horizon.
    pub fn total_predicted(&self) -> f64 {
        self.points.iter().map(|point| point.predicted).sum()
    }

    pub fn into_points(self) -> Vec<ForecastPoint> {
        self.points
    }
}

impl<'a> IntoIterator for &'a Forecast {
    type Item = &'a ForecastPoint;
    type IntoIter = std::slice::Iter<'a, ForecastPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Category;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    #[test]
    fn clipping_is_independent_per_field() {
        let point = ForecastPoint::from_raw(date(1), 4.0, -6.0, 14.0);
        assert_eq!(point.predicted, 4.0);
        assert_eq!(point.lower_bound, 0.0);
        assert_eq!(point.upper_bound, 14.0);

        let point = ForecastPoint::from_raw(date(2), -3.0, -9.0, 3.0);
        assert_eq!(point.predicted, 0.0);
        assert_eq!(point.lower_bound, 0.0);
        assert_eq!(point.upper_bound, 3.0);
    }

    #[test]
    fn forecast_totals_predictions() {
        let forecast = Forecast::new(vec![
            ForecastPoint::from_raw(date(1), 100.0, 80.0, 120.0),
            ForecastPoint::from_raw(date(2), 50.5, 30.0, 70.0),
        ]);
        assert_eq!(forecast.len(), 2);
        assert_eq!(forecast.total_predicted(), 150.5);
    }

    #[test]
    fn isolation_score_negates_anomaly_score() {
        let result = AnomalyResult {
            record: TransactionRecord::new(date(3), 5000.0, Category::Shopping, None),
            anomaly_score: -0.71,
            is_anomaly: true,
        };
        assert_eq!(result.isolation_score(), 0.71);
    }
}
