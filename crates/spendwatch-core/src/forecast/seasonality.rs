use std::f64::consts::PI;

use super::ForecastSettings;

/// A periodic component represented by `order` sine/cosine harmonics.
#[derive(Debug, Clone, PartialEq)]
pub struct Seasonality {
    pub name: &'static str,
    pub period_days: f64,
    pub order: usize,
}

impl Seasonality {
    pub const DAILY: Seasonality = Seasonality {
        name: "daily",
        period_days: 1.0,
        order: 4,
    };
    pub const WEEKLY: Seasonality = Seasonality {
        name: "weekly",
        period_days: 7.0,
        order: 3,
    };
    pub const YEARLY: Seasonality = Seasonality {
        name: "yearly",
        period_days: 365.25,
        order: 10,
    };

    pub fn feature_count(&self) -> usize {
        2 * self.order
    }

    /// Appends `sin, cos` for harmonics `1..=order` at `epoch_days` (days since 1970-01-01).
    pub fn push_features(&self, epoch_days: f64, row: &mut Vec<f64>) {
        for harmonic in 1..=self.order {
            let angle = 2.0 * PI * harmonic as f64 * epoch_days / self.period_days;
            row.push(angle.sin());
            row.push(angle.cos());
        }
    }
}

/// Components enabled by `settings` for a history spanning `history_days`.
pub(crate) fn active_seasonalities(settings: &ForecastSettings, history_days: f64) -> Vec<Seasonality> {
    [
        (settings.daily_seasonality, Seasonality::DAILY),
        (settings.weekly_seasonality, Seasonality::WEEKLY),
        (settings.yearly_seasonality, Seasonality::YEARLY),
    ]
    .into_iter()
    .filter(|(mode, seasonality)| mode.is_active(history_days, seasonality.period_days))
    .map(|(_, seasonality)| seasonality)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::SeasonalityMode;

    #[test]
    fn weekly_features_repeat_every_period() {
        let mut first = Vec::new();
        let mut second = Vec::new();
        Seasonality::WEEKLY.push_features(20_000.0, &mut first);
        Seasonality::WEEKLY.push_features(20_007.0, &mut second);
        assert_eq!(first.len(), Seasonality::WEEKLY.feature_count());
        for (a, b) in first.iter().zip(&second) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn default_components_include_yearly_on_short_history() {
        let settings = ForecastSettings::default();
        let names: Vec<&str> = active_seasonalities(&settings, 60.0)
            .iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["weekly", "yearly"]);

        let names: Vec<&str> = active_seasonalities(&settings, 10.0)
            .iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["yearly"]);
    }

    #[test]
    fn auto_components_follow_history_length() {
        let settings = ForecastSettings {
            yearly_seasonality: SeasonalityMode::Auto,
            ..ForecastSettings::default()
        };
        let names: Vec<&str> = active_seasonalities(&settings, 60.0)
            .iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["weekly"]);

        let names: Vec<&str> = active_seasonalities(&settings, 800.0)
            .iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["weekly", "yearly"]);
    }

    #[test]
    fn forced_components_ignore_history_length() {
        let settings = ForecastSettings {
            daily_seasonality: SeasonalityMode::Disabled,
            yearly_seasonality: SeasonalityMode::Enabled,
            ..ForecastSettings::default()
        };
        let names: Vec<&str> = active_seasonalities(&settings, 10.0)
            .iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["yearly"]);
    }
}
