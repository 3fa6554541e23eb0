use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    stats::{laplace, quantile, standard_normal},
    CancelToken, CoreError,
};

/// Monte Carlo interval estimate. Each sample replays the future with new trend
/// rate changes, drawn at the historical changepoint frequency and magnitude,
/// plus observation noise. All quantities are on the scaled series.
#[derive(Debug, Clone)]
pub(crate) struct TrendUncertainty {
    /// Chance that the trend rate changes on any one future day.
    pub change_probability: f64,
    /// Laplace scale of a rate change, the mean fitted magnitude.
    pub delta_scale: f64,
    pub sigma: f64,
    pub interval_width: f64,
    pub samples: usize,
    pub seed: u64,
}

impl TrendUncertainty {
    /// Half-width of the symmetric interval at each of `future_ts`, which must be
    /// increasing scaled times after the end of the history (scaled time `1.0`).
    /// Samples advance one day at a time, so memory grows with `samples + days`.
    pub fn half_widths(
        &self,
        future_ts: &[f64],
        token: &CancelToken,
    ) -> Result<Vec<f64>, CoreError> {
        if self.samples == 0 || future_ts.is_empty() {
            return Ok(vec![0.0; future_ts.len()]);
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut levels = vec![0.0; self.samples];
        let mut slopes = vec![0.0; self.samples];
        let mut bucket = Vec::with_capacity(self.samples);
        let mut widths = Vec::with_capacity(future_ts.len());
        let mut previous_t = 1.0;

        for &t in future_ts {
            token.check()?;
            let step = t - previous_t;
            previous_t = t;
            bucket.clear();
            for (level, slope) in levels.iter_mut().zip(slopes.iter_mut()) {
                *level += *slope * step;
                if rng.gen::<f64>() < self.change_probability {
                    *slope += laplace(&mut rng, self.delta_scale);
                }
                let noise = self.sigma * standard_normal(&mut rng);
                bucket.push((*level + noise).abs());
            }
            widths.push(quantile(&bucket, self.interval_width));
        }
        Ok(widths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uncertainty(samples: usize) -> TrendUncertainty {
        TrendUncertainty {
            change_probability: 0.2,
            delta_scale: 0.3,
            sigma: 0.05,
            interval_width: 0.8,
            samples,
            seed: 11,
        }
    }

    fn horizon(days: usize) -> Vec<f64> {
        (1..=days).map(|d| 1.0 + d as f64 / 60.0).collect()
    }

    #[test]
    fn zero_samples_give_zero_width() {
        let widths = uncertainty(0)
            .half_widths(&horizon(5), &CancelToken::new())
            .unwrap();
        assert_eq!(widths, vec![0.0; 5]);
    }

    #[test]
    fn intervals_widen_with_horizon() {
        let widths = uncertainty(2_000)
            .half_widths(&horizon(60), &CancelToken::new())
            .unwrap();
        assert!(widths.iter().all(|w| *w > 0.0));
        assert!(widths[59] > widths[0], "{} vs {}", widths[59], widths[0]);
    }

    #[test]
    fn noise_only_width_matches_normal_quantile() {
        let settings = TrendUncertainty {
            change_probability: 0.0,
            sigma: 1.0,
            ..uncertainty(20_000)
        };
        let widths = settings
            .half_widths(&horizon(1), &CancelToken::new())
            .unwrap();
        // P(|Z| <= 1.2816) = 0.8
        assert!((widths[0] - 1.2816).abs() < 0.05, "width {}", widths[0]);
    }

    #[test]
    fn seeded_runs_repeat() {
        let first = uncertainty(300)
            .half_widths(&horizon(10), &CancelToken::new())
            .unwrap();
        let second = uncertainty(300)
            .half_widths(&horizon(10), &CancelToken::new())
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn long_horizons_keep_one_width_per_day() {
        let days = 20_000;
        let widths = uncertainty(50)
            .half_widths(&horizon(days), &CancelToken::new())
            .unwrap();
        assert_eq!(widths.len(), days);
        assert!(widths.iter().all(|w| w.is_finite() && *w >= 0.0));
        assert!(widths[days - 1] > widths[0]);
    }

    #[test]
    fn honours_cancellation() {
        let token = CancelToken::new();
        token.cancel();
        assert!(matches!(
            uncertainty(100).half_widths(&horizon(3), &token),
            Err(CoreError::Cancelled)
        ));
    }
}
