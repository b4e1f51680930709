use crate::error::AnalyticsError;
use chrono::NaiveDate;

/// How a trailing window relates to the date being scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowMode {
    /// Only observations with `date < target`. This is the default for any
    /// statistic used to score the target date itself: the scored value
    /// must never be part of its own baseline.
    TrainOnly,
    /// Observations with `date <= target`. For presentation-layer callers
    /// that summarize a period including its last day.
    Inclusive,
}

/// Selects the trailing window from a date-ascending observation slice.
///
/// Takes at most the last `lookback` qualifying points. Non-finite values
/// are dropped here so one malformed observation poisons neither the mean
/// nor the std.
pub fn select_window(
    observations: &[(NaiveDate, f64)],
    target: NaiveDate,
    mode: WindowMode,
    lookback: usize,
) -> Vec<f64> {
    let mut window: Vec<f64> = observations
        .iter()
        .filter(|(date, _)| match mode {
            WindowMode::TrainOnly => *date < target,
            WindowMode::Inclusive => *date <= target,
        })
        .map(|(_, value)| *value)
        .filter(|value| {
            if value.is_finite() {
                true
            } else {
                tracing::debug!(target_date = %target, "dropping non-finite observation from window");
                false
            }
        })
        .collect();

    if window.len() > lookback {
        window.drain(..window.len() - lookback);
    }
    window
}

/// Windowed mean and sample standard deviation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollingStats {
    pub mean: f64,
    pub std_dev: f64,
    pub n: usize,
}

impl RollingStats {
    /// Derives the statistics for one window.
    ///
    /// A window with fewer than 2 points has an undefined dispersion: that
    /// is signalled as `InsufficientData`, never silently treated as zero.
    pub fn from_window(window: &[f64]) -> Result<Self, AnalyticsError> {
        let n = window.len();
        if n < 2 {
            return Err(AnalyticsError::InsufficientData(format!(
                "rolling window needs at least 2 observations, got {n}"
            )));
        }

        let mean = window.iter().sum::<f64>() / n as f64;
        let variance =
            window.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n as f64 - 1.0);

        Ok(Self {
            mean,
            std_dev: variance.sqrt(),
            n,
        })
    }

    /// The z-score of `value` against this window.
    ///
    /// A flat window (zero dispersion) also yields an undefined z-score.
    pub fn zscore(&self, value: f64) -> Result<f64, AnalyticsError> {
        if !value.is_finite() {
            return Err(AnalyticsError::MalformedInput(format!(
                "cannot z-score non-finite value {value}"
            )));
        }
        if self.std_dev <= f64::EPSILON {
            return Err(AnalyticsError::InsufficientData(
                "window has zero dispersion, z-score undefined".to_string(),
            ));
        }
        Ok((value - self.mean) / self.std_dev)
    }
}

/// Clamps a z-score to `[-limit, +limit]`.
///
/// Applied before any percentile transform so a single dislocated print
/// cannot saturate the composite.
pub fn winsorize(z: f64, limit: f64) -> f64 {
    z.clamp(-limit, limit)
}

/// Maps a z-score to a 0-100 percentile rank via the normal CDF.
///
/// This assumes approximate normality of the underlying window; it is an
/// approximation, not an empirical ranking against the window itself.
pub fn percentile_from_z(z: f64, winsor_limit: f64) -> f64 {
    100.0 * norm_cdf(winsorize(z, winsor_limit))
}

/// Standard normal CDF using the Abramowitz & Stegun approximation.
pub fn norm_cdf(x: f64) -> f64 {
    // A&S formula 7.1.26, accurate to 1.5e-7
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    0.5 * (1.0 + sign * y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn train_only_window_excludes_target_date() {
        let obs = vec![
            (date(2024, 1, 1), 1.0),
            (date(2024, 1, 2), 2.0),
            (date(2024, 1, 3), 99.0),
        ];
        let window = select_window(&obs, date(2024, 1, 3), WindowMode::TrainOnly, 10);
        assert_eq!(window, vec![1.0, 2.0]);

        let inclusive = select_window(&obs, date(2024, 1, 3), WindowMode::Inclusive, 10);
        assert_eq!(inclusive, vec![1.0, 2.0, 99.0]);
    }

    #[test]
    fn window_takes_last_lookback_points() {
        let obs: Vec<(NaiveDate, f64)> = (1..=20)
            .map(|d| (date(2024, 1, d), d as f64))
            .collect();
        let window = select_window(&obs, date(2024, 1, 20), WindowMode::TrainOnly, 5);
        assert_eq!(window, vec![15.0, 16.0, 17.0, 18.0, 19.0]);
    }

    #[test]
    fn non_finite_values_are_dropped() {
        let obs = vec![
            (date(2024, 1, 1), 1.0),
            (date(2024, 1, 2), f64::NAN),
            (date(2024, 1, 3), 3.0),
        ];
        let window = select_window(&obs, date(2024, 1, 4), WindowMode::TrainOnly, 10);
        assert_eq!(window, vec![1.0, 3.0]);
    }

    #[test]
    fn stats_of_known_window() {
        let stats = RollingStats::from_window(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((stats.mean - 5.0).abs() < 1e-12);
        // sample std of this classic window is sqrt(32/7)
        assert!((stats.std_dev - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(stats.n, 8);
    }

    #[test]
    fn single_point_window_is_insufficient() {
        assert!(matches!(
            RollingStats::from_window(&[1.0]),
            Err(AnalyticsError::InsufficientData(_))
        ));
    }

    #[test]
    fn flat_window_has_no_zscore() {
        let stats = RollingStats::from_window(&[3.0, 3.0, 3.0]).unwrap();
        assert!(matches!(
            stats.zscore(4.0),
            Err(AnalyticsError::InsufficientData(_))
        ));
    }

    #[test]
    fn norm_cdf_reference_values() {
        assert!((norm_cdf(0.0) - 0.5).abs() < 1e-7);
        assert!((norm_cdf(1.96) - 0.975).abs() < 1e-3);
        assert!((norm_cdf(-1.96) - 0.025).abs() < 1e-3);
        assert!(norm_cdf(3.0) > 0.998);
    }

    #[test]
    fn percentile_saturates_at_winsor_limit() {
        // z = 5 and z = 3 give the same percentile under a 3-sigma clamp.
        assert_eq!(percentile_from_z(5.0, 3.0), percentile_from_z(3.0, 3.0));
        assert_eq!(percentile_from_z(-5.0, 3.0), percentile_from_z(-3.0, 3.0));
    }

    proptest! {
        #[test]
        fn winsorize_stays_in_bounds(z in -100.0..100.0f64) {
            let w = winsorize(z, 3.0);
            prop_assert!(w >= -3.0 && w <= 3.0);
        }

        #[test]
        fn percentile_is_monotone(a in -10.0..10.0f64, b in -10.0..10.0f64) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(percentile_from_z(lo, 3.0) <= percentile_from_z(hi, 3.0));
        }

        #[test]
        fn percentile_in_range(z in -100.0..100.0f64) {
            let p = percentile_from_z(z, 3.0);
            prop_assert!((0.0..=100.0).contains(&p));
        }
    }
}
