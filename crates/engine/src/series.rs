use crate::error::EngineError;
use analytics::{WindowMode, select_window};
use chrono::{Days, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use store::SeriesReader;

/// A loaded series positioned around one target date: the train-only
/// trailing window, the observation on the target date itself (if any),
/// and the last prior observation for day-over-day comparisons.
#[derive(Debug, Clone)]
pub(crate) struct SeriesWindow {
    /// Values with `date < target`, oldest first, at most `lookback` points.
    pub window: Vec<f64>,
    /// The value observed on the target date, `None` when the series has
    /// no print for that date.
    pub latest: Option<f64>,
    /// The most recent observation strictly before the target date.
    pub previous: Option<(NaiveDate, f64)>,
    /// The lookback the window was selected with.
    pub lookback: usize,
}

/// Fetches a series and splits it around `target` with train-only
/// semantics.
///
/// The calendar span requested from the store is twice the lookback plus a
/// month, which comfortably covers weekend and holiday gaps between
/// trading observations.
pub(crate) async fn load_series_window<S: SeriesReader>(
    store: &S,
    series_id: &str,
    target: NaiveDate,
    lookback: usize,
) -> Result<SeriesWindow, EngineError> {
    let span_days = (lookback as u64) * 2 + 30;
    let start = target
        .checked_sub_days(Days::new(span_days))
        .unwrap_or(NaiveDate::MIN);

    let observations = store.read_series(series_id, start, target).await?;

    let mut points: Vec<(NaiveDate, f64)> = Vec::with_capacity(observations.len());
    let mut latest = None;
    for obs in &observations {
        let Some(value) = obs.value.to_f64() else {
            tracing::warn!(series = series_id, date = %obs.date, "unrepresentable observation value, skipping");
            continue;
        };
        if !value.is_finite() {
            tracing::warn!(series = series_id, date = %obs.date, "non-finite observation value, skipping");
            continue;
        }
        if obs.date == target {
            latest = Some(value);
        } else {
            points.push((obs.date, value));
        }
    }

    let previous = points.last().copied();
    let window = select_window(&points, target, WindowMode::TrainOnly, lookback);

    Ok(SeriesWindow {
        window,
        latest,
        previous,
        lookback,
    })
}
