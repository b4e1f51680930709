use crate::error::EngineError;
use crate::series::load_series_window;
use crate::{datasets, metrics};
use analytics::{ComponentScorer, percentile_from_z};
use chrono::NaiveDate;
use configuration::{Config, SeriesMap, StressConfig};
use core_types::{
    ComponentMetric, DataAvailability, MetricValue, StressComponent, StressDriver, StressIndexResult,
    StressRegime,
};
use std::sync::Arc;
use store::{MetricStore, SeriesReader};

/// Computes and persists the composite stress index for a date.
///
/// Builds on the persisted transmission score (a hard dependency) plus
/// liquidity/curve/auction/turnover sub-scores expressed as percentile
/// ranks of winsorized, direction-corrected z-scores.
pub struct StressIndexEngine<S> {
    store: Arc<S>,
    stress: StressConfig,
    series: SeriesMap,
    scorer: ComponentScorer,
}

/// One component's percentile rank, before weighting.
struct SubScore {
    component: StressComponent,
    percentile: f64,
}

impl<S> StressIndexEngine<S>
where
    S: SeriesReader + MetricStore,
{
    pub fn new(store: Arc<S>, config: &Config) -> Self {
        Self {
            store,
            stress: config.stress.clone(),
            series: config.series.clone(),
            scorer: ComponentScorer::new(config.scoring.auction_cover_ceiling),
        }
    }

    /// Computes the stress index for `target`.
    ///
    /// Fails with `DependencyMissing` when no transmission score has been
    /// computed for the date; everything else degrades by dropping the
    /// unavailable component and renormalizing the remaining weights.
    #[tracing::instrument(skip(self), fields(date = %target))]
    pub async fn compute(&self, target: NaiveDate) -> Result<StressIndexResult, EngineError> {
        let transmission_score = self
            .store
            .read_metric(target, datasets::TRANSMISSION, metrics::TRANSMISSION_SCORE)
            .await?
            .and_then(|value| value.as_numeric())
            .ok_or_else(|| EngineError::DependencyMissing {
                date: target,
                dataset: datasets::TRANSMISSION.to_string(),
            })?;

        // A neutral-fallback transmission score is still usable input, but
        // the caller must be able to see that the composite rests on a
        // calibrating placeholder.
        let transmission_neutral = matches!(
            self.store
                .read_metric(target, datasets::TRANSMISSION, metrics::SCORE_BASIS)
                .await?,
            Some(MetricValue::Text(basis)) if basis == metrics::BASIS_NEUTRAL
        );

        let mut available = vec![SubScore {
            component: StressComponent::Transmission,
            // The transmission score is already a 0-100 reading; it enters
            // the composite as its own percentile.
            percentile: transmission_score,
        }];
        let mut missing: Vec<String> = Vec::new();

        for component in [
            StressComponent::Liquidity,
            StressComponent::Curve,
            StressComponent::Auction,
            StressComponent::Turnover,
        ] {
            match self.sub_percentile(component, target).await? {
                Some(percentile) => available.push(SubScore {
                    component,
                    percentile,
                }),
                None => {
                    tracing::debug!(component = %component, "stress component unavailable");
                    missing.push(component.as_str().to_string());
                }
            }
        }

        let drivers = self.drivers(&available);
        let stress_index: f64 = drivers
            .iter()
            .map(|d| d.percentile * d.weight)
            .sum();
        let regime = StressRegime::from_score(stress_index);

        let top_drivers: Vec<StressDriver> = {
            let mut sorted = drivers.clone();
            sorted.sort_by(|a, b| {
                b.contribution
                    .abs()
                    .partial_cmp(&a.contribution.abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            sorted.truncate(self.stress.top_drivers);
            sorted
        };

        let result = StressIndexResult {
            date: target,
            stress_index,
            regime,
            drivers: top_drivers,
            data_availability: DataAvailability {
                included: available
                    .iter()
                    .map(|s| s.component.as_str().to_string())
                    .collect(),
                missing,
                neutral_fallback: transmission_neutral,
            },
        };

        self.persist(&result, &drivers).await?;

        tracing::info!(
            stress = result.stress_index,
            regime = %result.regime,
            components = result.data_availability.included.len(),
            "stress index computed"
        );
        Ok(result)
    }

    /// The percentile rank of one market sub-score, `None` when the
    /// component has no target-date observation or the window is too thin.
    async fn sub_percentile(
        &self,
        component: StressComponent,
        target: NaiveDate,
    ) -> Result<Option<f64>, EngineError> {
        let (series_id, lookback) = match component {
            StressComponent::Liquidity => {
                (&self.series.overnight_rate, self.stress.liquidity_window)
            }
            StressComponent::Curve => (&self.series.curve_slope, self.stress.long_window),
            StressComponent::Auction => {
                (&self.series.auction_bid_to_cover, self.stress.long_window)
            }
            StressComponent::Turnover => (&self.series.turnover_value, self.stress.long_window),
            // Handled by the caller from the persisted metric.
            StressComponent::Transmission => return Ok(None),
        };

        let window = load_series_window(&*self.store, series_id, target, lookback).await?;
        let Some(latest) = window.latest else {
            return Ok(None);
        };

        let zscore = match component {
            StressComponent::Liquidity => self.scorer.level_zscore(&window.window, latest),
            StressComponent::Curve => self.scorer.magnitude_zscore(&window.window, latest),
            StressComponent::Auction => self.scorer.auction_demand_zscore(&window.window, latest),
            StressComponent::Turnover => self.scorer.inverted_zscore(&window.window, latest),
            StressComponent::Transmission => unreachable!("handled above"),
        };

        match zscore {
            Ok(z) => Ok(Some(percentile_from_z(z, self.stress.winsor_limit))),
            Err(e) => {
                tracing::debug!(component = %component, error = %e, "sub-score not computable");
                Ok(None)
            }
        }
    }

    /// Effective weights renormalized over the available components, and
    /// each component's signed contribution `(percentile - 50) * weight`.
    fn drivers(&self, available: &[SubScore]) -> Vec<StressDriver> {
        let total: f64 = available
            .iter()
            .map(|s| self.configured_weight(s.component))
            .sum();
        if total <= 0.0 {
            return Vec::new();
        }

        available
            .iter()
            .map(|s| {
                let weight = self.configured_weight(s.component) / total;
                StressDriver {
                    component: s.component,
                    percentile: s.percentile,
                    weight,
                    contribution: (s.percentile - 50.0) * weight,
                }
            })
            .collect()
    }

    fn configured_weight(&self, component: StressComponent) -> f64 {
        let weights = &self.stress.weights;
        match component {
            StressComponent::Transmission => weights.transmission,
            StressComponent::Liquidity => weights.liquidity,
            StressComponent::Curve => weights.curve,
            StressComponent::Auction => weights.auction,
            StressComponent::Turnover => weights.turnover,
        }
    }

    async fn persist(
        &self,
        result: &StressIndexResult,
        drivers: &[StressDriver],
    ) -> Result<(), EngineError> {
        let mut sources: Vec<String> = result.data_availability.included.clone();
        if result.data_availability.neutral_fallback {
            sources.push("transmission is a neutral fallback".to_string());
        }

        for driver in drivers {
            let metric_name = format!("{}_percentile", driver.component);
            self.store
                .write_metric(&ComponentMetric::numeric(
                    result.date,
                    datasets::STRESS,
                    &metric_name,
                    driver.percentile,
                    sources.clone(),
                ))
                .await?;
        }

        self.store
            .write_metric(&ComponentMetric::numeric(
                result.date,
                datasets::STRESS,
                metrics::STRESS_INDEX,
                result.stress_index,
                sources.clone(),
            ))
            .await?;
        self.store
            .write_metric(&ComponentMetric::text(
                result.date,
                datasets::STRESS,
                metrics::REGIME_BUCKET,
                result.regime.as_str(),
                sources.clone(),
            ))
            .await?;
        self.store
            .write_metric(&ComponentMetric::text(
                result.date,
                datasets::STRESS,
                metrics::STRESS_DRIVERS,
                &serde_json::to_string(&result.drivers)?,
                sources,
            ))
            .await?;

        Ok(())
    }
}
