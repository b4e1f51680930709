use crate::error::EngineError;
use crate::series::load_series_window;
use crate::{datasets, metrics};
use analytics::{ComponentScorer, norm_cdf, winsorize};
use chrono::NaiveDate;
use configuration::{Config, ScoringConfig, SeriesMap};
use core_types::{
    ComponentContribution, ComponentFamily, ComponentMetric, DataAvailability, TransmissionRegime,
    TransmissionScoreResult,
};
use std::sync::Arc;
use store::{MetricStore, SeriesReader};

/// One family's direction-corrected z-score and the series that fed it.
struct FamilyScore {
    family: ComponentFamily,
    zscore: f64,
    sources: Vec<String>,
}

/// Computes and persists the composite transmission score for a date.
///
/// Aggregates the five component families (curve, liquidity, supply,
/// demand, policy) into a single 0-100 score plus a regime bucket. All
/// statistics are train-only; the target date's own observations enter
/// only as the values being scored, never as part of their baselines.
pub struct TransmissionScoreEngine<S> {
    store: Arc<S>,
    scoring: ScoringConfig,
    series: SeriesMap,
    scorer: ComponentScorer,
}

impl<S> TransmissionScoreEngine<S>
where
    S: SeriesReader + MetricStore,
{
    pub fn new(store: Arc<S>, config: &Config) -> Self {
        Self {
            store,
            scoring: config.scoring.clone(),
            series: config.series.clone(),
            scorer: ComponentScorer::new(config.scoring.auction_cover_ceiling),
        }
    }

    /// Computes the score for `target`, persists the per-family metrics and
    /// the composite, and returns the result.
    ///
    /// Never fails on missing or partial market data: with fewer than the
    /// configured minimum of families available it emits the fixed neutral
    /// score with a calibrating marker instead. Only store I/O errors
    /// propagate.
    #[tracing::instrument(skip(self), fields(date = %target))]
    pub async fn compute(&self, target: NaiveDate) -> Result<TransmissionScoreResult, EngineError> {
        let mut available: Vec<FamilyScore> = Vec::new();
        let mut missing: Vec<String> = Vec::new();

        for family in ComponentFamily::ALL {
            match self.family_zscore(family, target).await? {
                Some(score) => available.push(score),
                None => {
                    tracing::debug!(family = %family, "family unavailable for target date");
                    missing.push(family.as_str().to_string());
                }
            }
        }

        let result = if available.len() < self.scoring.min_families {
            self.neutral_result(target, &available, missing)
        } else {
            self.scored_result(target, &available, missing)
        };

        self.persist(&result, &available).await?;

        tracing::info!(
            score = result.score,
            regime = %result.regime,
            families = available.len(),
            neutral = result.data_availability.neutral_fallback,
            "transmission score computed"
        );
        Ok(result)
    }

    /// The cold-start path: a fixed neutral score, explicitly labelled so
    /// downstream consumers can render "calibrating" instead of treating
    /// it as a real reading.
    fn neutral_result(
        &self,
        target: NaiveDate,
        available: &[FamilyScore],
        missing: Vec<String>,
    ) -> TransmissionScoreResult {
        let score = self.scoring.neutral_score;
        TransmissionScoreResult {
            date: target,
            score,
            regime: TransmissionRegime::from_score(score),
            components: self.contributions(available),
            data_availability: DataAvailability {
                included: available.iter().map(|f| f.family.as_str().to_string()).collect(),
                missing,
                neutral_fallback: true,
            },
        }
    }

    fn scored_result(
        &self,
        target: NaiveDate,
        available: &[FamilyScore],
        missing: Vec<String>,
    ) -> TransmissionScoreResult {
        let components = self.contributions(available);
        let composite_z: f64 = components
            .iter()
            .map(|c| c.zscore * c.weight)
            .sum();
        let score = 100.0 * norm_cdf(winsorize(composite_z, self.scoring.winsor_limit));

        TransmissionScoreResult {
            date: target,
            score,
            regime: TransmissionRegime::from_score(score),
            components,
            data_availability: DataAvailability {
                included: available.iter().map(|f| f.family.as_str().to_string()).collect(),
                missing,
                neutral_fallback: false,
            },
        }
    }

    /// Renormalizes the configured family weights over the available
    /// subset so the effective weights always sum to 1.0.
    fn contributions(&self, available: &[FamilyScore]) -> Vec<ComponentContribution> {
        let total: f64 = available
            .iter()
            .map(|f| self.configured_weight(f.family))
            .sum();
        if total <= 0.0 {
            return Vec::new();
        }

        available
            .iter()
            .map(|f| ComponentContribution {
                family: f.family,
                zscore: f.zscore,
                weight: self.configured_weight(f.family) / total,
            })
            .collect()
    }

    fn configured_weight(&self, family: ComponentFamily) -> f64 {
        let weights = &self.scoring.weights;
        match family {
            ComponentFamily::Curve => weights.curve,
            ComponentFamily::Liquidity => weights.liquidity,
            ComponentFamily::Supply => weights.supply,
            ComponentFamily::Demand => weights.demand,
            ComponentFamily::Policy => weights.policy,
        }
    }

    async fn family_zscore(
        &self,
        family: ComponentFamily,
        target: NaiveDate,
    ) -> Result<Option<FamilyScore>, EngineError> {
        match family {
            ComponentFamily::Curve => self.curve_family(target).await,
            ComponentFamily::Liquidity => self.liquidity_family(target).await,
            ComponentFamily::Supply => self.supply_family(target).await,
            ComponentFamily::Demand => self.demand_family(target).await,
            ComponentFamily::Policy => self.policy_family(target).await,
        }
    }

    /// Curve shape: slope, level and curvature are all magnitude-style —
    /// a very steep and a flat/inverted curve both read as stress.
    async fn curve_family(&self, target: NaiveDate) -> Result<Option<FamilyScore>, EngineError> {
        let lookback = self.scoring.long_window;
        let slope = load_series_window(&*self.store, &self.series.curve_slope, target, lookback).await?;
        let Some(latest_slope) = slope.latest else {
            return Ok(None);
        };
        let Ok(primary) = self.scorer.magnitude_zscore(&slope.window, latest_slope) else {
            return Ok(None);
        };

        let mut parts = vec![primary];
        let mut sources = vec![self.series.curve_slope.clone()];

        for series_id in [&self.series.curve_level, &self.series.curve_curvature] {
            let aux = load_series_window(&*self.store, series_id, target, lookback).await?;
            if let Some(latest) = aux.latest
                && let Ok(z) = self.scorer.magnitude_zscore(&aux.window, latest)
            {
                parts.push(z);
                sources.push(series_id.clone());
            }
        }

        Ok(Some(FamilyScore {
            family: ComponentFamily::Curve,
            zscore: mean(&parts),
            sources,
        }))
    }

    /// Money-market conditions: overnight rate level plus the interbank
    /// spread, both with higher = more stress.
    async fn liquidity_family(
        &self,
        target: NaiveDate,
    ) -> Result<Option<FamilyScore>, EngineError> {
        let lookback = self.scoring.liquidity_window;
        let rate =
            load_series_window(&*self.store, &self.series.overnight_rate, target, lookback).await?;
        let Some(latest_rate) = rate.latest else {
            return Ok(None);
        };
        let Ok(primary) = self.scorer.level_zscore(&rate.window, latest_rate) else {
            return Ok(None);
        };

        let mut parts = vec![primary];
        let mut sources = vec![self.series.overnight_rate.clone()];

        let spread =
            load_series_window(&*self.store, &self.series.interbank_spread, target, lookback)
                .await?;
        if let Some(latest) = spread.latest
            && let Ok(z) = self.scorer.level_zscore(&spread.window, latest)
        {
            parts.push(z);
            sources.push(self.series.interbank_spread.clone());
        }

        Ok(Some(FamilyScore {
            family: ComponentFamily::Liquidity,
            zscore: mean(&parts),
            sources,
        }))
    }

    /// Primary-market supply: bid-to-cover (direction-corrected against
    /// the heuristic cover ceiling), sold amount, and cutoff-yield changes.
    /// Only present on auction dates.
    async fn supply_family(&self, target: NaiveDate) -> Result<Option<FamilyScore>, EngineError> {
        let lookback = self.scoring.long_window;
        let cover = load_series_window(
            &*self.store,
            &self.series.auction_bid_to_cover,
            target,
            lookback,
        )
        .await?;
        let Some(latest_cover) = cover.latest else {
            return Ok(None);
        };
        let Ok(primary) = self.scorer.auction_demand_zscore(&cover.window, latest_cover) else {
            return Ok(None);
        };

        let mut parts = vec![primary];
        let mut sources = vec![self.series.auction_bid_to_cover.clone()];

        let sold =
            load_series_window(&*self.store, &self.series.auction_sold, target, lookback).await?;
        if let Some(latest) = sold.latest
            && let Ok(z) = self.scorer.level_zscore(&sold.window, latest)
        {
            parts.push(z);
            sources.push(self.series.auction_sold.clone());
        }

        // Cutoff yields enter as day-over-day changes: a jump in the
        // clearing yield is the stress signal, not its level.
        let cutoff =
            load_series_window(&*self.store, &self.series.auction_cutoff, target, lookback).await?;
        if let (Some(latest), Some((_, previous))) = (cutoff.latest, cutoff.previous) {
            let changes: Vec<f64> = cutoff.window.windows(2).map(|w| w[1] - w[0]).collect();
            if let Ok(z) = self.scorer.level_zscore(&changes, latest - previous) {
                parts.push(z);
                sources.push(self.series.auction_cutoff.clone());
            }
        }

        Ok(Some(FamilyScore {
            family: ComponentFamily::Supply,
            zscore: mean(&parts),
            sources,
        }))
    }

    /// Secondary-market demand: turnover with lower volume = more stress.
    async fn demand_family(&self, target: NaiveDate) -> Result<Option<FamilyScore>, EngineError> {
        let lookback = self.scoring.long_window;
        let turnover =
            load_series_window(&*self.store, &self.series.turnover_value, target, lookback).await?;
        let Some(latest) = turnover.latest else {
            return Ok(None);
        };
        let Ok(z) = self.scorer.inverted_zscore(&turnover.window, latest) else {
            return Ok(None);
        };

        Ok(Some(FamilyScore {
            family: ComponentFamily::Demand,
            zscore: z,
            sources: vec![self.series.turnover_value.clone()],
        }))
    }

    /// Policy stance: the anchor rate itself, the interbank spread over
    /// it, and the term-premium proxy. The anchor observation must exist
    /// for the date; its z-score may still be undefined during long flat
    /// policy periods, in which case the spread and term premium carry the
    /// family.
    async fn policy_family(&self, target: NaiveDate) -> Result<Option<FamilyScore>, EngineError> {
        let anchor = load_series_window(
            &*self.store,
            &self.series.policy_rate,
            target,
            self.scoring.liquidity_window,
        )
        .await?;
        if anchor.latest.is_none() {
            return Ok(None);
        }

        let mut parts = Vec::new();
        let mut sources = Vec::new();

        if let Some(latest) = anchor.latest
            && let Ok(z) = self.scorer.level_zscore(&anchor.window, latest)
        {
            parts.push(z);
            sources.push(self.series.policy_rate.clone());
        }

        let spread = load_series_window(
            &*self.store,
            &self.series.interbank_spread,
            target,
            self.scoring.liquidity_window,
        )
        .await?;
        if let Some(latest) = spread.latest
            && let Ok(z) = self.scorer.level_zscore(&spread.window, latest)
        {
            parts.push(z);
            sources.push(self.series.interbank_spread.clone());
        }

        let premium = load_series_window(
            &*self.store,
            &self.series.term_premium,
            target,
            self.scoring.long_window,
        )
        .await?;
        if let Some(latest) = premium.latest
            && let Ok(z) = self.scorer.level_zscore(&premium.window, latest)
        {
            parts.push(z);
            sources.push(self.series.term_premium.clone());
        }

        if parts.is_empty() {
            return Ok(None);
        }

        Ok(Some(FamilyScore {
            family: ComponentFamily::Policy,
            zscore: mean(&parts),
            sources,
        }))
    }

    async fn persist(
        &self,
        result: &TransmissionScoreResult,
        available: &[FamilyScore],
    ) -> Result<(), EngineError> {
        for family in available {
            let metric_name = format!("{}_zscore", family.family);
            self.store
                .write_metric(&ComponentMetric::numeric(
                    result.date,
                    datasets::TRANSMISSION,
                    &metric_name,
                    family.zscore,
                    family.sources.clone(),
                ))
                .await?;
        }

        let (basis, score_sources) = if result.data_availability.neutral_fallback {
            (
                metrics::BASIS_NEUTRAL,
                vec![metrics::NEUTRAL_SOURCE_NOTE.to_string()],
            )
        } else {
            (
                metrics::BASIS_COMPUTED,
                vec![format!(
                    "computed from {} of {} families",
                    available.len(),
                    ComponentFamily::ALL.len()
                )],
            )
        };

        self.store
            .write_metric(&ComponentMetric::numeric(
                result.date,
                datasets::TRANSMISSION,
                metrics::TRANSMISSION_SCORE,
                result.score,
                score_sources.clone(),
            ))
            .await?;
        self.store
            .write_metric(&ComponentMetric::text(
                result.date,
                datasets::TRANSMISSION,
                metrics::REGIME_BUCKET,
                result.regime.as_str(),
                score_sources.clone(),
            ))
            .await?;
        self.store
            .write_metric(&ComponentMetric::text(
                result.date,
                datasets::TRANSMISSION,
                metrics::SCORE_BASIS,
                basis,
                score_sources,
            ))
            .await?;

        Ok(())
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
