use crate::error::AnalyticsError;
use crate::rolling::RollingStats;

/// Turns one raw indicator into a stress-direction-corrected z-score.
///
/// Every market input has its own polarity: a high overnight rate is
/// stressful, a high bid-to-cover is reassuring, a dislocated curve is
/// stressful in either direction. The scorer owns those corrections so the
/// engines can combine family scores without per-family special cases.
#[derive(Debug, Clone, Copy)]
pub struct ComponentScorer {
    /// Heuristic ceiling for the bid-to-cover transform. A calibration
    /// choice (demand above this is treated as fully comfortable), not a
    /// theoretical bound.
    auction_cover_ceiling: f64,
}

impl ComponentScorer {
    pub fn new(auction_cover_ceiling: f64) -> Self {
        Self {
            auction_cover_ceiling,
        }
    }

    /// Level indicators where higher = more stress (overnight rate,
    /// interbank spread, cutoff yield): the plain z-score.
    pub fn level_zscore(&self, window: &[f64], latest: f64) -> Result<f64, AnalyticsError> {
        RollingStats::from_window(window)?.zscore(latest)
    }

    /// Curve-shaped indicators: extremes on either side are stress, so the
    /// mapping is the magnitude of the z-score, not its sign.
    pub fn magnitude_zscore(&self, window: &[f64], latest: f64) -> Result<f64, AnalyticsError> {
        Ok(self.level_zscore(window, latest)?.abs())
    }

    /// Volume-style indicators where lower = more stress (secondary
    /// turnover): the inverted z-score.
    pub fn inverted_zscore(&self, window: &[f64], latest: f64) -> Result<f64, AnalyticsError> {
        Ok(-self.level_zscore(window, latest)?)
    }

    /// Auction demand: raw stress is `ceiling - bid_to_cover`, so a weaker
    /// cover ratio reads as higher stress. The transformed series is then
    /// z-scored like any other level indicator.
    pub fn auction_demand_zscore(
        &self,
        cover_window: &[f64],
        latest_cover: f64,
    ) -> Result<f64, AnalyticsError> {
        let transformed: Vec<f64> = cover_window
            .iter()
            .map(|cover| self.auction_cover_ceiling - cover)
            .collect();
        self.level_zscore(&transformed, self.auction_cover_ceiling - latest_cover)
    }
}
