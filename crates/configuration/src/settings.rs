use serde::Deserialize;

/// The root configuration structure for the engine.
///
/// Every field carries a serde default, so an absent or empty `conduit.toml`
/// yields a fully working configuration. All heuristic calibration constants
/// (weights, windows, ceilings) live here rather than as code literals, so
/// recalibration never requires a redeploy.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub stress: StressConfig,
    #[serde(default)]
    pub alerting: AlertingConfig,
    #[serde(default)]
    pub series: SeriesMap,
}

/// Parameters of the transmission-score composite.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Minimum number of component families that must be computable before
    /// the composite is derived from data. Below this the engine emits the
    /// fixed neutral score instead.
    pub min_families: usize,
    /// The fixed score emitted during cold-start calibration.
    pub neutral_score: f64,
    /// Family weights. Renormalized over the available subset at compute
    /// time; the configured values must sum to 1.0.
    pub weights: FamilyWeights,
    /// Trailing window (trading observations) for money-market statistics.
    pub liquidity_window: usize,
    /// Trailing window for curve, auction and turnover statistics.
    pub long_window: usize,
    /// Heuristic ceiling for the bid-to-cover stress transform
    /// (`raw = ceiling - bid_to_cover`). A calibration choice, not a
    /// theoretical bound.
    pub auction_cover_ceiling: f64,
    /// Winsorization bound (in sigmas) applied before percentile transforms.
    pub winsor_limit: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_families: 3,
            neutral_score: 50.0,
            weights: FamilyWeights::default(),
            liquidity_window: 60,
            long_window: 252,
            auction_cover_ceiling: 2.0,
            winsor_limit: 3.0,
        }
    }
}

/// Per-family weights of the transmission composite.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FamilyWeights {
    pub curve: f64,
    pub liquidity: f64,
    pub supply: f64,
    pub demand: f64,
    pub policy: f64,
}

impl Default for FamilyWeights {
    fn default() -> Self {
        Self {
            curve: 0.25,
            liquidity: 0.25,
            supply: 0.20,
            demand: 0.15,
            policy: 0.15,
        }
    }
}

/// Parameters of the stress-index composite.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    pub weights: StressWeights,
    /// Trailing window for the liquidity sub-score.
    pub liquidity_window: usize,
    /// Trailing window for curve/auction/turnover sub-scores.
    pub long_window: usize,
    /// Winsorization bound (in sigmas) applied before the percentile
    /// transform of every sub-score.
    pub winsor_limit: f64,
    /// How many top drivers to expose in the decomposition.
    pub top_drivers: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            weights: StressWeights::default(),
            liquidity_window: 60,
            long_window: 252,
            winsor_limit: 3.0,
            top_drivers: 3,
        }
    }
}

/// Component weights of the stress composite. Must sum to 1.0; unavailable
/// components are dropped and the rest renormalized proportionally.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StressWeights {
    pub transmission: f64,
    pub liquidity: f64,
    pub curve: f64,
    pub auction: f64,
    pub turnover: f64,
}

impl Default for StressWeights {
    fn default() -> Self {
        Self {
            transmission: 0.30,
            liquidity: 0.25,
            curve: 0.20,
            auction: 0.15,
            turnover: 0.10,
        }
    }
}

/// Alerting defaults. These are the compiled-in fallbacks used whenever the
/// threshold store has no row for a rule (or is unreachable); rows in the
/// store override them without a redeploy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlertingConfig {
    /// Threshold-store cache lifetime, in seconds. Kept at or below five
    /// minutes so sensitivity changes take effect promptly.
    pub cache_ttl_secs: u64,
    /// z-score bound for the overnight-rate spike rule.
    pub liquidity_spike_z: f64,
    /// z-score bound for the bear-steepening rule.
    pub bear_steepening_z: f64,
    /// Absolute bid-to-cover floor for the weak-auction rule.
    pub weak_auction_cover: f64,
    /// z-score bound (applied negatively) for the turnover-drop rule.
    pub turnover_drop_z: f64,
    /// Minimum policy-rate move, in percentage points, to report.
    pub policy_change_min_pp: f64,
    /// Day-over-day transmission-score jump, in points.
    pub transmission_jump_pts: f64,
    /// Absolute transmission-score ceiling.
    pub transmission_high: f64,
    /// Absolute stress-index ceiling.
    pub stress_high: f64,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            liquidity_spike_z: 2.0,
            bear_steepening_z: 2.0,
            weak_auction_cover: 1.8,
            turnover_drop_z: 2.0,
            policy_change_min_pp: 0.0,
            transmission_jump_pts: 10.0,
            transmission_high: 80.0,
            stress_high: 80.0,
        }
    }
}

/// Maps component families to the series ids that feed them. Ingestion
/// providers own the ids; this map is the only place the engine learns them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SeriesMap {
    /// Overnight interbank rate level (primary liquidity input).
    pub overnight_rate: String,
    /// Interbank term spread over the policy anchor.
    pub interbank_spread: String,
    /// Benchmark curve slope, e.g. 2s10s.
    pub curve_slope: String,
    /// Benchmark curve level (long anchor yield).
    pub curve_level: String,
    /// Benchmark curve curvature (butterfly).
    pub curve_curvature: String,
    /// Auction bid-to-cover ratio (primary supply input).
    pub auction_bid_to_cover: String,
    /// Auction sold amount.
    pub auction_sold: String,
    /// Auction cutoff yield.
    pub auction_cutoff: String,
    /// Secondary-market turnover value (primary demand input).
    pub turnover_value: String,
    /// Policy rate announcements.
    pub policy_rate: String,
    /// Term-premium proxy for the policy family.
    pub term_premium: String,
    /// Optional foreign reference yield for cross-market comparators.
    /// Alert-layer only; silently omitted when the series is absent.
    pub foreign_reference_yield: String,
}

impl Default for SeriesMap {
    fn default() -> Self {
        Self {
            overnight_rate: "mm_overnight_rate".to_string(),
            interbank_spread: "mm_interbank_spread".to_string(),
            curve_slope: "govt_curve_slope_2s10s".to_string(),
            curve_level: "govt_curve_level_10y".to_string(),
            curve_curvature: "govt_curve_curvature".to_string(),
            auction_bid_to_cover: "auction_bid_to_cover".to_string(),
            auction_sold: "auction_sold_amount".to_string(),
            auction_cutoff: "auction_cutoff_yield".to_string(),
            turnover_value: "secondary_turnover_value".to_string(),
            policy_rate: "policy_rate".to_string(),
            term_premium: "term_premium_proxy".to_string(),
            foreign_reference_yield: "foreign_reference_yield_10y".to_string(),
        }
    }
}
