use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// The five indicator families aggregated into the transmission score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentFamily {
    Curve,
    Liquidity,
    Supply,
    Demand,
    Policy,
}

impl ComponentFamily {
    pub const ALL: [ComponentFamily; 5] = [
        ComponentFamily::Curve,
        ComponentFamily::Liquidity,
        ComponentFamily::Supply,
        ComponentFamily::Demand,
        ComponentFamily::Policy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentFamily::Curve => "curve",
            ComponentFamily::Liquidity => "liquidity",
            ComponentFamily::Supply => "supply",
            ComponentFamily::Demand => "demand",
            ComponentFamily::Policy => "policy",
        }
    }
}

impl fmt::Display for ComponentFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The components of the stress index composite. `Transmission` is the
/// persisted transmission score; the rest are market sub-scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StressComponent {
    Transmission,
    Liquidity,
    Curve,
    Auction,
    Turnover,
}

impl StressComponent {
    pub const ALL: [StressComponent; 5] = [
        StressComponent::Transmission,
        StressComponent::Liquidity,
        StressComponent::Curve,
        StressComponent::Auction,
        StressComponent::Turnover,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StressComponent::Transmission => "transmission",
            StressComponent::Liquidity => "liquidity",
            StressComponent::Curve => "curve",
            StressComponent::Auction => "auction",
            StressComponent::Turnover => "turnover",
        }
    }
}

impl fmt::Display for StressComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discretized transmission-tightness bucket. The mapping from score to
/// bucket uses fixed 20-point cut points and is monotone in the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransmissionRegime {
    B0,
    B1,
    B2,
    B3,
    B4,
}

impl TransmissionRegime {
    /// Maps a 0-100 score to its bucket. Scores outside the range are
    /// clamped, so the mapping is total.
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s < 20.0 => TransmissionRegime::B0,
            s if s < 40.0 => TransmissionRegime::B1,
            s if s < 60.0 => TransmissionRegime::B2,
            s if s < 80.0 => TransmissionRegime::B3,
            _ => TransmissionRegime::B4,
        }
    }

    /// A human-readable description of the tightness regime.
    pub fn label(&self) -> &'static str {
        match self {
            TransmissionRegime::B0 => "very loose",
            TransmissionRegime::B1 => "loose",
            TransmissionRegime::B2 => "neutral",
            TransmissionRegime::B3 => "tight",
            TransmissionRegime::B4 => "very tight",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransmissionRegime::B0 => "B0",
            TransmissionRegime::B1 => "B1",
            TransmissionRegime::B2 => "B2",
            TransmissionRegime::B3 => "B3",
            TransmissionRegime::B4 => "B4",
        }
    }
}

impl fmt::Display for TransmissionRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransmissionRegime {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "B0" => Ok(TransmissionRegime::B0),
            "B1" => Ok(TransmissionRegime::B1),
            "B2" => Ok(TransmissionRegime::B2),
            "B3" => Ok(TransmissionRegime::B3),
            "B4" => Ok(TransmissionRegime::B4),
            other => Err(CoreError::InvalidInput(
                "transmission regime".to_string(),
                other.to_string(),
            )),
        }
    }
}

/// Discretized stress-severity bucket, same cut points as the transmission
/// buckets but its own label space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StressRegime {
    S0,
    S1,
    S2,
    S3,
    S4,
}

impl StressRegime {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s < 20.0 => StressRegime::S0,
            s if s < 40.0 => StressRegime::S1,
            s if s < 60.0 => StressRegime::S2,
            s if s < 80.0 => StressRegime::S3,
            _ => StressRegime::S4,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StressRegime::S0 => "calm",
            StressRegime::S1 => "moderate",
            StressRegime::S2 => "elevated",
            StressRegime::S3 => "high",
            StressRegime::S4 => "extreme",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StressRegime::S0 => "S0",
            StressRegime::S1 => "S1",
            StressRegime::S2 => "S2",
            StressRegime::S3 => "S3",
            StressRegime::S4 => "S4",
        }
    }
}

impl fmt::Display for StressRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StressRegime {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "S0" => Ok(StressRegime::S0),
            "S1" => Ok(StressRegime::S1),
            "S2" => Ok(StressRegime::S2),
            "S3" => Ok(StressRegime::S3),
            "S4" => Ok(StressRegime::S4),
            other => Err(CoreError::InvalidInput(
                "stress regime".to_string(),
                other.to_string(),
            )),
        }
    }
}

/// Severity attached to an alert threshold and the events it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "info",
            AlertSeverity::Warning => "warning",
            AlertSeverity::Critical => "critical",
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertSeverity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(AlertSeverity::Info),
            "warning" => Ok(AlertSeverity::Warning),
            "critical" => Ok(AlertSeverity::Critical),
            other => Err(CoreError::InvalidInput(
                "alert severity".to_string(),
                other.to_string(),
            )),
        }
    }
}

/// How an alert rule evaluates its metric. The active method is carried in
/// the emitted evidence so consumers render the right units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerMethod {
    /// Rolling z-score against a trailing train-only window.
    Zscore,
    /// Raw metric compared against a fixed numeric level.
    Absolute,
    /// Discrete change detection (e.g. a policy-rate move), not statistical.
    Event,
}

impl TriggerMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerMethod::Zscore => "zscore",
            TriggerMethod::Absolute => "absolute",
            TriggerMethod::Event => "event",
        }
    }
}

impl fmt::Display for TriggerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transmission_buckets_are_monotone_in_score() {
        let mut prev = TransmissionRegime::from_score(0.0);
        for step in 1..=1000 {
            let score = step as f64 * 0.1;
            let bucket = TransmissionRegime::from_score(score);
            assert!(bucket >= prev, "bucket regressed at score {score}");
            prev = bucket;
        }
    }

    #[test]
    fn stress_buckets_are_monotone_in_score() {
        let mut prev = StressRegime::from_score(0.0);
        for step in 1..=1000 {
            let score = step as f64 * 0.1;
            let bucket = StressRegime::from_score(score);
            assert!(bucket >= prev, "bucket regressed at score {score}");
            prev = bucket;
        }
    }

    #[test]
    fn bucket_cut_points() {
        assert_eq!(TransmissionRegime::from_score(0.0), TransmissionRegime::B0);
        assert_eq!(TransmissionRegime::from_score(19.99), TransmissionRegime::B0);
        assert_eq!(TransmissionRegime::from_score(20.0), TransmissionRegime::B1);
        assert_eq!(TransmissionRegime::from_score(50.0), TransmissionRegime::B2);
        assert_eq!(TransmissionRegime::from_score(79.99), TransmissionRegime::B3);
        assert_eq!(TransmissionRegime::from_score(80.0), TransmissionRegime::B4);
        assert_eq!(TransmissionRegime::from_score(100.0), TransmissionRegime::B4);
        assert_eq!(StressRegime::from_score(100.0), StressRegime::S4);
    }
}
