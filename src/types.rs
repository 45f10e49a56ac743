// =============================================================================
// Shared types used across the Confluence aggregation engine
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Bar timestamp in epoch milliseconds (the candle `open_time`).
pub type Timestamp = i64;

/// A directional trading opinion at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Signal {
    Sell,
    Hold,
    Buy,
}

impl Signal {
    /// -1, 0 or +1.
    pub fn value(self) -> i8 {
        match self {
            Self::Sell => -1,
            Self::Hold => 0,
            Self::Buy => 1,
        }
    }

    /// Map a score sign onto a signal using a symmetric deadband.
    pub fn from_score(score: f64, threshold: f64) -> Self {
        if score > threshold {
            Self::Buy
        } else if score < -threshold {
            Self::Sell
        } else {
            Self::Hold
        }
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::Hold
    }
}

impl From<Signal> for i8 {
    fn from(signal: Signal) -> Self {
        signal.value()
    }
}

impl TryFrom<i8> for Signal {
    type Error = i8;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::Sell),
            0 => Ok(Self::Hold),
            1 => Ok(Self::Buy),
            other => Err(other),
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sell => write!(f, "SELL"),
            Self::Hold => write!(f, "HOLD"),
            Self::Buy => write!(f, "BUY"),
        }
    }
}

/// Which combination policy produced an aggregated row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMethod {
    WeightedAverage,
    MajorityVote,
    Consensus,
}

impl AggregationMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WeightedAverage => "weighted_average",
            Self::MajorityVote => "majority_vote",
            Self::Consensus => "consensus",
        }
    }

    /// Whether the policy reads strategy weights at all.
    pub fn uses_weights(self) -> bool {
        matches!(self, Self::WeightedAverage)
    }
}

impl Default for AggregationMethod {
    fn default() -> Self {
        Self::WeightedAverage
    }
}

impl std::fmt::Display for AggregationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AggregationMethod {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weighted_average" => Ok(Self::WeightedAverage),
            "majority_vote" => Ok(Self::MajorityVote),
            "consensus" => Ok(Self::Consensus),
            _ => Err(ConfigurationError::UnknownMethod(s.to_string())),
        }
    }
}

/// Broad family a strategy belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    TrendFollowing,
    MeanReversion,
    SupportResistance,
}

impl std::fmt::Display for SignalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TrendFollowing => write!(f, "trend_following"),
            Self::MeanReversion => write!(f, "mean_reversion"),
            Self::SupportResistance => write!(f, "support_resistance"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_try_from_rejects_out_of_range() {
        assert_eq!(Signal::try_from(1), Ok(Signal::Buy));
        assert_eq!(Signal::try_from(-1), Ok(Signal::Sell));
        assert_eq!(Signal::try_from(2), Err(2));
    }

    #[test]
    fn signal_serialises_as_integer() {
        assert_eq!(serde_json::to_string(&Signal::Sell).unwrap(), "-1");
        let s: Signal = serde_json::from_str("1").unwrap();
        assert_eq!(s, Signal::Buy);
        assert!(serde_json::from_str::<Signal>("3").is_err());
    }

    #[test]
    fn from_score_uses_strict_deadband() {
        assert_eq!(Signal::from_score(0.2, 0.2), Signal::Hold);
        assert_eq!(Signal::from_score(-0.2, 0.2), Signal::Hold);
        assert_eq!(Signal::from_score(0.21, 0.2), Signal::Buy);
        assert_eq!(Signal::from_score(-0.0001, 0.0), Signal::Sell);
        assert_eq!(Signal::from_score(0.0, 0.0), Signal::Hold);
    }

    #[test]
    fn method_parses_known_names() {
        assert_eq!("consensus".parse::<AggregationMethod>().unwrap(), AggregationMethod::Consensus);
        assert_eq!(
            " Majority_Vote ".parse::<AggregationMethod>().unwrap(),
            AggregationMethod::MajorityVote
        );
        assert!(matches!(
            "median".parse::<AggregationMethod>(),
            Err(ConfigurationError::UnknownMethod(name)) if name == "median"
        ));
    }
}
