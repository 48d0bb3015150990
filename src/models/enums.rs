use serde::{Deserialize, Serialize};

/// Coarse grade of a prediction's confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReliabilityTier {
    VeryHigh,
    High,
    Moderate,
    Low,
}

/// Percent thresholds (inclusive lower bounds) for each reliability tier.
pub mod reliability_thresholds {
    pub const VERY_HIGH: u8 = 90;
    pub const HIGH: u8 = 75;
    pub const MODERATE: u8 = 60;
}

impl ReliabilityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VeryHigh => "very_high",
            Self::High => "high",
            Self::Moderate => "moderate",
            Self::Low => "low",
        }
    }

    /// Grade a rounded confidence percentage.
    pub fn from_percent(percent: u8) -> Self {
        use self::reliability_thresholds::{HIGH, MODERATE, VERY_HIGH};
        if percent >= VERY_HIGH {
            Self::VeryHigh
        } else if percent >= HIGH {
            Self::High
        } else if percent >= MODERATE {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    /// Human-readable name used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::VeryHigh => "Very High",
            Self::High => "High",
            Self::Moderate => "Moderate",
            Self::Low => "Low",
        }
    }

    /// Low-tier results should prompt the user to retake the image.
    pub fn suggests_retake(&self) -> bool {
        matches!(self, Self::Low)
    }
}

impl std::fmt::Display for ReliabilityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_str_matches_serde_name() {
        for tier in [
            ReliabilityTier::VeryHigh,
            ReliabilityTier::High,
            ReliabilityTier::Moderate,
            ReliabilityTier::Low,
        ] {
            let json = serde_json::to_string(&tier).unwrap();
            assert_eq!(json, format!("\"{}\"", tier.as_str()));
        }
    }

    #[test]
    fn tier_boundaries() {
        assert_eq!(ReliabilityTier::from_percent(100), ReliabilityTier::VeryHigh);
        assert_eq!(ReliabilityTier::from_percent(90), ReliabilityTier::VeryHigh);
        assert_eq!(ReliabilityTier::from_percent(89), ReliabilityTier::High);
        assert_eq!(ReliabilityTier::from_percent(75), ReliabilityTier::High);
        assert_eq!(ReliabilityTier::from_percent(74), ReliabilityTier::Moderate);
        assert_eq!(ReliabilityTier::from_percent(60), ReliabilityTier::Moderate);
        assert_eq!(ReliabilityTier::from_percent(59), ReliabilityTier::Low);
        assert_eq!(ReliabilityTier::from_percent(0), ReliabilityTier::Low);
    }

    #[test]
    fn only_low_suggests_retake() {
        assert!(ReliabilityTier::Low.suggests_retake());
        assert!(!ReliabilityTier::Moderate.suggests_retake());
        assert!(!ReliabilityTier::VeryHigh.suggests_retake());
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&ReliabilityTier::VeryHigh).unwrap();
        assert_eq!(json, "\"very_high\"");
    }
}
