//! Risk tiers.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One of the three risk categories, each backed by its own remote list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// All tiers in processing order.
    pub const ALL: [RiskTier; 3] = [RiskTier::Low, RiskTier::Medium, RiskTier::High];

    /// Lowercase name used in keys, logs and list descriptions.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RiskTier {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(CoreError::InvalidTier(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("HIGH".parse::<RiskTier>().unwrap(), RiskTier::High);
        assert_eq!(" Medium ".parse::<RiskTier>().unwrap(), RiskTier::Medium);
        assert_eq!("low".parse::<RiskTier>().unwrap(), RiskTier::Low);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "critical".parse::<RiskTier>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidTier(ref s) if s == "critical"));
    }

    #[test]
    fn test_tiers_are_ordered() {
        assert!(RiskTier::Low < RiskTier::Medium);
        assert!(RiskTier::Medium < RiskTier::High);
        assert_eq!(RiskTier::ALL.len(), 3);
    }

    #[test]
    fn test_serde_uses_lowercase() {
        let json = serde_json::to_string(&RiskTier::Medium).unwrap();
        assert_eq!(json, "\"medium\"");
    }
}
