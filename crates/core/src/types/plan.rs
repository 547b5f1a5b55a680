//! Subscription plan and usage limit table.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Usage limits attached to a [`Plan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    /// Total collections that may be imported + exported per calendar month.
    pub monthly: u32,
    /// Maximum batch size for a single import or export operation.
    pub per_operation: u32,
}

/// Subscription plan for a shop.
///
/// Plans gate the monthly usage counters: `free` shops get 100 collections
/// per month with a 50-per-operation batch cap, `premium` shops get 1000 of
/// each (effectively unlimited by batch).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    /// Free tier: 100 collections per month, 50 per operation.
    #[default]
    Free,
    /// Premium tier: 1000 collections per month, 1000 per operation.
    Premium,
}

impl Plan {
    /// Returns the usage limits for this plan.
    #[must_use]
    pub const fn limits(self) -> PlanLimits {
        match self {
            Self::Free => PlanLimits {
                monthly: 100,
                per_operation: 50,
            },
            Self::Premium => PlanLimits {
                monthly: 1000,
                per_operation: 1000,
            },
        }
    }

    /// Returns the plan name as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Premium => "premium",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Plan {
    type Err = UnknownPlan;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Self::Free),
            "premium" => Ok(Self::Premium),
            other => Err(UnknownPlan(other.to_owned())),
        }
    }
}

/// Error returned when a plan name is not recognized.
#[derive(thiserror::Error, Debug, Clone)]
#[error("unknown plan: {0}")]
pub struct UnknownPlan(pub String);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_free_limits() {
        let limits = Plan::Free.limits();
        assert_eq!(limits.monthly, 100);
        assert_eq!(limits.per_operation, 50);
    }

    #[test]
    fn test_premium_limits() {
        let limits = Plan::Premium.limits();
        assert_eq!(limits.monthly, 1000);
        assert_eq!(limits.per_operation, 1000);
    }

    #[test]
    fn test_default_is_free() {
        assert_eq!(Plan::default(), Plan::Free);
    }

    #[test]
    fn test_roundtrip_str() {
        assert_eq!("free".parse::<Plan>().unwrap(), Plan::Free);
        assert_eq!("premium".parse::<Plan>().unwrap(), Plan::Premium);
        assert!("gold".parse::<Plan>().is_err());
        assert_eq!(Plan::Premium.as_str(), "premium");
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Plan::Free).unwrap(), "\"free\"");
        let plan: Plan = serde_json::from_str("\"premium\"").unwrap();
        assert_eq!(plan, Plan::Premium);
    }
}
