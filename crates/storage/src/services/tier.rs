use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Coarse rank bucket derived from a user's current rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bronze => "Bronze",
            Self::Silver => "Silver",
            Self::Gold => "Gold",
            Self::Platinum => "Platinum",
            Self::Diamond => "Diamond",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("tier thresholds must be strictly increasing (silver < gold < platinum < diamond)")]
    UnorderedThresholds,

    #[error("invalid rating engine configuration: {0}")]
    InvalidEngine(String),
}

/// Minimum rating for each tier above Bronze
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub silver: i32,
    pub gold: i32,
    pub platinum: i32,
    pub diamond: i32,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            silver: 1200,
            gold: 1600,
            platinum: 2000,
            diamond: 2400,
        }
    }
}

impl TierThresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.silver < self.gold && self.gold < self.platinum && self.platinum < self.diamond {
            Ok(())
        } else {
            Err(ConfigError::UnorderedThresholds)
        }
    }
}

/// Maps ratings to tiers. Thresholds are checked once at construction so
/// `classify` stays total and monotonic.
#[derive(Debug, Clone, Copy)]
pub struct TierClassifier {
    thresholds: TierThresholds,
}

impl Default for TierClassifier {
    fn default() -> Self {
        Self {
            thresholds: TierThresholds::default(),
        }
    }
}

impl TierClassifier {
    pub fn new(thresholds: TierThresholds) -> Result<Self, ConfigError> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    pub fn classify(&self, rating: i32) -> Tier {
        let t = &self.thresholds;
        if rating >= t.diamond {
            Tier::Diamond
        } else if rating >= t.platinum {
            Tier::Platinum
        } else if rating >= t.gold {
            Tier::Gold
        } else if rating >= t.silver {
            Tier::Silver
        } else {
            Tier::Bronze
        }
    }
}
