//! Per-participant rating computation.
//!
//! A participant's rank is turned into a percentile, the percentile into a
//! performance rating via an Elo-style logistic model against a field centered
//! on the participant's prior rating, and the performance rating into a new
//! rating by moving a K-dependent fraction of the gap.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::tier::ConfigError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComputationError {
    #[error("invalid rating input: {0}")]
    InvalidInput(String),

    #[error("performance rating search did not converge after {iterations} iterations (residual {residual})")]
    DidNotConverge { iterations: u32, residual: f64 },
}

/// Divisor applied to the performance gap, growing with experience
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KFactorSchedule {
    pub novice_contests: i32,
    pub novice_k: i32,
    pub intermediate_contests: i32,
    pub intermediate_k: i32,
    pub veteran_k: i32,
}

impl Default for KFactorSchedule {
    fn default() -> Self {
        Self {
            novice_contests: 10,
            novice_k: 4,
            intermediate_contests: 30,
            intermediate_k: 6,
            veteran_k: 8,
        }
    }
}

impl KFactorSchedule {
    /// `contests_played` is the count before the contest being rated
    pub fn k_for(&self, contests_played: i32) -> i32 {
        if contests_played < self.novice_contests {
            self.novice_k
        } else if contests_played < self.intermediate_contests {
            self.intermediate_k
        } else {
            self.veteran_k
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingEngineConfig {
    pub tolerance: f64,
    pub max_iterations: u32,
    pub search_floor: f64,
    pub search_ceiling: f64,
    pub k_factors: KFactorSchedule,
}

impl Default for RatingEngineConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-4,
            max_iterations: 100,
            search_floor: 0.0,
            search_ceiling: 4000.0,
            k_factors: KFactorSchedule::default(),
        }
    }
}

impl RatingEngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(ConfigError::InvalidEngine(
                "tolerance must be a positive finite number".to_string(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidEngine(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if !(self.search_floor.is_finite()
            && self.search_ceiling.is_finite()
            && self.search_floor < self.search_ceiling)
        {
            return Err(ConfigError::InvalidEngine(
                "search domain must be a finite, non-empty interval".to_string(),
            ));
        }
        let k = &self.k_factors;
        if k.novice_k <= 0 || k.intermediate_k <= 0 || k.veteran_k <= 0 {
            return Err(ConfigError::InvalidEngine(
                "K factors must be positive".to_string(),
            ));
        }
        if k.novice_contests > k.intermediate_contests {
            return Err(ConfigError::InvalidEngine(
                "K factor bands must be ordered".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingInput {
    pub rank: i32,
    pub total_participants: i32,
    pub old_rating: i32,
    pub contests_played: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingOutcome {
    pub old_rating: i32,
    pub percentile: f64,
    pub performance_rating: i32,
    pub new_rating: i32,
}

impl RatingOutcome {
    pub fn rating_change(&self) -> i32 {
        self.new_rating - self.old_rating
    }
}

/// Fraction of the field outperformed, kept strictly inside (0, 1).
///
/// Bounded to `[1/(2n), 1 - 1/(2n)]` so the logistic inverse always exists.
pub fn percentile(rank: i32, total_participants: i32) -> f64 {
    let n = f64::from(total_participants);
    let raw = 1.0 - f64::from(rank - 1) / n;
    let margin = 1.0 / (2.0 * n);
    raw.clamp(margin, 1.0 - margin)
}

/// Logistic win probability for a rating difference
pub fn expected_score(diff: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf(-diff / 400.0))
}

#[derive(Debug, Clone, Copy)]
pub struct RatingEngine {
    config: RatingEngineConfig,
}

impl Default for RatingEngine {
    fn default() -> Self {
        Self {
            config: RatingEngineConfig::default(),
        }
    }
}

impl RatingEngine {
    pub fn new(config: RatingEngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn compute(&self, input: &RatingInput) -> Result<RatingOutcome, ComputationError> {
        if input.total_participants < 1 {
            return Err(ComputationError::InvalidInput(format!(
                "total_participants must be positive, got {}",
                input.total_participants
            )));
        }
        if input.rank < 1 || input.rank > input.total_participants {
            return Err(ComputationError::InvalidInput(format!(
                "rank {} outside 1..={}",
                input.rank, input.total_participants
            )));
        }
        if input.contests_played < 0 {
            return Err(ComputationError::InvalidInput(format!(
                "contests_played must not be negative, got {}",
                input.contests_played
            )));
        }

        let percentile = percentile(input.rank, input.total_participants);
        let old = f64::from(input.old_rating);
        let performance = self.solve_performance(old, percentile)?;

        let k = f64::from(self.config.k_factors.k_for(input.contests_played));
        let delta = ((performance - old) / k).round() as i32;
        let new_rating = input.old_rating.saturating_add(delta).max(0);

        Ok(RatingOutcome {
            old_rating: input.old_rating,
            percentile,
            performance_rating: performance.round() as i32,
            new_rating,
        })
    }

    /// Bisection for `x` with `expected_score(x - old_rating) == target`.
    ///
    /// When the root lies outside the search domain the bracket collapses onto
    /// the nearest bound, which counts as converged.
    pub fn solve_performance(&self, old_rating: f64, target: f64) -> Result<f64, ComputationError> {
        if !old_rating.is_finite() || !(target > 0.0 && target < 1.0) {
            return Err(ComputationError::InvalidInput(format!(
                "cannot solve for old_rating={old_rating}, percentile={target}"
            )));
        }

        let tolerance = self.config.tolerance;
        let mut lo = self.config.search_floor;
        let mut hi = self.config.search_ceiling;
        let mut residual = f64::NAN;

        for _ in 0..self.config.max_iterations {
            let mid = lo + (hi - lo) / 2.0;
            residual = expected_score(mid - old_rating) - target;

            if residual.abs() <= tolerance || (hi - lo) / 2.0 <= tolerance {
                return Ok(mid);
            }

            if residual < 0.0 {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        Err(ComputationError::DidNotConverge {
            iterations: self.config.max_iterations,
            residual,
        })
    }
}
