pub mod finalization;
pub mod lifecycle;
pub mod rating_engine;
pub mod tier;

pub use finalization::{BatchProcessor, BatchProcessorConfig, FinalizeError, FinalizeOutcome};
pub use rating_engine::{RatingEngine, RatingEngineConfig};
pub use tier::{Tier, TierClassifier, TierThresholds};
