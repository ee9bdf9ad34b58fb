use std::sync::Arc;

use storage::RatingStore;
use storage::services::{BatchProcessor, BatchProcessorConfig, RatingEngine, TierClassifier};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RatingStore>,
    pub processor: BatchProcessor,
    pub classifier: TierClassifier,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RatingStore>,
        engine: RatingEngine,
        classifier: TierClassifier,
        processor_config: BatchProcessorConfig,
    ) -> Self {
        Self {
            processor: BatchProcessor::new(store.clone(), engine, processor_config),
            store,
            classifier,
        }
    }
}
