use crate::services::prediction_cache::PredictionCache;
use crate::services::prediction_service::PredictionService;

#[derive(Clone)]
pub struct AppState {
    pub predictions: PredictionService,
}

impl AppState {
    pub fn new(predictions: PredictionService) -> Self {
        Self { predictions }
    }

    pub fn cache(&self) -> &PredictionCache {
        self.predictions.cache()
    }
}
