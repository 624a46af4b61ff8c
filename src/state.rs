use crate::{assets::Assets, config::ModelConfig, model::ModelService};
use std::sync::Arc;

/// Read-only state shared by every request handler. A `None` model means
/// the artifact failed to load at startup and predictions return errors.
pub struct AppState<M: ModelService> {
    pub model: Option<Arc<M>>,
    pub assets: Arc<Assets>,
    pub model_config: ModelConfig,
}

impl<M: ModelService> Clone for AppState<M> {
    fn clone(&self) -> Self {
        Self {
            model: self.model.clone(),
            assets: self.assets.clone(),
            model_config: self.model_config.clone(),
        }
    }
}
