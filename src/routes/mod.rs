mod pages;
mod predict;

use crate::{model::ModelService, state::AppState};
use axum::routing::{get, Router};

pub fn api_routes<M: ModelService>() -> Router<AppState<M>> {
    Router::new()
        .route("/", get(pages::home))
        .route(
            "/predict",
            get(pages::upload).post(predict::predict_image::<M>),
        )
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::{
        assets::{Assets, Guidance},
        config::ModelConfig,
        error::ModelError,
        model::ModelService,
    };
    use ndarray::{Array, Ix4};
    use std::{collections::HashMap, sync::Arc};
    use tower_http::cors::CorsLayer;

    #[derive(Clone)]
    pub struct MockModelService {
        pub logits: Vec<f32>,
    }

    impl ModelService for MockModelService {
        fn infer(&self, _input: &Array<f32, Ix4>) -> Result<Vec<f32>, ModelError> {
            Ok(self.logits.clone())
        }
    }

    pub fn test_router(model: Option<MockModelService>) -> axum::Router {
        let mut guidelines = HashMap::new();
        guidelines.insert(
            "plastic".to_string(),
            Guidance {
                category: "Recyclable".to_string(),
                instructions: "Rinse and squash.".to_string(),
                bin_color: "yellow".to_string(),
            },
        );

        let state = AppState {
            model: model.map(Arc::new),
            assets: Arc::new(Assets::from_parts(
                vec!["cardboard".into(), "glass".into(), "plastic".into()],
                guidelines,
            )),
            model_config: ModelConfig {
                input_width: 256,
                input_height: 256,
                pixel_divisor: 255.0,
                num_instances: 1,
            },
        };

        Router::new()
            .merge(api_routes::<MockModelService>())
            .with_state(state)
            .layer(CorsLayer::permissive())
    }
}
