use crate::{
    assets::Assets,
    config::Config,
    model::{ModelService, OrtModel},
    routes::api_routes,
    state::AppState,
};
use axum::Router;
use std::{error::Error, sync::Arc};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new<M: ModelService>(
        state: AppState<M>,
        addr: &str,
    ) -> anyhow::Result<Self> {
        let router = Router::new()
            .merge(api_routes::<M>())
            .with_state(state)
            .layer(CorsLayer::permissive());

        let listener = TcpListener::bind(addr).await?;

        Ok(Self { router, listener })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        tracing::info!("Starting app on {}", self.listener.local_addr()?);

        let shutdown = async {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, starting graceful shutdown");
        };

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}

pub async fn start_app(config: Config) -> Result<(), Box<dyn Error>> {
    let assets = Arc::new(Assets::load(&config.assets));

    let model_path = config.assets.get_model_path();
    let model = match OrtModel::load(&model_path, &config.model) {
        Ok(model) => Some(Arc::new(model)),
        Err(e) => {
            tracing::error!(
                "Failed to load model from {:?}: {}. Predictions will be unavailable.",
                model_path,
                e
            );
            None
        }
    };

    let state = AppState {
        model,
        assets,
        model_config: config.model.clone(),
    };

    let server = HttpServer::new(state, &config.server.get_address()).await?;
    server.run().await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
