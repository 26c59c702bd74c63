mod configuration;
mod engine;
mod error;
mod routes;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use restyle::gemini::{GeminiConfig, GeminiRewriter};
use restyle::rewrite::Rewriter;
use restyle::settings::SettingsStore;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::configuration::Settings;
use crate::engine::Engine;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    let settings = Settings::new()?;

    let settings_path = match &settings.settings_file {
        Some(path) => PathBuf::from(path),
        None => SettingsStore::default_path()?,
    };
    let store = SettingsStore::open(&settings_path)?;
    info!(
        path = %settings_path.display(),
        enabled = store.get().enabled,
        "loaded user settings"
    );

    let rewriter: Arc<dyn Rewriter> = Arc::new(GeminiRewriter::new(
        GeminiConfig {
            host: settings.gemini.host.clone(),
            model: settings.gemini.model.clone(),
        },
        store.clone(),
    )?);

    let engine = Arc::new(Engine::new(store.clone(), rewriter.clone()));
    Engine::spawn_settings_listener(engine.clone());

    let app_state = AppState {
        engine,
        settings: store,
        rewriter,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::configure(app_state).layer(cors);

    let listener = tokio::net::TcpListener::bind(settings.server.socket_addr()).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
