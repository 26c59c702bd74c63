use std::sync::Arc;

use restyle::rewrite::Rewriter;
use restyle::settings::SettingsStore;

use crate::engine::Engine;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub settings: SettingsStore,
    pub rewriter: Arc<dyn Rewriter>,
}
