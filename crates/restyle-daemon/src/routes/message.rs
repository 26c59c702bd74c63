//! The envelope dispatch endpoint. Every peer (page bridges, the
//! settings CLI) talks through one `POST /message` with an `action`
//! discriminator.

use axum::{extract::State, routing::post, Json, Router};
use restyle::message::{Ack, ModifyResponse, PingResponse, Request};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/message", post(handle_message))
        .with_state(state)
}

async fn handle_message(
    State(state): State<AppState>,
    Json(request): Json<Request>,
) -> Json<Value> {
    match request {
        Request::ModifyWithGemini { text } => match state.rewriter.rewrite(&text).await {
            Ok(modified_text) => Json(json_value(ModifyResponse::ok(modified_text))),
            Err(error) => {
                error!(%error, "Gemini rewrite failed");
                Json(json_value(ModifyResponse::err(error.to_string())))
            }
        },
        Request::Ping => Json(json_value(PingResponse::alive())),
        Request::UpdateSettings => match state.settings.reload() {
            Ok(_) => {
                info!("settings updated");
                Json(json_value(Ack { success: true }))
            }
            Err(error) => {
                error!(%error, "failed to reload settings");
                Json(json_value(Ack { success: false }))
            }
        },
        Request::ToggleExtension { enabled } => match state.settings.set_enabled(enabled) {
            Ok(_) => {
                state.engine.apply_enabled(enabled);
                info!(enabled, "extension toggled");
                Json(json_value(Ack { success: true }))
            }
            Err(error) => {
                error!(%error, "failed to persist enabled flag");
                Json(json_value(Ack { success: false }))
            }
        },
        Request::InjectContentScript => {
            state.engine.ensure_started();
            Json(json_value(Ack { success: true }))
        }
    }
}

fn json_value<T: serde::Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|_| json!({"success": false}))
}
