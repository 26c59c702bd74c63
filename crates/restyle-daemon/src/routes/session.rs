//! Page session routes: attach a document snapshot, feed it mutations,
//! read the current HTML back, and toggle swapped containers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/sessions", post(create_session).get(list_sessions))
        .route("/sessions/:id/fragments", post(append_fragment))
        .route("/sessions/:id/html", get(session_html))
        .route("/sessions/:id/toggle", post(toggle_container))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CreateSession {
    html: String,
}

#[derive(Debug, Serialize)]
struct SessionCreated {
    id: u64,
}

async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSession>,
) -> Json<SessionCreated> {
    let session = state.engine.create_session(&request.html);
    Json(SessionCreated { id: session.id })
}

#[derive(Debug, Serialize)]
struct SessionList {
    sessions: Vec<u64>,
}

async fn list_sessions(State(state): State<AppState>) -> Json<SessionList> {
    Json(SessionList {
        sessions: state.engine.session_ids(),
    })
}

#[derive(Debug, Deserialize)]
struct AppendFragment {
    html: String,
    /// Arena index of the insertion parent; defaults to the page body.
    #[serde(default)]
    parent: Option<usize>,
}

#[derive(Debug, Serialize)]
struct FragmentAdded {
    nodes: Vec<usize>,
}

async fn append_fragment(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<AppendFragment>,
) -> Result<Json<FragmentAdded>, StatusCode> {
    let session = state.engine.session(id).ok_or(StatusCode::NOT_FOUND)?;
    let added = session
        .append_fragment(request.parent, &request.html)
        .ok_or(StatusCode::UNPROCESSABLE_ENTITY)?;
    info!(session = id, nodes = added.len(), "fragment appended");
    Ok(Json(FragmentAdded {
        nodes: added.iter().map(|node| node.index()).collect(),
    }))
}

#[derive(Debug, Serialize)]
struct SessionHtml {
    html: String,
}

async fn session_html(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<SessionHtml>, StatusCode> {
    let session = state.engine.session(id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(SessionHtml {
        html: session.html(),
    }))
}

#[derive(Debug, Deserialize)]
struct ToggleBody {
    node: usize,
}

#[derive(Debug, Serialize)]
struct ToggleResult {
    showing_original: bool,
}

async fn toggle_container(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<ToggleBody>,
) -> Result<Json<ToggleResult>, StatusCode> {
    let session = state.engine.session(id).ok_or(StatusCode::NOT_FOUND)?;
    let showing_original = session
        .toggle(request.node)
        .ok_or(StatusCode::UNPROCESSABLE_ENTITY)?;
    Ok(Json(ToggleResult { showing_original }))
}
