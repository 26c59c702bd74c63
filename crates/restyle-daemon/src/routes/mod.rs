// Export route modules
pub mod message;
pub mod session;

use axum::Router;

use crate::state::AppState;

// Function to configure all routes
pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(message::routes(state.clone()))
        .merge(session::routes(state))
}
