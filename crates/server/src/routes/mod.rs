pub mod boards;
pub mod cards;
pub mod error;
pub mod lists;
pub mod users;
pub mod workspaces;

use axum::{Json, Router, middleware, routing::get};
use serde_json::json;

use crate::{AppState, auth, realtime::socket};

/// The full HTTP surface. REST endpoints live under `/api` behind bearer
/// authentication; `/health` and the websocket upgrade handle their own.
pub fn router(state: &AppState) -> Router<AppState> {
    let api = Router::new()
        .merge(users::router())
        .merge(workspaces::router())
        .merge(boards::router())
        .merge(lists::router())
        .merge(cards::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/ws", get(socket::connect))
        .nest("/api", api)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
