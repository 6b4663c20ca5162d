//! API layer -- axum routes, handlers, and error mapping.

pub mod error;
mod routes;
pub mod state;

use self::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::trace::TraceLayer;

pub use self::routes::UPLOAD_FIELD;

/// Build the application router with all routes.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.uploads.max_bytes;
    Router::new()
        .merge(routes::lab_routes())
        .fallback(fallback)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn fallback() -> (axum::http::StatusCode, axum::Json<serde_json::Value>) {
    (
        axum::http::StatusCode::NOT_FOUND,
        axum::Json(serde_json::json!({ "error": "not found" })),
    )
}
