pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Full HTTP application: routes plus the shared layer stack. `request_context` is the
/// outermost layer so the trace span and every handler see the same request id.
pub fn build_app(state: AppState) -> Router {
    let timeout = state.config().request_timeout;
    routes::router(state)
        .layer(TimeoutLayer::new(timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(middleware::request_context))
}
