mod audio;
mod auth;
mod exercises;
mod health;
mod media;
mod modules;
mod progress;
mod tips;
mod words;

use axum::async_trait;
use axum::body::Body;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::de::DeserializeOwned;

use crate::models::ExerciseKind;
use crate::response::{json_error, AppError};
use crate::state::AppState;

const JSON_BODY_LIMIT: usize = 1024 * 1024;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .route("/api/ping", get(health::ping))
        .nest("/api/auth", auth::router(state.clone()))
        .nest("/api/modules", modules::router(state.clone()))
        .nest("/api/exercises", exercises::router(state.clone()))
        .nest("/api/progress", progress::router(state.clone()))
        .nest("/api/tips", tips::router(state.clone()))
        .nest("/api/words", words::router(state.clone()))
        .nest("/api/topics", words::topics_router(state.clone()))
        .nest("/api/audio", audio::router(&state))
        .nest("/api/media", media::router(state.clone()))
        .nest("/media", media::public_router())
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "route not found").into_response()
}

/// JSON request body whose decoding failures are reported as `VALIDATION_ERROR`.
pub(crate) struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request<Body>, _state: &S) -> Result<Self, Self::Rejection> {
        let bytes = axum::body::to_bytes(req.into_body(), JSON_BODY_LIMIT)
            .await
            .map_err(|_| AppError::payload_too_large("request body too large"))?;
        serde_json::from_slice(&bytes)
            .map(JsonBody)
            .map_err(|err| AppError::validation(format!("invalid request body: {err}")))
    }
}

pub(crate) fn parse_kind(raw: &str) -> Result<ExerciseKind, AppError> {
    ExerciseKind::parse(raw)
        .ok_or_else(|| AppError::validation(format!("kind must be word or phrase (got '{raw}')")))
}

pub(crate) fn parse_id(name: &str, raw: &str) -> Result<i64, AppError> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::validation(format!("{name} must be a positive integer")))
}
