use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use serde::Serialize;

use crate::context::RequestContext;
use crate::middleware::auth::require_auth;
use crate::response::{ok, AppError};
use crate::routes::JsonBody;
use crate::services::exercises::{self, NewPhraseExercise, NewWordExercise};
use crate::state::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/word", post(create_word_exercise))
        .route("/phrase", post(create_phrase_exercise))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

#[derive(Debug, Serialize)]
struct CreatedExercise {
    id: i64,
}

async fn create_word_exercise(
    State(state): State<AppState>,
    ctx: RequestContext,
    JsonBody(body): JsonBody<NewWordExercise>,
) -> Result<impl IntoResponse, AppError> {
    let id = exercises::create_word_exercise(&ctx, state.db(), &body).await?;
    Ok((StatusCode::CREATED, ok(CreatedExercise { id })))
}

async fn create_phrase_exercise(
    State(state): State<AppState>,
    ctx: RequestContext,
    JsonBody(body): JsonBody<NewPhraseExercise>,
) -> Result<impl IntoResponse, AppError> {
    let id = exercises::create_phrase_exercise(&ctx, state.db(), &body).await?;
    Ok((StatusCode::CREATED, ok(CreatedExercise { id })))
}
