use axum::extract::{Path, State};
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Router};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::context::RequestContext;
use crate::middleware::auth::require_auth;
use crate::models::ProgressStatus;
use crate::response::{ok, AppError};
use crate::routes::{parse_id, parse_kind, JsonBody};
use crate::services::progress::{self, ProgressError};
use crate::state::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(save_progress))
        .route("/:kind/:exercise_id", get(get_progress))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

impl From<ProgressError> for AppError {
    fn from(err: ProgressError) -> Self {
        match err {
            ProgressError::Validation(msg) => AppError::validation(msg),
            ProgressError::ExerciseNotFound { .. } => AppError::not_found(err.to_string()),
            ProgressError::Store(_) => AppError::internal(err.to_string()),
        }
    }
}

/// The user comes from the token; exercise type and status stay raw strings so the
/// progress service owns their validation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveProgressRequest {
    exercise_id: i64,
    exercise_type: String,
    status: String,
}

#[derive(Debug, Serialize)]
struct SavedProgress {
    id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProgressView {
    exercise_id: i64,
    status: ProgressStatus,
}

async fn save_progress(
    State(state): State<AppState>,
    ctx: RequestContext,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<SaveProgressRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = progress::create_or_update_progress(
        &ctx,
        state.db(),
        &user.id,
        body.exercise_id,
        &body.exercise_type,
        &body.status,
    )
    .await?;
    Ok(ok(SavedProgress { id }))
}

async fn get_progress(
    State(state): State<AppState>,
    ctx: RequestContext,
    Extension(user): Extension<AuthUser>,
    Path((kind, exercise_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let kind = parse_kind(&kind)?;
    let exercise_id = parse_id("exercise id", &exercise_id)?;
    let status = progress::progress_status(&ctx, state.db(), &user.id, exercise_id, kind).await?;
    Ok(ok(ProgressView { exercise_id, status }))
}
