use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::middleware::auth::require_auth;
use crate::response::{ok, AppError};
use crate::routes::JsonBody;
use crate::services::tips::{self, NewTip, TipError};
use crate::state::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new().route("/", get(get_tip));
    let protected = Router::new()
        .route("/", post(upload_tip))
        .route_layer(middleware::from_fn_with_state(state, require_auth));
    public.merge(protected)
}

impl From<TipError> for AppError {
    fn from(err: TipError) -> Self {
        match err {
            TipError::Validation(msg) => AppError::validation(msg),
            TipError::Store(_) => AppError::internal(err.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TipQuery {
    #[serde(default)]
    phonema: String,
}

#[derive(Debug, Serialize)]
struct CreatedTip {
    id: i64,
}

async fn upload_tip(
    State(state): State<AppState>,
    ctx: RequestContext,
    JsonBody(body): JsonBody<NewTip>,
) -> Result<impl IntoResponse, AppError> {
    let id = tips::upload_tip(&ctx, state.db(), &body).await?;
    Ok((StatusCode::CREATED, ok(CreatedTip { id })))
}

async fn get_tip(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<TipQuery>,
) -> Result<impl IntoResponse, AppError> {
    let tip = tips::get_tip(&ctx, state.db(), &query.phonema)
        .await?
        .ok_or_else(|| AppError::not_found(format!("no tip for phonema '{}'", query.phonema.trim())))?;
    Ok(ok(tip))
}
