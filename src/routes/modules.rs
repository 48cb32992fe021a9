use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Router};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::context::RequestContext;
use crate::middleware::auth::{optional_auth, require_auth};
use crate::models::Module;
use crate::response::{ok, AppError};
use crate::routes::{parse_id, parse_kind, JsonBody};
use crate::services::exercises::{self, ExerciseError};
use crate::services::modules::{self, ModuleError};
use crate::state::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new().route("/:kind", get(list_modules));

    let optional = Router::new()
        .route("/:kind/:id/exercises", get(module_exercises))
        .route_layer(middleware::from_fn_with_state(state.clone(), optional_auth));

    let protected = Router::new()
        .route("/:kind", post(create_module))
        .route("/:kind/next", get(next_module))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    public.merge(optional).merge(protected)
}

impl From<ModuleError> for AppError {
    fn from(err: ModuleError) -> Self {
        match err {
            ModuleError::Validation(msg) => AppError::validation(msg),
            ModuleError::Store(_) => AppError::internal(err.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateModuleRequest {
    title: String,
}

#[derive(Debug, Serialize)]
struct CreatedModule {
    id: i64,
}

#[derive(Debug, Serialize)]
struct NextModuleResponse {
    module: Option<Module>,
}

async fn create_module(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(kind): Path<String>,
    JsonBody(body): JsonBody<CreateModuleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let kind = parse_kind(&kind)?;
    let id = modules::create_module(&ctx, state.db(), kind, &body.title).await?;
    Ok((StatusCode::CREATED, ok(CreatedModule { id })))
}

async fn list_modules(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(kind): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let kind = parse_kind(&kind)?;
    let modules = modules::list_modules(&ctx, state.db(), kind).await?;
    Ok(ok(modules))
}

/// `module` is `null` once the user has completed every non-empty module.
async fn next_module(
    State(state): State<AppState>,
    ctx: RequestContext,
    Extension(user): Extension<AuthUser>,
    Path(kind): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let kind = parse_kind(&kind)?;
    let module = modules::next_incomplete_module(&ctx, state.db(), &user.id, kind).await?;
    Ok(ok(NextModuleResponse { module }))
}

async fn module_exercises(
    State(state): State<AppState>,
    ctx: RequestContext,
    user: Option<Extension<AuthUser>>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let kind = parse_kind(&kind)?;
    let module_id = parse_id("module id", &id)?;
    let user_id = user.as_ref().map(|Extension(user)| user.id.as_str());

    let list = exercises::module_exercises(&ctx, state.db(), user_id, kind, module_id)
        .await
        .map_err(AppError::from)?;
    Ok(ok(list))
}

impl From<ExerciseError> for AppError {
    fn from(err: ExerciseError) -> Self {
        match err {
            ExerciseError::Validation(msg) => AppError::validation(msg),
            ExerciseError::ModuleNotFound { .. } => AppError::not_found(err.to_string()),
            ExerciseError::Store(_) => AppError::internal(err.to_string()),
        }
    }
}
