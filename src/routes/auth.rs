use axum::extract::State;
use axum::http::{header, HeaderValue};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Extension, Router};
use serde::Deserialize;

use crate::auth::{expired_session_cookie, session_cookie, AuthError, AuthUser};
use crate::context::RequestContext;
use crate::middleware::auth::require_auth;
use crate::response::{ok, AppError};
use crate::routes::JsonBody;
use crate::services::users::{self, Session};
use crate::state::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout));

    let protected = Router::new()
        .route("/me", get(me))
        .route("/password", put(update_password))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    public.merge(protected)
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(msg) => AppError::validation(msg),
            AuthError::SamePassword => AppError::validation(err.to_string()),
            AuthError::MissingToken => AppError::unauthorized("authentication required"),
            AuthError::InvalidToken | AuthError::TokenExpired | AuthError::TokenRevoked => {
                AppError::unauthorized("invalid or expired token")
            }
            AuthError::InvalidCredentials => AppError::unauthorized(err.to_string()),
            AuthError::EmailTaken => AppError::conflict(err.to_string()),
            AuthError::UserNotFound => AppError::not_found(err.to_string()),
            AuthError::MissingSecret | AuthError::InvalidExpiresIn => {
                tracing::error!(error = %err, "authentication misconfigured");
                AppError::service_unavailable("authentication is not configured")
            }
            AuthError::Hash(_) | AuthError::Join(_) | AuthError::Store(_) => {
                tracing::error!(error = %err, "authentication failure");
                AppError::internal(err.to_string())
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct SignUpRequest {
    email: String,
    name: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePasswordRequest {
    old_password: String,
    new_password: String,
}

fn with_session_cookie(state: &AppState, session: Session) -> Response {
    let max_age = state
        .jwt()
        .map(|keys| keys.ttl())
        .unwrap_or_else(|_| chrono::Duration::zero());
    let cookie = session_cookie(&session.token, max_age);
    let mut response = ok(session).into_response();
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

async fn signup(
    State(state): State<AppState>,
    ctx: RequestContext,
    JsonBody(body): JsonBody<SignUpRequest>,
) -> Result<Response, AppError> {
    let keys = state.jwt()?;
    let session = users::sign_up(
        &ctx,
        state.db(),
        keys,
        state.config().auth.bcrypt_cost,
        &body.email,
        &body.name,
        &body.password,
    )
    .await?;
    Ok(with_session_cookie(&state, session))
}

async fn login(
    State(state): State<AppState>,
    ctx: RequestContext,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<Response, AppError> {
    let keys = state.jwt()?;
    let session = users::login(&ctx, state.db(), keys, &body.email, &body.password).await?;
    Ok(with_session_cookie(&state, session))
}

async fn logout() -> Response {
    let mut response = ok(serde_json::json!({ "loggedOut": true })).into_response();
    if let Ok(value) = HeaderValue::from_str(&expired_session_cookie()) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

async fn me(
    State(state): State<AppState>,
    ctx: RequestContext,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let user = users::current_user(&ctx, state.db(), &user.id).await?;
    Ok(ok(user))
}

async fn update_password(
    State(state): State<AppState>,
    ctx: RequestContext,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<UpdatePasswordRequest>,
) -> Result<Response, AppError> {
    let keys = state.jwt()?;
    let session = users::update_password(
        &ctx,
        state.db(),
        keys,
        state.config().auth.bcrypt_cost,
        &user.id,
        &body.old_password,
        &body.new_password,
    )
    .await?;
    Ok(with_session_cookie(&state, session))
}
