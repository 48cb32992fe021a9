use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::{AuthError, AuthUser, JwtKeys};
use crate::context::RequestContext;
use crate::db::operations::users::{
    find_user_by_email, find_user_by_id, insert_user, update_password_hash, User,
};
use crate::db::{is_unique_violation, Database};

const MIN_PASSWORD_LEN: usize = 6;
const MAX_PASSWORD_LEN: usize = 72;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: User,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .map(|(local, domain)| {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        })
        .unwrap_or(false);
    if valid {
        Ok(email)
    } else {
        Err(AuthError::Validation("invalid email address".to_string()))
    }
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    // bcrypt only looks at the first 72 bytes
    if password.len() > MAX_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "password must be at most {MAX_PASSWORD_LEN} bytes"
        )));
    }
    Ok(())
}

async fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    let password = password.to_string();
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hash)
}

async fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let password = password.to_string();
    let hash = hash.to_string();
    let ok = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await?;
    Ok(ok)
}

fn store_error<'a>(ctx: &'a RequestContext, op: &'static str) -> impl FnOnce(sqlx::Error) -> AuthError + 'a {
    move |err| {
        tracing::error!(request_id = ctx.request_id(), op, error = %err, "user store failure");
        AuthError::Store(err)
    }
}

pub async fn sign_up(
    ctx: &RequestContext,
    db: &Database,
    keys: &JwtKeys,
    bcrypt_cost: u32,
    email: &str,
    name: &str,
    password: &str,
) -> Result<Session, AuthError> {
    let email = normalize_email(email)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::Validation("name must not be empty".to_string()));
    }
    validate_password(password)?;

    let password_hash = hash_password(password, bcrypt_cost).await?;
    let id = Uuid::new_v4().to_string();

    let user = match insert_user(db.pool(), &id, &email, name, &password_hash).await {
        Ok(user) => user,
        Err(err) if is_unique_violation(&err) => return Err(AuthError::EmailTaken),
        Err(err) => return Err(store_error(ctx, "insert_user")(err)),
    };

    let (token, expires_at) = keys.sign(&user.id, user.level_update)?;
    tracing::info!(request_id = ctx.request_id(), user_id = %user.id, "user signed up");
    Ok(Session {
        user,
        token,
        expires_at,
    })
}

pub async fn login(
    ctx: &RequestContext,
    db: &Database,
    keys: &JwtKeys,
    email: &str,
    password: &str,
) -> Result<Session, AuthError> {
    let Ok(email) = normalize_email(email) else {
        return Err(AuthError::InvalidCredentials);
    };

    let user = find_user_by_email(db.pool(), &email)
        .await
        .map_err(store_error(ctx, "find_user_by_email"))?
        .ok_or(AuthError::InvalidCredentials)?;

    if !verify_password(password, &user.password_hash).await? {
        tracing::info!(request_id = ctx.request_id(), user_id = %user.id, "login rejected");
        return Err(AuthError::InvalidCredentials);
    }

    let (token, expires_at) = keys.sign(&user.id, user.level_update)?;
    tracing::info!(request_id = ctx.request_id(), user_id = %user.id, "user logged in");
    Ok(Session {
        user,
        token,
        expires_at,
    })
}

/// Verifies the token and checks that it was issued after the user's last password change.
pub async fn check_auth(
    ctx: &RequestContext,
    db: &Database,
    keys: &JwtKeys,
    token: &str,
) -> Result<AuthUser, AuthError> {
    let claims = keys.verify(token)?;
    let user = find_user_by_id(db.pool(), &claims.id)
        .await
        .map_err(store_error(ctx, "find_user_by_id"))?
        .ok_or(AuthError::InvalidToken)?;

    if user.level_update != claims.level {
        tracing::debug!(request_id = ctx.request_id(), user_id = %user.id, "stale token level");
        return Err(AuthError::TokenRevoked);
    }

    Ok(AuthUser {
        id: user.id,
        level: user.level_update,
    })
}

pub async fn update_password(
    ctx: &RequestContext,
    db: &Database,
    keys: &JwtKeys,
    bcrypt_cost: u32,
    user_id: &str,
    old_password: &str,
    new_password: &str,
) -> Result<Session, AuthError> {
    validate_password(new_password)?;
    if old_password == new_password {
        return Err(AuthError::SamePassword);
    }

    let user = find_user_by_id(db.pool(), user_id)
        .await
        .map_err(store_error(ctx, "find_user_by_id"))?
        .ok_or(AuthError::UserNotFound)?;
    if !verify_password(old_password, &user.password_hash).await? {
        return Err(AuthError::InvalidCredentials);
    }

    let new_hash = hash_password(new_password, bcrypt_cost).await?;
    let level = update_password_hash(db.pool(), user_id, &new_hash)
        .await
        .map_err(store_error(ctx, "update_password_hash"))?
        .ok_or(AuthError::UserNotFound)?;

    let (token, expires_at) = keys.sign(user_id, level)?;
    tracing::info!(request_id = ctx.request_id(), user_id, level, "password updated");

    Ok(Session {
        user: User {
            password_hash: new_hash,
            level_update: level,
            ..user
        },
        token,
        expires_at,
    })
}

pub async fn current_user(
    ctx: &RequestContext,
    db: &Database,
    user_id: &str,
) -> Result<User, AuthError> {
    find_user_by_id(db.pool(), user_id)
        .await
        .map_err(store_error(ctx, "find_user_by_id"))?
        .ok_or(AuthError::UserNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Ana@Example.COM ").unwrap(), "ana@example.com");
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("a@localhost").is_err());
        assert!(normalize_email("a b@example.com").is_err());
    }

    #[test]
    fn password_length_bounds() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
        assert!(validate_password(&"x".repeat(73)).is_err());
    }

    #[tokio::test]
    async fn hash_then_verify() {
        let hash = hash_password("secret-pass", 4).await.unwrap();
        assert!(verify_password("secret-pass", &hash).await.unwrap());
        assert!(!verify_password("wrong-pass", &hash).await.unwrap());
    }
}
