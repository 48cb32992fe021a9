use serde::Serialize;
use sqlx::SqliteExecutor;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub level_update: i64,
    pub created_at: String,
}

const USER_COLUMNS: &str = "id, email, name, password_hash, level_update, created_at";

pub async fn insert_user<'e>(
    executor: impl SqliteExecutor<'e>,
    id: &str,
    email: &str,
    name: &str,
    password_hash: &str,
) -> Result<User, sqlx::Error> {
    let sql = format!(
        "INSERT INTO users (id, email, name, password_hash, level_update, created_at) \
         VALUES (?, ?, ?, ?, 0, ?) RETURNING {USER_COLUMNS}"
    );
    sqlx::query_as(&sql)
        .bind(id)
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .bind(super::now_iso())
        .fetch_one(executor)
        .await
}

pub async fn find_user_by_email<'e>(
    executor: impl SqliteExecutor<'e>,
    email: &str,
) -> Result<Option<User>, sqlx::Error> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ? AND is_deleted = 0");
    sqlx::query_as(&sql).bind(email).fetch_optional(executor).await
}

pub async fn find_user_by_id<'e>(
    executor: impl SqliteExecutor<'e>,
    id: &str,
) -> Result<Option<User>, sqlx::Error> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ? AND is_deleted = 0");
    sqlx::query_as(&sql).bind(id).fetch_optional(executor).await
}

/// Stores a new hash and bumps `level_update`, returning the new level.
pub async fn update_password_hash<'e>(
    executor: impl SqliteExecutor<'e>,
    id: &str,
    password_hash: &str,
) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar(
        "UPDATE users SET password_hash = ?, level_update = level_update + 1 \
         WHERE id = ? AND is_deleted = 0 RETURNING level_update",
    )
    .bind(password_hash)
    .bind(id)
    .fetch_optional(executor)
    .await
}
