use sqlx::{SqliteConnection, SqliteExecutor};

use crate::models::{ExerciseKind, ProgressStatus};

/// Inserts or overwrites the (user, exercise, kind) progress row.
///
/// The write is guarded by an existence check against the exercise table of `kind`; `None`
/// means no such exercise and nothing was written. Being a single write statement, it also
/// takes SQLite's write lock up front, so concurrent submissions for the same key serialize
/// on the busy handler and the later commit wins.
pub async fn upsert_progress(
    conn: &mut SqliteConnection,
    user_id: &str,
    exercise_id: i64,
    kind: ExerciseKind,
    status: ProgressStatus,
) -> Result<Option<i64>, sqlx::Error> {
    let sql = format!(
        r#"
        INSERT INTO exercise_progress (user_id, exercise_id, exercise_type, status, created_at, updated_at)
        SELECT ?, ?, ?, ?, ?, ?
        WHERE EXISTS (SELECT 1 FROM {exercises} WHERE id = ?)
        ON CONFLICT (user_id, exercise_id, exercise_type) DO UPDATE SET
            status = excluded.status,
            updated_at = excluded.updated_at
        RETURNING id
        "#,
        exercises = kind.exercises_table(),
    );

    let now = super::now_iso();
    sqlx::query_scalar(&sql)
        .bind(user_id)
        .bind(exercise_id)
        .bind(kind.as_str())
        .bind(status.as_str())
        .bind(&now)
        .bind(&now)
        .bind(exercise_id)
        .fetch_optional(conn)
        .await
}

pub async fn select_progress_status<'e>(
    executor: impl SqliteExecutor<'e>,
    user_id: &str,
    exercise_id: i64,
    kind: ExerciseKind,
) -> Result<Option<ProgressStatus>, sqlx::Error> {
    let status: Option<String> = sqlx::query_scalar(
        "SELECT status FROM exercise_progress WHERE user_id = ? AND exercise_id = ? AND exercise_type = ?",
    )
    .bind(user_id)
    .bind(exercise_id)
    .bind(kind.as_str())
    .fetch_optional(executor)
    .await?;

    Ok(status.as_deref().and_then(ProgressStatus::parse))
}
