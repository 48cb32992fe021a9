use sqlx::{SqliteConnection, SqliteExecutor};

use crate::models::{ExerciseKind, Module};

#[derive(Debug, sqlx::FromRow)]
struct ModuleRow {
    id: i64,
    title: String,
}

impl ModuleRow {
    fn into_module(self, kind: ExerciseKind) -> Module {
        Module {
            id: self.id,
            title: self.title,
            kind,
        }
    }
}

pub async fn insert_module(
    conn: &mut SqliteConnection,
    kind: ExerciseKind,
    title: &str,
) -> Result<i64, sqlx::Error> {
    let sql = format!(
        "INSERT INTO {} (title, created_at) VALUES (?, ?) RETURNING id",
        kind.modules_table()
    );
    sqlx::query_scalar(&sql)
        .bind(title)
        .bind(super::now_iso())
        .fetch_one(conn)
        .await
}

pub async fn select_modules<'e>(
    executor: impl SqliteExecutor<'e>,
    kind: ExerciseKind,
) -> Result<Vec<Module>, sqlx::Error> {
    let sql = format!("SELECT id, title FROM {} ORDER BY id ASC", kind.modules_table());
    let rows: Vec<ModuleRow> = sqlx::query_as(&sql).fetch_all(executor).await?;
    Ok(rows.into_iter().map(|row| row.into_module(kind)).collect())
}

pub async fn module_exists<'e>(
    executor: impl SqliteExecutor<'e>,
    kind: ExerciseKind,
    module_id: i64,
) -> Result<bool, sqlx::Error> {
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?)",
        kind.modules_table()
    );
    let exists: i64 = sqlx::query_scalar(&sql)
        .bind(module_id)
        .fetch_one(executor)
        .await?;
    Ok(exists != 0)
}

/// First module (by id) in which the user has completed fewer exercises than the module
/// holds. The inner join drops modules without exercises.
pub async fn select_next_incomplete_module<'e>(
    executor: impl SqliteExecutor<'e>,
    user_id: &str,
    kind: ExerciseKind,
) -> Result<Option<Module>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT m.id, m.title
        FROM {modules} m
        JOIN {exercises} e ON e.module_id = m.id
        LEFT JOIN exercise_progress p
            ON p.exercise_id = e.id
            AND p.exercise_type = ?
            AND p.user_id = ?
        GROUP BY m.id, m.title
        HAVING SUM(CASE WHEN p.status = 'completed' THEN 1 ELSE 0 END) < COUNT(e.id)
        ORDER BY m.id ASC
        LIMIT 1
        "#,
        modules = kind.modules_table(),
        exercises = kind.exercises_table(),
    );

    let row: Option<ModuleRow> = sqlx::query_as(&sql)
        .bind(kind.as_str())
        .bind(user_id)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(|row| row.into_module(kind)))
}
