use sqlx::{Executor, SqlitePool};

/// Embedded schema files, applied in order and recorded in `_migrations`.
const MIGRATIONS: &[(&str, &str)] = &[
    ("001_init_schema", include_str!("../../sql/001_init_schema.sql")),
    ("002_words_and_tips", include_str!("../../sql/002_words_and_tips.sql")),
    ("003_word_stats", include_str!("../../sql/003_word_stats.sql")),
];

pub async fn run_migrations(pool: &SqlitePool) -> Result<usize, MigrationError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    let applied = applied_migrations(pool).await?;
    let mut count = 0;

    for (name, sql) in MIGRATIONS {
        if applied.iter().any(|done| done == name) {
            tracing::debug!(migration = name, "already applied");
            continue;
        }

        let mut tx = pool.begin().await?;
        // Unprepared execution runs every statement in the file.
        (&mut *tx)
            .execute(*sql)
            .await
            .map_err(|source| MigrationError::Migration {
                name: name.to_string(),
                source,
            })?;
        sqlx::query("INSERT INTO _migrations (name) VALUES (?)")
            .bind(*name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        count += 1;
        tracing::info!(migration = name, "migration applied");
    }

    if count == 0 {
        tracing::info!("schema up to date");
    }

    Ok(count)
}

pub async fn applied_migrations(pool: &SqlitePool) -> Result<Vec<String>, MigrationError> {
    let names = sqlx::query_scalar("SELECT name FROM _migrations ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(names)
}

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("migration '{name}' failed: {source}")]
    Migration {
        name: String,
        #[source]
        source: sqlx::Error,
    },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}
