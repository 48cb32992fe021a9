pub mod config;
pub mod migrate;
pub mod operations;

use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use thiserror::Error;

use crate::context::RequestContext;
use crate::db::config::DbConfig;
use crate::db::migrate::MigrationError;

/// Shared handle to the relational store. Cloning is cheap; all clones share one pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(config: &DbConfig) -> Result<Self, DbInitError> {
        if let Some(path) = sqlite_file_path(&config.url) {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(DbInitError::Io)?;
                }
            }
        }

        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(DbInitError::Sqlx)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(config.busy_timeout)
            .foreign_keys(config.foreign_keys);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(DbInitError::Sqlx)?;

        tracing::info!(
            url = %config.url,
            max_connections = config.max_connections,
            "database pool ready"
        );

        Ok(Self { pool })
    }

    /// Connects and brings the schema up to date.
    pub async fn connect_and_migrate(config: &DbConfig) -> Result<Self, DbInitError> {
        let db = Self::connect(config).await?;
        migrate::run_migrations(db.pool()).await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn sqlite_file_path(url: &str) -> Option<&str> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        None
    } else {
        Some(path)
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Rolls back `tx`, logging instead of returning a failed rollback so the caller's error wins.
pub(crate) async fn rollback(ctx: &RequestContext, tx: Transaction<'_, Sqlite>) {
    if let Err(err) = tx.rollback().await {
        tracing::warn!(request_id = ctx.request_id(), error = %err, "rollback failed");
    }
}

#[derive(Debug, Error)]
pub enum DbInitError {
    #[error("failed to prepare database directory: {0}")]
    Io(#[source] std::io::Error),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] MigrationError),
}
