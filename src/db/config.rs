use std::time::Duration;

use crate::config::{env_string, env_u32, env_u64};

const DEFAULT_DATABASE_URL: &str = "sqlite:./data/ouzi.db";

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub busy_timeout: Duration,
    pub acquire_timeout: Duration,
    pub foreign_keys: bool,
}

impl DbConfig {
    pub fn from_env() -> Self {
        Self {
            url: env_string("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            max_connections: env_u32("DB_MAX_CONNECTIONS", 5).max(1),
            busy_timeout: Duration::from_millis(env_u64("DB_BUSY_TIMEOUT_MS", 5000)),
            acquire_timeout: Duration::from_millis(env_u64("DB_ACQUIRE_TIMEOUT_MS", 5000)),
            foreign_keys: env_bool("SQLITE_FOREIGN_KEYS", true),
        }
    }

    /// Config pointing at a database file, used by tools and tests.
    pub fn for_path(path: impl AsRef<std::path::Path>) -> Self {
        Self {
            url: format!("sqlite:{}", path.as_ref().display()),
            max_connections: 5,
            busy_timeout: Duration::from_millis(5000),
            acquire_timeout: Duration::from_millis(5000),
            foreign_keys: true,
        }
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    match env_string(key).as_deref().map(str::trim) {
        Some("1") | Some("true") | Some("TRUE") | Some("yes") => true,
        Some("0") | Some("false") | Some("FALSE") | Some("no") => false,
        _ => default,
    }
}
