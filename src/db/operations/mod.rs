pub mod exercises;
pub mod modules;
pub mod progress;
pub mod tips;
pub mod users;
pub mod words;

use chrono::{SecondsFormat, Utc};

/// Timestamp format shared by every `*_at` column.
pub(crate) fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn decode_error(err: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}
