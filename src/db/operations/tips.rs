use serde::Serialize;
use sqlx::SqliteExecutor;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tip {
    pub id: i64,
    pub phonema: String,
    pub text: String,
    pub media_link: String,
    pub audio_link: String,
}

pub async fn insert_tip<'e>(
    executor: impl SqliteExecutor<'e>,
    phonema: &str,
    text: &str,
    media_link: &str,
    audio_link: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO tips (phonema, text, media_link, audio_link, created_at) \
         VALUES (?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(phonema)
    .bind(text)
    .bind(media_link)
    .bind(audio_link)
    .bind(super::now_iso())
    .fetch_one(executor)
    .await
}

/// Most recently uploaded tip for a phoneme.
pub async fn select_latest_tip<'e>(
    executor: impl SqliteExecutor<'e>,
    phonema: &str,
) -> Result<Option<Tip>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, phonema, text, media_link, audio_link FROM tips \
         WHERE phonema = ? ORDER BY id DESC LIMIT 1",
    )
    .bind(phonema)
    .fetch_optional(executor)
    .await
}
