use serde::Serialize;
use sqlx::{SqliteConnection, SqliteExecutor};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub id: i64,
    pub word: String,
    pub transcription: String,
    pub audio_link: String,
    pub topic: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WordWithProgress {
    pub id: i64,
    pub word: String,
    pub transcription: String,
    pub audio_link: String,
    pub topic: String,
    /// Last pronunciation result for the user: `1`, `-1`, or absent.
    pub progress: Option<i64>,
}

/// Running totals of correct and incorrect attempts for one user and word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WordStats {
    pub word_id: i64,
    pub total_plus: i64,
    pub total_minus: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct TopicSummary {
    pub topic: String,
    pub all_words: i64,
    pub true_words: i64,
}

pub async fn insert_topic(conn: &mut SqliteConnection, topic: &str) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO topics (topic) VALUES (?) ON CONFLICT (topic) DO NOTHING")
        .bind(topic)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn insert_word(
    conn: &mut SqliteConnection,
    word: &str,
    transcription: &str,
    audio_link: &str,
    topic: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO words (word, transcription, audio_link, topic, created_at) \
         VALUES (?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(word)
    .bind(transcription)
    .bind(audio_link)
    .bind(topic)
    .bind(super::now_iso())
    .fetch_one(conn)
    .await
}

pub async fn select_word<'e>(
    executor: impl SqliteExecutor<'e>,
    word: &str,
) -> Result<Option<Word>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, word, transcription, audio_link, topic FROM words \
         WHERE word = ? AND is_deleted = 0",
    )
    .bind(word)
    .fetch_optional(executor)
    .await
}

pub async fn upsert_word_progress<'e>(
    executor: impl SqliteExecutor<'e>,
    user_id: &str,
    word_id: i64,
    progress: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO word_progress (user_id, word_id, progress, updated_at) VALUES (?, ?, ?, ?) \
         ON CONFLICT (user_id, word_id) DO UPDATE SET \
             progress = excluded.progress, updated_at = excluded.updated_at",
    )
    .bind(user_id)
    .bind(word_id)
    .bind(progress)
    .bind(super::now_iso())
    .execute(executor)
    .await?;
    Ok(())
}

/// Bumps `total_plus` for a correct attempt (`result > 0`) and `total_minus` otherwise.
pub async fn increment_word_stats<'e>(
    executor: impl SqliteExecutor<'e>,
    user_id: &str,
    word_id: i64,
    result: i64,
) -> Result<(), sqlx::Error> {
    let (plus, minus) = if result > 0 { (1, 0) } else { (0, 1) };
    sqlx::query(
        "INSERT INTO word_stats (user_id, word_id, total_plus, total_minus, updated_at) \
         VALUES (?, ?, ?, ?, ?) \
         ON CONFLICT (user_id, word_id) DO UPDATE SET \
             total_plus = word_stats.total_plus + excluded.total_plus, \
             total_minus = word_stats.total_minus + excluded.total_minus, \
             updated_at = excluded.updated_at",
    )
    .bind(user_id)
    .bind(word_id)
    .bind(plus)
    .bind(minus)
    .bind(super::now_iso())
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn select_word_stats<'e>(
    executor: impl SqliteExecutor<'e>,
    user_id: &str,
    word_id: i64,
) -> Result<Option<WordStats>, sqlx::Error> {
    sqlx::query_as(
        "SELECT word_id, total_plus, total_minus FROM word_stats WHERE user_id = ? AND word_id = ?",
    )
    .bind(user_id)
    .bind(word_id)
    .fetch_optional(executor)
    .await
}

/// One live word picked at random, optionally restricted to a topic.
pub async fn select_random_word<'e>(
    executor: impl SqliteExecutor<'e>,
    topic: Option<&str>,
) -> Result<Option<Word>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, word, transcription, audio_link, topic FROM words \
         WHERE is_deleted = 0 AND (?1 IS NULL OR topic = ?1) \
         ORDER BY RANDOM() LIMIT 1",
    )
    .bind(topic)
    .fetch_optional(executor)
    .await
}

/// Every topic with its word count and the number of words the user last pronounced
/// correctly. Binding no user yields zero correct words everywhere.
pub async fn select_topics<'e>(
    executor: impl SqliteExecutor<'e>,
    user_id: Option<&str>,
) -> Result<Vec<TopicSummary>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT t.topic AS topic,
               COUNT(w.id) AS all_words,
               COALESCE(SUM(CASE WHEN wp.progress = 1 THEN 1 ELSE 0 END), 0) AS true_words
        FROM topics t
        LEFT JOIN words w ON w.topic = t.topic AND w.is_deleted = 0
        LEFT JOIN word_progress wp ON wp.word_id = w.id AND wp.user_id = ?
        GROUP BY t.id, t.topic
        ORDER BY t.id ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
}

pub async fn select_words_by_topic<'e>(
    executor: impl SqliteExecutor<'e>,
    topic: &str,
    user_id: Option<&str>,
) -> Result<Vec<WordWithProgress>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT w.id, w.word, w.transcription, w.audio_link, w.topic, wp.progress
        FROM words w
        LEFT JOIN word_progress wp ON wp.word_id = w.id AND wp.user_id = ?
        WHERE w.topic = ? AND w.is_deleted = 0
        ORDER BY w.id ASC
        "#,
    )
    .bind(user_id)
    .bind(topic)
    .fetch_all(executor)
    .await
}

pub async fn topic_exists<'e>(
    executor: impl SqliteExecutor<'e>,
    topic: &str,
) -> Result<bool, sqlx::Error> {
    let exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM topics WHERE topic = ?)")
        .bind(topic)
        .fetch_one(executor)
        .await?;
    Ok(exists != 0)
}
