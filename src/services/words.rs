use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::db::operations::words::{
    increment_word_stats, insert_topic, insert_word, select_random_word, select_topics,
    select_word, select_word_stats, select_words_by_topic, topic_exists, upsert_word_progress,
    TopicSummary, Word, WordStats, WordWithProgress,
};
use crate::db::{is_unique_violation, rollback, Database};

#[derive(Debug, thiserror::Error)]
pub enum WordError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("word '{0}' already exists")]
    Duplicate(String),
    #[error("word '{0}' not found")]
    WordNotFound(String),
    #[error("topic '{0}' not found")]
    TopicNotFound(String),
    #[error("word store failure")]
    Store(#[source] sqlx::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWord {
    pub word: String,
    pub transcription: String,
    #[serde(default)]
    pub audio_link: String,
    pub topic: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PronunciationResult {
    /// `1` when the recognised transcription matches the reference, `-1` otherwise.
    pub result: i64,
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, WordError> {
    let value = value.trim();
    if value.is_empty() {
        Err(WordError::Validation(format!("{field} is required")))
    } else {
        Ok(value)
    }
}

/// Compares transcriptions ignoring surrounding whitespace and enclosing brackets.
fn same_transcription(reference: &str, heard: &str) -> bool {
    fn strip(value: &str) -> &str {
        value
            .trim()
            .trim_start_matches(['[', '/'])
            .trim_end_matches([']', '/'])
            .trim()
    }
    strip(reference) == strip(heard)
}

pub async fn create_word(ctx: &RequestContext, db: &Database, input: &NewWord) -> Result<i64, WordError> {
    let word = required("word", &input.word)?;
    let transcription = required("transcription", &input.transcription)?;
    let topic = required("topic", &input.topic)?;

    let store_failure = |err: sqlx::Error| {
        tracing::error!(request_id = ctx.request_id(), word, error = %err, "failed to create word");
        WordError::Store(err)
    };

    let mut tx = db.pool().begin().await.map_err(|err| {
        tracing::error!(request_id = ctx.request_id(), word, error = %err, "failed to open word transaction");
        WordError::Store(err)
    })?;

    let inserted = match insert_topic(&mut *tx, topic).await {
        Ok(()) => insert_word(&mut *tx, word, transcription, input.audio_link.trim(), topic).await,
        Err(err) => Err(err),
    };
    let id = match inserted {
        Ok(id) => id,
        Err(err) if is_unique_violation(&err) => {
            rollback(ctx, tx).await;
            tracing::warn!(request_id = ctx.request_id(), word, "duplicate word");
            return Err(WordError::Duplicate(word.to_string()));
        }
        Err(err) => {
            rollback(ctx, tx).await;
            return Err(store_failure(err));
        }
    };
    tx.commit().await.map_err(|err| {
        tracing::error!(request_id = ctx.request_id(), word, error = %err, "failed to commit word");
        WordError::Store(err)
    })?;

    tracing::info!(request_id = ctx.request_id(), word, topic, word_id = id, "word created");
    Ok(id)
}

pub async fn get_word(ctx: &RequestContext, db: &Database, word: &str) -> Result<Option<Word>, WordError> {
    let word = required("word", word)?;
    select_word(db.pool(), word).await.map_err(|err| {
        tracing::error!(request_id = ctx.request_id(), word, error = %err, "failed to load word");
        WordError::Store(err)
    })
}

/// Scores one pronunciation attempt, records it as the user's latest result and adds it to
/// the user's running totals for the word.
pub async fn check_pronunciation(
    ctx: &RequestContext,
    db: &Database,
    user_id: &str,
    word: &str,
    transcription: &str,
) -> Result<PronunciationResult, WordError> {
    let word = required("word", word)?;
    let reference = get_word(ctx, db, word)
        .await?
        .ok_or_else(|| WordError::WordNotFound(word.to_string()))?;

    let result = if same_transcription(&reference.transcription, transcription) {
        1
    } else {
        -1
    };

    let store_failure = |err: sqlx::Error| {
        tracing::error!(request_id = ctx.request_id(), user_id, word, error = %err, "failed to record pronunciation");
        WordError::Store(err)
    };

    let mut tx = db.pool().begin().await.map_err(store_failure)?;
    let recorded = match upsert_word_progress(&mut *tx, user_id, reference.id, result).await {
        Ok(()) => increment_word_stats(&mut *tx, user_id, reference.id, result).await,
        Err(err) => Err(err),
    };
    if let Err(err) = recorded {
        rollback(ctx, tx).await;
        return Err(store_failure(err));
    }
    tx.commit().await.map_err(store_failure)?;

    tracing::info!(request_id = ctx.request_id(), user_id, word, result, "pronunciation checked");
    Ok(PronunciationResult { result })
}

/// A random live word, restricted to `topic` when given. `None` when nothing matches.
pub async fn random_word(
    ctx: &RequestContext,
    db: &Database,
    topic: Option<&str>,
) -> Result<Option<Word>, WordError> {
    let topic = topic.map(str::trim).filter(|topic| !topic.is_empty());
    let word = select_random_word(db.pool(), topic).await.map_err(|err| {
        tracing::error!(request_id = ctx.request_id(), topic, error = %err, "failed to pick random word");
        WordError::Store(err)
    })?;
    tracing::debug!(request_id = ctx.request_id(), topic, word_id = word.as_ref().map(|w| w.id), "random word");
    Ok(word)
}

/// The user's attempt totals for `word`. A word never attempted reports zeros.
pub async fn word_stats(
    ctx: &RequestContext,
    db: &Database,
    user_id: &str,
    word: &str,
) -> Result<WordStats, WordError> {
    let word = required("word", word)?;
    let reference = get_word(ctx, db, word)
        .await?
        .ok_or_else(|| WordError::WordNotFound(word.to_string()))?;

    let stats = select_word_stats(db.pool(), user_id, reference.id)
        .await
        .map_err(|err| {
            tracing::error!(request_id = ctx.request_id(), user_id, word, error = %err, "failed to load word stats");
            WordError::Store(err)
        })?;
    Ok(stats.unwrap_or(WordStats {
        word_id: reference.id,
        total_plus: 0,
        total_minus: 0,
    }))
}

pub async fn list_topics(
    ctx: &RequestContext,
    db: &Database,
    user_id: Option<&str>,
) -> Result<Vec<TopicSummary>, WordError> {
    select_topics(db.pool(), user_id).await.map_err(|err| {
        tracing::error!(request_id = ctx.request_id(), error = %err, "failed to list topics");
        WordError::Store(err)
    })
}

pub async fn words_by_topic(
    ctx: &RequestContext,
    db: &Database,
    topic: &str,
    user_id: Option<&str>,
) -> Result<Vec<WordWithProgress>, WordError> {
    let topic = required("topic", topic)?;
    let store_failure = |err: sqlx::Error| {
        tracing::error!(request_id = ctx.request_id(), topic, error = %err, "failed to list topic words");
        WordError::Store(err)
    };

    if !topic_exists(db.pool(), topic).await.map_err(store_failure)? {
        return Err(WordError::TopicNotFound(topic.to_string()));
    }
    select_words_by_topic(db.pool(), topic, user_id)
        .await
        .map_err(store_failure)
}
