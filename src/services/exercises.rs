use serde::Deserialize;

use crate::context::RequestContext;
use crate::db::operations::exercises::{insert_exercise, select_module_exercises};
use crate::db::operations::modules::module_exists;
use crate::db::{rollback, Database};
use crate::models::{
    ExerciseContent, ExerciseKind, ExerciseList, ExerciseWithProgress, PhraseExerciseType,
    WordExerciseType,
};

#[derive(Debug, thiserror::Error)]
pub enum ExerciseError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("{kind} module {module_id} not found")]
    ModuleNotFound { kind: ExerciseKind, module_id: i64 },
    #[error("exercise store failure")]
    Store(#[source] sqlx::Error),
}

/// Word exercise payload: one entry per word in each parallel list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWordExercise {
    pub module_id: i64,
    pub exercise_type: String,
    pub words: Vec<String>,
    pub transcriptions: Vec<String>,
    pub translations: Vec<String>,
    pub audio_links: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPhraseExercise {
    pub module_id: i64,
    pub exercise_type: String,
    pub sentence: String,
    pub transcription: String,
    pub translation: String,
    pub audio_link: String,
    #[serde(default)]
    pub chain: Vec<String>,
}

impl NewWordExercise {
    fn validate(&self) -> Result<(WordExerciseType, ExerciseContent), ExerciseError> {
        let exercise_type = WordExerciseType::parse(&self.exercise_type).ok_or_else(|| {
            ExerciseError::Validation(format!(
                "word exercise type must be one of pronounce, pronounceFew, guessWord (got '{}')",
                self.exercise_type
            ))
        })?;

        let content = ExerciseContent {
            items: trimmed(&self.words),
            transcriptions: self.transcriptions.clone(),
            translations: self.translations.clone(),
            audio_links: self.audio_links.clone(),
        };
        content.validate().map_err(ExerciseError::Validation)?;

        Ok((exercise_type, content))
    }
}

impl NewPhraseExercise {
    fn validate(&self) -> Result<(PhraseExerciseType, ExerciseContent, Vec<String>), ExerciseError> {
        let exercise_type = PhraseExerciseType::parse(&self.exercise_type).ok_or_else(|| {
            ExerciseError::Validation(format!(
                "phrase exercise type must be one of pronounce, completeChain (got '{}')",
                self.exercise_type
            ))
        })?;

        let content = ExerciseContent {
            items: vec![self.sentence.trim().to_string()],
            transcriptions: vec![self.transcription.clone()],
            translations: vec![self.translation.clone()],
            audio_links: vec![self.audio_link.clone()],
        };
        content.validate().map_err(ExerciseError::Validation)?;

        let chain = trimmed(&self.chain);
        if exercise_type.requires_chain() {
            if chain.is_empty() || chain.iter().any(String::is_empty) {
                return Err(ExerciseError::Validation(
                    "completeChain exercise needs at least one non-empty chain token".to_string(),
                ));
            }
        } else if !chain.is_empty() {
            return Err(ExerciseError::Validation(format!(
                "chain tokens are only accepted for completeChain exercises (got {})",
                exercise_type.as_str()
            )));
        }

        Ok((exercise_type, content, chain))
    }
}

fn trimmed(values: &[String]) -> Vec<String> {
    values.iter().map(|v| v.trim().to_string()).collect()
}

pub async fn create_word_exercise(
    ctx: &RequestContext,
    db: &Database,
    input: &NewWordExercise,
) -> Result<i64, ExerciseError> {
    let (exercise_type, content) = input.validate()?;
    store_exercise(
        ctx,
        db,
        ExerciseKind::Word,
        input.module_id,
        exercise_type.as_str(),
        &content,
        &[],
    )
    .await
}

pub async fn create_phrase_exercise(
    ctx: &RequestContext,
    db: &Database,
    input: &NewPhraseExercise,
) -> Result<i64, ExerciseError> {
    let (exercise_type, content, chain) = input.validate()?;
    store_exercise(
        ctx,
        db,
        ExerciseKind::Phrase,
        input.module_id,
        exercise_type.as_str(),
        &content,
        &chain,
    )
    .await
}

async fn store_exercise(
    ctx: &RequestContext,
    db: &Database,
    kind: ExerciseKind,
    module_id: i64,
    exercise_type: &str,
    content: &ExerciseContent,
    chain: &[String],
) -> Result<i64, ExerciseError> {
    let mut tx = db.pool().begin().await.map_err(|err| {
        tracing::error!(request_id = ctx.request_id(), kind = %kind, module_id, error = %err, "failed to open exercise transaction");
        ExerciseError::Store(err)
    })?;

    let inserted =
        insert_exercise(&mut *tx, kind, module_id, exercise_type, content, chain).await;

    match inserted {
        Ok(Some(exercise_id)) => {
            tx.commit().await.map_err(|err| {
                tracing::error!(
                    request_id = ctx.request_id(),
                    kind = %kind,
                    module_id,
                    error = %err,
                    "failed to commit exercise"
                );
                ExerciseError::Store(err)
            })?;
            tracing::info!(
                request_id = ctx.request_id(),
                kind = %kind,
                module_id,
                exercise_id,
                exercise_type,
                "exercise created"
            );
            Ok(exercise_id)
        }
        Ok(None) => {
            rollback(ctx, tx).await;
            tracing::warn!(
                request_id = ctx.request_id(),
                kind = %kind,
                module_id,
                "exercise for unknown module"
            );
            Err(ExerciseError::ModuleNotFound { kind, module_id })
        }
        Err(err) => {
            rollback(ctx, tx).await;
            tracing::error!(
                request_id = ctx.request_id(),
                kind = %kind,
                module_id,
                error = %err,
                "failed to create exercise"
            );
            Err(ExerciseError::Store(err))
        }
    }
}

/// Exercises of a module in id order, annotated with the user's progress. Anonymous callers
/// see every exercise as `none`.
pub async fn module_exercises(
    ctx: &RequestContext,
    db: &Database,
    user_id: Option<&str>,
    kind: ExerciseKind,
    module_id: i64,
) -> Result<ExerciseList, ExerciseError> {
    let store_failure = |err: sqlx::Error| {
        tracing::error!(
            request_id = ctx.request_id(),
            kind = %kind,
            module_id,
            error = %err,
            "failed to load module exercises"
        );
        ExerciseError::Store(err)
    };

    let mut tx = db.pool().begin().await.map_err(store_failure)?;

    if !module_exists(&mut *tx, kind, module_id)
        .await
        .map_err(store_failure)?
    {
        rollback(ctx, tx).await;
        return Err(ExerciseError::ModuleNotFound { kind, module_id });
    }

    let rows = select_module_exercises(&mut *tx, kind, module_id, user_id)
        .await
        .map_err(store_failure)?;
    tx.commit().await.map_err(store_failure)?;

    tracing::debug!(
        request_id = ctx.request_id(),
        kind = %kind,
        module_id,
        count = rows.len(),
        authenticated = user_id.is_some(),
        "module exercises loaded"
    );

    Ok(ExerciseList {
        module_id,
        kind,
        exercises: rows
            .into_iter()
            .map(|(exercise, status)| ExerciseWithProgress { exercise, status })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phrase(exercise_type: &str, chain: &[&str]) -> NewPhraseExercise {
        NewPhraseExercise {
            module_id: 1,
            exercise_type: exercise_type.to_string(),
            sentence: " Как дела? ".to_string(),
            transcription: "[kak dʲɪˈla]".to_string(),
            translation: "How are you?".to_string(),
            audio_link: "audio-1.mp3".to_string(),
            chain: chain.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn complete_chain_requires_tokens() {
        assert!(phrase("completeChain", &[]).validate().is_err());
        assert!(phrase("completeChain", &["Как", " "]).validate().is_err());

        let (kind, content, chain) = phrase("completeChain", &["Как", "дела"]).validate().unwrap();
        assert_eq!(kind, PhraseExerciseType::CompleteChain);
        assert_eq!(content.items, vec!["Как дела?".to_string()]);
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn pronounce_phrase_rejects_chain() {
        assert!(phrase("pronounce", &[]).validate().is_ok());
        assert!(phrase("pronounce", &["a"]).validate().is_err());
        assert!(phrase("guessWord", &[]).validate().is_err());
    }

    #[test]
    fn word_exercise_lists_must_line_up() {
        let mut input = NewWordExercise {
            module_id: 1,
            exercise_type: "pronounceFew".to_string(),
            words: vec!["мама".into(), "папа".into()],
            transcriptions: vec!["[mamə]".into(), "[papə]".into()],
            translations: vec!["mom".into(), "dad".into()],
            audio_links: vec!["a".into(), "b".into()],
        };
        assert!(input.validate().is_ok());

        input.translations.pop();
        assert!(matches!(input.validate(), Err(ExerciseError::Validation(_))));

        input.translations.push("dad".into());
        input.exercise_type = "completeChain".into();
        assert!(input.validate().is_err());
    }
}
