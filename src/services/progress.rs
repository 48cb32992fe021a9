use crate::context::RequestContext;
use crate::db::operations::progress::{select_progress_status, upsert_progress};
use crate::db::{rollback, Database};
use crate::models::{ExerciseKind, ProgressStatus};

#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("{kind} exercise {exercise_id} not found")]
    ExerciseNotFound { kind: ExerciseKind, exercise_id: i64 },
    #[error("failed to save progress")]
    Store(#[source] sqlx::Error),
}

fn parse_inputs(exercise_type: &str, status: &str) -> Result<(ExerciseKind, ProgressStatus), ProgressError> {
    let kind = ExerciseKind::parse(exercise_type).ok_or_else(|| {
        ProgressError::Validation(format!(
            "exercise_type must be one of word, phrase (got '{exercise_type}')"
        ))
    })?;
    let status = ProgressStatus::parse(status).ok_or_else(|| {
        ProgressError::Validation(format!(
            "status must be one of none, in_progress, completed, failed (got '{status}')"
        ))
    })?;
    Ok((kind, status))
}

/// Records the user's status for one exercise and returns the progress row id.
///
/// Resubmitting the same (user, exercise, type) overwrites the previous status. Nothing is
/// written when the inputs are invalid or the exercise does not exist.
pub async fn create_or_update_progress(
    ctx: &RequestContext,
    db: &Database,
    user_id: &str,
    exercise_id: i64,
    exercise_type: &str,
    status: &str,
) -> Result<i64, ProgressError> {
    let (kind, status) = parse_inputs(exercise_type, status)?;

    let mut tx = db.pool().begin().await.map_err(|err| {
        tracing::error!(request_id = ctx.request_id(), error = %err, "failed to open progress transaction");
        ProgressError::Store(err)
    })?;

    let outcome = upsert_progress(&mut *tx, user_id, exercise_id, kind, status).await;

    match outcome {
        Ok(Some(progress_id)) => {
            tx.commit().await.map_err(|err| {
                tracing::error!(
                    request_id = ctx.request_id(),
                    user_id,
                    exercise_id,
                    error = %err,
                    "failed to commit progress"
                );
                ProgressError::Store(err)
            })?;
            tracing::info!(
                request_id = ctx.request_id(),
                user_id,
                exercise_id,
                exercise_type = kind.as_str(),
                status = status.as_str(),
                progress_id,
                "progress saved"
            );
            Ok(progress_id)
        }
        Ok(None) => {
            rollback(ctx, tx).await;
            tracing::warn!(
                request_id = ctx.request_id(),
                user_id,
                exercise_id,
                exercise_type = kind.as_str(),
                "progress for unknown exercise"
            );
            Err(ProgressError::ExerciseNotFound { kind, exercise_id })
        }
        Err(err) => {
            rollback(ctx, tx).await;
            tracing::error!(
                request_id = ctx.request_id(),
                user_id,
                exercise_id,
                exercise_type = kind.as_str(),
                error = %err,
                "failed to save progress"
            );
            Err(ProgressError::Store(err))
        }
    }
}

/// Current status for one exercise; `none` when the user never submitted one.
pub async fn progress_status(
    ctx: &RequestContext,
    db: &Database,
    user_id: &str,
    exercise_id: i64,
    kind: ExerciseKind,
) -> Result<ProgressStatus, ProgressError> {
    let status = select_progress_status(db.pool(), user_id, exercise_id, kind)
        .await
        .map_err(|err| {
            tracing::error!(request_id = ctx.request_id(), user_id, exercise_id, error = %err, "failed to load progress");
            ProgressError::Store(err)
        })?;
    Ok(status.unwrap_or(ProgressStatus::None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_exercise_type_and_status() {
        assert!(matches!(
            parse_inputs("sentence", "completed"),
            Err(ProgressError::Validation(_))
        ));
        assert!(matches!(
            parse_inputs("word", "done"),
            Err(ProgressError::Validation(_))
        ));
        assert_eq!(
            parse_inputs("phrase", "in_progress").unwrap(),
            (ExerciseKind::Phrase, ProgressStatus::InProgress)
        );
    }

    #[test]
    fn store_errors_render_generic_message() {
        let err = ProgressError::Store(sqlx::Error::PoolTimedOut);
        assert_eq!(err.to_string(), "failed to save progress");
    }
}
