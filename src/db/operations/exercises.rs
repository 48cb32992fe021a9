use sqlx::{SqliteConnection, SqliteExecutor};

use crate::models::{
    Exercise, ExerciseContent, ExerciseKind, PhraseExercise, PhraseExerciseType, ProgressStatus,
    WordExercise, WordExerciseType,
};

use super::decode_error;

#[derive(Debug, thiserror::Error)]
#[error("unexpected {column} value '{value}' in {table}")]
struct UnknownTag {
    table: &'static str,
    column: &'static str,
    value: String,
}

#[derive(Debug, sqlx::FromRow)]
struct ExerciseRow {
    id: i64,
    module_id: i64,
    exercise_type: String,
    items: String,
    transcriptions: String,
    translations: String,
    audio_links: String,
    chain: String,
    status: String,
}

impl ExerciseRow {
    fn into_parts(self, kind: ExerciseKind) -> Result<(Exercise, ProgressStatus), sqlx::Error> {
        let table = kind.exercises_table();
        let status = ProgressStatus::parse(&self.status).ok_or_else(|| {
            decode_error(UnknownTag {
                table,
                column: "status",
                value: self.status.clone(),
            })
        })?;

        let content = ExerciseContent {
            items: decode_list(&self.items)?,
            transcriptions: decode_list(&self.transcriptions)?,
            translations: decode_list(&self.translations)?,
            audio_links: decode_list(&self.audio_links)?,
        };
        let unknown_type = || {
            decode_error(UnknownTag {
                table,
                column: "exercise_type",
                value: self.exercise_type.clone(),
            })
        };

        let exercise = match kind {
            ExerciseKind::Word => Exercise::Word(WordExercise {
                id: self.id,
                module_id: self.module_id,
                exercise_type: WordExerciseType::parse(&self.exercise_type)
                    .ok_or_else(unknown_type)?,
                content,
            }),
            ExerciseKind::Phrase => Exercise::Phrase(PhraseExercise {
                id: self.id,
                module_id: self.module_id,
                exercise_type: PhraseExerciseType::parse(&self.exercise_type)
                    .ok_or_else(unknown_type)?,
                content,
                chain: decode_list(&self.chain)?,
            }),
        };

        Ok((exercise, status))
    }
}

fn decode_list(raw: &str) -> Result<Vec<String>, sqlx::Error> {
    serde_json::from_str(raw).map_err(decode_error)
}

fn encode_list(values: &[String]) -> Result<String, sqlx::Error> {
    serde_json::to_string(values).map_err(|err| sqlx::Error::Encode(Box::new(err)))
}

/// Inserts an exercise only when its module exists. `None` means the module is missing.
pub async fn insert_exercise(
    conn: &mut SqliteConnection,
    kind: ExerciseKind,
    module_id: i64,
    exercise_type: &str,
    content: &ExerciseContent,
    chain: &[String],
) -> Result<Option<i64>, sqlx::Error> {
    let sql = format!(
        r#"
        INSERT INTO {exercises}
            (module_id, exercise_type, items, transcriptions, translations, audio_links, chain, created_at)
        SELECT ?, ?, ?, ?, ?, ?, ?, ?
        WHERE EXISTS (SELECT 1 FROM {modules} WHERE id = ?)
        RETURNING id
        "#,
        exercises = kind.exercises_table(),
        modules = kind.modules_table(),
    );

    sqlx::query_scalar(&sql)
        .bind(module_id)
        .bind(exercise_type)
        .bind(encode_list(&content.items)?)
        .bind(encode_list(&content.transcriptions)?)
        .bind(encode_list(&content.translations)?)
        .bind(encode_list(&content.audio_links)?)
        .bind(encode_list(chain)?)
        .bind(super::now_iso())
        .bind(module_id)
        .fetch_optional(conn)
        .await
}

/// Exercises of one module, ascending by id, each paired with the given user's status.
/// Without a user the progress table is not consulted and every status is `none`.
pub async fn select_module_exercises<'e>(
    executor: impl SqliteExecutor<'e>,
    kind: ExerciseKind,
    module_id: i64,
    user_id: Option<&str>,
) -> Result<Vec<(Exercise, ProgressStatus)>, sqlx::Error> {
    const COLUMNS: &str = "e.id, e.module_id, e.exercise_type, e.items, e.transcriptions, \
                           e.translations, e.audio_links, e.chain";
    let table = kind.exercises_table();

    let rows: Vec<ExerciseRow> = match user_id {
        Some(user_id) => {
            let sql = format!(
                r#"
                SELECT {COLUMNS}, COALESCE(p.status, 'none') AS status
                FROM {table} e
                LEFT JOIN exercise_progress p
                    ON p.exercise_id = e.id
                    AND p.exercise_type = ?
                    AND p.user_id = ?
                WHERE e.module_id = ?
                ORDER BY e.id ASC
                "#
            );
            sqlx::query_as(&sql)
                .bind(kind.as_str())
                .bind(user_id)
                .bind(module_id)
                .fetch_all(executor)
                .await?
        }
        None => {
            let sql = format!(
                "SELECT {COLUMNS}, 'none' AS status FROM {table} e WHERE e.module_id = ? ORDER BY e.id ASC"
            );
            sqlx::query_as(&sql).bind(module_id).fetch_all(executor).await?
        }
    };

    rows.into_iter().map(|row| row.into_parts(kind)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_columns_round_trip_through_json() {
        let values = vec!["привет".to_string(), "a \"quoted\" word".to_string()];
        let encoded = encode_list(&values).unwrap();
        assert_eq!(decode_list(&encoded).unwrap(), values);
    }

    #[test]
    fn malformed_list_is_a_decode_error() {
        assert!(matches!(decode_list("not json"), Err(sqlx::Error::Decode(_))));
    }
}
