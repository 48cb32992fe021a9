use serde::{Deserialize, Serialize};

/// The two disjoint module/exercise families. Each kind has its own module and exercise
/// tables with identical shapes, so every shared query is parameterised by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseKind {
    Word,
    Phrase,
}

impl ExerciseKind {
    pub const ALL: [ExerciseKind; 2] = [ExerciseKind::Word, ExerciseKind::Phrase];

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ExerciseKind::Word => "word",
            ExerciseKind::Phrase => "phrase",
        }
    }

    pub(crate) const fn modules_table(self) -> &'static str {
        match self {
            ExerciseKind::Word => "word_modules",
            ExerciseKind::Phrase => "phrase_modules",
        }
    }

    pub(crate) const fn exercises_table(self) -> &'static str {
        match self {
            ExerciseKind::Word => "word_exercises",
            ExerciseKind::Phrase => "phrase_exercises",
        }
    }
}

impl std::fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    None,
    InProgress,
    Completed,
    Failed,
}

impl ProgressStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(Self::None),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ProgressStatus::None => "none",
            ProgressStatus::InProgress => "in_progress",
            ProgressStatus::Completed => "completed",
            ProgressStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WordExerciseType {
    Pronounce,
    PronounceFew,
    GuessWord,
}

impl WordExerciseType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pronounce" => Some(Self::Pronounce),
            "pronounceFew" => Some(Self::PronounceFew),
            "guessWord" => Some(Self::GuessWord),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            WordExerciseType::Pronounce => "pronounce",
            WordExerciseType::PronounceFew => "pronounceFew",
            WordExerciseType::GuessWord => "guessWord",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PhraseExerciseType {
    Pronounce,
    CompleteChain,
}

impl PhraseExerciseType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pronounce" => Some(Self::Pronounce),
            "completeChain" => Some(Self::CompleteChain),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            PhraseExerciseType::Pronounce => "pronounce",
            PhraseExerciseType::CompleteChain => "completeChain",
        }
    }

    pub const fn requires_chain(self) -> bool {
        matches!(self, PhraseExerciseType::CompleteChain)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Module {
    pub id: i64,
    pub title: String,
    pub kind: ExerciseKind,
}

/// Parallel lists describing what the learner sees and hears, one entry per item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseContent {
    pub items: Vec<String>,
    pub transcriptions: Vec<String>,
    pub translations: Vec<String>,
    pub audio_links: Vec<String>,
}

impl ExerciseContent {
    pub fn validate(&self) -> Result<(), String> {
        if self.items.is_empty() {
            return Err("exercise must contain at least one item".to_string());
        }
        if self.items.iter().any(|item| item.trim().is_empty()) {
            return Err("exercise items must be non-empty".to_string());
        }
        let len = self.items.len();
        if self.transcriptions.len() != len
            || self.translations.len() != len
            || self.audio_links.len() != len
        {
            return Err(format!(
                "items, transcriptions, translations and audio links must have equal length \
                 (got {}, {}, {}, {})",
                len,
                self.transcriptions.len(),
                self.translations.len(),
                self.audio_links.len()
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordExercise {
    pub id: i64,
    pub module_id: i64,
    pub exercise_type: WordExerciseType,
    #[serde(flatten)]
    pub content: ExerciseContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhraseExercise {
    pub id: i64,
    pub module_id: i64,
    pub exercise_type: PhraseExerciseType,
    #[serde(flatten)]
    pub content: ExerciseContent,
    pub chain: Vec<String>,
}

impl PhraseExercise {
    pub fn sentence(&self) -> &str {
        self.content.items.first().map(String::as_str).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Exercise {
    Word(WordExercise),
    Phrase(PhraseExercise),
}

impl Exercise {
    pub fn id(&self) -> i64 {
        match self {
            Exercise::Word(exercise) => exercise.id,
            Exercise::Phrase(exercise) => exercise.id,
        }
    }

    pub fn module_id(&self) -> i64 {
        match self {
            Exercise::Word(exercise) => exercise.module_id,
            Exercise::Phrase(exercise) => exercise.module_id,
        }
    }

    pub fn kind(&self) -> ExerciseKind {
        match self {
            Exercise::Word(_) => ExerciseKind::Word,
            Exercise::Phrase(_) => ExerciseKind::Phrase,
        }
    }

    pub fn type_tag(&self) -> &'static str {
        match self {
            Exercise::Word(exercise) => exercise.exercise_type.as_str(),
            Exercise::Phrase(exercise) => exercise.exercise_type.as_str(),
        }
    }

    pub fn content(&self) -> &ExerciseContent {
        match self {
            Exercise::Word(exercise) => &exercise.content,
            Exercise::Phrase(exercise) => &exercise.content,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExerciseWithProgress {
    #[serde(flatten)]
    pub exercise: Exercise,
    pub status: ProgressStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseList {
    pub module_id: i64,
    pub kind: ExerciseKind,
    pub exercises: Vec<ExerciseWithProgress>,
}

impl ExerciseList {
    pub fn status_of(&self, exercise_id: i64) -> Option<ProgressStatus> {
        self.exercises
            .iter()
            .find(|entry| entry.exercise.id() == exercise_id)
            .map(|entry| entry.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn content(n: usize) -> ExerciseContent {
        ExerciseContent {
            items: (0..n).map(|i| format!("word{i}")).collect(),
            transcriptions: (0..n).map(|i| format!("[w{i}]")).collect(),
            translations: (0..n).map(|i| format!("t{i}")).collect(),
            audio_links: (0..n).map(|i| format!("ref-{i}")).collect(),
        }
    }

    #[test]
    fn status_round_trips_through_its_tag() {
        for status in [
            ProgressStatus::None,
            ProgressStatus::InProgress,
            ProgressStatus::Completed,
            ProgressStatus::Failed,
        ] {
            assert_eq!(ProgressStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn kind_parse_is_case_sensitive() {
        assert_eq!(ExerciseKind::parse("word"), Some(ExerciseKind::Word));
        assert_eq!(ExerciseKind::parse("Word"), None);
        assert_eq!(ExerciseKind::parse(""), None);
        for kind in ExerciseKind::ALL {
            assert_eq!(ExerciseKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn content_requires_parallel_lists() {
        assert!(content(3).validate().is_ok());
        assert!(content(0).validate().is_err());

        let mut broken = content(2);
        broken.audio_links.pop();
        assert!(broken.validate().is_err());
    }

    #[test]
    fn exercise_serializes_with_kind_tag() {
        let exercise = Exercise::Phrase(PhraseExercise {
            id: 7,
            module_id: 2,
            exercise_type: PhraseExerciseType::CompleteChain,
            content: content(1),
            chain: vec!["a".into(), "b".into()],
        });
        let value = serde_json::to_value(ExerciseWithProgress {
            exercise,
            status: ProgressStatus::InProgress,
        })
        .unwrap();

        assert_eq!(value["kind"], "phrase");
        assert_eq!(value["exerciseType"], "completeChain");
        assert_eq!(value["status"], "in_progress");
        assert_eq!(value["chain"][1], "b");
        assert_eq!(value["items"][0], "word0");
    }

    proptest! {
        #[test]
        fn unknown_status_strings_are_rejected(value in "[a-zA-Z_ ]{0,16}") {
            let known = ["none", "in_progress", "completed", "failed"];
            prop_assert_eq!(ProgressStatus::parse(&value).is_some(), known.contains(&value.as_str()));
        }

        #[test]
        fn unknown_kind_strings_are_rejected(value in "[a-z]{0,10}") {
            prop_assert_eq!(
                ExerciseKind::parse(&value).is_some(),
                value == "word" || value == "phrase"
            );
        }
    }
}
