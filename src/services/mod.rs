pub mod exercises;
pub mod modules;
pub mod progress;
pub mod tips;
pub mod transcription;
pub mod users;
pub mod words;
