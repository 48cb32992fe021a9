use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::auth::{AuthError, JwtKeys};
use crate::config::Config;
use crate::db::Database;
use crate::services::transcription::TranscriptionClient;
use crate::storage::ObjectStore;

/// Long-lived handles shared by every request. Built once at start-up.
#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    config: Arc<Config>,
    db: Database,
    jwt: Option<Arc<JwtKeys>>,
    object_store: Arc<dyn ObjectStore>,
    transcription: Arc<TranscriptionClient>,
}

impl AppState {
    pub fn new(config: Config, db: Database, object_store: Arc<dyn ObjectStore>) -> Self {
        let jwt = match JwtKeys::from_config(&config.auth) {
            Ok(keys) => Some(Arc::new(keys)),
            Err(err) => {
                tracing::warn!(error = %err, "token operations disabled");
                None
            }
        };
        let transcription = Arc::new(TranscriptionClient::new(&config.ml));

        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            config: Arc::new(config),
            db,
            jwt,
            object_store,
            transcription,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn jwt(&self) -> Result<&JwtKeys, AuthError> {
        self.jwt.as_deref().ok_or(AuthError::MissingSecret)
    }

    pub fn object_store(&self) -> Arc<dyn ObjectStore> {
        Arc::clone(&self.object_store)
    }

    pub fn transcription(&self) -> &TranscriptionClient {
        &self.transcription
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }
}
