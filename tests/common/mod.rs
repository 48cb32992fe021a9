#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use ouzi_backend::config::{AuthConfig, Config, MediaConfig, MlConfig};
use ouzi_backend::context::RequestContext;
use ouzi_backend::db::config::DbConfig;
use ouzi_backend::db::operations::users::insert_user;
use ouzi_backend::db::Database;
use ouzi_backend::models::ExerciseKind;
use ouzi_backend::services::exercises::{self, NewPhraseExercise, NewWordExercise};
use ouzi_backend::services::modules;
use ouzi_backend::state::AppState;
use ouzi_backend::storage::LocalObjectStore;

pub const JWT_SECRET: &str = "test-secret-with-enough-entropy";

/// A migrated database and media directory living in a temp dir for one test.
pub struct TestEnv {
    pub dir: TempDir,
    pub db: Database,
    pub config: Config,
}

impl TestEnv {
    pub async fn new() -> Self {
        Self::with_ml_url("http://127.0.0.1:9").await
    }

    pub async fn with_ml_url(ml_url: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let db = Database::connect_and_migrate(&DbConfig::for_path(dir.path().join("test.db")))
            .await
            .unwrap();
        let config = test_config(&dir, ml_url);
        Self { dir, db, config }
    }

    pub async fn state(&self) -> AppState {
        let store = LocalObjectStore::new(&self.config.media).await.unwrap();
        AppState::new(self.config.clone(), self.db.clone(), Arc::new(store))
    }

    pub async fn app(&self) -> Router {
        ouzi_backend::build_app(self.state().await)
    }

    /// Inserts a user row directly, returning its id.
    pub async fn user(&self, email: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        insert_user(self.db.pool(), &id, email, "Test", "not-a-hash")
            .await
            .unwrap();
        id
    }

    pub async fn module(&self, kind: ExerciseKind, title: &str) -> i64 {
        modules::create_module(&ctx(), &self.db, kind, title)
            .await
            .unwrap()
    }

    pub async fn word_exercise(&self, module_id: i64) -> i64 {
        exercises::create_word_exercise(&ctx(), &self.db, &word_exercise_input(module_id))
            .await
            .unwrap()
    }

    pub async fn phrase_exercise(&self, module_id: i64) -> i64 {
        exercises::create_phrase_exercise(&ctx(), &self.db, &phrase_exercise_input(module_id))
            .await
            .unwrap()
    }
}

pub fn test_config(dir: &TempDir, ml_url: &str) -> Config {
    Config {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        log_level: "warn".to_string(),
        request_timeout: Duration::from_secs(10),
        auth: AuthConfig {
            jwt_secret: Some(JWT_SECRET.to_string()),
            jwt_expires_in: "1h".to_string(),
            bcrypt_cost: 4,
        },
        ml: MlConfig {
            base_url: ml_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(500),
        },
        media: MediaConfig {
            dir: dir.path().join("media"),
            public_url: "http://localhost:8080".to_string(),
            url_ttl: Duration::from_secs(60),
            signing_secret: Some("media-secret".to_string()),
            max_bytes: 1024,
        },
        audio_max_bytes: 1024,
    }
}

pub fn ctx() -> RequestContext {
    RequestContext::new("test-request")
}

pub fn word_exercise_input(module_id: i64) -> NewWordExercise {
    NewWordExercise {
        module_id,
        exercise_type: "pronounce".to_string(),
        words: vec!["кот".to_string(), "дом".to_string()],
        transcriptions: vec!["[kot]".to_string(), "[dom]".to_string()],
        translations: vec!["cat".to_string(), "house".to_string()],
        audio_links: vec!["a1".to_string(), "a2".to_string()],
    }
}

pub fn phrase_exercise_input(module_id: i64) -> NewPhraseExercise {
    NewPhraseExercise {
        module_id,
        exercise_type: "completeChain".to_string(),
        sentence: "Я иду домой".to_string(),
        transcription: "[ja idu damoj]".to_string(),
        translation: "I am going home".to_string(),
        audio_link: "p1".to_string(),
        chain: vec!["Я".to_string(), "иду".to_string(), "домой".to_string()],
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

/// Signs up through the API and returns the bearer token.
pub async fn sign_up(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/api/auth/signup",
            None,
            serde_json::json!({ "email": email, "name": "Learner", "password": "secret123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "signup failed: {body}");
    body["data"]["token"].as_str().unwrap().to_string()
}

pub fn multipart_body(boundary: &str, field: &str, file_name: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

pub fn multipart_request(uri: &str, token: Option<&str>, file_name: &str, data: &[u8]) -> Request<Body> {
    let boundary = "ouzi-test-boundary";
    let mut builder = Request::builder().method("POST").uri(uri).header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={boundary}"),
    );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(multipart_body(boundary, "file", file_name, data)))
        .unwrap()
}
