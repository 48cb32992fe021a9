use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

mod common;

use common::{get, json_request, send, sign_up, TestEnv};

#[tokio::test]
async fn health_reports_connected_database() {
    let env = TestEnv::new().await;
    let app = env.app().await;

    let (status, body) = send(&app, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "connected");

    let (status, _) = send(&app, get("/health/live", None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn ping_answers_pong() {
    let env = TestEnv::new().await;
    let app = env.app().await;

    let response = app.oneshot(get("/api/ping", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"pong");
}

#[tokio::test]
async fn request_id_is_echoed_or_generated() {
    let env = TestEnv::new().await;
    let app = env.app().await;

    let request = Request::builder()
        .uri("/api/ping")
        .header("x-request-id", "trace-me-42")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "trace-me-42");

    let response = app.oneshot(get("/api/ping", None)).await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let env = TestEnv::new().await;
    let app = env.app().await;

    let (status, body) = send(&app, get("/api/nope", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn signup_login_and_me() {
    let env = TestEnv::new().await;
    let app = env.app().await;

    let token = sign_up(&app, "Learner@Example.com").await;

    let (status, body) = send(&app, get("/api/auth/me", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "learner@example.com");
    assert!(body["data"].get("passwordHash").is_none());

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "email": "learner@example.com", "password": "secret123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["token"].is_string());

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "email": "learner@example.com", "password": "wrong-password" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn duplicate_signup_conflicts() {
    let env = TestEnv::new().await;
    let app = env.app().await;
    sign_up(&app, "dup@example.com").await;

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/signup",
            None,
            json!({ "email": "dup@example.com", "name": "Other", "password": "secret123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn session_cookie_authenticates() {
    let env = TestEnv::new().await;
    let app = env.app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/signup",
            None,
            json!({ "email": "c@example.com", "name": "Cookie", "password": "secret123" }),
        ))
        .await
        .unwrap();
    let cookie = response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("jwt-ouzi="));

    let request = Request::builder()
        .uri("/api/auth/me")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn password_change_revokes_old_tokens() {
    let env = TestEnv::new().await;
    let app = env.app().await;
    let old_token = sign_up(&app, "p@example.com").await;

    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            "/api/auth/password",
            Some(&old_token),
            json!({ "oldPassword": "secret123", "newPassword": "secret456" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let new_token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, _) = send(&app, get("/api/auth/me", Some(&old_token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, get("/api/auth/me", Some(&new_token))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let env = TestEnv::new().await;
    let app = env.app().await;

    let (status, _) = send(&app, get("/api/auth/me", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, get("/api/auth/me", Some("not.a.token"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/progress",
            None,
            json!({ "exerciseId": 1, "exerciseType": "word", "status": "completed" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, get("/api/modules/word/next", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn learning_flow_through_the_api() {
    let env = TestEnv::new().await;
    let app = env.app().await;
    let token = sign_up(&app, "flow@example.com").await;

    let (status, body) = send(
        &app,
        json_request("POST", "/api/modules/word", Some(&token), json!({ "title": "Animals" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let module_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/exercises/word",
            Some(&token),
            json!({
                "moduleId": module_id,
                "exerciseType": "guessWord",
                "words": ["кот"],
                "transcriptions": ["[kot]"],
                "translations": ["cat"],
                "audioLinks": [""],
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let exercise_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(&app, get("/api/modules/word/next", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["module"]["id"], module_id);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/progress",
            Some(&token),
            json!({ "exerciseId": exercise_id, "exerciseType": "word", "status": "completed" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["data"]["id"].as_i64().unwrap() > 0);

    let uri = format!("/api/modules/word/{module_id}/exercises");
    let (status, body) = send(&app, get(&uri, Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["exercises"][0]["status"], "completed");
    assert_eq!(body["data"]["exercises"][0]["kind"], "word");
    assert_eq!(body["data"]["exercises"][0]["exerciseType"], "guessWord");

    let (status, body) = send(&app, get(&uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["exercises"][0]["status"], "none");

    let progress_uri = format!("/api/progress/word/{exercise_id}");
    let (status, body) = send(&app, get(&progress_uri, Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");

    let (status, body) = send(&app, get("/api/modules/word/next", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["module"].is_null());
}

#[tokio::test]
async fn progress_validation_and_not_found_codes() {
    let env = TestEnv::new().await;
    let app = env.app().await;
    let token = sign_up(&app, "codes@example.com").await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/progress",
            Some(&token),
            json!({ "exerciseId": 1, "exerciseType": "word", "status": "bogus" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/progress",
            Some(&token),
            json!({ "exerciseId": 77, "exerciseType": "phrase", "status": "completed" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, get("/api/modules/sentence", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = send(&app, get("/api/modules/word/0/exercises", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, get("/api/modules/word/5/exercises", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let env = TestEnv::new().await;
    let app = env.app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}
