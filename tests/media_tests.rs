use axum::http::StatusCode;
use bytes::Bytes;
use tower::ServiceExt;

use ouzi_backend::storage::{LocalObjectStore, ObjectStore, StorageError};

mod common;

use common::{ctx, get, multipart_request, send, sign_up, TestEnv};

fn path_and_query(url: &str) -> &str {
    let rest = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    rest.find('/').map(|i| &rest[i..]).unwrap_or("/")
}

#[tokio::test]
async fn upload_fetch_open_and_delete() {
    let env = TestEnv::new().await;
    let store = LocalObjectStore::new(&env.config.media).await.unwrap();

    let reference = store
        .upload(&ctx(), Bytes::from_static(b"RIFFdata"), "voice.WAV")
        .await
        .unwrap();
    assert!(reference.ends_with(".wav"));
    assert!(store.dir().join(&reference).exists());

    let url = store.fetch(&ctx(), &reference).await.unwrap();
    assert!(url.starts_with("http://localhost:8080/media/"));

    let query = url.split_once('?').unwrap().1;
    let mut expires = 0;
    let mut signature = String::new();
    for pair in query.split('&') {
        match pair.split_once('=') {
            Some(("expires", v)) => expires = v.parse().unwrap(),
            Some(("signature", v)) => signature = v.to_string(),
            _ => {}
        }
    }
    let object = store.open_signed(&reference, expires, &signature).await.unwrap();
    assert_eq!(&object.bytes[..], b"RIFFdata");
    assert_eq!(object.content_type, "audio/wav");

    let err = store
        .open_signed(&reference, expires + 1, &signature)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidSignature));

    store.delete(&ctx(), &reference).await.unwrap();
    assert!(matches!(
        store.delete(&ctx(), &reference).await,
        Err(StorageError::NotFound(_))
    ));
    assert!(matches!(
        store.fetch(&ctx(), &reference).await,
        Err(StorageError::NotFound(_))
    ));
}

#[tokio::test]
async fn expired_urls_are_rejected() {
    let env = TestEnv::new().await;
    let store = LocalObjectStore::new(&env.config.media).await.unwrap();
    let reference = store
        .upload(&ctx(), Bytes::from_static(b"png"), "pic.png")
        .await
        .unwrap();

    let past = chrono::Utc::now().timestamp() - 10;
    let url = store.signed_url(&reference, past).unwrap();
    let signature = url.rsplit_once("signature=").unwrap().1;
    let err = store.open_signed(&reference, past, signature).await.unwrap_err();
    assert!(matches!(err, StorageError::Expired));
}

#[tokio::test]
async fn uploads_are_bounded_and_references_checked() {
    let env = TestEnv::new().await;
    let store = LocalObjectStore::new(&env.config.media).await.unwrap();

    assert!(matches!(
        store.upload(&ctx(), Bytes::new(), "a.wav").await,
        Err(StorageError::Empty)
    ));
    let big = Bytes::from(vec![1u8; env.config.media.max_bytes + 1]);
    assert!(matches!(
        store.upload(&ctx(), big, "a.wav").await,
        Err(StorageError::TooLarge { .. })
    ));
    assert!(matches!(
        store.fetch(&ctx(), "../test.db").await,
        Err(StorageError::InvalidReference)
    ));
}

#[tokio::test]
async fn media_routes_round_trip() {
    let env = TestEnv::new().await;
    let app = env.app().await;
    let token = sign_up(&app, "media@example.com").await;

    let (status, _) = send(&app, multipart_request("/api/media", None, "a.mp3", b"ID3")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        multipart_request("/api/media", Some(&token), "a.mp3", b"ID3audio"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let reference = body["data"]["reference"].as_str().unwrap().to_string();
    let url = body["data"]["url"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(get(path_and_query(&url), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "audio/mpeg");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"ID3audio");

    let (status, body) = send(&app, get(&format!("/api/media/{reference}/url"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["url"].as_str().unwrap().contains(&reference));

    let tampered = format!("/media/{reference}?expires=9999999999&signature=00");
    let (status, body) = send(&app, get(&tampered, None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let delete = axum::http::Request::builder()
        .method("DELETE")
        .uri(format!("/api/media/{reference}"))
        .header("authorization", format!("Bearer {token}"))
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.clone().oneshot(delete).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let (status, _) = send(&app, get(&format!("/api/media/{reference}/url"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
