//! Artifact acquisition against an in-process HTTP server

use authorcheck_classifiers::{ModelFetcher, ModelSource};
use authorcheck_core::Error;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const TOKEN: &str = "T0K3N";

fn payload() -> Vec<u8> {
    (0..200_000u32).map(|i| (i % 251) as u8).collect()
}

#[derive(Clone, Default)]
struct Counters {
    requests: Arc<AtomicUsize>,
    confirmed: Arc<AtomicUsize>,
}

async fn direct_ok() -> Vec<u8> {
    payload()
}

async fn direct_fail() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Mimics the Drive interstitial: without `confirm` it answers with a
/// warning page and a `download_warning*` cookie, with it the real bytes.
async fn gated(
    State(counters): State<Counters>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    counters.requests.fetch_add(1, Ordering::SeqCst);
    if params.get("id").map(String::as_str) != Some("file123") {
        return StatusCode::NOT_FOUND.into_response();
    }
    match params.get("confirm") {
        Some(token) if token == TOKEN => {
            counters.confirmed.fetch_add(1, Ordering::SeqCst);
            payload().into_response()
        }
        Some(_) => StatusCode::FORBIDDEN.into_response(),
        None => (
            [(
                header::SET_COOKIE,
                format!("download_warning_13058_file123={}; Path=/", TOKEN),
            )],
            "<html>Google Drive can't scan this file for viruses.</html>",
        )
            .into_response(),
    }
}

/// Warning cookie on the first request, then a refusal on the confirmation
async fn refuses_confirmation(Query(params): Query<HashMap<String, String>>) -> Response {
    if params.contains_key("confirm") {
        return StatusCode::FORBIDDEN.into_response();
    }
    (
        [(
            header::SET_COOKIE,
            format!("download_warning_1_file123={}; Path=/", TOKEN),
        )],
        "<html>warning</html>",
    )
        .into_response()
}

/// Small files are served straight away, with no warning cookie
async fn ungated(State(counters): State<Counters>) -> Vec<u8> {
    counters.requests.fetch_add(1, Ordering::SeqCst);
    b"small artifact".to_vec()
}

/// Announces a large body, sends only part of it, then hangs up
async fn spawn_truncating_server() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = vec![0u8; 4096];
        let _ = socket.read(&mut request).await;
        let head = b"HTTP/1.1 200 OK\r\nContent-Length: 100000\r\n\r\n";
        socket.write_all(head).await.unwrap();
        socket.write_all(&payload()[..5000]).await.unwrap();
        socket.shutdown().await.unwrap();
    });
    addr
}

async fn spawn_server(counters: Counters) -> SocketAddr {
    let app = Router::new()
        .route("/direct/model.bin", get(direct_ok))
        .route("/direct/broken.bin", get(direct_fail))
        .route("/uc", get(gated))
        .route("/small/uc", get(ungated))
        .route("/refused/uc", get(refuses_confirmation))
        .with_state(counters);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn direct(addr: SocketAddr, path: &str) -> ModelSource {
    ModelSource::parse(&format!("http://{}{}", addr, path)).unwrap()
}

fn drive(file_id: &str) -> ModelSource {
    ModelSource::parse(&format!(
        "https://drive.google.com/file/d/{}/view?usp=sharing",
        file_id
    ))
    .unwrap()
}

#[tokio::test]
async fn test_direct_download_writes_full_body() {
    let addr = spawn_server(Counters::default()).await;
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("models").join("naive_bayes.bin");

    let fetcher = ModelFetcher::new().unwrap();
    let downloaded = fetcher
        .ensure(&dest, Some(&direct(addr, "/direct/model.bin")))
        .await
        .unwrap();

    assert!(downloaded);
    assert_eq!(std::fs::read(&dest).unwrap(), payload());
}

#[tokio::test]
async fn test_direct_non_success_leaves_no_file() {
    let addr = spawn_server(Counters::default()).await;
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("naive_bayes.bin");

    let err = ModelFetcher::new()
        .unwrap()
        .ensure(&dest, Some(&direct(addr, "/direct/broken.bin")))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert!(err.to_string().contains("500"));
    assert!(!dest.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_gated_download_confirms_token() {
    let counters = Counters::default();
    let addr = spawn_server(counters.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("naive_bayes.bin");

    let fetcher = ModelFetcher::new()
        .unwrap()
        .with_drive_endpoint(format!("http://{}/uc", addr));
    fetcher.ensure(&dest, Some(&drive("file123"))).await.unwrap();

    assert_eq!(counters.requests.load(Ordering::SeqCst), 2);
    assert_eq!(counters.confirmed.load(Ordering::SeqCst), 1);
    assert_eq!(std::fs::read(&dest).unwrap(), payload());
}

#[tokio::test]
async fn test_drive_without_warning_uses_first_response() {
    let counters = Counters::default();
    let addr = spawn_server(counters.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("model.bin");

    let fetcher = ModelFetcher::new()
        .unwrap()
        .with_drive_endpoint(format!("http://{}/small/uc", addr));
    fetcher.ensure(&dest, Some(&drive("tiny"))).await.unwrap();

    assert_eq!(counters.requests.load(Ordering::SeqCst), 1);
    assert_eq!(std::fs::read(&dest).unwrap(), b"small artifact");
}

#[tokio::test]
async fn test_existing_file_is_not_downloaded_again() {
    let counters = Counters::default();
    let addr = spawn_server(counters.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("model.bin");
    std::fs::write(&dest, b"already here").unwrap();

    let fetcher = ModelFetcher::new()
        .unwrap()
        .with_drive_endpoint(format!("http://{}/uc", addr));
    let downloaded = fetcher.ensure(&dest, Some(&drive("file123"))).await.unwrap();

    assert!(!downloaded);
    assert_eq!(counters.requests.load(Ordering::SeqCst), 0);
    assert_eq!(std::fs::read(&dest).unwrap(), b"already here");
}

#[tokio::test]
async fn test_missing_source_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ModelFetcher::new()
        .unwrap()
        .ensure(dir.path().join("model.bin"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[tokio::test]
async fn test_digest_mismatch_leaves_no_file() {
    let addr = spawn_server(Counters::default()).await;
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("model.bin");

    let err = ModelFetcher::new()
        .unwrap()
        .with_sha256(Some("00".repeat(32)))
        .ensure(&dest, Some(&direct(addr, "/direct/model.bin")))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Integrity { .. }));
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_digest_match_is_accepted() {
    let addr = spawn_server(Counters::default()).await;
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("model.bin");
    let digest = format!("{:x}", Sha256::digest(payload()));

    ModelFetcher::new()
        .unwrap()
        .with_sha256(Some(digest.to_uppercase()))
        .ensure(&dest, Some(&direct(addr, "/direct/model.bin")))
        .await
        .unwrap();

    assert_eq!(std::fs::read(&dest).unwrap(), payload());
}

#[tokio::test]
async fn test_unreachable_host_is_transport_error() {
    // Bind then drop to get a local port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("model.bin");
    let err = ModelFetcher::new()
        .unwrap()
        .ensure(&dest, Some(&direct(addr, "/model.bin")))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Transport(_)), "{}", err);
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_truncated_body_leaves_no_file() {
    let addr = spawn_truncating_server().await;
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("model.bin");

    let err = ModelFetcher::new()
        .unwrap()
        .ensure(&dest, Some(&direct(addr, "/model.bin")))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Transport(_)), "{}", err);
    assert!(!dest.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_refused_confirmation_is_http_error() {
    let addr = spawn_server(Counters::default()).await;
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("model.bin");

    let err = ModelFetcher::new()
        .unwrap()
        .with_drive_endpoint(format!("http://{}/refused/uc", addr))
        .ensure(&dest, Some(&drive("file123")))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Http { status: 403, .. }), "{}", err);
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_bad_url_is_ignored_when_artifact_present() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("model.bin");
    std::fs::write(&dest, b"already here").unwrap();

    let fetcher = ModelFetcher::new().unwrap();
    let downloaded = fetcher.ensure_url(&dest, Some("not a url")).await.unwrap();
    assert!(!downloaded);

    let missing = dir.path().join("other.bin");
    let err = fetcher.ensure_url(&missing, Some("not a url")).await.unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}
