//! Router tests with mock classifiers

use async_trait::async_trait;
use authorcheck_classifiers::{
    AlgorithmRegistry, ClassificationResult, Classifier, Pipeline, ServingConfig, TrainedArtifact,
};
use authorcheck_core::{Error, Label, Result};
use authorcheck_server::commands::load_classifier;
use authorcheck_server::{create_router, AppState, PredictResponse};
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

/// A configurable mock classifier
struct MockClassifier {
    probability: f64,
    fail: bool,
    call_count: AtomicU32,
    last_text: std::sync::Mutex<Option<String>>,
}

impl MockClassifier {
    fn new() -> Self {
        Self {
            probability: 0.5,
            fail: false,
            call_count: AtomicU32::new(0),
            last_text: std::sync::Mutex::new(None),
        }
    }

    fn with_probability(mut self, probability: f64) -> Self {
        self.probability = probability;
        self
    }

    fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl Classifier for MockClassifier {
    async fn classify(&self, text: &str) -> Result<ClassificationResult> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        *self.last_text.lock().unwrap() = Some(text.to_string());
        if self.fail {
            return Err(Error::training("mock failure"));
        }
        Ok(ClassificationResult::from_probability(self.probability))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

fn origins() -> Vec<String> {
    ServingConfig::default().allowed_origins
}

fn predict_request(text: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::json!({ "text": text }).to_string()))
        .unwrap()
}

async fn predict_with(probability: f64) -> PredictResponse {
    let state = AppState::new(Arc::new(MockClassifier::new().with_probability(probability)));
    let app = create_router(state, &origins()).unwrap();
    let response = app.oneshot(predict_request("hello")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_predict_response_shape() {
    let state = AppState::new(Arc::new(MockClassifier::new().with_probability(0.9)));
    let app = create_router(state, &origins()).unwrap();

    let response = app.oneshot(predict_request("Hello there")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["confidence"], 90.0);
    assert_eq!(value["label"], "Likely AI");
}

#[tokio::test]
async fn test_predict_labels_by_threshold() {
    let human = predict_with(0.1234).await;
    assert_eq!(human.confidence, 12.34);
    assert_eq!(human.label.as_str(), "Likely Human");

    let mixed = predict_with(0.75).await;
    assert_eq!(mixed.confidence, 75.0);
    assert_eq!(mixed.label.as_str(), "Some AI assistance used");

    let ai = predict_with(0.7501).await;
    assert_eq!(ai.label.as_str(), "Likely AI");
}

#[tokio::test]
async fn test_predict_passes_raw_text_to_classifier() {
    let mock = Arc::new(MockClassifier::new());
    let state = AppState::new(mock.clone());
    let app = create_router(state, &origins()).unwrap();

    app.oneshot(predict_request("Dear Sam,\nThanks!")).await.unwrap();

    assert_eq!(mock.call_count.load(Ordering::SeqCst), 1);
    assert_eq!(
        mock.last_text.lock().unwrap().as_deref(),
        Some("Dear Sam,\nThanks!")
    );
}

#[tokio::test]
async fn test_predict_failure_is_server_error() {
    let state = AppState::new(Arc::new(MockClassifier::new().failing()));
    let app = create_router(state, &origins()).unwrap();

    let response = app.oneshot(predict_request("anything")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_predict_rejects_missing_text() {
    let state = AppState::new(Arc::new(MockClassifier::new()));
    let app = create_router(state, &origins()).unwrap();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_health() {
    let state = AppState::new(Arc::new(MockClassifier::new()));
    let app = create_router(state, &origins()).unwrap();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn test_cors_allows_configured_origin_only() {
    let state = AppState::new(Arc::new(MockClassifier::new()));
    let app = create_router(state, &origins()).unwrap();

    let preflight = |origin: &str| {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/predict")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap()
    };

    let allowed = app
        .clone()
        .oneshot(preflight("https://outlook.office.com"))
        .await
        .unwrap();
    assert_eq!(
        allowed.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "https://outlook.office.com"
    );
    assert_eq!(
        allowed
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .unwrap(),
        "true"
    );

    let denied = app.oneshot(preflight("https://evil.example")).await.unwrap();
    assert!(denied
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn test_invalid_origin_is_rejected() {
    let state = AppState::new(Arc::new(MockClassifier::new()));
    assert!(create_router(state, &["bad\norigin".to_string()]).is_err());
}

#[tokio::test]
async fn test_startup_loads_existing_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("naive_bayes.bin");

    let registry = AlgorithmRegistry::standard();
    let pipeline = Pipeline::fit(
        registry.get("naive_bayes").unwrap(),
        &["my dog went to the park", "as an ai language model"],
        &[Label::Human, Label::Ai],
    )
    .unwrap();
    TrainedArtifact::new("naive_bayes", pipeline)
        .save(&model_path)
        .unwrap();

    let config = ServingConfig {
        model_path,
        ..Default::default()
    };
    let classifier = load_classifier(&config).await.unwrap();
    assert_eq!(classifier.name(), "naive_bayes");

    let result = classifier.classify("As an AI language model.").await.unwrap();
    assert!((0.0..=100.0).contains(&result.confidence));
}

#[tokio::test]
async fn test_startup_fails_without_model_or_url() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServingConfig {
        model_path: dir.path().join("absent.bin"),
        model_url: None,
        ..Default::default()
    };
    assert!(load_classifier(&config).await.is_err());
}

#[tokio::test]
async fn test_startup_ignores_bad_url_when_artifact_present() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("naive_bayes.bin");

    let registry = AlgorithmRegistry::standard();
    let pipeline = Pipeline::fit(
        registry.get("naive_bayes").unwrap(),
        &["my dog went to the park", "as an ai language model"],
        &[Label::Human, Label::Ai],
    )
    .unwrap();
    TrainedArtifact::new("naive_bayes", pipeline)
        .save(&model_path)
        .unwrap();

    let config = ServingConfig {
        model_path,
        model_url: Some("definitely not a url".to_string()),
        ..Default::default()
    };
    let classifier = load_classifier(&config).await.unwrap();
    assert_eq!(classifier.name(), "naive_bayes");
}
