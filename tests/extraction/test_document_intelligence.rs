// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Document intelligence client against an in-process analyze/poll server

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use docflow::extraction::{
    DocumentIntelligenceConfig, DocumentIntelligenceExtractor, ExtractionError, TextExtractor,
};
use docflow::PageImage;
use image::DynamicImage;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const KEY: &str = "test-key";

/// How every analyze operation on the fake server ends
#[derive(Clone)]
enum Outcome {
    /// Pages of lines, one entry per submitted document, after one "running" poll
    Succeed(Vec<Vec<Vec<&'static str>>>),
    Fail,
    NeverFinish,
}

#[derive(Clone)]
struct FakeService {
    base: String,
    outcome: Outcome,
    submitted: Arc<Mutex<Vec<Vec<u8>>>>,
    polls: Arc<Mutex<Vec<usize>>>,
    poll_count: Arc<AtomicUsize>,
}

async fn handle(
    State(service): State<FakeService>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if headers.get("Ocp-Apim-Subscription-Key").and_then(|v| v.to_str().ok()) != Some(KEY) {
        return (StatusCode::UNAUTHORIZED, "bad key").into_response();
    }

    let path = uri.path();
    if method == Method::POST && path == "/formrecognizer/documentModels/prebuilt-document:analyze" {
        assert_eq!(uri.query(), Some("api-version=2023-07-31"));
        let request: Value = serde_json::from_slice(&body).unwrap();
        let source = request["base64Source"].as_str().unwrap();
        let mut submitted = service.submitted.lock().unwrap();
        submitted.push(STANDARD.decode(source).unwrap());
        service.polls.lock().unwrap().push(0);

        let location = format!("{}/operations/{}", service.base, submitted.len() - 1);
        return (StatusCode::ACCEPTED, [("Operation-Location", location)], "").into_response();
    }

    if method == Method::GET {
        if let Some(id) = path.strip_prefix("/operations/") {
            service.poll_count.fetch_add(1, Ordering::SeqCst);
            let id: usize = id.parse().unwrap();
            let polls = {
                let mut polls = service.polls.lock().unwrap();
                polls[id] += 1;
                polls[id]
            };

            let body = match &service.outcome {
                Outcome::Succeed(_) if polls == 1 => json!({"status": "running"}),
                Outcome::Succeed(documents) => {
                    let pages: Vec<Value> = documents[id]
                        .iter()
                        .map(|lines| {
                            json!({
                                "lines": lines.iter().map(|l| json!({"content": l})).collect::<Vec<_>>()
                            })
                        })
                        .collect();
                    json!({"status": "succeeded", "analyzeResult": {"pages": pages}})
                }
                Outcome::Fail => json!({
                    "status": "failed",
                    "error": {"code": "InvalidImage", "message": "image is corrupt"}
                }),
                Outcome::NeverFinish => json!({"status": "running"}),
            };
            return axum::Json(body).into_response();
        }
    }

    StatusCode::NOT_FOUND.into_response()
}

async fn start(outcome: Outcome) -> FakeService {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let service = FakeService {
        base: format!("http://{}", listener.local_addr().unwrap()),
        outcome,
        submitted: Arc::new(Mutex::new(Vec::new())),
        polls: Arc::new(Mutex::new(Vec::new())),
        poll_count: Arc::new(AtomicUsize::new(0)),
    };

    let app = Router::new().fallback(handle).with_state(service.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    service
}

fn config(service: &FakeService, key: &str) -> DocumentIntelligenceConfig {
    DocumentIntelligenceConfig {
        endpoint: Some(format!("{}/", service.base)),
        api_key: Some(key.to_string()),
        poll_interval_ms: 5,
        max_polls: 4,
        ..DocumentIntelligenceConfig::default()
    }
}

fn images(count: usize) -> Vec<PageImage> {
    (0..count)
        .map(|i| PageImage::new(DynamicImage::new_rgb8(20 + i as u32, 10)))
        .collect()
}

#[tokio::test]
async fn test_lines_space_joined_images_newline_joined() {
    let service = start(Outcome::Succeed(vec![
        vec![vec!["Invoice", "Total: $42.00"], vec!["Page two"]],
        vec![vec!["Second image"]],
    ]))
    .await;
    let extractor = DocumentIntelligenceExtractor::from_config(&config(&service, KEY)).unwrap();

    let text = extractor.extract_text(&images(2)).await.unwrap();
    assert_eq!(text, "Invoice Total: $42.00 Page two\nSecond image");

    // Images without a known format travel as PNG
    let submitted = service.submitted.lock().unwrap();
    assert_eq!(submitted.len(), 2);
    assert!(submitted.iter().all(|bytes| bytes.starts_with(&[0x89, b'P', b'N', b'G'])));
    assert_eq!(service.poll_count.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_known_format_is_preserved() {
    let service = start(Outcome::Succeed(vec![vec![vec!["scan"]]])).await;
    let extractor = DocumentIntelligenceExtractor::from_config(&config(&service, KEY)).unwrap();

    let page = PageImage::with_format(DynamicImage::new_rgb8(16, 16), image::ImageFormat::Jpeg);
    extractor.extract_text(&[page]).await.unwrap();

    let submitted = service.submitted.lock().unwrap();
    assert!(submitted[0].starts_with(&[0xFF, 0xD8, 0xFF]));
}

#[tokio::test]
async fn test_failed_operation_is_backend_error() {
    let service = start(Outcome::Fail).await;
    let extractor = DocumentIntelligenceExtractor::from_config(&config(&service, KEY)).unwrap();

    let err = extractor.extract_text(&images(1)).await.unwrap_err();
    match err {
        ExtractionError::Backend { message, .. } => assert!(message.contains("InvalidImage")),
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_poll_budget_exhausted_is_timeout() {
    let service = start(Outcome::NeverFinish).await;
    let extractor = DocumentIntelligenceExtractor::from_config(&config(&service, KEY)).unwrap();

    let err = extractor.extract_text(&images(1)).await.unwrap_err();
    assert!(matches!(err, ExtractionError::Timeout { .. }));
    assert_eq!(service.poll_count.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_rejected_key_is_api_error() {
    let service = start(Outcome::Succeed(vec![])).await;
    let extractor =
        DocumentIntelligenceExtractor::from_config(&config(&service, "wrong-key")).unwrap();

    let err = extractor.extract_text(&images(1)).await.unwrap_err();
    assert!(matches!(err, ExtractionError::Api { status: 401, .. }));
}

#[tokio::test]
async fn test_no_images_no_requests() {
    let service = start(Outcome::Succeed(vec![])).await;
    let extractor = DocumentIntelligenceExtractor::from_config(&config(&service, KEY)).unwrap();

    assert_eq!(extractor.extract_text(&[]).await.unwrap(), "");
    assert!(service.submitted.lock().unwrap().is_empty());
}

#[test]
fn test_unconfigured_client_is_rejected() {
    let err = DocumentIntelligenceExtractor::from_config(&DocumentIntelligenceConfig::default())
        .unwrap_err();
    assert!(matches!(err, ExtractionError::Backend { .. }));
}

#[tokio::test]
async fn test_slow_analyze_reports_request_timeout() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let app = Router::new().fallback(|| async {
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        StatusCode::ACCEPTED
    });
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let extractor = DocumentIntelligenceExtractor::from_config(&DocumentIntelligenceConfig {
        endpoint: Some(base),
        api_key: Some(KEY.to_string()),
        request_timeout_secs: 1,
        ..DocumentIntelligenceConfig::default()
    })
    .unwrap();

    let err = extractor.extract_text(&images(1)).await.unwrap_err();
    assert!(matches!(err, ExtractionError::Timeout { timeout_ms: 1000, .. }));
}
