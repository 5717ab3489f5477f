// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Chat-completions client against an in-process server

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use docflow::extraction::{
    ChatCompletionsModel, ChatMessage, ExtractionError, LanguageModel, LanguageModelConfig,
    ModelResponse, ModelSettings,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

/// One captured request: path with query, auth headers, JSON body
#[derive(Debug, Clone)]
struct Captured {
    path: String,
    authorization: Option<String>,
    api_key: Option<String>,
    body: Value,
}

#[derive(Clone)]
struct FakeChat {
    status: StatusCode,
    reply: &'static str,
    requests: Arc<Mutex<Vec<Captured>>>,
}

async fn handle(
    State(chat): State<FakeChat>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };
    chat.requests.lock().unwrap().push(Captured {
        path: uri.to_string(),
        authorization: header("authorization"),
        api_key: header("api-key"),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    if !chat.status.is_success() {
        return (chat.status, "upstream unavailable").into_response();
    }
    axum::Json(json!({
        "choices": [{"message": {"role": "assistant", "content": chat.reply}}]
    }))
    .into_response()
}

async fn start(status: StatusCode, reply: &'static str) -> (String, FakeChat) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let chat = FakeChat {
        status,
        reply,
        requests: Arc::new(Mutex::new(Vec::new())),
    };

    let app = Router::new().fallback(handle).with_state(chat.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (base, chat)
}

fn messages() -> Vec<ChatMessage> {
    vec![
        ChatMessage::system("Extract: Invoice Total"),
        ChatMessage::user("DOCUMENT CONTENT:\nInvoice Total: $42.00"),
    ]
}

#[tokio::test]
async fn test_openai_routing_and_fixed_settings() {
    let (base, chat) = start(StatusCode::OK, r#"{"Invoice Total": "$42.00"}"#).await;
    let model = ChatCompletionsModel::new(&base, "gpt-4o-mini")
        .unwrap()
        .with_api_key("sk-test");

    let response = model
        .complete(&messages(), &ModelSettings::default())
        .await
        .unwrap();
    assert_eq!(
        response,
        ModelResponse::Text(r#"{"Invoice Total": "$42.00"}"#.to_string())
    );

    let requests = chat.requests.lock().unwrap();
    let request = &requests[0];
    assert_eq!(request.path, "/v1/chat/completions");
    assert_eq!(request.authorization.as_deref(), Some("Bearer sk-test"));
    assert_eq!(request.body["model"], "gpt-4o-mini");
    assert_eq!(request.body["temperature"], 0.0);
    assert_eq!(request.body["top_p"], 1.0);
    assert_eq!(request.body["max_tokens"], 1000);
    assert_eq!(request.body["messages"][0]["role"], "system");
    assert_eq!(request.body["messages"][1]["role"], "user");
}

#[tokio::test]
async fn test_azure_routing_uses_api_key_header() {
    let (base, chat) = start(StatusCode::OK, "{}").await;
    let model = ChatCompletionsModel::from_config(&LanguageModelConfig {
        endpoint: Some(base),
        api_key: Some("azure-secret".to_string()),
        azure_deployment: Some("extractor".to_string()),
        ..LanguageModelConfig::default()
    })
    .unwrap();

    model
        .complete(&messages(), &ModelSettings::default())
        .await
        .unwrap();

    let requests = chat.requests.lock().unwrap();
    assert_eq!(
        requests[0].path,
        "/openai/deployments/extractor/chat/completions?api-version=2024-02-01"
    );
    assert_eq!(requests[0].api_key.as_deref(), Some("azure-secret"));
    assert!(requests[0].authorization.is_none());
}

#[tokio::test]
async fn test_server_error_is_api_error() {
    let (base, _) = start(StatusCode::SERVICE_UNAVAILABLE, "").await;
    let model = ChatCompletionsModel::new(&base, "gpt-4o-mini").unwrap();

    let err = model
        .complete(&messages(), &ModelSettings::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractionError::Api { status: 503, .. }));
}

#[test]
fn test_missing_endpoint_is_rejected() {
    assert!(ChatCompletionsModel::from_config(&LanguageModelConfig::default()).is_err());
}

#[tokio::test]
async fn test_slow_server_reports_configured_timeout() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let app = Router::new().fallback(|| async {
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        "late"
    });
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let model = ChatCompletionsModel::from_config(&LanguageModelConfig {
        endpoint: Some(base),
        timeout_secs: 1,
        ..LanguageModelConfig::default()
    })
    .unwrap();

    let err = model
        .complete(&messages(), &ModelSettings::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractionError::Timeout { timeout_ms: 1000, .. }));
    assert!(err.to_string().contains("1000ms"));
}
