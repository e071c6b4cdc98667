#![cfg(feature = "server")]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use voxledger::config::Config;
use voxledger::pipeline::{ParsePipeline, PipelineConfig};
use voxledger::server::{AppState, router};
use voxledger::{MockExtractor, MockTranscriber, SchemaValidator};

const BOUNDARY: &str = "voxledger-test-boundary";

const ENTRY: &str = r#"{"title":"Groceries","type":"expense","amount":500,"currency":"INR","needs_confirmation":{"date":true}}"#;

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, filename, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn parse_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn app_with(transcriber: MockTranscriber, extractor: MockExtractor, config: &Config) -> Router {
    let pipeline = ParsePipeline::new(
        Arc::new(transcriber),
        Arc::new(extractor),
        Arc::new(SchemaValidator::embedded().unwrap()),
        PipelineConfig::from_config(config),
    );
    router(AppState::new(pipeline), &config.server)
}

fn app(extractor: MockExtractor) -> Router {
    app_with(
        MockTranscriber::new("whisper-1"),
        extractor,
        &Config::default(),
    )
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let response = app(MockExtractor::new("llm"))
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"ok": true}));
}

#[tokio::test]
async fn hint_text_returns_validated_entry() {
    let response = app(MockExtractor::new("llm").with_response(ENTRY))
        .oneshot(parse_request(
            "/parse",
            &[
                Part::Text("hint_text", "paid 500 for groceries today"),
                Part::Text("tz", "Asia/Kolkata"),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    let body = json_body(response).await;
    assert_eq!(body["title"], "Groceries");
    assert_eq!(body["date"].as_str().unwrap().len(), 10);
}

#[tokio::test]
async fn versioned_route_is_an_alias() {
    let response = app(MockExtractor::new("llm").with_response(ENTRY))
        .oneshot(parse_request("/v1/parse", &[Part::Text("hint_text", "tea 20")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn audio_upload_is_transcribed() {
    let extractor = MockExtractor::new("llm").with_response(ENTRY);
    let app = app_with(
        MockTranscriber::new("whisper-1").with_response("spent 500 on groceries"),
        extractor.clone(),
        &Config::default(),
    );

    let response = app
        .oneshot(parse_request(
            "/parse",
            &[Part::File("audio", "memo.m4a", b"not really audio")],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extractor.transcripts(), vec!["spent 500 on groceries"]);
}

#[tokio::test]
async fn empty_form_is_bad_request() {
    let response = app(MockExtractor::new("llm"))
        .oneshot(parse_request("/parse", &[Part::Text("hint_text", "   ")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({"error": "no audio or hint_text provided"})
    );
}

#[tokio::test]
async fn non_multipart_body_is_bad_request() {
    let response = app(MockExtractor::new("llm"))
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/parse")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"hint_text":"tea"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "invalid multipart body");
}

#[tokio::test]
async fn audio_over_ceiling_is_payload_too_large() {
    let mut config = Config::default();
    config.server.max_upload_mb = 1;
    let transcriber = MockTranscriber::new("whisper-1");
    let app = app_with(
        transcriber.clone(),
        MockExtractor::new("llm").with_response(ENTRY),
        &config,
    );
    let audio = vec![0u8; 1024 * 1024 + 1];

    let response = app
        .oneshot(parse_request(
            "/parse",
            &[
                Part::File("audio", "long.m4a", &audio),
                Part::Text("hint_text", "fallback"),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json_body(response).await, json!({"error": "file too large"}));
    assert_eq!(transcriber.calls(), 0);
}

#[tokio::test]
async fn body_over_transport_limit_is_payload_too_large() {
    let mut config = Config::default();
    config.server.max_upload_mb = 1;
    let app = app_with(
        MockTranscriber::new("whisper-1"),
        MockExtractor::new("llm"),
        &config,
    );
    let audio = vec![0u8; 3 * 1024 * 1024];

    let response = app
        .oneshot(parse_request(
            "/parse",
            &[Part::File("audio", "huge.m4a", &audio)],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json_body(response).await["error"], "file too large");
}

#[tokio::test]
async fn zero_choices_echoes_transcript() {
    let response = app(MockExtractor::new("llm").with_no_choices())
        .oneshot(parse_request(
            "/parse",
            &[Part::Text("hint_text", "dinner 1200 split with Ana")],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        json_body(response).await,
        json!({"error": "could_not_parse", "transcript": "dinner 1200 split with Ana"})
    );
}

#[tokio::test]
async fn schema_violation_lists_details() {
    let response = app(MockExtractor::new("llm").with_response(r#"{"title":"Mystery"}"#))
        .oneshot(parse_request("/parse", &[Part::Text("hint_text", "mystery")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["error"], "schema_invalid");
    assert_eq!(body["transcript"], "mystery");
    assert!(!body["details"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn cors_preflight_allows_configured_origin() {
    let response = app(MockExtractor::new("llm"))
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/parse")
                .header(header::ORIGIN, "https://ledger.example")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
    let methods = response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS]
        .to_str()
        .unwrap()
        .to_string();
    assert!(methods.contains("POST"), "{methods}");
}

#[tokio::test]
async fn cors_origin_list_echoes_known_origin() {
    let mut config = Config::default();
    config.server.allow_origins = "https://a.example, https://b.example".to_string();
    let app = app_with(
        MockTranscriber::new("whisper-1"),
        MockExtractor::new("llm"),
        &config,
    );

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, "https://b.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://b.example"
    );
}
