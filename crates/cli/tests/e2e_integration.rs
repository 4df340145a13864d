//! End-to-end integration tests for the localllm server.
//!
//! These tests exercise the full pipeline from configuration and model
//! discovery through the HTTP router to the completion envelope.

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use tower::ServiceExt;

use localllm_config::{AppConfig, ModelConfig};
use localllm_core::error::GenerationError;
use localllm_core::generator::{GenerationRequest, Generator};
use localllm_core::{CompletionResponse, CompletionRouter};
use localllm_gateway::{GatewayState, HealthResponse, build_router};

// ── Scripted Generator ───────────────────────────────────────────────────

/// A generator that returns scripted continuations in sequence and records
/// the prompts it was given.
struct ScriptedGenerator {
    outputs: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn new(outputs: &[&str]) -> Self {
        Self {
            outputs: Mutex::new(outputs.iter().rev().map(|s| s.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl Generator for ScriptedGenerator {
    fn name(&self) -> &str {
        "e2e_scripted"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(request.prompt);
        self.outputs
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| GenerationError::Inference("script exhausted".into()))
    }
}

fn app(router: CompletionRouter) -> axum::Router {
    build_router(
        Arc::new(GatewayState::new(router)),
        &AppConfig::default().server,
    )
}

async fn chat(app: axum::Router, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let req = Request::builder()
        .method("POST")
        .uri("/v1/chat/completions")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// ── E2E: Mock mode ───────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_missing_model_dir_serves_mock_responses() {
    let model = ModelConfig {
        path: "/nonexistent/localllm-models".into(),
        ..ModelConfig::default()
    };
    let router = CompletionRouter::new(localllm_providers::load_generator(&model));
    assert!(!router.model_loaded());

    let (status, json) = chat(
        app(router),
        serde_json::json!({
            "model": "phi-3-mini",
            "messages": [{"role": "user", "content": "Tell me about shepherd dogs"}]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let resp: CompletionResponse = serde_json::from_value(json).unwrap();
    assert_eq!(resp.model, "phi-3-mini");
    assert!(resp.content().contains(
        "shepherd breeds are working dogs originally bred for herding livestock"
    ));
}

#[tokio::test]
async fn e2e_mock_priority_and_fallback() {
    let (_, terrier) = chat(
        app(CompletionRouter::mock()),
        serde_json::json!({
            "model": "m",
            "messages": [{"role": "user", "content": "my terrier loves bulldogs"}]
        }),
    )
    .await;
    let content = terrier["choices"][0]["message"]["content"].as_str().unwrap();
    assert!(content.contains("terrier breeds"));
    assert!(!content.contains("bulldog"));

    let (_, fallback) = chat(
        app(CompletionRouter::mock()),
        serde_json::json!({
            "model": "m",
            "messages": [{"role": "user", "content": "What about poodles?"}]
        }),
    )
    .await;
    let content = fallback["choices"][0]["message"]["content"].as_str().unwrap();
    assert!(content.contains("'What about poodles?'"));
}

#[tokio::test]
async fn e2e_health_tracks_backend() {
    let req = || Request::builder().uri("/health").body(Body::empty()).unwrap();

    let response = app(CompletionRouter::mock()).oneshot(req()).await.unwrap();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let health: HealthResponse = serde_json::from_slice(&bytes).unwrap();
    assert!(!health.model_loaded);

    let router = CompletionRouter::new(Some(Arc::new(ScriptedGenerator::new(&[]))));
    let response = app(router).oneshot(req()).await.unwrap();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let health: HealthResponse = serde_json::from_slice(&bytes).unwrap();
    assert!(health.model_loaded);
}

// ── E2E: Loaded generator ────────────────────────────────────────────────

#[tokio::test]
async fn e2e_conversation_is_flattened_in_order() {
    let generator = Arc::new(ScriptedGenerator::new(&[" Dachshunds were bred to hunt badgers.\n"]));
    let router = CompletionRouter::new(Some(generator.clone()));

    let (status, json) = chat(
        app(router),
        serde_json::json!({
            "model": "local-gguf",
            "messages": [
                {"role": "system", "content": "You answer questions about dog breeds."},
                {"role": "user", "content": "Name a hound."},
                {"role": "assistant", "content": "The dachshund."},
                {"role": "function", "content": "{\"ignored\": true}"},
                {"role": "user", "content": "What was it bred for?"}
            ],
            "temperature": 0.1,
            "max_tokens": 32
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["choices"][0]["message"]["content"],
        "Dachshunds were bred to hunt badgers."
    );
    assert_eq!(json["model"], "local-gguf");

    let prompts = generator.prompts.lock().unwrap();
    assert_eq!(
        prompts[0],
        "System: You answer questions about dog breeds.\n\n\
         User: Name a hound.\n\n\
         Assistant: The dachshund.\n\n\
         User: What was it bred for?\n\n\
         Assistant: "
    );
}

#[tokio::test]
async fn e2e_generator_failure_surfaces_as_500() {
    let router = CompletionRouter::new(Some(Arc::new(ScriptedGenerator::new(&[]))));
    let (status, json) = chat(
        app(router),
        serde_json::json!({
            "model": "m",
            "messages": [{"role": "user", "content": "hi"}]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["detail"].as_str().unwrap().contains("script exhausted"));
}

#[tokio::test]
async fn e2e_concurrent_requests_share_one_router() {
    let app = app(CompletionRouter::mock());
    let mut handles = Vec::new();
    for i in 0..8 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            let (status, json) = chat(
                app,
                serde_json::json!({
                    "model": format!("model-{i}"),
                    "messages": [{"role": "user", "content": "hounds?"}]
                }),
            )
            .await;
            (i, status, json)
        }));
    }

    for handle in handles {
        let (i, status, json) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["model"], format!("model-{i}"));
        assert!(
            json["choices"][0]["message"]["content"]
                .as_str()
                .unwrap()
                .contains("hounds are a group of hunting dogs")
        );
    }
}

#[tokio::test]
async fn e2e_unloadable_model_file_falls_back_to_mock() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), "not a model").unwrap();
    std::fs::write(dir.path().join("broken.gguf"), b"\0\0\0\0").unwrap();

    let model = ModelConfig {
        path: dir.path().to_path_buf(),
        ..ModelConfig::default()
    };
    assert_eq!(
        localllm_providers::find_model_file(&model.path, &model.extension).unwrap(),
        dir.path().join("broken.gguf")
    );

    let router = CompletionRouter::new(localllm_providers::load_generator(&model));
    assert!(!router.model_loaded());

    let (status, json) = chat(
        app(router),
        serde_json::json!({
            "model": "phi-3-mini",
            "messages": [{"role": "user", "content": "Is a bulldog stubborn?"}]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap()
            .contains("bulldog")
    );
}
