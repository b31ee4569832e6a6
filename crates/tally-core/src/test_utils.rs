//! Test utilities for tally-core
//!
//! A mock LLM server speaking both the Ollama and OpenAI-compatible APIs, for
//! exercising the real HTTP backends without a model running.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;

/// How the mock answers detection requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockLlmBehavior {
    /// Well-formed subscription JSON
    Valid,
    /// 200 OK but the model text isn't the expected schema
    Malformed,
    /// 500 Internal Server Error
    HttpError,
    /// Valid answer after a long delay
    Slow,
}

/// Delay used by [`MockLlmBehavior::Slow`]
pub const SLOW_RESPONSE_DELAY: Duration = Duration::from_secs(3);

/// Model text returned for [`MockLlmBehavior::Valid`]
pub const VALID_SUBSCRIPTIONS_JSON: &str = r#"{"subscriptions": [
  {"merchant": "NETFLIX.COM", "amount": 15.99, "frequency": "monthly", "confidence": 0.95},
  {"merchant": "Spotify USA", "amount": 10.99, "frequency": "monthly", "confidence": 0.9}
]}"#;

const MALFORMED_CONTENT: &str = r#"{"subscriptions": [{"merchant": "NETFLIX.COM", "frequency": "sometimes"}]}"#;

/// Mock LLM server bound to an ephemeral local port
pub struct MockLlmServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockLlmServer {
    /// Start the mock server on an available port
    pub async fn start(behavior: MockLlmBehavior) -> Self {
        let app = Router::new()
            .route("/api/tags", get(handle_tags))
            .route("/api/generate", post(handle_generate))
            .route("/v1/models", get(handle_models))
            .route("/v1/chat/completions", post(handle_chat))
            .with_state(behavior);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockLlmServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Model text for a behavior, or `None` for an HTTP failure
async fn model_text(behavior: MockLlmBehavior) -> Option<&'static str> {
    match behavior {
        MockLlmBehavior::Valid => Some(VALID_SUBSCRIPTIONS_JSON),
        MockLlmBehavior::Malformed => Some(MALFORMED_CONTENT),
        MockLlmBehavior::HttpError => None,
        MockLlmBehavior::Slow => {
            tokio::time::sleep(SLOW_RESPONSE_DELAY).await;
            Some(VALID_SUBSCRIPTIONS_JSON)
        }
    }
}

fn server_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "model crashed").into_response()
}

async fn handle_tags() -> Json<Value> {
    Json(json!({
        "models": [{"name": "llama3.2:latest", "modified_at": "2024-01-01T00:00:00Z", "size": 2_000_000_000u64}]
    }))
}

async fn handle_models() -> Json<Value> {
    Json(json!({
        "object": "list",
        "data": [{"id": "test-model", "object": "model"}]
    }))
}

async fn handle_generate(
    State(behavior): State<MockLlmBehavior>,
    Json(_request): Json<Value>,
) -> Response {
    match model_text(behavior).await {
        Some(text) => Json(json!({
            "model": "llama3.2",
            "response": text,
            "done": true
        }))
        .into_response(),
        None => server_error(),
    }
}

async fn handle_chat(
    State(behavior): State<MockLlmBehavior>,
    Json(_request): Json<Value>,
) -> Response {
    match model_text(behavior).await {
        Some(text) => Json(json!({
            "id": "chatcmpl-mock",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": text},
                "finish_reason": "stop"
            }]
        }))
        .into_response(),
        None => server_error(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_starts_and_serves_health() {
        let server = MockLlmServer::start(MockLlmBehavior::Valid).await;
        let resp = reqwest::get(format!("{}/api/tags", server.url())).await.unwrap();
        assert!(resp.status().is_success());

        let resp = reqwest::get(format!("{}/v1/models", server.url())).await.unwrap();
        assert!(resp.status().is_success());
    }

    #[tokio::test]
    async fn test_mock_server_http_error() {
        let server = MockLlmServer::start(MockLlmBehavior::HttpError).await;
        let resp = reqwest::Client::new()
            .post(format!("{}/api/generate", server.url()))
            .json(&json!({"model": "x", "prompt": "y"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
