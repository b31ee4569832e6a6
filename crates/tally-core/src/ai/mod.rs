//! Pluggable AI backend abstraction
//!
//! Backend-agnostic interface for asking a language model which merchants in a
//! transaction history are recurring charges.
//!
//! # Architecture
//!
//! - `AIBackend` trait: the interface every backend implements
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OllamaBackend`, `OpenAICompatibleBackend`, `MockBackend`
//!
//! # Configuration
//!
//! Clients are built only through [`AIClient::from_config`]. The `[ai]` table
//! and its environment overrides (`AI_BACKEND`, `OLLAMA_HOST`, ...) are resolved
//! in [`crate::config`].

mod mock;
mod ollama;
mod openai_compatible;
pub mod parsing;
pub mod types;

pub use mock::MockBackend;
pub use ollama::OllamaBackend;
pub use openai_compatible::OpenAICompatibleBackend;
pub use types::*;

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::warn;

use crate::config::{AiBackendKind, AiConfig};
use crate::error::{Error, Result};
use crate::models::TransactionSummary;
use crate::prompts::{PromptId, PromptLibrary};

pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";
pub const DEFAULT_OPENAI_COMPATIBLE_MODEL: &str = "gpt-3.5-turbo";

/// Interface for all AI backends
#[async_trait]
pub trait AIBackend: Send + Sync {
    /// Ask the model which merchants in `transactions` are recurring charges
    async fn detect_subscriptions(
        &self,
        transactions: &[TransactionSummary],
    ) -> Result<Vec<ExternalSubscription>>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;

    /// Model name (for logging)
    fn model(&self) -> &str;

    /// Host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete AI client enum
#[derive(Clone)]
pub enum AIClient {
    Ollama(OllamaBackend),
    /// Any server implementing `/v1/chat/completions`
    OpenAICompatible(OpenAICompatibleBackend),
    Mock(MockBackend),
}

impl AIClient {
    /// Build a client from resolved configuration.
    ///
    /// Returns `None` when AI is disabled or the selected backend has no host.
    pub fn from_config(config: &AiConfig) -> Option<Self> {
        match config.backend {
            AiBackendKind::None => None,
            AiBackendKind::Ollama => {
                let Some(host) = config.host.as_deref() else {
                    warn!("Ollama backend selected but no host configured");
                    return None;
                };
                let model = config.model.as_deref().unwrap_or(DEFAULT_OLLAMA_MODEL);
                Some(AIClient::Ollama(OllamaBackend::new(host, model)))
            }
            AiBackendKind::OpenAICompatible => {
                let Some(host) = config.host.as_deref() else {
                    warn!("OpenAI-compatible backend selected but no host configured");
                    return None;
                };
                let model = config
                    .model
                    .as_deref()
                    .unwrap_or(DEFAULT_OPENAI_COMPATIBLE_MODEL);
                let mut backend = OpenAICompatibleBackend::new(host, model);
                if let Some(key) = config.api_key.as_deref() {
                    backend = backend.with_api_key(key);
                }
                Some(AIClient::OpenAICompatible(backend))
            }
            AiBackendKind::Mock => Some(AIClient::mock()),
        }
    }

    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }

    /// Backend label for status output
    pub fn kind(&self) -> AiBackendKind {
        match self {
            AIClient::Ollama(_) => AiBackendKind::Ollama,
            AIClient::OpenAICompatible(_) => AiBackendKind::OpenAICompatible,
            AIClient::Mock(_) => AiBackendKind::Mock,
        }
    }
}

#[async_trait]
impl AIBackend for AIClient {
    async fn detect_subscriptions(
        &self,
        transactions: &[TransactionSummary],
    ) -> Result<Vec<ExternalSubscription>> {
        match self {
            AIClient::Ollama(b) => b.detect_subscriptions(transactions).await,
            AIClient::OpenAICompatible(b) => b.detect_subscriptions(transactions).await,
            AIClient::Mock(b) => b.detect_subscriptions(transactions).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::Ollama(b) => b.health_check().await,
            AIClient::OpenAICompatible(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::Ollama(b) => b.model(),
            AIClient::OpenAICompatible(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::Ollama(b) => b.host(),
            AIClient::OpenAICompatible(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}

/// Rendered (system, user) text for the detection prompt
pub(crate) fn render_detection_prompt(
    prompts: &RwLock<PromptLibrary>,
    transactions: &[TransactionSummary],
) -> Result<(String, String)> {
    let payload = serde_json::to_string_pretty(transactions)?;
    let count = transactions.len().to_string();

    let mut prompts = prompts
        .write()
        .map_err(|_| Error::InvalidData("Failed to acquire prompt library lock".into()))?;
    let template = prompts.get(PromptId::DetectSubscriptions)?;

    let mut vars = HashMap::new();
    vars.insert("transactions", payload.as_str());
    vars.insert("count", count.as_str());

    Ok((template.render_system(), template.render_user(&vars)))
}
