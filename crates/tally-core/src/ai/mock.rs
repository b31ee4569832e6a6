//! Mock backend for testing
//!
//! Deterministic in-process backend. Useful for unit tests and for running
//! the AI path without an LLM server (`AI_BACKEND=mock`).

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::TransactionSummary;

use super::parsing::parse_subscription_response;
use super::types::ExternalSubscription;
use super::AIBackend;

/// What the mock answers with
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Already-structured results
    Subscriptions(Vec<ExternalSubscription>),
    /// Raw model text, run through the real response parser
    Raw(String),
    /// Fail with this message
    Error(String),
}

/// Mock AI backend
#[derive(Debug, Clone)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    response: MockResponse,
    delay: Option<Duration>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Healthy, and reports no subscriptions
    pub fn new() -> Self {
        Self {
            healthy: true,
            response: MockResponse::Subscriptions(Vec::new()),
            delay: None,
        }
    }

    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    pub fn with_subscriptions(subscriptions: Vec<ExternalSubscription>) -> Self {
        Self {
            response: MockResponse::Subscriptions(subscriptions),
            ..Self::new()
        }
    }

    pub fn with_raw_response(raw: &str) -> Self {
        Self {
            response: MockResponse::Raw(raw.to_string()),
            ..Self::new()
        }
    }

    /// Every detection call fails
    pub fn failing() -> Self {
        Self {
            response: MockResponse::Error("mock backend failure".to_string()),
            ..Self::new()
        }
    }

    /// Sleep before answering (for timeout tests)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn detect_subscriptions(
        &self,
        _transactions: &[TransactionSummary],
    ) -> Result<Vec<ExternalSubscription>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.response {
            MockResponse::Subscriptions(subs) => Ok(subs.clone()),
            MockResponse::Raw(raw) => parse_subscription_response(raw),
            MockResponse::Error(msg) => Err(Error::Ai(msg.clone())),
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Frequency;

    #[tokio::test]
    async fn test_mock_default_is_empty() {
        let subs = MockBackend::new().detect_subscriptions(&[]).await.unwrap();
        assert!(subs.is_empty());
    }

    #[tokio::test]
    async fn test_mock_raw_response_is_parsed() {
        let mock = MockBackend::with_raw_response(
            r#"{"subscriptions": [{"merchant": "HULU", "amount": 17.99, "frequency": "monthly", "confidence": 0.9}]}"#,
        );
        let subs = mock.detect_subscriptions(&[]).await.unwrap();
        assert_eq!(subs[0].frequency, Frequency::Monthly);

        let broken = MockBackend::with_raw_response("{\"subscriptions\": \"nope\"}");
        assert!(broken.detect_subscriptions(&[]).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_failing() {
        let err = MockBackend::failing().detect_subscriptions(&[]).await.unwrap_err();
        assert!(matches!(err, Error::Ai(_)));
    }

    #[tokio::test]
    async fn test_mock_health_check() {
        assert!(MockBackend::new().health_check().await);
        assert!(!MockBackend::unhealthy().health_check().await);
    }
}
