//! Tally Core Library
//!
//! Recurring payment (subscription) detection for a single user's
//! transaction history:
//! - Merchant name normalization and grouping
//! - Statistical detection from amount consistency and billing intervals
//! - AI-assisted detection (Ollama, OpenAI-compatible) with statistical fallback
//! - CSV/JSON transaction import
//! - Layered TOML configuration and a customizable prompt library

pub mod ai;
pub mod config;
pub mod detect;
pub mod error;
pub mod import;
pub mod merchant;
pub mod models;
pub mod prompts;
pub mod source;

/// Test utilities including a mock LLM server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{AIBackend, AIClient, ExternalSubscription, MockBackend};
pub use config::{AiBackendKind, AiConfig, TallyConfig};
pub use detect::{
    build_detector, rank_candidates, run_detection, AiDetector, BillingCalendar, DetectionConfig,
    FallbackDetector, StatisticalDetector, SubscriptionDetector,
};
pub use error::{Error, Result};
pub use merchant::{normalize_merchant, MerchantGroups};
pub use models::{Frequency, SubscriptionCandidate, Transaction, TransactionSummary};
pub use source::{CandidateSink, FileSource, InMemorySink, InMemorySource, TransactionSource};
