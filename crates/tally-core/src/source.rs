//! Collaborator interfaces for detection runs
//!
//! Detection never reaches for a database or session on its own. Callers
//! hand it a [`TransactionSource`] to read from and a [`CandidateSink`] to
//! write to, so the core can run against in-memory fixtures.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::import::parse_file;
use crate::models::{SubscriptionCandidate, Transaction};

/// Supplies one user's transactions
#[async_trait]
pub trait TransactionSource: Send + Sync {
    async fn load_transactions(&self) -> Result<Vec<Transaction>>;
}

/// Receives ranked candidates after a detection run
#[async_trait]
pub trait CandidateSink: Send + Sync {
    async fn store(&self, candidates: &[SubscriptionCandidate]) -> Result<()>;
}

/// Fixed list of transactions
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    transactions: Vec<Transaction>,
}

impl InMemorySource {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self { transactions }
    }
}

#[async_trait]
impl TransactionSource for InMemorySource {
    async fn load_transactions(&self) -> Result<Vec<Transaction>> {
        Ok(self.transactions.clone())
    }
}

/// Transactions read from a `.csv` or `.json` file on each load
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TransactionSource for FileSource {
    async fn load_transactions(&self) -> Result<Vec<Transaction>> {
        parse_file(&self.path)
    }
}

/// Keeps the most recent run's candidates
#[derive(Debug, Default)]
pub struct InMemorySink {
    candidates: Mutex<Vec<SubscriptionCandidate>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of what was last stored
    pub fn candidates(&self) -> Vec<SubscriptionCandidate> {
        self.candidates
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CandidateSink for InMemorySink {
    async fn store(&self, candidates: &[SubscriptionCandidate]) -> Result<()> {
        let mut stored = self
            .candidates
            .lock()
            .map_err(|_| Error::InvalidData("Candidate sink lock poisoned".into()))?;
        *stored = candidates.to_vec();
        Ok(())
    }
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

#[async_trait]
impl CandidateSink for NullSink {
    async fn store(&self, _candidates: &[SubscriptionCandidate]) -> Result<()> {
        Ok(())
    }
}
