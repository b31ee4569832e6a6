//! Subscription detection
//!
//! Two interchangeable strategies behind [`SubscriptionDetector`]:
//! - [`StatisticalDetector`]: local amount/interval statistics, never fails
//! - [`AiDetector`]: delegates to an AI backend, may fail
//!
//! [`FallbackDetector`] composes them so an external failure degrades to the
//! statistical result instead of surfacing to the caller.

mod calendar;
mod fallback;
mod statistical;

pub use calendar::{next_billing_date, BillingCalendar};
pub use fallback::{AiDetector, FallbackDetector};
pub use statistical::{
    amount_consistency, analyze_group, classify_frequency, intervals, CadenceWindow,
    DetectionConfig, StatisticalDetector, MIN_GROUP_SIZE,
};

use async_trait::async_trait;
use tracing::info;

use crate::ai::AIClient;
use crate::config::TallyConfig;
use crate::error::Result;
use crate::models::{SubscriptionCandidate, Transaction};
use crate::source::{CandidateSink, TransactionSource};

/// A strategy that turns a transaction history into ranked candidates
#[async_trait]
pub trait SubscriptionDetector: Send + Sync {
    /// Short label for logs
    fn name(&self) -> &str;

    /// Detect recurring charges across the whole transaction set
    async fn detect_all(&self, transactions: &[Transaction]) -> Result<Vec<SubscriptionCandidate>>;
}

#[async_trait]
impl SubscriptionDetector for StatisticalDetector {
    fn name(&self) -> &str {
        "statistical"
    }

    async fn detect_all(&self, transactions: &[Transaction]) -> Result<Vec<SubscriptionCandidate>> {
        Ok(self.detect(transactions))
    }
}

/// Sort by confidence, highest first. Stable: ties keep detector order.
pub fn rank_candidates(mut candidates: Vec<SubscriptionCandidate>) -> Vec<SubscriptionCandidate> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    candidates
}

/// Statistical detector, fronted by AI detection when a client is given
pub fn build_detector(config: &TallyConfig, ai: Option<AIClient>) -> Box<dyn SubscriptionDetector> {
    let statistical = StatisticalDetector::new(config.detection.clone());
    match ai {
        Some(client) => {
            let primary = AiDetector::new(client)
                .with_calendar(config.detection.billing_calendar)
                .with_timeout(config.ai.timeout());
            Box::new(FallbackDetector::new(primary, statistical))
        }
        None => Box::new(statistical),
    }
}

/// Load from `source`, detect, rank, hand the result to `sink`, and return it
pub async fn run_detection<S, D, K>(
    source: &S,
    detector: &D,
    sink: &K,
) -> Result<Vec<SubscriptionCandidate>>
where
    S: TransactionSource + ?Sized,
    D: SubscriptionDetector + ?Sized,
    K: CandidateSink + ?Sized,
{
    let transactions = source.load_transactions().await?;
    let candidates = rank_candidates(detector.detect_all(&transactions).await?);

    info!(
        detector = detector.name(),
        transactions = transactions.len(),
        subscriptions = candidates.len(),
        "Detection run complete"
    );

    sink.store(&candidates).await?;
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Frequency;
    use crate::source::{InMemorySink, InMemorySource};
    use chrono::NaiveDate;

    fn candidate(merchant: &str, confidence: f64) -> SubscriptionCandidate {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        SubscriptionCandidate {
            merchant: merchant.to_string(),
            amount: 9.99,
            frequency: Frequency::Monthly,
            confidence,
            transactions: vec![Transaction::new("t", date, merchant, -9.99)],
            next_billing_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        }
    }

    #[test]
    fn test_rank_descending() {
        let ranked = rank_candidates(vec![
            candidate("A", 0.72),
            candidate("B", 0.98),
            candidate("C", 0.85),
        ]);
        let order: Vec<_> = ranked.iter().map(|c| c.merchant.as_str()).collect();
        assert_eq!(order, vec!["B", "C", "A"]);
    }

    #[test]
    fn test_rank_is_stable_on_ties() {
        let ranked = rank_candidates(vec![
            candidate("FIRST", 0.8),
            candidate("TOP", 0.9),
            candidate("SECOND", 0.8),
            candidate("THIRD", 0.8),
        ]);
        let order: Vec<_> = ranked.iter().map(|c| c.merchant.as_str()).collect();
        assert_eq!(order, vec!["TOP", "FIRST", "SECOND", "THIRD"]);

        for pair in ranked.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }

    #[test]
    fn test_rank_empty() {
        assert!(rank_candidates(Vec::new()).is_empty());
    }

    #[test]
    fn test_build_detector() {
        let config = TallyConfig::default();
        assert_eq!(build_detector(&config, None).name(), "statistical");
        assert_eq!(build_detector(&config, Some(AIClient::mock())).name(), "ai");
    }

    #[tokio::test]
    async fn test_run_detection_stores_ranked_output() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let transactions: Vec<Transaction> = (0..4)
            .map(|i| {
                let date = start + chrono::Duration::days(30 * i);
                Transaction::new(format!("n{}", i), date, "NETFLIX.COM", -15.99)
            })
            .collect();

        let source = InMemorySource::new(transactions);
        let sink = InMemorySink::new();
        let detector = StatisticalDetector::default();

        let result = run_detection(&source, &detector, &sink).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].merchant, "NETFLIX COM");

        let stored = sink.candidates();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].merchant, "NETFLIX COM");
    }
}
