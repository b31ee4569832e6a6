//! AI-backed detection and the fallback combinator

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::ai::{AIBackend, AIClient, ExternalSubscription};
use crate::error::{Error, Result};
use crate::merchant::{normalize_merchant, MerchantGroups};
use crate::models::{SubscriptionCandidate, Transaction, TransactionSummary};

use super::calendar::{next_billing_date, BillingCalendar};
use super::{rank_candidates, SubscriptionDetector};

/// Default upper bound on a single AI detection request
pub const DEFAULT_AI_TIMEOUT: Duration = Duration::from_secs(30);

/// Detector that asks an AI backend to find recurring charges.
///
/// The backend never sees transaction ids; its answers are matched back to
/// transactions by normalized merchant. Answers that match nothing are dropped.
#[derive(Clone)]
pub struct AiDetector {
    client: AIClient,
    calendar: BillingCalendar,
    timeout: Duration,
}

impl AiDetector {
    pub fn new(client: AIClient) -> Self {
        Self {
            client,
            calendar: BillingCalendar::default(),
            timeout: DEFAULT_AI_TIMEOUT,
        }
    }

    pub fn with_calendar(mut self, calendar: BillingCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn request(&self, summaries: &[TransactionSummary]) -> Result<Vec<ExternalSubscription>> {
        tokio::time::timeout(self.timeout, self.client.detect_subscriptions(summaries))
            .await
            .map_err(|_| Error::Timeout(self.timeout))?
    }

    /// Turn validated backend answers into candidates with member transactions
    fn associate(
        &self,
        external: Vec<ExternalSubscription>,
        transactions: &[Transaction],
    ) -> Vec<SubscriptionCandidate> {
        let groups = MerchantGroups::from_transactions(transactions);
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for sub in external {
            let key = normalize_merchant(&sub.merchant);
            if !seen.insert(key.clone()) {
                debug!(merchant = %key, "Ignoring duplicate AI result");
                continue;
            }

            let Some(group) = groups.get(&key) else {
                debug!(merchant = %sub.merchant, "AI result matches no transactions, dropping");
                continue;
            };

            let mut members = group.transactions.clone();
            members.sort_by_key(|t| t.date);
            let Some(last) = members.last().map(|t| t.date) else {
                continue;
            };
            let Some(next) = next_billing_date(last, sub.frequency, self.calendar) else {
                continue;
            };

            candidates.push(SubscriptionCandidate {
                merchant: key,
                amount: sub.amount.abs(),
                frequency: sub.frequency,
                confidence: sub.confidence,
                transactions: members,
                next_billing_date: next,
            });
        }

        candidates
    }
}

#[async_trait]
impl SubscriptionDetector for AiDetector {
    fn name(&self) -> &str {
        "ai"
    }

    async fn detect_all(&self, transactions: &[Transaction]) -> Result<Vec<SubscriptionCandidate>> {
        if transactions.is_empty() {
            return Ok(Vec::new());
        }

        let summaries: Vec<TransactionSummary> =
            transactions.iter().map(Transaction::summary).collect();

        let external = self.request(&summaries).await?;
        for sub in &external {
            sub.validate()?;
        }

        let returned = external.len();
        let candidates = self.associate(external, transactions);
        info!(
            model = self.client.model(),
            returned,
            matched = candidates.len(),
            "AI detection complete"
        );

        Ok(rank_candidates(candidates))
    }
}

/// Try `primary` once; on any error log it and return `fallback`'s result
pub struct FallbackDetector<P, F> {
    primary: P,
    fallback: F,
}

impl<P, F> FallbackDetector<P, F>
where
    P: SubscriptionDetector,
    F: SubscriptionDetector,
{
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl<P, F> SubscriptionDetector for FallbackDetector<P, F>
where
    P: SubscriptionDetector,
    F: SubscriptionDetector,
{
    fn name(&self) -> &str {
        self.primary.name()
    }

    async fn detect_all(&self, transactions: &[Transaction]) -> Result<Vec<SubscriptionCandidate>> {
        match self.primary.detect_all(transactions).await {
            Ok(candidates) => Ok(candidates),
            Err(e) => {
                warn!(
                    primary = self.primary.name(),
                    fallback = self.fallback.name(),
                    error = %e,
                    "Detector failed, using fallback"
                );
                self.fallback.detect_all(transactions).await
            }
        }
    }
}
