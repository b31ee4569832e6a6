//! Statistical recurring-charge detection
//!
//! Scores each merchant group on two signals:
//! - Amount consistency: `1 - σ/μ` over absolute amounts
//! - Interval regularity: RMS deviation of day gaps from the expected cadence
//!
//! The weighted sum is compared against a configurable threshold. Everything
//! here is pure and synchronous; no state outlives a single call.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::merchant::{MerchantGroup, MerchantGroups};
use crate::models::{Frequency, FrequencyEstimate, SubscriptionCandidate, Transaction};

use super::calendar::{next_billing_date, BillingCalendar};
use super::rank_candidates;

/// A single occurrence can't exhibit a recurrence
pub const MIN_GROUP_SIZE: usize = 2;

/// Day-interval window for one cadence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CadenceWindow {
    /// Smallest mean interval (inclusive) that matches this cadence
    pub min_days: f64,
    /// Largest mean interval (inclusive) that matches this cadence
    pub max_days: f64,
    /// Nominal period the deviation is measured against
    pub expected_days: f64,
}

impl CadenceWindow {
    pub fn contains(&self, mean_interval: f64) -> bool {
        mean_interval >= self.min_days && mean_interval <= self.max_days
    }

    /// `1 - rms(interval - expected) / expected`, floored at 0
    pub fn regularity(&self, intervals: &[i64]) -> f64 {
        if intervals.is_empty() || self.expected_days <= 0.0 {
            return 0.0;
        }
        let mean_sq = intervals
            .iter()
            .map(|&i| (i as f64 - self.expected_days).powi(2))
            .sum::<f64>()
            / intervals.len() as f64;
        (1.0 - mean_sq.sqrt() / self.expected_days).max(0.0)
    }
}

/// Detection policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Groups scoring below this are not reported
    pub confidence_threshold: f64,
    /// Weight of amount consistency in the overall score
    pub amount_weight: f64,
    /// Weight of interval regularity in the overall score
    pub frequency_weight: f64,
    pub monthly: CadenceWindow,
    pub yearly: CadenceWindow,
    /// Month-end rule for `next_billing_date`
    pub billing_calendar: BillingCalendar,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            amount_weight: 0.6,
            frequency_weight: 0.4,
            monthly: CadenceWindow {
                min_days: 25.0,
                max_days: 35.0,
                expected_days: 30.0,
            },
            yearly: CadenceWindow {
                min_days: 350.0,
                max_days: 380.0,
                expected_days: 365.0,
            },
            billing_calendar: BillingCalendar::Clamp,
        }
    }
}

/// Mean of absolute amounts and `1 - σ/μ` (population σ).
///
/// The consistency may be negative for wildly varying amounts. Returns `None`
/// when the mean is zero or there are no amounts.
pub fn amount_consistency(amounts: &[f64]) -> Option<(f64, f64)> {
    if amounts.is_empty() {
        return None;
    }
    let n = amounts.len() as f64;
    let abs: Vec<f64> = amounts.iter().map(|a| a.abs()).collect();
    let mean = abs.iter().sum::<f64>() / n;
    if mean == 0.0 || !mean.is_finite() {
        return None;
    }
    let variance = abs.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / n;
    Some((mean, 1.0 - variance.sqrt() / mean))
}

/// Day gaps between consecutive transactions (input must be date-sorted)
pub fn intervals(sorted: &[Transaction]) -> Vec<i64> {
    sorted
        .windows(2)
        .map(|w| (w[1].date - w[0].date).num_days().abs())
        .collect()
}

/// Match the mean interval against the monthly then yearly window
pub fn classify_frequency(intervals: &[i64], config: &DetectionConfig) -> FrequencyEstimate {
    if intervals.is_empty() {
        return FrequencyEstimate::none();
    }
    let mean = intervals.iter().sum::<i64>() as f64 / intervals.len() as f64;

    if config.monthly.contains(mean) {
        FrequencyEstimate {
            kind: Some(Frequency::Monthly),
            confidence: config.monthly.regularity(intervals),
        }
    } else if config.yearly.contains(mean) {
        FrequencyEstimate {
            kind: Some(Frequency::Yearly),
            confidence: config.yearly.regularity(intervals),
        }
    } else {
        FrequencyEstimate::none()
    }
}

/// Score one merchant group; `None` means "no pattern", never an error
pub fn analyze_group(
    merchant: &str,
    transactions: &[Transaction],
    config: &DetectionConfig,
) -> Option<SubscriptionCandidate> {
    if transactions.len() < MIN_GROUP_SIZE {
        return None;
    }

    let mut sorted = transactions.to_vec();
    sorted.sort_by_key(|t| t.date);

    let amounts: Vec<f64> = sorted.iter().map(|t| t.amount).collect();
    let Some((mean_amount, consistency)) = amount_consistency(&amounts) else {
        debug!(merchant, "Rejected: zero mean amount");
        return None;
    };

    let gaps = intervals(&sorted);
    let estimate = classify_frequency(&gaps, config);
    let Some(frequency) = estimate.kind else {
        debug!(merchant, ?gaps, "Rejected: no recognizable cadence");
        return None;
    };

    let confidence =
        config.amount_weight * consistency + config.frequency_weight * estimate.confidence;

    if confidence < config.confidence_threshold {
        debug!(
            merchant,
            confidence,
            consistency,
            regularity = estimate.confidence,
            "Rejected: below confidence threshold"
        );
        return None;
    }

    let last = sorted.last()?.date;
    let Some(next) = next_billing_date(last, frequency, config.billing_calendar) else {
        debug!(merchant, %last, "Rejected: next billing date out of range");
        return None;
    };

    debug!(merchant, %frequency, confidence, "Detected recurring charge");

    Some(SubscriptionCandidate {
        merchant: merchant.to_string(),
        amount: mean_amount,
        frequency,
        confidence: confidence.min(1.0),
        transactions: sorted,
        next_billing_date: next,
    })
}

/// Local detector: normalize, group, analyze, rank
#[derive(Debug, Clone, Default)]
pub struct StatisticalDetector {
    config: DetectionConfig,
}

impl StatisticalDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Run the full statistical pass. Never fails.
    pub fn detect(&self, transactions: &[Transaction]) -> Vec<SubscriptionCandidate> {
        let groups = MerchantGroups::from_transactions(transactions);

        let candidates: Vec<SubscriptionCandidate> = groups
            .recurring(MIN_GROUP_SIZE)
            .filter_map(|g: &MerchantGroup| analyze_group(&g.merchant, &g.transactions, &self.config))
            .collect();

        info!(
            transactions = transactions.len(),
            merchants = groups.len(),
            candidates = candidates.len(),
            "Statistical detection complete"
        );

        rank_candidates(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    /// Transactions starting at `start`, separated by `gaps` days
    fn series(merchant: &str, start: NaiveDate, gaps: &[i64], amounts: &[f64]) -> Vec<Transaction> {
        let mut date = start;
        let mut out = Vec::new();
        for (i, amount) in amounts.iter().enumerate() {
            if i > 0 {
                date += Duration::days(gaps[i - 1]);
            }
            out.push(Transaction::new(format!("{}-{}", merchant, i), date, merchant, *amount));
        }
        out
    }

    #[test]
    fn test_amount_consistency() {
        let (mean, c) = amount_consistency(&[-10.0, -10.0, -10.0]).unwrap();
        assert_eq!(mean, 10.0);
        assert_eq!(c, 1.0);

        // σ = 5, μ = 10
        let (mean, c) = amount_consistency(&[5.0, 15.0]).unwrap();
        assert_eq!(mean, 10.0);
        assert!((c - 0.5).abs() < 1e-9);

        assert!(amount_consistency(&[0.0, 0.0]).is_none());
        assert!(amount_consistency(&[]).is_none());
    }

    #[test]
    fn test_amount_consistency_can_go_negative() {
        let (_, c) = amount_consistency(&[1.0, 1.0, 1.0, 100.0]).unwrap();
        assert!(c < 0.0);
    }

    #[test]
    fn test_classify_frequency_windows() {
        let config = DetectionConfig::default();

        let monthly = classify_frequency(&[30, 30, 30], &config);
        assert_eq!(monthly.kind, Some(Frequency::Monthly));
        assert_eq!(monthly.confidence, 1.0);

        let yearly = classify_frequency(&[365, 366], &config);
        assert_eq!(yearly.kind, Some(Frequency::Yearly));
        assert!(yearly.confidence > 0.99);

        // Window edges are inclusive
        assert_eq!(classify_frequency(&[25], &config).kind, Some(Frequency::Monthly));
        assert_eq!(classify_frequency(&[35], &config).kind, Some(Frequency::Monthly));
        assert_eq!(classify_frequency(&[380], &config).kind, Some(Frequency::Yearly));

        let weekly = classify_frequency(&[7, 7, 7], &config);
        assert_eq!(weekly, FrequencyEstimate::none());
        assert_eq!(classify_frequency(&[], &config), FrequencyEstimate::none());
    }

    #[test]
    fn test_regularity_floors_at_zero() {
        // Mean 30 but wildly irregular
        let config = DetectionConfig::default();
        let est = classify_frequency(&[1, 59, 1, 59], &config);
        assert_eq!(est.kind, Some(Frequency::Monthly));
        assert!(est.confidence >= 0.0);
        assert!(est.confidence < 0.1);
    }

    #[test]
    fn test_exact_monthly_series_scores_high() {
        let txs = series("SPOTIFY", d(2024, 1, 1), &[30, 30, 30], &[-10.99; 4]);
        let candidate = analyze_group("SPOTIFY", &txs, &DetectionConfig::default()).unwrap();

        assert_eq!(candidate.frequency, Frequency::Monthly);
        assert!(candidate.confidence >= 0.9);
        assert!((candidate.amount - 10.99).abs() < 1e-9);
        assert_eq!(candidate.transactions.len(), 4);
    }

    #[test]
    fn test_irregular_inconsistent_group_rejected() {
        let txs = series(
            "CORNER STORE",
            d(2024, 1, 1),
            &[5, 47, 12],
            &[-4.50, -38.20, -12.00, -71.35],
        );
        assert!(analyze_group("CORNER STORE", &txs, &DetectionConfig::default()).is_none());
    }

    #[test]
    fn test_single_transaction_never_a_candidate() {
        let txs = series("AMAZON", d(2024, 1, 1), &[], &[-25.0]);
        assert!(analyze_group("AMAZON", &txs, &DetectionConfig::default()).is_none());
    }

    #[test]
    fn test_zero_amount_group_rejected() {
        let txs = series("FREE TRIAL", d(2024, 1, 1), &[30, 30], &[0.0, 0.0, 0.0]);
        assert!(analyze_group("FREE TRIAL", &txs, &DetectionConfig::default()).is_none());
    }

    #[test]
    fn test_yearly_series() {
        let txs = series("DOMAIN REG", d(2021, 6, 15), &[365, 365], &[-14.0, -14.0, -14.0]);
        let candidate = analyze_group("DOMAIN REG", &txs, &DetectionConfig::default()).unwrap();

        assert_eq!(candidate.frequency, Frequency::Yearly);
        assert_eq!(candidate.next_billing_date, d(2024, 6, 15));
    }

    #[test]
    fn test_members_sorted_and_stable_on_ties() {
        let mut txs = series("GYM", d(2024, 1, 10), &[30, 30], &[-50.0, -50.0, -50.0]);
        txs.reverse();
        // Same-day duplicate after the reversal; keeps its relative position
        let dup = Transaction::new("GYM-dup", d(2024, 1, 10), "GYM", -50.0);
        txs.push(dup);

        let mut config = DetectionConfig::default();
        config.monthly.min_days = 15.0;
        let candidate = analyze_group("GYM", &txs, &config).unwrap();

        let ids: Vec<_> = candidate.transactions.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["GYM-0", "GYM-dup", "GYM-1", "GYM-2"]);
    }

    #[test]
    fn test_threshold_is_configurable() {
        // Consistency 0.5, regularity 1.0 -> 0.6*0.5 + 0.4 = 0.7
        let txs = series("UTILITY", d(2024, 1, 1), &[30], &[-5.0, -15.0]);

        let mut strict = DetectionConfig::default();
        strict.confidence_threshold = 0.75;
        assert!(analyze_group("UTILITY", &txs, &strict).is_none());

        let mut lenient = DetectionConfig::default();
        lenient.confidence_threshold = 0.5;
        assert!(analyze_group("UTILITY", &txs, &lenient).is_some());
    }

    #[test]
    fn test_no_cadence_rejected_even_with_zero_threshold() {
        let txs = series("WEEKLY", d(2024, 1, 1), &[7, 7], &[-3.0, -3.0, -3.0]);
        let mut config = DetectionConfig::default();
        config.confidence_threshold = 0.0;
        assert!(analyze_group("WEEKLY", &txs, &config).is_none());
    }

    #[test]
    fn test_next_billing_uses_configured_calendar() {
        let txs = vec![
            Transaction::new("1", d(2022, 12, 31), "RENT", -1000.0),
            Transaction::new("2", d(2023, 1, 31), "RENT", -1000.0),
        ];

        let clamp = analyze_group("RENT", &txs, &DetectionConfig::default()).unwrap();
        assert_eq!(clamp.next_billing_date, d(2023, 2, 28));

        let overflow_config = DetectionConfig {
            billing_calendar: BillingCalendar::Overflow,
            ..DetectionConfig::default()
        };
        let overflow = analyze_group("RENT", &txs, &overflow_config).unwrap();
        assert_eq!(overflow.next_billing_date, d(2023, 3, 3));
    }

    #[test]
    fn test_detector_groups_and_ranks() {
        let mut txs = series("HULU", d(2024, 1, 1), &[28, 33, 29], &[-17.99; 4]);
        txs.extend(series("NETFLIX", d(2024, 1, 5), &[30, 30, 30], &[-15.99; 4]));
        txs.push(Transaction::new("one-off", d(2024, 2, 2), "AMAZON", -42.0));

        let detector = StatisticalDetector::default();
        let candidates = detector.detect(&txs);

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].merchant, "NETFLIX");
        assert_eq!(candidates[1].merchant, "HULU");
        assert!(candidates[0].confidence >= candidates[1].confidence);
        for c in &candidates {
            assert!(c.next_billing_date > c.last_seen().unwrap());
        }
    }

    #[test]
    fn test_detector_empty_input() {
        assert!(StatisticalDetector::default().detect(&[]).is_empty());
    }
}
