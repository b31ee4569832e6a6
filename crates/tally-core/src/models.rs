//! Domain models for Tally

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A financial transaction as delivered by the transaction source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub date: NaiveDate,
    /// Free-text merchant name as it appears on the statement
    pub merchant: String,
    /// Negative = debit, positive = credit
    pub amount: f64,
    #[serde(default)]
    pub description: String,
}

impl Transaction {
    pub fn new(id: impl Into<String>, date: NaiveDate, merchant: &str, amount: f64) -> Self {
        Self {
            id: id.into(),
            date,
            merchant: merchant.to_string(),
            amount,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Reduce to the fields shared with the external inference service
    pub fn summary(&self) -> TransactionSummary {
        TransactionSummary {
            merchant: self.merchant.clone(),
            amount: self.amount,
            date: self.date,
            description: self.description.clone(),
        }
    }
}

/// Transaction fields sent to the AI backend.
///
/// Identity is deliberately not included; results are matched back to
/// transactions by normalized merchant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub merchant: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub description: String,
}

/// Billing frequency of a recurring charge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    /// Number of calendar months in one billing period
    pub fn months(&self) -> u32 {
        match self {
            Self::Monthly => 1,
            Self::Yearly => 12,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(format!("Unknown frequency: {}", other)),
        }
    }
}

/// Cadence inferred from the intervals between charges
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyEstimate {
    /// `None` when the mean interval matches no known cadence
    pub kind: Option<Frequency>,
    /// Interval regularity in [0, 1]
    pub confidence: f64,
}

impl FrequencyEstimate {
    pub fn none() -> Self {
        Self {
            kind: None,
            confidence: 0.0,
        }
    }
}

/// A freshly computed hypothesis that a merchant is a recurring charge
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionCandidate {
    /// Normalized merchant key
    pub merchant: String,
    /// Estimated recurring amount (absolute value)
    pub amount: f64,
    pub frequency: Frequency,
    /// Heuristic score in [0, 1]
    pub confidence: f64,
    /// Contributing transactions, ascending by date
    #[serde(rename = "member_transactions")]
    pub transactions: Vec<Transaction>,
    /// Strictly after the latest member transaction
    pub next_billing_date: NaiveDate,
}

impl SubscriptionCandidate {
    /// Date of the most recent member transaction
    pub fn last_seen(&self) -> Option<NaiveDate> {
        self.transactions.iter().map(|t| t.date).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_round_trip_str() {
        assert_eq!("monthly".parse::<Frequency>(), Ok(Frequency::Monthly));
        assert_eq!(" Yearly ".parse::<Frequency>(), Ok(Frequency::Yearly));
        assert!("weekly".parse::<Frequency>().is_err());
        assert_eq!(Frequency::Yearly.to_string(), "yearly");
    }

    #[test]
    fn test_frequency_serde_lowercase() {
        let json = serde_json::to_string(&Frequency::Monthly).unwrap();
        assert_eq!(json, "\"monthly\"");
        let parsed: Frequency = serde_json::from_str("\"yearly\"").unwrap();
        assert_eq!(parsed, Frequency::Yearly);
    }

    #[test]
    fn test_transaction_description_defaults_empty() {
        let tx: Transaction = serde_json::from_str(
            r#"{"id": "t1", "date": "2024-01-05", "merchant": "NETFLIX", "amount": -15.99}"#,
        )
        .unwrap();
        assert_eq!(tx.description, "");
        assert_eq!(tx.date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
    }

    #[test]
    fn test_candidate_serializes_member_transactions() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let candidate = SubscriptionCandidate {
            merchant: "NETFLIX".to_string(),
            amount: 15.99,
            frequency: Frequency::Monthly,
            confidence: 0.95,
            transactions: vec![Transaction::new("t1", date, "NETFLIX", -15.99)],
            next_billing_date: NaiveDate::from_ymd_opt(2024, 2, 5).unwrap(),
        };

        let json = serde_json::to_value(&candidate).unwrap();
        assert_eq!(json["frequency"], "monthly");
        assert_eq!(json["next_billing_date"], "2024-02-05");
        assert_eq!(json["member_transactions"].as_array().unwrap().len(), 1);
        assert_eq!(candidate.last_seen(), Some(date));
    }
}
