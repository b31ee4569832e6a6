//! AI backend request/response types
//!
//! Backend-agnostic; shared by every implementation.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::merchant::normalize_merchant;
use crate::models::Frequency;

/// One recurring charge as reported by an AI backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalSubscription {
    /// Merchant as the model wrote it; re-normalized before matching
    pub merchant: String,
    pub amount: f64,
    pub frequency: Frequency,
    pub confidence: f64,
}

impl ExternalSubscription {
    /// Reject answers that can't become a valid candidate
    pub fn validate(&self) -> Result<()> {
        if normalize_merchant(&self.merchant).is_empty() {
            return Err(Error::InvalidData(format!(
                "AI result has no usable merchant: {:?}",
                self.merchant
            )));
        }
        if !self.amount.is_finite() {
            return Err(Error::InvalidData(format!(
                "AI result for {} has non-finite amount",
                self.merchant
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(Error::InvalidData(format!(
                "AI result for {} has confidence {} outside [0, 1]",
                self.merchant, self.confidence
            )));
        }
        Ok(())
    }
}

/// Top-level JSON object the detection prompt asks for
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    pub subscriptions: Vec<ExternalSubscription>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(amount: f64, confidence: f64) -> ExternalSubscription {
        ExternalSubscription {
            merchant: "NETFLIX".to_string(),
            amount,
            frequency: Frequency::Monthly,
            confidence,
        }
    }

    #[test]
    fn test_validate() {
        assert!(sub(15.99, 0.9).validate().is_ok());
        assert!(sub(-15.99, 0.0).validate().is_ok());
        assert!(sub(15.99, 1.0).validate().is_ok());

        assert!(sub(f64::NAN, 0.9).validate().is_err());
        assert!(sub(f64::INFINITY, 0.9).validate().is_err());
        assert!(sub(15.99, 1.01).validate().is_err());
        assert!(sub(15.99, -0.1).validate().is_err());
        assert!(sub(15.99, f64::NAN).validate().is_err());
    }

    #[test]
    fn test_validate_empty_merchant() {
        let mut s = sub(1.0, 0.5);
        s.merchant = "  ".to_string();
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_validate_symbol_only_merchant() {
        let mut s = sub(1.0, 0.5);
        s.merchant = "***".to_string();
        assert!(s.validate().is_err());

        s.merchant = "*NETFLIX*".to_string();
        assert!(s.validate().is_ok());
    }
}
