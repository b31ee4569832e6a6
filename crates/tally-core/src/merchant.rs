//! Merchant name normalization and grouping
//!
//! Normalization is intentionally lossy. Punctuation, store numbers glued to
//! punctuation, and city/province suffixes are folded into a single key, so
//! different physical locations of the same chain are treated as one logical
//! merchant. Two transactions with equal keys belong to the same group.
//!
//! Punctuation becomes a word break rather than being deleted, so
//! `NETFLIX.COM` and `Netflix com` share a key. The cost is that apostrophe
//! variants split: `McDonald's` keys as `MCDONALD S`, `MCDONALDS` as
//! `MCDONALDS`.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::Transaction;

/// Anything that is not an uppercase ASCII letter, digit, or whitespace
static NON_KEY_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Z0-9\s]").expect("valid regex"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Canonicalize a free-text merchant name into a grouping key.
///
/// Uppercases, turns every character outside `[A-Z0-9]` and whitespace into a
/// separator, collapses whitespace runs to one space and trims. Total and
/// idempotent; empty input yields an empty key.
pub fn normalize_merchant(merchant: &str) -> String {
    let upper = merchant.to_uppercase();
    let stripped = NON_KEY_CHARS.replace_all(&upper, " ");
    WHITESPACE_RUN
        .replace_all(&stripped, " ")
        .trim()
        .to_string()
}

/// Transactions sharing one normalized merchant key, in input order
#[derive(Debug, Clone)]
pub struct MerchantGroup {
    pub merchant: String,
    pub transactions: Vec<Transaction>,
}

impl MerchantGroup {
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

/// Transactions partitioned by normalized merchant.
///
/// Groups are kept in order of first appearance so detection output is
/// deterministic for a given input.
#[derive(Debug, Clone, Default)]
pub struct MerchantGroups {
    groups: Vec<MerchantGroup>,
}

impl MerchantGroups {
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<MerchantGroup> = Vec::new();

        for tx in transactions {
            let key = normalize_merchant(&tx.merchant);
            match index.get(&key) {
                Some(&i) => groups[i].transactions.push(tx.clone()),
                None => {
                    index.insert(key.clone(), groups.len());
                    groups.push(MerchantGroup {
                        merchant: key,
                        transactions: vec![tx.clone()],
                    });
                }
            }
        }

        Self { groups }
    }

    /// Groups large enough to exhibit a recurrence
    pub fn recurring(&self, min_size: usize) -> impl Iterator<Item = &MerchantGroup> {
        self.groups.iter().filter(move |g| g.len() >= min_size)
    }

    pub fn get(&self, merchant: &str) -> Option<&MerchantGroup> {
        self.groups.iter().find(|g| g.merchant == merchant)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MerchantGroup> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
