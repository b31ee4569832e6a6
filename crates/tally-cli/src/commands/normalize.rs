//! Merchant normalization preview

use anyhow::Result;
use tally_core::normalize_merchant;

pub fn cmd_normalize(merchants: &[String]) -> Result<()> {
    for (merchant, key) in normalized_pairs(merchants) {
        println!("  \"{}\" → {}", merchant, key);
    }
    Ok(())
}

/// Each input next to its grouping key
pub fn normalized_pairs(merchants: &[String]) -> Vec<(&str, String)> {
    merchants
        .iter()
        .map(|m| (m.as_str(), normalize_merchant(m)))
        .collect()
}
