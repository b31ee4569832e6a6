//! Detection command implementation

use std::path::Path;

use anyhow::{Context, Result};
use tally_core::source::NullSink;
use tally_core::{
    build_detector, run_detection, AIClient, FileSource, SubscriptionCandidate, TallyConfig,
};
use tracing::warn;

use super::truncate;

pub async fn cmd_detect(config: &TallyConfig, file: &Path, use_ai: bool, json: bool) -> Result<()> {
    let candidates = detect_file(config, file, use_ai).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
    } else {
        print_candidates(&candidates);
    }

    Ok(())
}

/// Run detection over a transaction file and return ranked candidates
pub async fn detect_file(
    config: &TallyConfig,
    file: &Path,
    use_ai: bool,
) -> Result<Vec<SubscriptionCandidate>> {
    let ai = if use_ai {
        let client = AIClient::from_config(&config.ai);
        if client.is_none() {
            warn!("--ai given but no AI backend is configured; using statistical detection");
        }
        client
    } else {
        None
    };

    let detector = build_detector(config, ai);
    let source = FileSource::new(file);

    run_detection(&source, detector.as_ref(), &NullSink)
        .await
        .with_context(|| format!("Failed to detect subscriptions in {}", file.display()))
}

fn print_candidates(candidates: &[SubscriptionCandidate]) {
    if candidates.is_empty() {
        println!("No recurring charges found.");
        println!("  At least two charges from the same merchant are needed.");
        return;
    }

    println!();
    println!("📋 Detected Subscriptions");
    println!("   ─────────────────────────────────────────────────────────────────");

    for sub in candidates {
        println!(
            "   {:24} │ {:>9}/{:<7} │ {:>3.0}% │ next {} │ {} charges",
            truncate(&sub.merchant, 24),
            format!("${:.2}", sub.amount),
            sub.frequency.as_str(),
            sub.confidence * 100.0,
            sub.next_billing_date,
            sub.transactions.len()
        );
    }

    let monthly: f64 = candidates
        .iter()
        .map(|c| c.amount / c.frequency.months() as f64)
        .sum();

    println!();
    println!(
        "   {} subscriptions, about ${:.2}/month",
        candidates.len(),
        monthly
    );
}
