//! AI backend and configuration command implementations

use std::path::Path;

use anyhow::Result;
use chrono::NaiveDate;
use tally_core::config::default_config_path;
use tally_core::{AIBackend, AIClient, AiBackendKind, AiDetector, SubscriptionDetector, TallyConfig, Transaction};

/// Check the configured AI backend and run a small detection through it
pub async fn cmd_ai_check(config: &TallyConfig) -> Result<()> {
    println!("🔍 Checking AI backend...\n");
    println!("  Backend: {}", config.ai.backend);

    let Some(client) = AIClient::from_config(&config.ai) else {
        println!();
        println!("⚠️  No AI backend configured. Detection uses statistics only.");
        println!();
        println!("To enable one:");
        println!("  export OLLAMA_HOST=http://localhost:11434");
        println!("  # or");
        println!("  export AI_BACKEND=openai_compatible OPENAI_COMPATIBLE_HOST=http://localhost:8080");
        return Ok(());
    };

    println!("  Host: {}", client.host());
    println!("  Model: {}", client.model());
    println!("  Timeout: {}s\n", config.ai.timeout_secs);

    print!("Checking availability... ");
    if !client.health_check().await {
        println!("❌ Failed");
        println!("\n⚠️  Could not reach {}", client.host());
        if client.kind() == AiBackendKind::Ollama {
            println!("\nTo set up Ollama:");
            println!("  1. Install Ollama: https://ollama.ai/download");
            println!("  2. Start the server: ollama serve");
            println!("  3. Pull the model: ollama pull {}", client.model());
        }
        return Ok(());
    }
    println!("✅ Connected");

    println!("\n📋 Sample detection...\n");
    let detector = AiDetector::new(client)
        .with_calendar(config.detection.billing_calendar)
        .with_timeout(config.ai.timeout());

    match detector.detect_all(&sample_transactions()).await {
        Ok(candidates) if candidates.is_empty() => {
            println!("  Model answered, but found no subscriptions in the sample");
        }
        Ok(candidates) => {
            for c in candidates {
                println!(
                    "  {} → ${:.2} {} ({:.0}%)",
                    c.merchant,
                    c.amount,
                    c.frequency,
                    c.confidence * 100.0
                );
            }
        }
        Err(e) => {
            println!("  ❌ Error: {}", e);
            println!("  Detection would fall back to statistics");
        }
    }

    Ok(())
}

/// Print the configuration after file and environment layering
pub fn cmd_config_show(config: &TallyConfig, path: Option<&Path>) -> Result<()> {
    let source = path
        .map(|p| p.display().to_string())
        .or_else(|| default_config_path().map(|p| p.display().to_string()))
        .unwrap_or_else(|| "(not available)".to_string());

    let d = &config.detection;
    println!("Config file: {}", source);
    println!();
    println!("[detection]");
    println!("  confidence_threshold = {}", d.confidence_threshold);
    println!("  amount_weight = {}", d.amount_weight);
    println!("  frequency_weight = {}", d.frequency_weight);
    println!("  billing_calendar = {}", d.billing_calendar);
    println!(
        "  monthly = {}-{} days (expected {})",
        d.monthly.min_days, d.monthly.max_days, d.monthly.expected_days
    );
    println!(
        "  yearly = {}-{} days (expected {})",
        d.yearly.min_days, d.yearly.max_days, d.yearly.expected_days
    );
    println!();
    println!("[ai]");
    println!("  backend = {}", config.ai.backend);
    println!("  host = {}", config.ai.host.as_deref().unwrap_or("(unset)"));
    println!("  model = {}", config.ai.model.as_deref().unwrap_or("(backend default)"));
    println!(
        "  api_key = {}",
        if config.ai.api_key.is_some() { "(set)" } else { "(unset)" }
    );
    println!("  timeout_secs = {}", config.ai.timeout_secs);

    Ok(())
}

/// Three months of two obvious subscriptions and some noise
fn sample_transactions() -> Vec<Transaction> {
    let d = |m: u32, day: u32| NaiveDate::from_ymd_opt(2024, m, day).unwrap_or_default();
    vec![
        Transaction::new("s1", d(1, 5), "NETFLIX.COM", -15.99),
        Transaction::new("s2", d(2, 4), "NETFLIX.COM", -15.99),
        Transaction::new("s3", d(3, 5), "NETFLIX.COM", -15.99),
        Transaction::new("s4", d(1, 20), "SPOTIFY USA", -10.99),
        Transaction::new("s5", d(2, 20), "SPOTIFY USA", -10.99),
        Transaction::new("s6", d(3, 20), "SPOTIFY USA", -10.99),
        Transaction::new("s7", d(1, 12), "SHELL OIL 5512", -42.10),
        Transaction::new("s8", d(2, 27), "TARGET #1042", -88.12),
    ]
}
