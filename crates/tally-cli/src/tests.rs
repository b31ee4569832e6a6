//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Write;

use clap::{CommandFactory, Parser};
use tally_core::test_utils::{MockLlmBehavior, MockLlmServer};
use tally_core::{AiBackendKind, AiConfig, Frequency, TallyConfig};
use tempfile::NamedTempFile;

use crate::cli::{Cli, Commands};
use crate::commands::{self, truncate};

/// Netflix and Spotify monthly, plus one-off purchases
fn transactions_csv() -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(".csv").unwrap();
    write!(
        file,
        "date,merchant,amount\n\
         2024-01-05,NETFLIX.COM,-15.99\n\
         2024-02-04,Netflix.com,-15.99\n\
         2024-03-06,NETFLIX   COM,-15.99\n\
         2024-01-20,SPOTIFY USA,-10.99\n\
         2024-02-20,SPOTIFY USA,-10.99\n\
         2024-03-20,SPOTIFY USA,-10.99\n\
         2024-01-10,AMAZON,-63.20\n\
         2024-02-14,TARGET #1042,-88.12\n"
    )
    .unwrap();
    file.flush().unwrap();
    file
}

fn config_with_ollama(host: &str) -> TallyConfig {
    TallyConfig {
        ai: AiConfig {
            backend: AiBackendKind::Ollama,
            host: Some(host.to_string()),
            timeout_secs: 5,
            ..AiConfig::default()
        },
        ..TallyConfig::default()
    }
}

// ========== Argument Parsing Tests ==========

#[test]
fn test_cli_definition_is_valid() {
    Cli::command().debug_assert();
}

#[test]
fn test_parse_detect() {
    let cli = Cli::try_parse_from(["tally", "-v", "detect", "--file", "tx.csv", "--ai"]).unwrap();
    assert!(cli.verbose);
    assert!(cli.config.is_none());
    match cli.command {
        Commands::Detect { file, ai, json } => {
            assert_eq!(file.to_str(), Some("tx.csv"));
            assert!(ai);
            assert!(!json);
        }
        _ => panic!("expected detect"),
    }
}

#[test]
fn test_parse_serve_defaults() {
    let cli = Cli::try_parse_from(["tally", "--config", "tally.toml", "serve"]).unwrap();
    assert_eq!(
        cli.config.as_deref().and_then(|p| p.to_str()),
        Some("tally.toml")
    );
    match cli.command {
        Commands::Serve { port, host } => {
            assert_eq!(port, 3000);
            assert_eq!(host, "127.0.0.1");
        }
        _ => panic!("expected serve"),
    }
}

#[test]
fn test_parse_normalize_requires_merchant() {
    assert!(Cli::try_parse_from(["tally", "normalize"]).is_err());
    assert!(Cli::try_parse_from(["tally", "detect"]).is_err());
}

// ========== Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("NETFLIX COM", 20), "NETFLIX COM");
    assert_eq!(truncate("AMAZON MARKETPLACE SEATTLE", 10), "AMAZON ...");
    // Multi-byte characters are not split
    assert_eq!(truncate("CAFÉ CAFÉ CAFÉ", 8), "CAFÉ ...");
}

#[test]
fn test_normalized_pairs() {
    let input = vec!["Netflix.com #123".to_string(), "  spotify   usa ".to_string()];
    let pairs = commands::normalized_pairs(&input);
    assert_eq!(pairs[0], ("Netflix.com #123", "NETFLIX COM 123".to_string()));
    assert_eq!(pairs[1].1, "SPOTIFY USA");
    assert!(commands::cmd_normalize(&input).is_ok());
}

// ========== Detect Command Tests ==========

#[tokio::test]
async fn test_detect_file_statistical() {
    let file = transactions_csv();
    let candidates = commands::detect_file(&TallyConfig::default(), file.path(), false)
        .await
        .unwrap();

    let merchants: Vec<_> = candidates.iter().map(|c| c.merchant.as_str()).collect();
    assert_eq!(merchants.len(), 2, "{:?}", merchants);
    assert!(merchants.contains(&"NETFLIX COM"));
    assert!(merchants.contains(&"SPOTIFY USA"));
    assert!(candidates.iter().all(|c| c.frequency == Frequency::Monthly));
}

#[tokio::test]
async fn test_detect_ai_without_backend_uses_statistics() {
    let file = transactions_csv();
    let config = TallyConfig::default();

    let with_ai = commands::detect_file(&config, file.path(), true).await.unwrap();
    let without = commands::detect_file(&config, file.path(), false).await.unwrap();

    let key = |c: &tally_core::SubscriptionCandidate| (c.merchant.clone(), c.confidence);
    assert_eq!(
        with_ai.iter().map(key).collect::<Vec<_>>(),
        without.iter().map(key).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_detect_file_with_ai_backend() {
    let server = MockLlmServer::start(MockLlmBehavior::Valid).await;
    let file = transactions_csv();

    let candidates = commands::detect_file(&config_with_ollama(&server.url()), file.path(), true)
        .await
        .unwrap();

    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].merchant, "NETFLIX COM");
    assert_eq!(candidates[0].confidence, 0.95);
    assert_eq!(candidates[0].transactions.len(), 3);
    assert_eq!(candidates[1].merchant, "SPOTIFY USA");
    assert_eq!(candidates[1].confidence, 0.9);
}

#[tokio::test]
async fn test_detect_file_falls_back_on_bad_model_output() {
    let server = MockLlmServer::start(MockLlmBehavior::Malformed).await;
    let file = transactions_csv();

    let fallback = commands::detect_file(&config_with_ollama(&server.url()), file.path(), true)
        .await
        .unwrap();
    let statistical = commands::detect_file(&TallyConfig::default(), file.path(), false)
        .await
        .unwrap();

    assert_eq!(fallback.len(), statistical.len());
    for (a, b) in fallback.iter().zip(&statistical) {
        assert_eq!(a.merchant, b.merchant);
        assert_eq!(a.confidence, b.confidence);
    }
}

#[tokio::test]
async fn test_detect_missing_file() {
    let result = commands::detect_file(
        &TallyConfig::default(),
        std::path::Path::new("/nonexistent/tx.csv"),
        false,
    )
    .await;
    let err = result.unwrap_err();
    assert!(format!("{:#}", err).contains("/nonexistent/tx.csv"));
}

#[tokio::test]
async fn test_cmd_detect_json_output() {
    let file = transactions_csv();
    let result = commands::cmd_detect(&TallyConfig::default(), file.path(), false, true).await;
    assert!(result.is_ok());
}

// ========== AI / Config Command Tests ==========

#[tokio::test]
async fn test_ai_check_without_backend() {
    assert!(commands::cmd_ai_check(&TallyConfig::default()).await.is_ok());
}

#[tokio::test]
async fn test_ai_check_against_mock_server() {
    let server = MockLlmServer::start(MockLlmBehavior::Valid).await;
    assert!(commands::cmd_ai_check(&config_with_ollama(&server.url()))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_ai_check_unreachable_backend() {
    // Nothing listens on port 9 locally
    let config = config_with_ollama("http://127.0.0.1:9");
    assert!(commands::cmd_ai_check(&config).await.is_ok());
}

#[test]
fn test_config_show() {
    let mut config = config_with_ollama("http://localhost:11434");
    config.ai.api_key = Some("secret".to_string());
    assert!(commands::cmd_config_show(&config, None).is_ok());
}

// ========== Prompts Command Tests ==========

#[test]
fn test_prompts_list() {
    assert!(commands::cmd_prompts_list().is_ok());
}

#[test]
fn test_prompts_show() {
    assert!(commands::cmd_prompts_show("detect_subscriptions").is_ok());
    assert!(commands::cmd_prompts_show("classify_merchant").is_err());
}

#[test]
fn test_prompts_path() {
    assert!(commands::cmd_prompts_path().is_ok());
}
