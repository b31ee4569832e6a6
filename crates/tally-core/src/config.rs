//! Configuration
//!
//! Resolution order:
//! 1. An explicit path (`--config`)
//! 2. `~/.local/share/tally/config.toml` if it exists
//! 3. The embedded default (`config/tally.toml`)
//!
//! Environment variables are applied on top of whichever file was used, then
//! the result is validated.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::detect::{BillingCalendar, CadenceWindow, DetectionConfig};
use crate::error::{Error, Result};

const DEFAULT_CONFIG: &str = include_str!("../../../config/tally.toml");

/// Which AI backend to use for AI-assisted detection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiBackendKind {
    /// AI detection disabled; statistics only
    #[default]
    None,
    Ollama,
    #[serde(rename = "openai_compatible")]
    OpenAICompatible,
    Mock,
}

impl AiBackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Ollama => "ollama",
            Self::OpenAICompatible => "openai_compatible",
            Self::Mock => "mock",
        }
    }
}

impl fmt::Display for AiBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AiBackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "ollama" => Ok(Self::Ollama),
            "openai_compatible" | "openai" => Ok(Self::OpenAICompatible),
            "mock" => Ok(Self::Mock),
            other => Err(format!("Unknown AI backend: {}", other)),
        }
    }
}

/// AI backend settings
#[derive(Debug, Clone, PartialEq)]
pub struct AiConfig {
    pub backend: AiBackendKind,
    pub host: Option<String>,
    /// Backend default when unset
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            backend: AiBackendKind::None,
            host: None,
            model: None,
            api_key: None,
            timeout_secs: 30,
        }
    }
}

impl AiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Full application configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TallyConfig {
    pub detection: DetectionConfig,
    pub ai: AiConfig,
}

impl TallyConfig {
    /// Load the config file, apply environment overrides, and validate
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = load(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_env_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides using `lookup` to read variables
    pub fn apply_env_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup("AI_BACKEND") {
            Some(backend) => {
                self.ai.backend = backend.parse().map_err(Error::Config)?;
            }
            // OLLAMA_HOST alone is enough to turn on the Ollama backend
            None if self.ai.backend == AiBackendKind::None && lookup("OLLAMA_HOST").is_some() => {
                self.ai.backend = AiBackendKind::Ollama;
            }
            None => {}
        }

        match self.ai.backend {
            AiBackendKind::Ollama => {
                if let Some(host) = lookup("OLLAMA_HOST") {
                    self.ai.host = Some(host);
                }
                if let Some(model) = lookup("OLLAMA_MODEL") {
                    self.ai.model = Some(model);
                }
            }
            AiBackendKind::OpenAICompatible => {
                if let Some(host) = lookup("OPENAI_COMPATIBLE_HOST") {
                    self.ai.host = Some(host);
                }
                if let Some(model) = lookup("OPENAI_COMPATIBLE_MODEL") {
                    self.ai.model = Some(model);
                }
                if let Some(key) = lookup("OPENAI_COMPATIBLE_API_KEY") {
                    self.ai.api_key = Some(key);
                }
            }
            AiBackendKind::None | AiBackendKind::Mock => {}
        }

        if let Some(secs) = lookup("AI_TIMEOUT_SECS") {
            self.ai.timeout_secs = secs
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("AI_TIMEOUT_SECS is not a number: {}", secs)))?;
        }

        if let Some(threshold) = lookup("TALLY_CONFIDENCE_THRESHOLD") {
            self.detection.confidence_threshold = threshold.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "TALLY_CONFIDENCE_THRESHOLD is not a number: {}",
                    threshold
                ))
            })?;
        }

        Ok(())
    }

    /// Reject values the detector can't work with
    pub fn validate(&self) -> Result<()> {
        let d = &self.detection;

        if !(0.0..=1.0).contains(&d.confidence_threshold) {
            return Err(Error::Config(format!(
                "confidence_threshold must be within [0, 1], got {}",
                d.confidence_threshold
            )));
        }

        for (name, weight) in [
            ("amount_weight", d.amount_weight),
            ("frequency_weight", d.frequency_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::Config(format!(
                    "{} must be a non-negative number, got {}",
                    name, weight
                )));
            }
        }

        for (name, window) in [("monthly", &d.monthly), ("yearly", &d.yearly)] {
            if !(window.min_days <= window.max_days) {
                return Err(Error::Config(format!(
                    "{} window: min_days {} exceeds max_days {}",
                    name, window.min_days, window.max_days
                )));
            }
            if !(window.expected_days > 0.0) {
                return Err(Error::Config(format!(
                    "{} window: expected_days must be positive",
                    name
                )));
            }
        }

        if self.ai.timeout_secs == 0 {
            return Err(Error::Config("ai.timeout_secs must be at least 1".into()));
        }

        Ok(())
    }
}

/// ~/.local/share/tally/config.toml on Linux
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("tally").join("config.toml"))
}

/// Read and parse the config file, without env overrides or validation
pub fn load(path: Option<&Path>) -> Result<TallyConfig> {
    let content = match path {
        Some(path) => {
            debug!(path = %path.display(), "Loading config");
            fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Failed to read {}: {}", path.display(), e))
            })?
        }
        None => match default_config_path().filter(|p| p.exists()) {
            Some(default_path) => {
                debug!(path = %default_path.display(), "Loading config");
                fs::read_to_string(&default_path)
                    .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?
            }
            None => DEFAULT_CONFIG.to_string(),
        },
    };

    parse_config(&content)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    detection: Option<RawDetection>,
    ai: Option<RawAi>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDetection {
    confidence_threshold: Option<f64>,
    amount_weight: Option<f64>,
    frequency_weight: Option<f64>,
    billing_calendar: Option<String>,
    monthly: Option<RawWindow>,
    yearly: Option<RawWindow>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWindow {
    min_days: Option<f64>,
    max_days: Option<f64>,
    expected_days: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAi {
    backend: Option<String>,
    host: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
}

fn apply_window(window: &mut CadenceWindow, raw: RawWindow) {
    if let Some(v) = raw.min_days {
        window.min_days = v;
    }
    if let Some(v) = raw.max_days {
        window.max_days = v;
    }
    if let Some(v) = raw.expected_days {
        window.expected_days = v;
    }
}

/// Parse TOML content over the built-in defaults
pub fn parse_config(content: &str) -> Result<TallyConfig> {
    let raw: RawConfig = toml::from_str(content)?;
    let mut config = TallyConfig::default();

    if let Some(det) = raw.detection {
        let d = &mut config.detection;
        if let Some(v) = det.confidence_threshold {
            d.confidence_threshold = v;
        }
        if let Some(v) = det.amount_weight {
            d.amount_weight = v;
        }
        if let Some(v) = det.frequency_weight {
            d.frequency_weight = v;
        }
        if let Some(cal) = det.billing_calendar {
            d.billing_calendar = cal.parse::<BillingCalendar>().map_err(Error::Config)?;
        }
        if let Some(w) = det.monthly {
            apply_window(&mut d.monthly, w);
        }
        if let Some(w) = det.yearly {
            apply_window(&mut d.yearly, w);
        }
    }

    if let Some(ai) = raw.ai {
        if let Some(backend) = ai.backend {
            config.ai.backend = backend.parse().map_err(Error::Config)?;
        }
        config.ai.host = ai.host.filter(|h| !h.trim().is_empty());
        config.ai.model = ai.model.filter(|m| !m.trim().is_empty());
        config.ai.api_key = ai.api_key.filter(|k| !k.is_empty());
        if let Some(secs) = ai.timeout_secs {
            config.ai.timeout_secs = secs;
        }
    }

    Ok(config)
}
