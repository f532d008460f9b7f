//! Service configuration and factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use viva_core::deck::Deck;
use viva_core::traits::{Evaluator, QuestionSource};

use crate::http::HttpInterviewService;
use crate::local::{DeckSource, KeyPointEvaluator};

/// Configuration for a single interview service.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure
/// in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServiceConfig {
    /// Remote interview API: question source and evaluator over HTTP.
    Http {
        base_url: String,
        #[serde(default)]
        api_key: Option<String>,
    },
    /// Offline: deck-backed source plus the key-point evaluator.
    Local,
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceConfig::Http { base_url, api_key } => f
                .debug_struct("Http")
                .field("base_url", base_url)
                .field("api_key", &api_key.as_ref().map(|_| "***"))
                .finish(),
            ServiceConfig::Local => f.debug_struct("Local").finish(),
        }
    }
}

/// Top-level viva configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VivaConfig {
    /// Service configurations keyed by name.
    #[serde(default)]
    pub services: HashMap<String, ServiceConfig>,
    /// Service used when the CLI doesn't name one.
    #[serde(default = "default_service")]
    pub default_service: String,
    /// Questions per session.
    #[serde(default = "default_total_questions")]
    pub total_questions: usize,
    /// Confidence assumed when the candidate doesn't set one.
    #[serde(default = "default_confidence")]
    pub default_confidence: u8,
    /// Directory session reports are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_service() -> String {
    "local".to_string()
}
fn default_total_questions() -> usize {
    5
}
fn default_confidence() -> u8 {
    50
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./viva-reports")
}

impl Default for VivaConfig {
    fn default() -> Self {
        let mut services = HashMap::new();
        services.insert("local".to_string(), ServiceConfig::Local);
        Self {
            services,
            default_service: default_service(),
            total_questions: default_total_questions(),
            default_confidence: default_confidence(),
            output_dir: default_output_dir(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_service_config(config: &ServiceConfig) -> ServiceConfig {
    match config {
        ServiceConfig::Http { base_url, api_key } => ServiceConfig::Http {
            base_url: resolve_env_vars(base_url),
            api_key: api_key.as_ref().map(|k| resolve_env_vars(k)),
        },
        ServiceConfig::Local => ServiceConfig::Local,
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `viva.toml` in the current directory
/// 2. `~/.config/viva/config.toml`
pub fn load_config() -> Result<VivaConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<VivaConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("viva.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            if global.exists() {
                Some(global)
            } else {
                None
            }
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<VivaConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => VivaConfig::default(),
    };

    // Resolve env vars in all service configs
    let resolved: HashMap<String, ServiceConfig> = config
        .services
        .iter()
        .map(|(k, v)| (k.clone(), resolve_service_config(v)))
        .collect();
    config.services = resolved;

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("viva"))
}

/// Build the (question source, evaluator) pair a service config describes.
///
/// `Local` services need the deck the session will draw from.
pub fn create_service(
    config: &ServiceConfig,
    deck: Option<Deck>,
) -> Result<(Arc<dyn QuestionSource>, Arc<dyn Evaluator>)> {
    match config {
        ServiceConfig::Http { base_url, api_key } => {
            let source = Arc::new(HttpInterviewService::new(base_url, api_key.clone()));
            let evaluator = Arc::new(HttpInterviewService::new(base_url, api_key.clone()));
            Ok((source, evaluator))
        }
        ServiceConfig::Local => {
            let deck = deck.context("local service requires a deck")?;
            Ok((Arc::new(DeckSource::new(deck)), Arc::new(KeyPointEvaluator)))
        }
    }
}
