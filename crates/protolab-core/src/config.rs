//! Configuration file management for Protolab.
//!
//! Supports reading gateway credentials from
//! `~/.config/protolab/secret.json`, with environment variables as a
//! fallback. A missing API key is a fatal configuration error: the
//! pipeline refuses to start without one.

use crate::error::{ProtolabError, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Default model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Root structure of secret.json.
#[derive(Debug, Clone, Deserialize)]
pub struct SecretConfig {
    #[serde(default)]
    pub gateway: Option<GatewayConfig>,
}

/// Credentials for the tool-execution gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub api_key: String,
    #[serde(default)]
    pub model: Option<String>,
}

impl GatewayConfig {
    /// Model to use, falling back to [`DEFAULT_MODEL`].
    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Loads the secret configuration file from ~/.config/protolab/secret.json
pub fn load_secret_config() -> Result<SecretConfig> {
    let config_path = config_path()?;

    if !config_path.exists() {
        return Err(ProtolabError::config(format!(
            "configuration file not found at: {}",
            config_path.display()
        )));
    }

    let content = fs::read_to_string(&config_path).map_err(|e| {
        ProtolabError::config(format!(
            "failed to read configuration file at {}: {e}",
            config_path.display()
        ))
    })?;

    serde_json::from_str(&content).map_err(|e| {
        ProtolabError::config(format!(
            "failed to parse configuration file at {}: {e}",
            config_path.display()
        ))
    })
}

/// Resolves gateway credentials.
///
/// Priority:
/// 1. `~/.config/protolab/secret.json`
/// 2. Environment variables (`GATEWAY_API_KEY`, `PROTOLAB_MODEL`)
pub fn resolve_gateway_config() -> Result<GatewayConfig> {
    if let Ok(secret) = load_secret_config() {
        if let Some(gateway) = secret.gateway {
            return Ok(gateway);
        }
    }

    let api_key = env::var("GATEWAY_API_KEY").map_err(|_| {
        ProtolabError::config(
            "GATEWAY_API_KEY not found in ~/.config/protolab/secret.json or environment variables",
        )
    })?;

    Ok(GatewayConfig {
        api_key,
        model: env::var("PROTOLAB_MODEL").ok(),
    })
}

/// Returns the path to the configuration file: ~/.config/protolab/secret.json
fn config_path() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ProtolabError::config("could not determine home directory"))?;
    Ok(home.join(".config").join("protolab").join("secret.json"))
}
