//! Run configuration.
//!
//! An optional JSON file supplies defaults for a run; command-line flags win
//! over the file and the file wins over built-in defaults.
use crate::http::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::search::{ProviderKind, DEFAULT_MAX_CANDIDATES};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;

pub const CONFIG_SCHEMA_VERSION: u32 = 1;

const MAX_CANDIDATES_RANGE: RangeInclusive<usize> = 1..=100;
const TIMEOUT_SECS_RANGE: RangeInclusive<u64> = 1..=300;

/// File-level config; every field is optional except the schema version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnrichConfig {
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub providers: Option<Vec<ProviderKind>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_candidates: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION,
            providers: None,
            max_candidates: None,
            timeout_secs: None,
            user_agent: None,
        }
    }
}

/// Command-line values that can override the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub providers: Vec<ProviderKind>,
    pub max_candidates: Option<usize>,
    pub timeout_secs: Option<u64>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub providers: Vec<ProviderKind>,
    pub max_candidates: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
}

fn default_providers() -> Vec<ProviderKind> {
    vec![ProviderKind::Duckduckgo]
}

/// Load a config file from disk.
pub fn load_config(path: &Path) -> Result<EnrichConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: EnrichConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    Ok(config)
}

/// Validate schema version and value ranges.
pub fn validate_config(config: &EnrichConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {} (expected {CONFIG_SCHEMA_VERSION})",
            config.schema_version
        ));
    }
    if let Some(providers) = config.providers.as_deref() {
        if providers.is_empty() {
            return Err(anyhow!("providers must list at least one search provider"));
        }
    }
    if let Some(max) = config.max_candidates {
        check_max_candidates(max)?;
    }
    if let Some(secs) = config.timeout_secs {
        check_timeout_secs(secs)?;
    }
    if let Some(agent) = config.user_agent.as_deref() {
        if agent.trim().is_empty() {
            return Err(anyhow!("user_agent must be non-empty"));
        }
    }
    Ok(())
}

/// Merge command-line overrides over the config file over defaults.
pub fn resolve(config: &EnrichConfig, overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let providers = if !overrides.providers.is_empty() {
        overrides.providers.clone()
    } else {
        config.providers.clone().unwrap_or_else(default_providers)
    };
    let max_candidates = overrides
        .max_candidates
        .or(config.max_candidates)
        .unwrap_or(DEFAULT_MAX_CANDIDATES);
    let timeout_secs = overrides
        .timeout_secs
        .or(config.timeout_secs)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    check_max_candidates(max_candidates)?;
    check_timeout_secs(timeout_secs)?;
    Ok(ResolvedConfig {
        providers: dedup_providers(providers),
        max_candidates,
        timeout_secs,
        user_agent: config
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
    })
}

fn dedup_providers(providers: Vec<ProviderKind>) -> Vec<ProviderKind> {
    let mut seen = Vec::with_capacity(providers.len());
    for kind in providers {
        if !seen.contains(&kind) {
            seen.push(kind);
        }
    }
    seen
}

fn check_max_candidates(value: usize) -> Result<()> {
    if !MAX_CANDIDATES_RANGE.contains(&value) {
        return Err(anyhow!(
            "max_candidates must be between {} and {} (got {value})",
            MAX_CANDIDATES_RANGE.start(),
            MAX_CANDIDATES_RANGE.end()
        ));
    }
    Ok(())
}

fn check_timeout_secs(value: u64) -> Result<()> {
    if !TIMEOUT_SECS_RANGE.contains(&value) {
        return Err(anyhow!(
            "timeout_secs must be between {} and {} (got {value})",
            TIMEOUT_SECS_RANGE.start(),
            TIMEOUT_SECS_RANGE.end()
        ));
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
