// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::stream::{StreamOptions, DEFAULT_SCOPE};

const ENV_PATH: &str = "REDDIT_STREAM_CONFIG_PATH";

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}
fn default_rate_ms() -> u64 {
    1000
}

/// File-backed stream settings. Validation (scope length, rate, pattern)
/// happens when the stream is opened, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSettings {
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default = "default_rate_ms")]
    pub rate_ms: u64,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub drift_secs: i64,
    /// Listing page size forwarded to the fetcher as `limit`.
    #[serde(default)]
    pub limit: Option<u32>,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            scope: default_scope(),
            rate_ms: default_rate_ms(),
            pattern: None,
            drift_secs: 0,
            limit: None,
        }
    }
}

impl StreamSettings {
    pub fn to_options(&self) -> StreamOptions {
        let mut opts = StreamOptions::new().rate(Duration::from_millis(self.rate_ms));
        if let Some(p) = self.pattern.as_deref().filter(|p| !p.is_empty()) {
            opts = opts.pattern(p);
        }
        if let Some(limit) = self.limit {
            opts = opts.extra("limit", limit);
        }
        opts
    }
}

/// Load settings from an explicit path. Supports TOML or JSON formats.
pub fn load_settings_from(path: &Path) -> Result<StreamSettings> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading stream settings from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_settings(&content, ext.as_str())
}

/// Load settings using env var + fallbacks:
/// 1) $REDDIT_STREAM_CONFIG_PATH
/// 2) config/stream.toml
/// 3) config/stream.json
/// 4) defaults
pub fn load_settings_default() -> Result<StreamSettings> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_settings_from(&pb);
        } else {
            return Err(anyhow!("{ENV_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/stream.toml");
    if toml_p.exists() {
        return load_settings_from(&toml_p);
    }
    let json_p = PathBuf::from("config/stream.json");
    if json_p.exists() {
        return load_settings_from(&json_p);
    }
    Ok(StreamSettings::default())
}

fn parse_settings(s: &str, hint_ext: &str) -> Result<StreamSettings> {
    if hint_ext == "json" || s.trim_start().starts_with('{') {
        return serde_json::from_str(s).context("parsing stream settings json");
    }
    toml::from_str(s).context("parsing stream settings toml")
}
