use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Environment variable overriding [`ReaderConfig::default_keys`]
/// (comma-separated, highest priority first).
pub const DEFAULT_KEYS_ENV: &str = "RUSTY_MDF_DEFAULT_KEYS";

/// How the reader resolves logical channels.
///
/// ```json
/// { "default_keys": ["RecResult", "D"], "origin": "MDF" }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Recorder keys preferred when a channel name is recorded under several
    /// keys, highest priority first. If none is present the first variant
    /// found in the file wins.
    pub default_keys: Vec<String>,
    /// Prefix of the channel provenance string (`"<origin>:<key>"`).
    pub origin: String,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            default_keys: vec!["RecResult".to_string()],
            origin: "MDF".to_string(),
        }
    }
}

impl ReaderConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading reader config {}", path.display()))?;
        serde_json::from_str(&text).context("parsing reader config")
    }

    /// Apply [`DEFAULT_KEYS_ENV`] if it is set and not blank.
    pub fn with_env_overrides(self) -> Self {
        match std::env::var(DEFAULT_KEYS_ENV) {
            Ok(raw) => self.with_default_keys_from(&raw),
            Err(_) => self,
        }
    }

    fn with_default_keys_from(self, raw: &str) -> Self {
        let keys: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();
        if keys.is_empty() {
            return self;
        }
        log::debug!("default keys overridden from {DEFAULT_KEYS_ENV}: {keys:?}");
        Self {
            default_keys: keys,
            ..self
        }
    }

    pub fn with_default_keys<I, S>(self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            default_keys: keys.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    /// Priority of `key` among the default keys (lower wins).
    pub(crate) fn key_rank(&self, key: &str) -> Option<usize> {
        self.default_keys.iter().position(|k| k == key)
    }
}
