// src/config.rs

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path, path::PathBuf, time::Duration};

use crate::fetch::TextEncoding;

pub const DEFAULT_URL_TEMPLATE: &str =
    "https://www7.fdic.gov/sod/ShowFileWithStats1.asp?strFileName=ALL_{year}.zip";

/// Where archives come from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Http,
    Mirror,
}

/// Retry policy the orchestrator applies to transport failures.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 500,
            timeout_secs: 300,
        }
    }
}

impl FetchConfig {
    /// No retries, no waiting.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            initial_backoff_ms: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (1-based), doubling each time.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.initial_backoff_ms.saturating_mul(factor))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store_dir: PathBuf,
    pub source: SourceKind,
    pub url_template: String,
    pub mirror_dir: Option<PathBuf>,
    pub mirror_file_template: String,
    pub default_start_year: i32,
    pub encoding: TextEncoding,
    pub fetch: FetchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("bank_info"),
            source: SourceKind::Http,
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            mirror_dir: None,
            mirror_file_template: "ALL_{year}.zip".to_string(),
            default_start_year: 2015,
            encoding: TextEncoding::Latin1,
            fetch: FetchConfig::default(),
        }
    }
}

impl Config {
    /// Read a YAML config file; missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text =
            fs::read_to_string(path).with_context(|| format!("reading config {:?}", path))?;
        Self::from_yaml(&text).with_context(|| format!("parsing config {:?}", path))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        // an empty document deserializes as unit, not as an empty map
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.source == SourceKind::Mirror && self.mirror_dir.is_none() {
            anyhow::bail!("source `mirror` needs `mirror_dir`");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
        let c = Config::default();
        assert_eq!(c.default_start_year, 2015);
        assert_eq!(c.encoding, TextEncoding::Latin1);
        assert!(c.url_template.contains("{year}"));
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let c = Config::from_yaml(
            "store_dir: /data/sod\nsource: mirror\nmirror_dir: /mnt/fdic\nfetch:\n  max_retries: 1\n",
        )
        .unwrap();
        assert_eq!(c.store_dir, PathBuf::from("/data/sod"));
        assert_eq!(c.source, SourceKind::Mirror);
        assert_eq!(c.fetch.max_retries, 1);
        assert_eq!(c.fetch.initial_backoff_ms, 500);
        assert_eq!(c.default_start_year, 2015);
    }

    #[test]
    fn mirror_without_dir_is_rejected() {
        assert!(Config::from_yaml("source: mirror\n").is_err());
        assert!(Config::from_yaml("default_start_year: nineteen\n").is_err());
    }

    #[test]
    fn backoff_doubles() {
        let f = FetchConfig::default();
        assert_eq!(f.backoff(1), Duration::from_millis(500));
        assert_eq!(f.backoff(2), Duration::from_millis(1000));
        assert_eq!(f.backoff(3), Duration::from_millis(2000));
        assert_eq!(FetchConfig::no_retry().backoff(5), Duration::ZERO);
    }
}
