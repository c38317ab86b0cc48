use std::path::PathBuf;
use std::time::Duration;

use crate::codec::{ItemSetCodec, DEFAULT_ALTERNATIVE, DEFAULT_SEPARATOR};
use crate::engine::EngineError;
use crate::title::DEFAULT_TITLE_TEMPLATE;

/// Daemon settings, read once from `LISTWISE_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub sweep_interval: Duration,
    pub sweep_concurrency: usize,
    /// Journal appends between compactions.
    pub compact_threshold: u64,
    pub metrics_port: Option<u16>,
    /// JSON catalog file; an empty catalog when unset.
    pub catalog_path: Option<PathBuf>,
    pub separator: char,
    pub separator_alt: char,
    pub default_title: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            sweep_interval: Duration::from_secs(60),
            sweep_concurrency: 8,
            compact_threshold: 1000,
            metrics_port: None,
            catalog_path: None,
            separator: DEFAULT_SEPARATOR,
            separator_alt: DEFAULT_ALTERNATIVE,
            default_title: DEFAULT_TITLE_TEMPLATE.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unparseable numbers fall back to the default; a bad separator is an error.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, EngineError> {
        let defaults = Self::default();
        let separator = match get("LISTWISE_SEPARATOR") {
            Some(s) => single_char("LISTWISE_SEPARATOR", &s)?,
            None => defaults.separator,
        };
        let separator_alt = match get("LISTWISE_SEPARATOR_ALT") {
            Some(s) => single_char("LISTWISE_SEPARATOR_ALT", &s)?,
            None => defaults.separator_alt,
        };

        let config = Self {
            data_dir: get("LISTWISE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            sweep_interval: get("LISTWISE_SWEEP_INTERVAL_SECS")
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            sweep_concurrency: get("LISTWISE_SWEEP_CONCURRENCY")
                .and_then(|s| s.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.sweep_concurrency),
            compact_threshold: get("LISTWISE_COMPACT_THRESHOLD")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.compact_threshold),
            metrics_port: get("LISTWISE_METRICS_PORT").and_then(|s| s.parse().ok()),
            catalog_path: get("LISTWISE_CATALOG").map(PathBuf::from),
            separator,
            separator_alt,
            default_title: get("LISTWISE_DEFAULT_TITLE")
                .filter(|t| !t.trim().is_empty())
                .unwrap_or(defaults.default_title),
        };
        config.codec()?;
        Ok(config)
    }

    pub fn codec(&self) -> Result<ItemSetCodec, EngineError> {
        ItemSetCodec::new(self.separator, self.separator_alt)
    }

    pub fn journal_path(&self) -> PathBuf {
        self.data_dir.join("listwise.journal")
    }
}

fn single_char(key: &str, value: &str) -> Result<char, EngineError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(EngineError::Configuration(format!(
            "{key} must be a single character, got {value:?}"
        ))),
    }
}
