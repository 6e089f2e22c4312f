use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use casefile_extract_types::{Capabilities, ExtractorConfig};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub populate: PopulateConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    /// Switches for optional parsing dependencies.  A capability is only
    /// active when it is both compiled in and enabled here.
    #[serde(default)]
    pub capabilities: Capabilities,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// SQLite file holding the file index and the per-family tables.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Prefix joined onto relative `file.path` values before opening them.
    #[serde(default)]
    pub base_dir: Option<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { db_path: default_db_path(), base_dir: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulateConfig {
    /// Directory the per-run log file is created in.
    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// Run logs are named `<prefix>_<timestamp>.log`.
    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,

    /// Sniff files whose true extension has not been resolved yet before
    /// routing them.
    #[serde(default = "default_true")]
    pub sniff_unresolved: bool,
}

impl Default for PopulateConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            log_prefix: default_log_prefix(),
            sniff_unresolved: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    #[serde(default = "default_max_text_size_kb")]
    pub max_text_size_kb: u64,

    #[serde(default = "default_max_listed_entries")]
    pub max_listed_entries: usize,

    /// Cap on formats parsed from memory (PDF, executables, text meshes).
    #[serde(default = "default_max_parse_size_mb")]
    pub max_parse_size_mb: u64,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_text_size_kb: default_max_text_size_kb(),
            max_listed_entries: default_max_listed_entries(),
            max_parse_size_mb: default_max_parse_size_mb(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    /// Regexes matched against `target: message`; matching events are dropped.
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Also write diagnostic logs to this file.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_db_path() -> String {
    "casefile.db".into()
}

fn default_log_dir() -> String {
    ".".into()
}

fn default_log_prefix() -> String {
    "metadata_run".into()
}

fn default_true() -> bool {
    true
}

fn default_max_text_size_kb() -> u64 { 16 * 1024 }
fn default_max_listed_entries() -> usize { 2000 }
fn default_max_parse_size_mb() -> u64 { 256 }

impl AppConfig {
    /// Extractor settings with `compiled` (what this build can do) narrowed
    /// by the `[capabilities]` section.
    pub fn extractor_config(&self, compiled: Capabilities) -> ExtractorConfig {
        ExtractorConfig {
            capabilities: compiled.intersect(self.capabilities),
            max_text_bytes: self.extract.max_text_size_kb.saturating_mul(1024),
            max_listed_entries: self.extract.max_listed_entries,
            max_parse_bytes: self.extract.max_parse_size_mb.saturating_mul(1024 * 1024),
        }
    }

    /// Resolve a `file.path` value against `index.base_dir`.
    pub fn resolve_path(&self, stored: &str) -> PathBuf {
        match &self.index.base_dir {
            Some(base) if !PathBuf::from(stored).is_absolute() => PathBuf::from(base).join(stored),
            _ => PathBuf::from(stored),
        }
    }
}

/// `/etc/casefile/casefile.toml` when running as root or without a home
/// directory, else `~/.config/casefile/casefile.toml`.
pub fn default_config_path() -> String {
    let is_root = std::env::var("USER").map(|u| u == "root").unwrap_or(false);
    match std::env::var("HOME") {
        Ok(home) if !is_root => format!("{home}/.config/casefile/casefile.toml"),
        _ => "/etc/casefile/casefile.toml".into(),
    }
}

/// Parse a TOML config, warning about keys that are not recognised.
pub fn parse_config(toml_str: &str) -> Result<AppConfig> {
    let de = toml::Deserializer::new(toml_str);
    let mut unknown = Vec::new();
    let cfg: AppConfig = serde_ignored::deserialize(de, |path| unknown.push(path.to_string()))
        .context("parsing config")?;
    for key in unknown {
        tracing::warn!("unknown config key: {key}");
    }
    Ok(cfg)
}

/// Load the config at `path`, or at the default location.  A missing file
/// at the default location yields the built-in defaults; a missing file
/// that was asked for explicitly is an error.
pub fn load_config(path: Option<&str>) -> Result<AppConfig> {
    let (path, explicit) = match path {
        Some(p) => (p.to_string(), true),
        None => (default_config_path(), false),
    };
    match std::fs::read_to_string(&path) {
        Ok(s) => parse_config(&s).with_context(|| format!("in {path}")),
        Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(e).with_context(|| format!("reading config {path}")),
    }
}
