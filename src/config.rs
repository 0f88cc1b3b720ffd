//! TOML configuration.
//!
//! ```toml
//! [corpus]
//! root = "./documents"
//! include_globs = ["**/*.rs3"]
//!
//! [parser]
//! layout = "auto"     # auto | nested | flat
//! on_error = "fail"   # fail | skip
//!
//! [server]
//! bind = "127.0.0.1:7341"
//! ```

use anyhow::{Context, Result};
use globset::Glob;
use rst_lens_core::parser::ParseOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub parser: ParseOptions,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
    /// Files larger than this are skipped with a warning.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.rs3".to_string()]
}
fn default_max_file_bytes() -> u64 {
    10 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

impl Config {
    /// Defaults used when no config file exists: `./documents`, all `.rs3`
    /// files, auto layout, fail-fast.
    pub fn minimal() -> Self {
        Self {
            corpus: CorpusConfig {
                root: PathBuf::from("./documents"),
                include_globs: default_include_globs(),
                exclude_globs: Vec::new(),
                follow_symlinks: false,
                max_file_bytes: default_max_file_bytes(),
            },
            parser: ParseOptions::default(),
            server: ServerConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.corpus.include_globs.is_empty() {
        anyhow::bail!("corpus.include_globs must not be empty");
    }
    for pattern in config
        .corpus
        .include_globs
        .iter()
        .chain(&config.corpus.exclude_globs)
    {
        Glob::new(pattern).with_context(|| format!("Invalid glob in [corpus]: '{}'", pattern))?;
    }

    if config.corpus.max_file_bytes == 0 {
        anyhow::bail!("corpus.max_file_bytes must be > 0");
    }

    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    Ok(())
}
