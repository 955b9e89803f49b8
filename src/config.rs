use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::pattern;

const DEFAULT_CONFIG_FILE: &str = ".auto-approve.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .auto-approve.toml.
///
/// Every section is optional. With no `[[rules]]` nothing is ever approved.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// GitHub-specific settings
    #[serde(default)]
    pub github: GitHubConfig,

    /// Rule catalog to use instead of the built-in one
    #[serde(default)]
    pub catalog: Option<PathBuf>,

    /// PR-level policy entries, in priority order
    #[serde(default)]
    pub rules: Vec<ValidPr>,

    /// Per-ecosystem overrides, keyed by process tag (e.g. "java-dependency")
    #[serde(default)]
    pub ecosystems: HashMap<String, EcosystemConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubConfig {
    /// GitHub API token. If None, falls back to GITHUB_TOKEN env var.
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EcosystemConfig {
    /// Dependency names the ecosystem rule may approve; `*` suffix for prefixes
    #[serde(default)]
    pub allowed_dependencies: Option<Vec<String>>,
}

/// One PR-level policy entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidPr {
    /// PR author (exact match)
    pub author: String,
    /// Pattern the PR title must match
    #[serde(deserialize_with = "pattern::required")]
    pub title: Regex,
    /// Patterns for files this entry approves without a file-specific rule
    #[serde(default, deserialize_with = "pattern::optional_list")]
    pub changed_files: Option<Vec<Regex>>,
    /// Upper bound on the number of changed files
    #[serde(default)]
    pub max_files: Option<usize>,
}

impl ValidPr {
    pub fn matches(&self, author: &str, title: &str) -> bool {
        self.author == author && self.title.is_match(title)
    }

    /// Whether `path` is covered by `changed_files`. Always false when the
    /// entry lists no files.
    pub fn lists_file(&self, path: &str) -> bool {
        self.changed_files
            .as_ref()
            .is_some_and(|patterns| patterns.iter().any(|p| p.is_match(path)))
    }
}

/// The policy half of the configuration: the ordered list of ValidPr entries
/// a PR is judged against.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    pub rules: Vec<ValidPr>,
}

impl Configuration {
    pub fn new(rules: Vec<ValidPr>) -> Self {
        Self { rules }
    }

    /// First entry whose author and title match, with its index.
    pub fn find_entry(&self, author: &str, title: &str) -> Option<(usize, &ValidPr)> {
        self.rules
            .iter()
            .enumerate()
            .find(|(_, entry)| entry.matches(author, title))
    }
}

impl Config {
    /// Load configuration from .auto-approve.toml in the current directory.
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(DEFAULT_CONFIG_FILE);
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        // A relative catalog path is relative to the config file, not the cwd.
        if let (Some(catalog), Some(dir)) = (config.catalog.as_mut(), path.parent()) {
            if catalog.is_relative() {
                *catalog = dir.join(&*catalog);
            }
        }
        Ok(config)
    }

    pub fn configuration(&self) -> Configuration {
        Configuration::new(self.rules.clone())
    }

    /// Resolve the GitHub token: config file value takes precedence,
    /// falls back to GITHUB_TOKEN env var.
    pub fn github_token(&self) -> Option<String> {
        self.github
            .token
            .clone()
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
    }
}
