use std::fs;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use super::versions::REQUIRED_GROUPS;
use crate::pattern;

const BUILTIN_CATALOG: &str = include_str!("../../rules/catalog.toml");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read rule catalog: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse rule catalog: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Rule #{index} ({target_file}): {field} pattern is missing capture group `{group}`")]
    MissingCaptureGroup {
        index: usize,
        target_file: String,
        field: &'static str,
        group: &'static str,
    },

    #[error("Rule #{second} duplicates rule #{first} (same author, process and target file)")]
    DuplicateRule { first: usize, second: usize },

    #[error("Rule #{index} ({target_file}) declares unknown process `{process}`")]
    UnknownProcess {
        index: usize,
        target_file: String,
        process: String,
    },
}

/// A rule for files that match an author and filename, carrying the patterns
/// that pull the before/after versions out of that file format's diff.
#[derive(Debug, Clone, Deserialize)]
pub struct FileSpecificRule {
    /// PR author this rule applies to (exact match)
    pub pr_author: String,
    /// Language rule that judges files matched by this entry
    #[serde(default)]
    pub process: Option<String>,
    /// Pattern the PR title must match; may capture `dependencyName`
    #[serde(default, deserialize_with = "pattern::optional")]
    pub title: Option<Regex>,
    #[serde(deserialize_with = "pattern::required")]
    pub target_file: Regex,
    #[serde(deserialize_with = "pattern::required")]
    pub old_version: Regex,
    #[serde(deserialize_with = "pattern::required")]
    pub new_version: Regex,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    rules: Vec<FileSpecificRule>,
}

/// Ordered list of file-specific rules. Order matters: the first rule whose
/// author and target file match wins.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    rules: Vec<FileSpecificRule>,
}

impl Catalog {
    /// Build a catalog, validating every entry.
    pub fn new(rules: Vec<FileSpecificRule>) -> Result<Self, CatalogError> {
        for (index, rule) in rules.iter().enumerate() {
            for (field, regex) in [("old_version", &rule.old_version), ("new_version", &rule.new_version)] {
                for group in REQUIRED_GROUPS {
                    if !regex.capture_names().flatten().any(|name| name == group) {
                        return Err(CatalogError::MissingCaptureGroup {
                            index,
                            target_file: rule.target_file.to_string(),
                            field,
                            group,
                        });
                    }
                }
            }
            if let Some(first) = rules[..index].iter().position(|earlier| same_rule(earlier, rule)) {
                return Err(CatalogError::DuplicateRule { first, second: index });
            }
        }
        Ok(Self { rules })
    }

    /// The catalog shipped with the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml(BUILTIN_CATALOG)
    }

    pub fn from_toml(contents: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(contents)?;
        Self::new(file.rules)
    }

    pub fn load_from(path: &Path) -> Result<Self, CatalogError> {
        Self::from_toml(&fs::read_to_string(path)?)
    }

    pub fn rules(&self) -> &[FileSpecificRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn same_rule(a: &FileSpecificRule, b: &FileSpecificRule) -> bool {
    a.pr_author == b.pr_author
        && a.process == b.process
        && a.target_file.as_str() == b.target_file.as_str()
}
