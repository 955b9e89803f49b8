pub mod go;
pub mod java;
pub mod node;
pub mod python;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::catalog::{Catalog, CatalogError, FileSpecificRule};
use super::versions::{extract_versions, Versions, DEPENDENCY_NAME};
use crate::config::EcosystemConfig;
use crate::pr::{diff, ChangedFile, ContentFetcher, PullRequest};

/// Everything a language rule may look at while judging one file.
pub struct RuleContext<'a> {
    pub file: &'a ChangedFile,
    pub rule: &'a FileSpecificRule,
    pub author: &'a str,
    pub title: &'a str,
    /// The whole PR, for cross-file checks
    pub pull_request: &'a PullRequest,
    pub fetcher: &'a dyn ContentFetcher,
}

/// Outcome of a language rule for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileVerdict {
    Approved,
    /// Rejected, with one message per unmet condition
    Rejected(Vec<String>),
}

impl FileVerdict {
    pub fn from_failures(failures: Vec<String>) -> Self {
        if failures.is_empty() {
            FileVerdict::Approved
        } else {
            FileVerdict::Rejected(failures)
        }
    }

    pub fn reject(message: impl Into<String>) -> Self {
        FileVerdict::Rejected(vec![message.into()])
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, FileVerdict::Approved)
    }
}

/// Ecosystem-specific acceptance policy.
///
/// Implementations never fail: every unmet condition becomes a
/// `FileVerdict::Rejected` message. Must be Send + Sync because files are
/// checked concurrently.
#[async_trait]
pub trait LanguageRule: Send + Sync {
    /// Process tag catalog entries use to select this rule (e.g. "node-dependency")
    fn process(&self) -> &str;

    async fn check_pr(&self, ctx: &RuleContext<'_>) -> FileVerdict;
}

/// Language rules keyed by process tag.
#[derive(Clone, Default)]
pub struct RuleRegistry {
    rules: HashMap<String, Arc<dyn LanguageRule>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in ecosystem, with allow-lists taken from
    /// `ecosystems` where configured.
    pub fn builtin(ecosystems: &HashMap<String, EcosystemConfig>) -> Self {
        let allow_list = |process: &str| {
            ecosystems
                .get(process)
                .and_then(|e| e.allowed_dependencies.clone())
                .map(AllowList::new)
        };

        let mut registry = Self::new();
        registry.register(node::NodeDependency::new(allow_list(node::NodeDependency::PROCESS)));
        registry.register(node::NodeRelease);
        registry.register(python::PythonDependency::new(allow_list(python::PythonDependency::PROCESS)));
        registry.register(java::JavaDependency::new(allow_list(java::JavaDependency::PROCESS)));
        registry.register(go::GoDependency::new(allow_list(go::GoDependency::PROCESS)));
        registry
    }

    pub fn register(&mut self, rule: impl LanguageRule + 'static) {
        self.rules.insert(rule.process().to_string(), Arc::new(rule));
    }

    pub fn get(&self, process: &str) -> Option<&dyn LanguageRule> {
        self.rules.get(process).map(|r| r.as_ref())
    }

    /// Every process named by the catalog must have a registered rule.
    pub fn check_catalog(&self, catalog: &Catalog) -> Result<(), CatalogError> {
        for (index, rule) in catalog.rules().iter().enumerate() {
            if let Some(process) = &rule.process {
                if !self.rules.contains_key(process) {
                    return Err(CatalogError::UnknownProcess {
                        index,
                        target_file: rule.target_file.to_string(),
                        process: process.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Dependency names a rule may approve. Entries ending in `*` match by
/// prefix, everything else must match exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
    entries: Vec<String>,
}

impl AllowList {
    pub fn new(entries: Vec<String>) -> Self {
        Self { entries }
    }

    pub fn permits(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| match entry.strip_suffix('*') {
            Some(prefix) => name.starts_with(prefix),
            None => name == entry,
        })
    }
}

// Checks shared by the ecosystem rules. Each appends a message to `failures`
// when its condition is not met.

/// Extract versions, or produce the rejection explaining why not.
pub(crate) fn versions_for(ctx: &RuleContext<'_>) -> Result<Versions, FileVerdict> {
    extract_versions(ctx.file, ctx.rule)
        .map_err(|e| FileVerdict::reject(format!("could not extract versions: {}", e)))
}

pub(crate) fn check_title(ctx: &RuleContext<'_>, failures: &mut Vec<String>) {
    if let Some(pattern) = &ctx.rule.title {
        if !pattern.is_match(ctx.title) {
            failures.push(format!(
                "title `{}` does not match required pattern `{}`",
                ctx.title, pattern
            ));
        }
    }
}

/// Dependency named by the title, when the rule's title pattern captures one.
pub(crate) fn title_dependency<'t>(ctx: &RuleContext<'t>) -> Option<&'t str> {
    let pattern = ctx.rule.title.as_ref()?;
    let caps = pattern.captures(ctx.title)?;
    caps.name(DEPENDENCY_NAME).map(|m| m.as_str())
}

pub(crate) fn check_title_names_dependency(
    ctx: &RuleContext<'_>,
    versions: &Versions,
    normalize: fn(&str) -> String,
    failures: &mut Vec<String>,
) {
    if let Some(named) = title_dependency(ctx) {
        if normalize(named) != normalize(&versions.new_dependency_name) {
            failures.push(format!(
                "title names `{}` but the diff changes `{}`",
                named, versions.new_dependency_name
            ));
        }
    }
}

pub(crate) fn check_same_dependency(
    versions: &Versions,
    normalize: fn(&str) -> String,
    failures: &mut Vec<String>,
) {
    if normalize(&versions.old_dependency_name) != normalize(&versions.new_dependency_name) {
        failures.push(format!(
            "dependency renamed from `{}` to `{}`",
            versions.old_dependency_name, versions.new_dependency_name
        ));
    }
}

pub(crate) fn check_allow_list(
    allow_list: Option<&AllowList>,
    versions: &Versions,
    failures: &mut Vec<String>,
) {
    if let Some(allow_list) = allow_list {
        if !allow_list.permits(&versions.new_dependency_name) {
            failures.push(format!(
                "dependency `{}` is not on the allow-list",
                versions.new_dependency_name
            ));
        }
    }
}

/// The patch must remove exactly one line and add exactly one line.
pub(crate) fn check_single_line_change(file: &ChangedFile, failures: &mut Vec<String>) {
    let Some(patch) = file.patch.as_deref() else {
        failures.push("file has no patch".to_string());
        return;
    };
    match diff::parse_patch(patch) {
        Ok(hunks) => {
            let (added, removed) = diff::line_counts(&hunks);
            if (added, removed) != (1, 1) {
                failures.push(format!(
                    "expected a single-line change, found +{} -{}",
                    added, removed
                ));
            }
        }
        Err(e) => failures.push(format!("could not parse patch: {}", e)),
    }
}

/// Path of `name` in the same directory as `file`.
pub(crate) fn sibling_path(file: &str, name: &str) -> String {
    match file.rsplit_once('/') {
        Some((dir, _)) => format!("{}/{}", dir, name),
        None => name.to_string(),
    }
}

/// A companion file in the same directory must be part of the same PR.
pub(crate) fn check_companion_file(ctx: &RuleContext<'_>, name: &str, failures: &mut Vec<String>) {
    let companion = sibling_path(&ctx.file.filename, name);
    if !ctx.pull_request.touches(&companion) {
        failures.push(format!(
            "`{}` changed without a matching change to `{}`",
            ctx.file.filename, companion
        ));
    }
}

pub(crate) fn exact(name: &str) -> String {
    name.to_string()
}
