use std::fmt;

use regex::Regex;
use thiserror::Error;

use super::catalog::FileSpecificRule;
use crate::pr::ChangedFile;

pub const DEPENDENCY_NAME: &str = "dependencyName";
pub const MAJOR_VERSION: &str = "majorVersion";
pub const MINOR_VERSION: &str = "minorVersion";

/// Capture groups every old/new version pattern must define.
pub const REQUIRED_GROUPS: [&str; 3] = [DEPENDENCY_NAME, MAJOR_VERSION, MINOR_VERSION];

/// Dependency name and version before and after the change.
///
/// Components stay strings: they may hold wildcards or pre-release tags. The
/// minor component carries everything after the major version, so `1.2.0`
/// splits into major `1` and minor `2.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versions {
    pub old_dependency_name: String,
    pub new_dependency_name: String,
    pub old_major_version: String,
    pub old_minor_version: String,
    pub new_major_version: String,
    pub new_minor_version: String,
}

impl Versions {
    pub fn old_version(&self) -> String {
        format!("{}.{}", self.old_major_version, self.old_minor_version)
    }

    pub fn new_version(&self) -> String {
        format!("{}.{}", self.new_major_version, self.new_minor_version)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Old,
    New,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Old => write!(f, "old"),
            Side::New => write!(f, "new"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("file has no patch to extract versions from")]
    MissingPatch,

    #[error("{0}-version pattern did not match the patch")]
    NotFound(Side),

    #[error("{side}-version pattern matched {count} different versions in the patch; expected exactly one")]
    Ambiguous { side: Side, count: usize },

    #[error("{side}-version pattern matched without capturing `{group}`")]
    MissingGroup { side: Side, group: &'static str },
}

/// Pull the old and new dependency versions out of a file's patch using the
/// rule's version patterns.
///
/// Each pattern must find exactly one distinct (name, major, minor) triple.
/// The same line repeated across hunks counts once; two different versions
/// means the diff bumps more than one thing and is rejected rather than
/// guessed at.
pub fn extract_versions(
    file: &ChangedFile,
    rule: &FileSpecificRule,
) -> Result<Versions, ExtractionError> {
    let patch = file.patch.as_deref().ok_or(ExtractionError::MissingPatch)?;

    let (old_dependency_name, old_major_version, old_minor_version) =
        single_match(&rule.old_version, patch, Side::Old)?;
    let (new_dependency_name, new_major_version, new_minor_version) =
        single_match(&rule.new_version, patch, Side::New)?;

    Ok(Versions {
        old_dependency_name,
        new_dependency_name,
        old_major_version,
        old_minor_version,
        new_major_version,
        new_minor_version,
    })
}

fn single_match(
    pattern: &Regex,
    patch: &str,
    side: Side,
) -> Result<(String, String, String), ExtractionError> {
    let mut found: Vec<(String, String, String)> = Vec::new();
    for caps in pattern.captures_iter(patch) {
        let group = |name: &'static str| {
            caps.name(name)
                .map(|m| m.as_str().trim().to_string())
                .ok_or(ExtractionError::MissingGroup { side, group: name })
        };
        let triple = (
            group(DEPENDENCY_NAME)?,
            group(MAJOR_VERSION)?,
            group(MINOR_VERSION)?,
        );
        if !found.contains(&triple) {
            found.push(triple);
        }
    }

    match found.len() {
        0 => Err(ExtractionError::NotFound(side)),
        1 => Ok(found.remove(0)),
        count => Err(ExtractionError::Ambiguous { side, count }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Number(u64),
    /// Non-numeric segment such as `x` or `0-beta`
    Wildcard(String),
}

/// Result of comparing two dotted version strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Up,
    Same,
    Down,
    /// A non-numeric segment decided the comparison
    Wildcard,
}

/// Dotted-decimal version fragment, compared segment by segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DottedVersion {
    raw: String,
    segments: Vec<Segment>,
}

impl DottedVersion {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let segments = raw
            .split('.')
            .filter(|s| !s.is_empty())
            .map(|s| match s.parse::<u64>() {
                Ok(n) => Segment::Number(n),
                Err(_) => Segment::Wildcard(s.to_string()),
            })
            .collect();
        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    /// Split off the leading segment, returning it and the remainder.
    pub fn split_first(&self) -> (DottedVersion, DottedVersion) {
        match self.raw.split_once('.') {
            Some((head, rest)) => (Self::parse(head), Self::parse(rest)),
            None => (Self::parse(&self.raw), Self::parse("")),
        }
    }

    /// Compare `self` (the new version) against `old`.
    pub fn step_from(&self, old: &DottedVersion) -> Step {
        if self.raw == old.raw {
            return Step::Same;
        }
        for (new, old) in self.segments.iter().zip(&old.segments) {
            match (new, old) {
                (Segment::Number(n), Segment::Number(o)) if n > o => return Step::Up,
                (Segment::Number(n), Segment::Number(o)) if n < o => return Step::Down,
                (Segment::Number(_), Segment::Number(_)) => continue,
                _ => return Step::Wildcard,
            }
        }
        match self.segments.len().cmp(&old.segments.len()) {
            std::cmp::Ordering::Greater => Step::Up,
            std::cmp::Ordering::Less => Step::Down,
            std::cmp::Ordering::Equal => Step::Same,
        }
    }
}

impl fmt::Display for DottedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// How far a version is allowed to move for a change to be auto-approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionBound {
    /// Major unchanged, minor (or anything after it) increased
    MinorOnly,
    /// Major and minor unchanged, patch increased
    PatchOnly,
    /// Any increase, major included
    AnyUpgrade,
}

impl fmt::Display for VersionBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionBound::MinorOnly => write!(f, "minor-only"),
            VersionBound::PatchOnly => write!(f, "patch-only"),
            VersionBound::AnyUpgrade => write!(f, "upgrade-only"),
        }
    }
}

impl VersionBound {
    /// Check the version delta, returning a human-readable violation.
    pub fn check(&self, versions: &Versions) -> Result<(), String> {
        let old_major = DottedVersion::parse(&versions.old_major_version);
        let new_major = DottedVersion::parse(&versions.new_major_version);
        let old_minor = DottedVersion::parse(&versions.old_minor_version);
        let new_minor = DottedVersion::parse(&versions.new_minor_version);
        let delta = format!("{} -> {}", versions.old_version(), versions.new_version());

        match self {
            VersionBound::MinorOnly => {
                if old_major.raw != new_major.raw {
                    return Err(format!("{} policy violated: major version changed ({})", self, delta));
                }
                match new_minor.step_from(&old_minor) {
                    Step::Up | Step::Wildcard => Ok(()),
                    Step::Same | Step::Down => {
                        Err(format!("{} policy violated: version did not increase ({})", self, delta))
                    }
                }
            }
            VersionBound::PatchOnly => {
                if old_major.raw != new_major.raw {
                    return Err(format!("{} policy violated: major version changed ({})", self, delta));
                }
                let (old_head, old_patch) = old_minor.split_first();
                let (new_head, new_patch) = new_minor.split_first();
                if old_head.raw != new_head.raw {
                    return Err(format!("{} policy violated: minor version changed ({})", self, delta));
                }
                match new_patch.step_from(&old_patch) {
                    Step::Up | Step::Wildcard => Ok(()),
                    Step::Same | Step::Down => {
                        Err(format!("{} policy violated: patch version did not increase ({})", self, delta))
                    }
                }
            }
            VersionBound::AnyUpgrade => match new_major.step_from(&old_major) {
                Step::Up => Ok(()),
                Step::Same => match new_minor.step_from(&old_minor) {
                    Step::Up | Step::Wildcard => Ok(()),
                    Step::Same | Step::Down => {
                        Err(format!("{} policy violated: version did not increase ({})", self, delta))
                    }
                },
                Step::Down => Err(format!("{} policy violated: major version decreased ({})", self, delta)),
                Step::Wildcard => Err(format!("{} policy violated: major version is not numeric ({})", self, delta)),
            },
        }
    }
}
