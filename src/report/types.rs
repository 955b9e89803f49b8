/// Which check produced a rejection reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// No ValidPr entry matches the author and title
    Policy,
    /// Changed-file count over `max_files`, or no files at all
    FileCount,
    /// A file was judged by a language rule and failed
    FileRule,
    /// A file matched no rule and is not listed in `changed_files`
    Unmatched,
    /// A reviewer is blocking at the head commit
    Review,
}

impl std::fmt::Display for Check {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Check::Policy => write!(f, "policy"),
            Check::FileCount => write!(f, "file-count"),
            Check::FileRule => write!(f, "file-rule"),
            Check::Unmatched => write!(f, "unmatched-file"),
            Check::Review => write!(f, "review"),
        }
    }
}

/// One failing check, with the file it concerns when there is one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reason {
    pub check: Check,
    pub file: Option<String>,
    pub message: String,
}

impl Reason {
    pub fn new(check: Check, message: impl Into<String>) -> Self {
        Self {
            check,
            file: None,
            message: message.into(),
        }
    }

    pub fn for_file(check: Check, file: &str, message: impl Into<String>) -> Self {
        Self {
            check,
            file: Some(file.to_string()),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.file {
            Some(file) => write!(f, "[{}] {}: {}", self.check, file, self.message),
            None => write!(f, "[{}] {}", self.check, self.message),
        }
    }
}

/// How a single changed file was judged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Passed the language rule registered for this process tag
    ApprovedByRule(String),
    /// Matched no rule but is listed in the entry's `changed_files`
    ApprovedByPolicy,
    Rejected,
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Disposition::ApprovedByRule(process) => write!(f, "approved by {}", process),
            Disposition::ApprovedByPolicy => write!(f, "listed in changed_files"),
            Disposition::Rejected => write!(f, "rejected"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub path: String,
    pub disposition: Disposition,
}

/// Verdict for one PR against one configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub approved: bool,
    /// Failing checks, in evaluation order; empty exactly when approved
    pub reasons: Vec<Reason>,
    /// Per-file outcomes, in PR file order
    pub files: Vec<FileOutcome>,
    /// Index of the ValidPr entry the PR was judged against
    pub policy_entry: Option<usize>,
}

impl Evaluation {
    /// Reasons rendered as plain strings, e.g. for a check-run summary.
    pub fn reason_messages(&self) -> Vec<String> {
        self.reasons.iter().map(|r| r.to_string()).collect()
    }
}

/// Evaluation plus the PR metadata needed to render it.
#[derive(Debug)]
pub struct Report {
    pub pr_number: u64,
    pub pr_title: String,
    pub author: String,
    pub files_changed: usize,
    pub additions: usize,
    pub deletions: usize,
    pub evaluation: Evaluation,
}
