pub mod catalog;
pub mod matcher;
pub mod reviews;
pub mod rules;
pub mod versions;

pub use catalog::{Catalog, CatalogError, FileSpecificRule};
pub use rules::{FileVerdict, LanguageRule, RuleContext, RuleRegistry};
pub use versions::{ExtractionError, Versions};

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, info_span, instrument, Instrument};

use crate::config::Configuration;
use crate::pr::{ChangedFile, ContentFetcher, PullRequest};
use crate::report::types::{Check, Disposition, Evaluation, FileOutcome, Reason};

/// Result of judging one file before PR-level policy is applied.
enum FileCheck {
    /// No catalog rule covers the file
    Unmatched,
    /// The matching catalog rule cannot be applied
    Unjudgeable(String),
    Judged { process: String, verdict: FileVerdict },
}

/// Decides whether pull requests qualify for automatic approval.
///
/// Holds only read-only inputs (the rule catalog, the language rules and a
/// content fetcher); every `evaluate` call is independent of every other.
pub struct Evaluator {
    catalog: Catalog,
    registry: RuleRegistry,
    fetcher: Arc<dyn ContentFetcher>,
}

impl Evaluator {
    /// Fails when the catalog names a process the registry does not know.
    pub fn new(
        catalog: Catalog,
        registry: RuleRegistry,
        fetcher: Arc<dyn ContentFetcher>,
    ) -> Result<Self, CatalogError> {
        registry.check_catalog(&catalog)?;
        Ok(Self {
            catalog,
            registry,
            fetcher,
        })
    }

    /// Judge `pull_request` against `configuration`.
    ///
    /// Approval requires all of:
    /// 1. a ValidPr entry matching the author and title (the first one wins)
    /// 2. the changed-file count within that entry's `max_files`
    /// 3. every file either passing its language rule or, when it matches no
    ///    rule, listed in the entry's `changed_files`
    /// 4. no reviewer requesting changes at the head commit
    ///
    /// Every failing check adds a reason; the PR is approved exactly when
    /// there are none.
    #[instrument(skip_all, fields(pr = pull_request.number, author = %pull_request.author))]
    pub async fn evaluate(
        &self,
        pull_request: &PullRequest,
        configuration: &Configuration,
    ) -> Evaluation {
        let mut reasons = Vec::new();

        let entry = configuration.find_entry(&pull_request.author, &pull_request.title);
        match entry {
            Some((index, _)) => debug!(entry = index, "matched policy entry"),
            None => reasons.push(Reason::new(
                Check::Policy,
                format!(
                    "no auto-approve rule matches author `{}` with title `{}`",
                    pull_request.author, pull_request.title
                ),
            )),
        }

        if pull_request.files.is_empty() {
            reasons.push(Reason::new(Check::FileCount, "pull request changes no files"));
        }
        if let Some((_, valid_pr)) = entry {
            if let Some(max_files) = valid_pr.max_files {
                if pull_request.files.len() > max_files {
                    reasons.push(Reason::new(
                        Check::FileCount,
                        format!(
                            "{} files changed, more than the {} allowed",
                            pull_request.files.len(),
                            max_files
                        ),
                    ));
                }
            }
        }

        let checks = join_all(
            pull_request
                .files
                .iter()
                .map(|file| self.check_file(pull_request, file)),
        )
        .await;

        let mut files = Vec::with_capacity(checks.len());
        for (file, check) in pull_request.files.iter().zip(checks) {
            let path = file.filename.as_str();
            let disposition = match check {
                FileCheck::Judged {
                    process,
                    verdict: FileVerdict::Approved,
                } => Disposition::ApprovedByRule(process),
                FileCheck::Judged {
                    verdict: FileVerdict::Rejected(messages),
                    ..
                } => {
                    reasons.extend(
                        messages
                            .into_iter()
                            .map(|m| Reason::for_file(Check::FileRule, path, m)),
                    );
                    Disposition::Rejected
                }
                FileCheck::Unjudgeable(message) => {
                    reasons.push(Reason::for_file(Check::FileRule, path, message));
                    Disposition::Rejected
                }
                FileCheck::Unmatched if entry.is_some_and(|(_, e)| e.lists_file(path)) => {
                    Disposition::ApprovedByPolicy
                }
                FileCheck::Unmatched => {
                    let listed = entry.is_some_and(|(_, e)| e.changed_files.is_some());
                    let message = if listed {
                        "matches no file rule and is not listed in changed_files"
                    } else {
                        "matches no file rule"
                    };
                    reasons.push(Reason::for_file(Check::Unmatched, path, message));
                    Disposition::Rejected
                }
            };
            files.push(FileOutcome {
                path: path.to_string(),
                disposition,
            });
        }

        if pull_request.head_sha().is_empty() {
            reasons.push(Reason::new(
                Check::Review,
                "head commit unknown; cannot verify reviews",
            ));
        }
        for review in reviews::blocking_reviews(&pull_request.reviews, pull_request.head_sha()) {
            reasons.push(Reason::new(
                Check::Review,
                format!(
                    "`{}` requested changes at head commit {}",
                    review.reviewer, review.commit_id
                ),
            ));
        }

        let approved = reasons.is_empty();
        for reason in &reasons {
            debug!(%reason, "rejection reason");
        }
        info!(approved, reasons = reasons.len(), "evaluation complete");

        Evaluation {
            approved,
            reasons,
            files,
            policy_entry: entry.map(|(index, _)| index),
        }
    }

    async fn check_file(&self, pull_request: &PullRequest, file: &ChangedFile) -> FileCheck {
        let author = pull_request.author.as_str();
        let Some(rule) = matcher::find_rule(&self.catalog, file, author) else {
            return FileCheck::Unmatched;
        };
        let Some(process) = rule.process.as_deref() else {
            return FileCheck::Unjudgeable("matching catalog rule declares no process".to_string());
        };
        let Some(language_rule) = self.registry.get(process) else {
            return FileCheck::Unjudgeable(format!("no language rule registered for `{}`", process));
        };

        let ctx = RuleContext {
            file,
            rule,
            author,
            title: &pull_request.title,
            pull_request,
            fetcher: self.fetcher.as_ref(),
        };
        let verdict = language_rule
            .check_pr(&ctx)
            .instrument(info_span!("check_file", path = %file.filename, process))
            .await;
        if let FileVerdict::Rejected(messages) = &verdict {
            debug!(path = %file.filename, process, failures = messages.len(), "file rejected");
        }
        FileCheck::Judged {
            process: process.to_string(),
            verdict,
        }
    }
}
