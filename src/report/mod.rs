pub mod types;

pub use types::{Check, Disposition, Evaluation, FileOutcome, Reason, Report};

use crate::pr::PullRequest;
use colored::Colorize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// Pair an evaluation with the PR metadata shown in the report header.
pub fn build(evaluation: Evaluation, pr: &PullRequest) -> Report {
    Report {
        pr_number: pr.number,
        pr_title: pr.title.clone(),
        author: pr.author.clone(),
        files_changed: pr.files.len(),
        additions: pr.additions(),
        deletions: pr.deletions(),
        evaluation,
    }
}

/// Output the report to terminal (default) or to a markdown file.
#[instrument(skip(report), fields(pr = report.pr_number, approved = report.evaluation.approved))]
pub fn output(report: &Report, output_path: Option<&Path>) -> Result<(), ReportError> {
    match output_path {
        None => {
            debug!("writing report to terminal");
            print_terminal_report(report);
            Ok(())
        }
        Some(path) => {
            debug!(path = %path.display(), "writing report to file");
            write_markdown_report(report, path)
        }
    }
}

/// PR #42: "chore(deps): bump left-pad from 1.2.0 to 1.3.0"
/// Author: renovate-bot | Files changed: 1 | +1 -1
///
/// ═══ Files ═══
///   ✔ package.json (approved by node-dependency)
///
/// ═══ Reasons ═══
///   • ...
///
/// ═══ Verdict: APPROVED ═══
fn print_terminal_report(report: &Report) {
    println!();
    println!("PR #{}: \"{}\"", report.pr_number, report.pr_title);
    println!(
        "Author: {} | Files changed: {} | +{} -{}",
        report.author, report.files_changed, report.additions, report.deletions
    );
    println!();

    let evaluation = &report.evaluation;
    println!("═══ Files ═══");
    if evaluation.files.is_empty() {
        println!("  No files.");
    }
    for file in &evaluation.files {
        let mark = match file.disposition {
            Disposition::Rejected => "✘".red().bold(),
            _ => "✔".green().bold(),
        };
        println!("  {} {} ({})", mark, file.path, file.disposition);
    }
    println!();

    if !evaluation.reasons.is_empty() {
        println!("═══ Reasons ═══");
        for reason in &evaluation.reasons {
            println!("  • {}", reason);
        }
        println!();
    }

    println!("═══ Verdict: {} ═══", colorize_verdict(evaluation.approved));
    println!();
}

/// Write the report as a markdown file, suitable for a check-run summary.
fn write_markdown_report(report: &Report, path: &Path) -> Result<(), ReportError> {
    std::fs::write(path, render_markdown(report))?;
    Ok(())
}

pub fn render_markdown(report: &Report) -> String {
    let evaluation = &report.evaluation;
    let mut md = String::new();
    md.push_str(&format!("# PR #{}: \"{}\"\n\n", report.pr_number, report.pr_title));
    md.push_str(&format!(
        "**Author:** {} | **Files changed:** {} | **+{} -{}**\n\n",
        report.author, report.files_changed, report.additions, report.deletions
    ));

    md.push_str("## Files\n\n");
    if evaluation.files.is_empty() {
        md.push_str("No files.\n\n");
    } else {
        for file in &evaluation.files {
            md.push_str(&format!("- `{}`: {}\n", file.path, file.disposition));
        }
        md.push('\n');
    }

    if !evaluation.reasons.is_empty() {
        md.push_str("## Reasons\n\n");
        for reason in &evaluation.reasons {
            let location = match &reason.file {
                Some(f) => format!(" (`{}`)", f),
                None => String::new(),
            };
            md.push_str(&format!("- **[{}]** {}{}\n", reason.check, reason.message, location));
        }
        md.push('\n');
    }

    md.push_str(&format!("## Verdict: {}\n", verdict_label(evaluation.approved)));
    md
}

fn verdict_label(approved: bool) -> &'static str {
    if approved {
        "APPROVED"
    } else {
        "REJECTED"
    }
}

fn colorize_verdict(approved: bool) -> colored::ColoredString {
    if approved {
        verdict_label(approved).green().bold()
    } else {
        verdict_label(approved).red().bold()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pr::ChangedFile;

    fn sample_pr() -> PullRequest {
        PullRequest {
            number: 42,
            title: "chore(deps): bump left-pad from 1.2.0 to 1.3.0".to_string(),
            author: "renovate-bot".to_string(),
            files: vec![ChangedFile {
                filename: "package.json".to_string(),
                additions: Some(1),
                deletions: Some(1),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn rejected() -> Evaluation {
        Evaluation {
            approved: false,
            reasons: vec![Reason::for_file(
                Check::FileRule,
                "package.json",
                "minor-only policy violated: major version changed (1.2.0 -> 2.0.0)",
            )],
            files: vec![FileOutcome {
                path: "package.json".to_string(),
                disposition: Disposition::Rejected,
            }],
            policy_entry: Some(0),
        }
    }

    fn approved() -> Evaluation {
        Evaluation {
            approved: true,
            reasons: vec![],
            files: vec![FileOutcome {
                path: "package.json".to_string(),
                disposition: Disposition::ApprovedByRule("node-dependency".to_string()),
            }],
            policy_entry: Some(0),
        }
    }

    #[test]
    fn test_build_report_metadata() {
        let report = build(approved(), &sample_pr());
        assert_eq!(report.pr_number, 42);
        assert_eq!(report.author, "renovate-bot");
        assert_eq!(report.files_changed, 1);
        assert_eq!(report.additions, 1);
    }

    #[test]
    fn test_markdown_for_rejection() {
        let md = render_markdown(&build(rejected(), &sample_pr()));
        assert!(md.contains("# PR #42"));
        assert!(md.contains("**Author:** renovate-bot"));
        assert!(md.contains("- `package.json`: rejected"));
        assert!(md.contains("**[file-rule]** minor-only policy violated"));
        assert!(md.contains("## Verdict: REJECTED"));
    }

    #[test]
    fn test_markdown_for_approval_has_no_reasons() {
        let md = render_markdown(&build(approved(), &sample_pr()));
        assert!(!md.contains("## Reasons"));
        assert!(md.contains("approved by node-dependency"));
        assert!(md.contains("## Verdict: APPROVED"));
    }

    #[test]
    fn test_output_to_file() {
        let report = build(rejected(), &sample_pr());
        let path = std::env::temp_dir().join("auto_approve_test_output.md");
        output(&report, Some(&path)).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("## Verdict: REJECTED"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_output_to_terminal() {
        let report = build(approved(), &sample_pr());
        // Should not panic
        output(&report, None).unwrap();
    }
}
