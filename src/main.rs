use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use auto_approve::config::Config;
use auto_approve::engine::{Catalog, Evaluator, RuleRegistry};
use auto_approve::pr::{self, ContentFetcher, GitHubFetcher};
use auto_approve::report;
use clap::Parser;
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

/// auto-approve: decide whether a GitHub Pull Request qualifies for automatic
/// approval under the repository's policy, and explain why or why not.
///
/// Exits 0 when the PR would be approved, 1 when it would not.
#[derive(Parser, Debug)]
#[command(name = "auto-approve", version, about)]
struct Cli {
    /// GitHub Pull Request URL (e.g., https://github.com/org/repo/pull/42)
    ///
    /// Not required when --snapshot is used.
    pr_url: Option<String>,

    /// Evaluate a PR snapshot from a JSON file instead of fetching from GitHub
    #[arg(long, conflicts_with = "pr_url")]
    snapshot: Option<PathBuf>,

    /// Configuration file (defaults to .auto-approve.toml in the current directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Optional output file path for markdown report
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    debug!(rules = config.rules.len(), "loaded configuration");

    let catalog = match config.catalog.as_deref() {
        Some(path) => Catalog::load_from(path)?,
        None => Catalog::builtin()?,
    };
    debug!(rules = catalog.len(), "loaded rule catalog");

    let (pull_request, fetcher) = match &cli.snapshot {
        Some(path) => {
            info!(path = %path.display(), "loading PR snapshot");
            let (snapshot, contents) = pr::load_snapshot(path)?;
            (snapshot, Arc::new(contents) as Arc<dyn ContentFetcher>)
        }
        None => {
            let pr_url = cli.pr_url.as_deref().ok_or(
                "PR URL is required unless --snapshot is used. Usage: auto-approve <URL> or auto-approve --snapshot <FILE>",
            )?;
            let _main_span = info_span!("auto_approve", pr_url = %pr_url).entered();

            let parsed_url = pr::parse_pr_url(pr_url)?;
            debug!(owner = %parsed_url.owner, repo = %parsed_url.repo, pr = parsed_url.pr_number, "parsed PR URL");

            let token = config.github_token().ok_or(pr::PrError::MissingToken)?;
            info!("fetching pull request from GitHub");
            let fetched = pr::fetch_pull_request(&parsed_url, &token).await?;
            info!(files = fetched.files.len(), reviews = fetched.reviews.len(), "fetched PR");
            (
                fetched,
                Arc::new(GitHubFetcher::new(token)) as Arc<dyn ContentFetcher>,
            )
        }
    };

    let registry = RuleRegistry::builtin(&config.ecosystems);
    let evaluator = Evaluator::new(catalog, registry, fetcher)?;

    info!("evaluating");
    let evaluation = evaluator
        .evaluate(&pull_request, &config.configuration())
        .await;
    let approved = evaluation.approved;

    let built_report = report::build(evaluation, &pull_request);
    report::output(&built_report, cli.output.as_deref())?;
    info!(approved, "done");

    Ok(if approved {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
