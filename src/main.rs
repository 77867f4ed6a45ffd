mod config;
mod github;
mod registry;
mod store;

use clap::Parser;
use colored::Colorize;
use tracing::{info, info_span, warn, Instrument};
use tracing_subscriber::EnvFilter;

use registry::{Outcome, Processor};
use store::MappingStore;

/// Registry bot — scans a repository's open issues for registration
/// requests, validates them, and records accepted name -> URL pairs in a
/// JSON mapping file committed back to the repository.
#[derive(Parser, Debug)]
#[command(name = "registry-bot", version, about)]
struct Cli {
    /// Repository to operate on, as owner/name. Overrides the config file.
    #[arg(long)]
    repo: Option<String>,

    /// Issue label that marks registration requests. Overrides the config file.
    #[arg(long)]
    label: Option<String>,

    /// Decide outcomes without writing the mapping, commenting, or closing
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Default)]
struct Tally {
    registered: usize,
    duplicates: usize,
    rejected: usize,
    invalid: usize,
    errors: usize,
}

impl Tally {
    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Registered => self.registered += 1,
            Outcome::AlreadyRegistered => self.duplicates += 1,
            Outcome::NameTaken { .. } | Outcome::UrlTaken { .. } => self.rejected += 1,
            Outcome::InvalidSyntax => self.invalid += 1,
        }
    }

    fn total(&self) -> usize {
        self.registered + self.duplicates + self.rejected + self.invalid + self.errors
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::Config::load()?;

    let repo_slug = cli
        .repo
        .or_else(|| config.github.repository.clone())
        .ok_or("repository is required: pass --repo owner/name or set github.repository in .registry-bot.toml")?;
    let (owner, repo) = github::parse_repo_slug(&repo_slug)?;
    let token = config
        .github_token()
        .ok_or("GitHub token is required: set github.token or the GITHUB_TOKEN env var")?;
    let label = cli.label.unwrap_or_else(|| config.registry.label.clone());

    let client = github::Client::new(owner, repo, token);
    let mapping_file = client.repo_file(&config.registry.mapping_path, &config.registry.commit_message);
    let processor = Processor::new(
        MappingStore::new(mapping_file),
        config.registry.mapping_path.clone(),
        client.blob_url(&config.registry.mapping_path),
        cli.dry_run,
    );

    info!(repo = %repo_slug, label = %label, dry_run = cli.dry_run, "scanning for registration issues");
    let issues = client.list_open_issues(&label).await?;
    info!(count = issues.len(), "fetched open registration issues");

    let mut tally = Tally::default();
    for issue in issues {
        let span = info_span!("issue", number = issue.number);
        match handle_issue(&client, &processor, &issue, cli.dry_run)
            .instrument(span)
            .await
        {
            Ok(outcome) => tally.record(&outcome),
            Err(err) => {
                warn!(issue = issue.number, error = %err, "processing failed; leaving issue open for the next run");
                tally.errors += 1;
            }
        }
    }

    print_summary(&tally, cli.dry_run);

    if tally.errors > 0 {
        return Err(format!("{} issue(s) could not be processed", tally.errors).into());
    }
    Ok(())
}

/// Process one issue end to end: decide the outcome, post the single
/// transcript comment, and close with the outcome's state reason.
///
/// Store and tracker failures bubble up before the close, so the issue
/// stays open and is reconsidered on a future run; a re-run of an already
/// persisted registration resolves to AlreadyRegistered, which keeps
/// at-least-once processing idempotent.
async fn handle_issue(
    client: &github::Client,
    processor: &Processor<github::RepoFile>,
    issue: &github::Issue,
    dry_run: bool,
) -> Result<Outcome, Box<dyn std::error::Error>> {
    info!(title = %issue.title, "processing issue");

    let body = issue.body.as_deref().unwrap_or_default();
    let processed = processor.process(body).await?;

    if dry_run {
        info!(outcome = %processed.outcome, "dry run, not commenting or closing");
        return Ok(processed.outcome);
    }

    client.create_comment(issue.number, &processed.comment).await?;
    client
        .close_issue(issue.number, processed.outcome.close_reason())
        .await?;

    info!(outcome = %processed.outcome, "issue closed");
    Ok(processed.outcome)
}

fn print_summary(tally: &Tally, dry_run: bool) {
    let heading = if dry_run {
        "Run complete (dry run)"
    } else {
        "Run complete"
    };
    println!();
    println!("═══ {} ═══", heading);
    println!("Issues processed: {}", tally.total());
    println!("  Registered:         {}", tally.registered.to_string().green().bold());
    println!("  Already registered: {}", tally.duplicates);
    println!("  Conflicts:          {}", tally.rejected.to_string().yellow().bold());
    println!("  Invalid syntax:     {}", tally.invalid);
    if tally.errors > 0 {
        println!("  Errors:             {}", tally.errors.to_string().red().bold());
    }
    println!();
}
