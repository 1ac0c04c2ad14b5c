//! commitsmith - CLI entry point.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use commitsmith::commit::BatchOutcome;
use commitsmith::{
    BatchOptions, BatchOrchestrator, GenerationClient, GenerationConfig, GitRepository,
    HttpGenerator, PrivacySanitizer,
};

/// Commit each pending file separately with a generated message.
#[derive(Parser, Debug)]
#[command(name = "commitsmith")]
#[command(about = "Commit each pending file separately with a generated message")]
#[command(version)]
struct Cli {
    /// Repository to operate on (defaults to the current directory)
    #[arg(long, default_value = ".")]
    repo: PathBuf,

    /// Dry run - print the planned commits without staging or committing
    #[arg(long)]
    dry_run: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context("Invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let repo = GitRepository::discover(&cli.repo)
        .with_context(|| format!("Not a git repository: {}", cli.repo.display()))?;

    let config = GenerationConfig::from_env().context("Generation service is not configured")?;

    let sanitizer = PrivacySanitizer::new(Some(repo.workdir().to_path_buf()));
    let client = GenerationClient::new(HttpGenerator::new(&config), config, sanitizer.clone());
    let options = BatchOptions {
        dry_run: cli.dry_run,
        ..Default::default()
    };

    println!("Analyzing changes in {}...", repo.workdir().display());

    let mut orchestrator = BatchOrchestrator::new(repo, client, sanitizer, options);
    let report = orchestrator.run().await.context("Batch commit failed")?;

    if cli.dry_run && report.outcome == BatchOutcome::Completed {
        println!("\n--- Dry Run Output ---\n");
    }
    print!("{report}");

    if let Some(privacy) = report.privacy.as_ref().filter(|p| p.has_findings()) {
        println!("\n{privacy}");
    }

    if !report.is_success() {
        anyhow::bail!("{} file(s) could not be committed", report.failed.len());
    }

    Ok(())
}
