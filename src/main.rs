use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ruyi_backend::auth::{check_password, hash_password};
use ruyi_backend::cli::{Cli, Command, PasswordCommand};
use ruyi_backend::config::Config;
use ruyi_backend::github::GitHubClient;
use ruyi_backend::staging::StagingDir;
use ruyi_backend::sync::ReleaseSyncer;
use ruyi_backend::transport::RsyncTransport;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    let default_level = if cli.verbose || config.debug {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();

    match cli.command {
        Command::Password { action } => run_password(action),
        Command::SyncReleases { repo } => sync_releases(&config, repo).await,
    }
}

fn run_password(action: PasswordCommand) -> Result<ExitCode> {
    let password = rpassword::prompt_password("Password: ").context("Failed to read password")?;

    match action {
        PasswordCommand::Hash => {
            println!("{}", hash_password(&password));
            Ok(ExitCode::SUCCESS)
        }
        PasswordCommand::Test { hash } => {
            if check_password(&hash, &password) {
                println!("Password matches");
                Ok(ExitCode::SUCCESS)
            } else {
                println!("Password does not match");
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

async fn sync_releases(config: &Config, repo: Option<String>) -> Result<ExitCode> {
    let worker = &config.cli.release_worker;
    worker.validate()?;

    let staging = StagingDir::new(&worker.rsync_staging_dir);
    let source = GitHubClient::new(&config.github).context("Failed to create GitHub client")?;
    let transport = RsyncTransport::new(
        &worker.rsync_remote_url,
        worker.remote_password().map(str::to_string),
        staging.clone(),
    );
    let repo = repo.unwrap_or_else(|| config.github.ruyi_pm_repo.clone());

    let syncer = ReleaseSyncer::new(Arc::new(source), Arc::new(transport), staging, repo);
    let summary = syncer.run().await.context("Release sync run failed")?;

    if summary.has_failures() {
        let failed: Vec<&str> = summary.failed().map(|r| r.tag.as_str()).collect();
        tracing::error!("{} release(s) failed: {}", failed.len(), failed.join(", "));
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}
