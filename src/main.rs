mod browser;
mod capture;
mod cli;
mod config;
mod demo;
mod email;
mod error;
mod governor;
mod locator;
mod model;
mod orchestrator;
mod sink;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use browser::{ActionExecutor, RemoteSession};
use capture::FsDocumentStore;
use cli::{Cli, Command};
use config::ScoutConfig;
use email::{DirectoryClient, DohClient, EmailResolver};
use error::ScoutError;
use model::JobRef;
use orchestrator::DiscoveryOrchestrator;
use sink::JsonlSink;
use ui::RunProgress;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Run { file, out } => run(cli.rate_limit, &file, &out).await,
        Command::Demo => demo::run_demo().await,
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "talentscout=debug"
    } else {
        "talentscout=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(rate_limit: Option<u32>, file: &str, out: &str) -> Result<()> {
    let mut config = ScoutConfig::load().context("failed to load configuration")?;
    if let Some(limit) = rate_limit {
        config.rate_limit_per_hour = limit;
    }
    if config.session_token.is_empty() {
        return Err(ScoutError::Config(
            "no session credential: set TALENTSCOUT_SESSION_TOKEN or session_token in talentscout.toml"
                .into(),
        )
        .into());
    }

    let jobs = load_jobs(file)?;
    tracing::info!(jobs = jobs.len(), input = file, output = out, "queue loaded");

    let session = match &config.browser_control_url {
        Some(url) => RemoteSession::with_base_url(config.session_token.clone(), url.clone()),
        None => RemoteSession::new(config.session_token.clone()),
    };
    let executor = ActionExecutor::new(session, config.governor(), config.pacing());

    let directory = match &config.directory_base_url {
        Some(url) => DirectoryClient::with_base_url(config.directory_api_key.clone(), url.clone()),
        None => DirectoryClient::new(config.directory_api_key.clone()),
    };
    let doh = match &config.doh_base_url {
        Some(url) => DohClient::with_base_url(url.clone()),
        None => DohClient::new(),
    };

    let sink = JsonlSink::create(out)
        .await
        .context("failed to create result sink")?;
    let mut orchestrator = DiscoveryOrchestrator::new(
        executor,
        FsDocumentStore::new(&config.store_dir),
        EmailResolver::new(directory, doh),
        sink,
    );

    // Ctrl-C requests a clean stop; the orchestrator drains the remaining
    // queue with explicit results instead of dropping jobs.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, finishing current job");
            signal_cancel.cancel();
        }
    });

    let progress = RunProgress::start(jobs.len());
    let summary = orchestrator.run(jobs, cancel).await?;
    progress.finish();
    progress.print_summary(&summary);

    Ok(())
}

fn load_jobs(path: &str) -> Result<Vec<JobRef>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read jobs file {path}"))?;
    let jobs: Vec<JobRef> =
        serde_json::from_str(&contents).context("jobs file must be a JSON array of {job_id, url}")?;
    if jobs.is_empty() {
        return Err(ScoutError::NoJobs.into());
    }
    Ok(jobs)
}
