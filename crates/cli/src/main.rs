//! storetrack CLI - install and update ServiceNow store applications and
//! track them to completion.

mod config;
mod render;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use storetrack_client::HttpStoreApi;
use storetrack_core::{
    Completion, OperationDescriptor, OperationError, OperationOptions, TrackingHandle,
};
use storetrack_progress::{OperationRunner, OperationTracker, TrackedOperation};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Overrides, Settings};

#[derive(Parser)]
#[command(name = "storetrack")]
#[command(about = "Install and update ServiceNow store applications", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (defaults to ./storetrack.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Store API base URL
    #[arg(long, env = "STORETRACK_URL", global = true)]
    url: Option<String>,

    /// Instance user for basic authentication
    #[arg(long, env = "STORETRACK_USER", global = true)]
    user: Option<String>,

    /// Password for --user
    #[arg(long, env = "STORETRACK_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    /// Bearer token (takes precedence over --user)
    #[arg(long, env = "STORETRACK_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Milliseconds between status checks
    #[arg(long, global = true)]
    interval_ms: Option<u64>,

    /// Status checks before giving up
    #[arg(long, global = true)]
    max_attempts: Option<u32>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Install one or more applications and wait for them
    Install {
        /// Application identifiers (sys_id or scope)
        #[arg(required = true)]
        app_ids: Vec<String>,
        /// Version to install (default: latest)
        #[arg(long)]
        version: Option<String>,
        /// Also load demo data
        #[arg(long)]
        demo_data: bool,
    },
    /// Update an installed application and wait for it
    Update {
        /// Application identifier (sys_id or scope)
        app_id: String,
        /// Target version
        #[arg(long)]
        version: String,
    },
    /// Wait for an operation started elsewhere
    Watch {
        /// Tracking identifier returned by the trigger
        tracking_id: TrackingHandle,
    },
    /// Print the effective settings
    Config,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let overrides = Overrides {
        url: cli.url.clone(),
        user: cli.user.clone(),
        password: cli.password.clone(),
        token: cli.token.clone(),
        interval_ms: cli.interval_ms,
        max_attempts: cli.max_attempts,
    };
    let settings = Settings::load(cli.config.as_deref())?.apply(&overrides)?;

    let code = match cli.command {
        Commands::Config => {
            let text = toml::to_string_pretty(&settings.redacted())
                .context("Failed to render settings")?;
            println!("{}", text);
            render::EXIT_OK
        }
        Commands::Install {
            app_ids,
            version,
            demo_data,
        } => {
            let descriptors = app_ids
                .into_iter()
                .map(|id| {
                    let descriptor = OperationDescriptor::install(id).with_options(
                        OperationOptions {
                            load_demo_data: demo_data,
                            ..Default::default()
                        },
                    );
                    match &version {
                        Some(version) => descriptor.with_version(version.clone()),
                        None => descriptor,
                    }
                })
                .collect();
            run_operations(&settings, descriptors).await?
        }
        Commands::Update { app_id, version } => {
            run_operations(&settings, vec![OperationDescriptor::update(app_id, version)]).await?
        }
        Commands::Watch { tracking_id } => watch(&settings, tracking_id).await?,
    };

    if code != render::EXIT_OK {
        std::process::exit(code);
    }
    Ok(())
}

/// Tracker reporting to a stderr renderer.
fn build_tracker(
    settings: &Settings,
) -> Result<(OperationTracker, tokio::task::JoinHandle<()>)> {
    let client = settings.client_config()?;
    let api = HttpStoreApi::new(client).context("Failed to create store API client")?;

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let runner = OperationRunner::new(Arc::new(api), settings.poller).with_events(events_tx);
    let renderer = tokio::spawn(render::render_events(events_rx));

    Ok((OperationTracker::new(runner), renderer))
}

/// Cancel everything on Ctrl-C; exit on a second one.
fn cancel_on_interrupt(tracker: &OperationTracker) -> tokio::task::JoinHandle<()> {
    let tracker = tracker.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        info!("Interrupted, cancelling");
        tracker.cancel_all().await;

        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted again, exiting");
            std::process::exit(render::EXIT_CANCELLED);
        }
    })
}

async fn run_operations(settings: &Settings, descriptors: Vec<OperationDescriptor>) -> Result<i32> {
    let (tracker, renderer) = build_tracker(settings)?;
    let interrupt = cancel_on_interrupt(&tracker);

    let mut started: Vec<(String, TrackedOperation)> = Vec::new();
    let mut results: Vec<(String, std::result::Result<Completion, OperationError>)> = Vec::new();

    let total = descriptors.len();
    for (index, descriptor) in descriptors.into_iter().enumerate() {
        if tracker.is_closed().await {
            warn!(skipped = total - index, "Interrupted, remaining operations not started");
            break;
        }
        let label = descriptor.item_id.clone();
        match tracker.start(descriptor).await {
            Ok(op) => {
                debug!(operation_id = %op.id, tracking_id = %op.handle, item_id = %label, "Started");
                started.push((label, op));
            }
            Err(e) => results.push((label, Err(e))),
        }
    }

    for (label, op) in started {
        results.push((label, op.outcome().await));
    }

    finish(tracker, renderer, interrupt, results).await
}

async fn watch(settings: &Settings, handle: TrackingHandle) -> Result<i32> {
    let (tracker, renderer) = build_tracker(settings)?;
    let interrupt = cancel_on_interrupt(&tracker);

    let label = handle.to_string();
    let result = match tracker.track(handle).await {
        Ok(op) => op.outcome().await,
        Err(e) => Err(e),
    };

    finish(tracker, renderer, interrupt, vec![(label, result)]).await
}

/// Flush progress output, print outcomes and pick the exit code.
async fn finish(
    tracker: OperationTracker,
    renderer: tokio::task::JoinHandle<()>,
    interrupt: tokio::task::JoinHandle<()>,
    results: Vec<(String, std::result::Result<Completion, OperationError>)>,
) -> Result<i32> {
    interrupt.abort();
    let _ = interrupt.await;
    drop(tracker);
    renderer.await.context("Progress renderer failed")?;

    for (label, result) in &results {
        println!("{}", render::outcome_line(label, result));
    }

    Ok(render::exit_code(results.iter().map(|(_, r)| r)))
}
