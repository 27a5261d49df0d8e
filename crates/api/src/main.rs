//! Jobwarden - resilient background job runner
//!
//! Command-line entry point. Every command prints its result as JSON.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jobwarden_api::{commands, AppContext, SubmitBatchRequest};
use jobwarden_domain::TaskPriority;
use jobwarden_infra::{config, init_logging};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "jobwarden")]
#[command(about = "Submit, track and inspect resilient background jobs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file (TOML or JSON); defaults to environment, then probed paths
    #[arg(short, long, env = "JOBWARDEN_CONFIG")]
    config: Option<PathBuf>,

    /// Print compact instead of pretty JSON
    #[arg(long)]
    compact: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Queue a batch of items for background processing
    SubmitBatch {
        /// Item ids to process, in order
        #[arg(required = true)]
        item_ids: Vec<String>,
        /// Retry budget per item
        #[arg(long)]
        max_retries: Option<u32>,
        /// LOW, NORMAL, HIGH or CRITICAL
        #[arg(short, long, default_value = "NORMAL")]
        priority: TaskPriority,
        /// Submitter recorded on the job
        #[arg(long)]
        created_by: Option<String>,
        /// Block until the batch finishes and print its final status
        #[arg(short, long)]
        wait: bool,
        /// Give up waiting after this many seconds
        #[arg(long, default_value = "3600")]
        wait_timeout: u64,
    },
    /// Queue a long-running optimization job
    SubmitOptimization {
        /// Optimization config as a JSON object
        #[arg(value_name = "JSON")]
        config: String,
        #[arg(long)]
        max_retries: Option<u32>,
        #[arg(short, long, default_value = "NORMAL")]
        priority: TaskPriority,
        #[arg(long)]
        created_by: Option<String>,
    },
    /// Status and progress of a batch
    GetBatchStatus {
        #[arg(value_name = "TASK_ID")]
        task_id: String,
    },
    /// Results of a finished batch
    GetBatchResults {
        #[arg(value_name = "TASK_ID")]
        task_id: String,
    },
    /// Revoke a batch, terminating it if running
    CancelBatch {
        #[arg(value_name = "TASK_ID")]
        task_id: String,
    },
    /// Batches currently running
    ListActiveBatches,
    /// Snapshots of every known queue
    ListQueues,
    /// Snapshot of one queue
    GetQueueStats {
        queue: String,
    },
    /// Drop every waiting task in a queue
    PurgeQueue {
        queue: String,
    },
    /// Circuit breaker state and counters
    BreakerStats,
    /// Run a batch in the foreground and print its result
    RunBatch {
        #[arg(required = true)]
        item_ids: Vec<String>,
        #[arg(long)]
        max_retries: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::load_from_file(Some(path.clone())),
        None => config::load(),
    }
    .context("failed to load configuration")?;

    init_logging(&config.logging);
    match dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded .env"),
        Err(err) => warn!(error = %err, "Could not load .env file"),
    }

    let ctx = AppContext::new_with_config(config).await.context("failed to initialize application context")?;
    let outcome = run(&ctx, cli.command, cli.compact).await;

    if let Err(err) = ctx.shutdown().await {
        warn!(error = %err, "Task runtime did not shut down cleanly");
    }
    outcome
}

async fn run(ctx: &AppContext, command: Commands, compact: bool) -> Result<()> {
    match command {
        Commands::SubmitBatch { item_ids, max_retries, priority, created_by, wait, wait_timeout } => {
            let job = commands::submit_batch(
                ctx,
                SubmitBatchRequest { item_ids, max_retries, priority, created_by },
            )
            .await?;
            if wait {
                let report = commands::wait_for_batch(
                    ctx,
                    &job.task_id,
                    Duration::from_millis(500),
                    Duration::from_secs(wait_timeout),
                )
                .await?;
                print_json(&report, compact)
            } else {
                print_json(&job, compact)
            }
        }
        Commands::SubmitOptimization { config, max_retries, priority, created_by } => {
            let config = serde_json::from_str(&config).context("optimization config is not valid JSON")?;
            print_json(&commands::submit_optimization(ctx, config, max_retries, priority, created_by).await?, compact)
        }
        Commands::GetBatchStatus { task_id } => print_json(&commands::get_batch_status(ctx, &task_id).await?, compact),
        Commands::GetBatchResults { task_id } => {
            print_json(&commands::get_batch_results(ctx, &task_id).await?, compact)
        }
        Commands::CancelBatch { task_id } => print_json(&commands::cancel_batch(ctx, &task_id).await?, compact),
        Commands::ListActiveBatches => print_json(&commands::list_active_batches(ctx).await?, compact),
        Commands::ListQueues => print_json(&commands::list_queues(ctx).await?, compact),
        Commands::GetQueueStats { queue } => print_json(&commands::get_queue_stats(ctx, &queue).await?, compact),
        Commands::PurgeQueue { queue } => print_json(&commands::purge_queue(ctx, &queue).await?, compact),
        Commands::BreakerStats => print_json(&commands::breaker_stats(ctx).await?, compact),
        Commands::RunBatch { item_ids, max_retries } => {
            print_json(&commands::run_batch(ctx, item_ids, max_retries).await?, compact)
        }
    }
}

fn print_json<T: Serialize>(value: &T, compact: bool) -> Result<()> {
    let rendered = if compact { serde_json::to_string(value)? } else { serde_json::to_string_pretty(value)? };
    println!("{rendered}");
    Ok(())
}
