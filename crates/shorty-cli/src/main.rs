//! assetctl: operate the asset storage from the command line.
//!
//! Configuration comes from the environment (or a `.env` file); see
//! `AssetStorageConfig` for the variables.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use shorty_cli::{connect, describe_error, format_size, print_json, store_files};
use shorty_core::{AssetStatus, Config};
use shorty_infra::{init_telemetry, shutdown_telemetry, LogFormat};
use shorty_services::DedupOutcome;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "assetctl", about = "Shorty asset storage CLI")]
struct Cli {
    /// Log output format: pretty or json
    #[arg(long, global = true, default_value = "pretty")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store one or more files as assets
    Put {
        /// Target bucket
        #[arg(long, default_value = "files")]
        bucket: String,
        /// Reuse existing assets with identical content
        #[arg(long)]
        dedup: bool,
        /// Files to store
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Read an asset's content
    Get {
        #[arg(long, default_value = "files")]
        bucket: String,
        /// Asset id
        id: String,
        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Check whether a file's content is already stored
    Dedup {
        #[arg(long, default_value = "files")]
        bucket: String,
        file: PathBuf,
    },
    /// List assets stuck in a status
    Stale {
        #[arg(long, default_value = "pending")]
        status: AssetStatus,
        /// Minimum age in seconds
        #[arg(long, default_value = "3600")]
        older_than_secs: i64,
        #[arg(long, default_value = "100")]
        limit: i64,
    },
    /// Run one reconciliation pass over stale pending assets
    Reconcile,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(cli.log_format)
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    let result = run(cli.command).await;
    shutdown_telemetry().await;

    if let Err(e) = result {
        eprintln!("Error: {}", describe_error(&e));
        std::process::exit(1);
    }
    Ok(())
}

async fn run(command: Commands) -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    let stack = connect(&config).await?;

    match command {
        Commands::Put {
            bucket,
            dedup,
            files,
        } => {
            let mut inputs = Vec::with_capacity(files.len());
            for file in files {
                let content = tokio::fs::read(&file)
                    .await
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                inputs.push((file.display().to_string(), content));
            }

            let resolver = dedup.then_some(&stack.dedup);
            let stored = store_files(&stack.storage, resolver, &bucket, inputs).await?;
            print_json(&stored)?;
        }
        Commands::Get { bucket, id, output } => {
            let content = stack.storage.get_asset_bytes(&bucket, &id).await?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, &content)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    eprintln!("Wrote {} to {}", format_size(content.len() as i64), path.display());
                }
                None => {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(&content).context("Failed to write to stdout")?;
                    stdout.flush()?;
                }
            }
        }
        Commands::Dedup { bucket, file } => {
            let content = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            match stack.dedup.resolve(&bucket, &content).await? {
                DedupOutcome::Existing(record) => {
                    print_json(&json!({ "duplicate": true, "asset": record }))?
                }
                DedupOutcome::Missing { size, hash } => {
                    print_json(&json!({ "duplicate": false, "size": size, "hash": hash }))?
                }
            }
        }
        Commands::Stale {
            status,
            older_than_secs,
            limit,
        } => {
            let older_than = chrono::Utc::now() - chrono::Duration::seconds(older_than_secs);
            let stale = stack
                .storage
                .list_stale_assets(status, older_than, None, limit)
                .await?;
            print_json(&stale)?;
        }
        Commands::Reconcile => {
            let report = stack.reconciler.reconcile_once().await?;
            print_json(&json!({
                "scanned": report.scanned,
                "completed": report.completed,
                "enqueued": report.enqueued,
                "failed": report.failed,
            }))?;
        }
    }

    Ok(())
}
