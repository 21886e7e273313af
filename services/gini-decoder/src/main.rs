//! GINI decoder service.
//!
//! Decodes GINI satellite products from disk, logs what was found and
//! prints one JSON summary per file. With a navigation section configured,
//! each product's footprint is reprojected into that satellite's view.

mod config;
mod decode;

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use config::DecoderConfig;
use decode::DecodeJob;

#[derive(Parser, Debug)]
#[command(name = "gini-decoder")]
#[command(about = "Decode GINI satellite products and summarize them as JSON")]
struct Args {
    /// GINI files to decode
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Configuration file path
    #[arg(short, long, env = "GINI_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr; stdout carries the summaries
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(&args.log_level, args.log_json)?;

    let config = match &args.config {
        Some(path) => DecoderConfig::from_yaml(path)?.with_env_overrides()?,
        None => DecoderConfig::from_env()?,
    };
    config.validate()?;
    info!(
        files = args.files.len(),
        parallelism = config.parallelism,
        navigation = ?config.navigation,
        "Starting GINI decoder"
    );

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling remaining decodes");
                cancel.cancel();
            }
        });
    }

    let job = DecodeJob::new(config, cancel)?;
    let files = args.files;
    let reports = tokio::task::spawn_blocking(move || job.run(&files)).await??;

    for report in &reports {
        println!("{}", serde_json::to_string(report)?);
    }

    let failed = reports.iter().filter(|r| !r.is_ok()).count();
    info!(decoded = reports.len() - failed, failed, "Decoding finished");
    if failed > 0 {
        bail!("{} of {} files failed to decode", failed, reports.len());
    }
    Ok(())
}
