use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::info;
use pnl_ingest::parse_income_statement;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod config;
mod delivery;
mod processing;
mod server;
mod signature;
mod stats;

use config::RelayConfig;
use delivery::{ReportSink, WebhookSink};

#[derive(Parser, Debug)]
#[command(name = "pnl-relay", version, about = "Income statement CSV relay")]
struct Cli {
    /// Optional TOML config; environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service (Mailgun webhook + direct uploads)
    Serve {
        /// Listen port (overrides config and PORT)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Parse a statement CSV and print the structured result as JSON
    Parse {
        #[arg(long)]
        csv: PathBuf,

        #[arg(long)]
        pretty: bool,
    },

    /// Parse a statement CSV and deliver it once to the configured webhook
    Send {
        #[arg(long)]
        csv: PathBuf,

        /// Batch id to send (default: current local timestamp)
        #[arg(long)]
        batch_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut cfg = RelayConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Serve { port } => {
            if let Some(p) = port {
                cfg.port = p;
            }
            server::serve(cfg).await?;
        }

        Command::Parse { csv, pretty } => {
            let statement = read_statement(&csv)?;
            let out = if pretty {
                serde_json::to_string_pretty(&statement)?
            } else {
                serde_json::to_string(&statement)?
            };
            println!("{out}");
        }

        Command::Send { csv, batch_id } => {
            let statement = read_statement(&csv)?;
            let batch_id = batch_id.unwrap_or_else(processing::new_batch_id);
            let sink = WebhookSink::new(
                &cfg.webhook_url,
                &cfg.webhook_token,
                Duration::from_secs(cfg.delivery_timeout_secs),
            )?;
            let payload = statement.into_payload(batch_id);
            let status = sink
                .deliver(&payload)
                .await
                .context(processing::DELIVERY_FAILED)?;
            println!("Delivered batch {} (status {status})", payload.batch_id);
        }
    }

    Ok(())
}

fn read_statement(path: &Path) -> Result<pnl_core::IncomeStatement> {
    if !path.exists() {
        bail!("CSV not found: {}", path.display());
    }
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let statement =
        parse_income_statement(&bytes).with_context(|| format!("parsing {}", path.display()))?;
    info!(
        "Parsed {}: {} categories, {} data points",
        path.display(),
        statement.metadata.total_categories,
        statement.metadata.total_data_points
    );
    Ok(statement)
}
