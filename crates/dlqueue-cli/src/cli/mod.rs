//! CLI for the dlqueue download queue.

mod commands;
mod http;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dlqueue_core::config;

use commands::{run_add, run_list, run_scheduler, run_serve};

/// Top-level CLI for the dlqueue download queue.
#[derive(Debug, Parser)]
#[command(name = "dlqueue")]
#[command(about = "dlqueue: durable download queue with a scheduled worker pool", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Submit a URL for download.
    Add {
        /// Direct HTTP/HTTPS URL to download.
        url: String,
    },

    /// List all jobs and whether their files are present.
    List,

    /// Run the scheduler loop in the foreground.
    Run {
        /// Perform a single tick, wait for its transfers, and exit. Rows left
        /// `downloading` by another process are not reverted.
        #[arg(long)]
        once: bool,
    },

    /// Serve the HTTP API and run the scheduler loop.
    Serve {
        /// Listen port (overrides the configured port).
        #[arg(long, value_name = "PORT")]
        port: Option<u16>,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Add { url } => run_add(&cfg, &url).await?,
            CliCommand::List => run_list(&cfg).await?,
            CliCommand::Run { once } => run_scheduler(&cfg, once).await?,
            CliCommand::Serve { port } => {
                run_serve(&cfg, port.unwrap_or(cfg.listen_port)).await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
