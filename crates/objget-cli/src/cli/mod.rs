//! CLI for objget.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use objget_core::config;
use objget_core::range::ByteRange;
use std::path::{Path, PathBuf};

use commands::{run_checksum, run_download, DownloadArgs};

/// Top-level CLI for objget.
#[derive(Debug, Parser)]
#[command(name = "objget")]
#[command(about = "objget: windowed, SHA-1 verified object downloads", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download an object (or a byte range of it) and print its metadata as JSON.
    Download {
        /// Download URL of the object.
        url: String,

        /// Output path (default: last URL path segment in the current directory).
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Inclusive byte range to fetch instead of the whole object.
        #[arg(long, value_name = "START-END")]
        range: Option<ByteRange>,

        /// Account authorization token sent with every request.
        #[arg(long, value_name = "TOKEN", env = "OBJGET_AUTH_TOKEN")]
        auth_token: Option<String>,

        /// Concurrent connections per window (overrides config).
        #[arg(long, value_name = "N")]
        max_streams: Option<usize>,

        /// Window size in bytes (overrides config).
        #[arg(long, value_name = "BYTES")]
        window_size: Option<u64>,

        /// Smallest window split over several connections (overrides config).
        #[arg(long, value_name = "BYTES")]
        min_part_size: Option<u64>,
    },

    /// Compute the SHA-1 (or SHA-256) of a file.
    Checksum {
        /// Path to the file.
        path: String,

        /// Print SHA-256 instead of SHA-1.
        #[arg(long)]
        sha256: bool,
    },
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Download {
                url,
                output,
                range,
                auth_token,
                max_streams,
                window_size,
                min_part_size,
            } => {
                let mut cfg = config::load_or_init()?;
                tracing::debug!("loaded config: {:?}", cfg);
                if let Some(n) = max_streams {
                    cfg.max_streams = n;
                }
                if let Some(n) = window_size {
                    cfg.window_size = n;
                }
                if let Some(n) = min_part_size {
                    cfg.min_part_size = n;
                }
                run_download(
                    &cfg,
                    DownloadArgs {
                        url,
                        output,
                        range,
                        auth_token,
                    },
                )?
            }
            CliCommand::Checksum { path, sha256 } => run_checksum(Path::new(&path), sha256)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
