//! Command-line arguments.

use clap::Parser;
use std::path::PathBuf;

/// Corpus orchestrator server - vision→speech pipelines over capability services
#[derive(Debug, Parser)]
#[command(name = "corpus-server", version, about)]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, env = "CORPUS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Bind address (overrides [server].host)
    #[arg(long, env = "CORPUS_HOST")]
    pub host: Option<String>,

    /// Bind port (overrides [server].port)
    #[arg(short, long, env = "CORPUS_PORT")]
    pub port: Option<u16>,
}
