//! CLI command definitions and dispatch for the `xmem` binary.
//!
//! Uses clap derive macros for argument parsing. Commands that act on data
//! take an explicit `--tenant`; the CLI runs with operator rights and never
//! derives a tenant from content.

pub mod memory;
pub mod provider;
pub mod stats;
pub mod sync;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use uuid::Uuid;

/// Tenant-scoped semantic memory store.
#[derive(Parser)]
#[command(name = "xmem", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding config.toml and the database.
    #[arg(long, global = true, env = "XMEM_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server and the periodic source sync.
    Serve {
        /// Port to listen on.
        #[arg(long, default_value_t = 3000)]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Do not run the periodic source sync.
        #[arg(long)]
        no_sync: bool,
    },

    /// Import a CSV file (header row required) as memories.
    Import {
        /// Path to the CSV file.
        file: PathBuf,

        #[arg(long)]
        tenant: String,
    },

    /// Semantic search over one tenant's memories.
    Search {
        /// Query text.
        query: String,

        #[arg(long)]
        tenant: String,

        /// Number of results (clamped to the configured maximum).
        #[arg(long)]
        top_k: Option<usize>,

        /// Only memories in this project.
        #[arg(long)]
        project: Option<Uuid>,

        /// Only memories carrying this tag (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Sync enabled external sources now.
    Sync {
        /// Restrict to one tenant.
        #[arg(long)]
        tenant: Option<String>,

        /// Only sources whose sync interval has elapsed.
        #[arg(long, conflicts_with = "tenant")]
        due: bool,
    },

    /// Show collection stats for a tenant.
    Stats {
        #[arg(long)]
        tenant: String,
    },

    /// Inspect registered providers.
    Provider {
        #[command(subcommand)]
        action: provider::ProviderCommand,
    },

    /// Print the SHA-256 of an API key, for the `api_keys` config table.
    HashKey {
        key: String,
    },
}
