// ABOUTME: CLI entry point for portable-dump
// ABOUTME: Parses commands and routes to appropriate handlers

use clap::{Parser, Subcommand, ValueEnum};
use portable_dump::commands;
use portable_dump::migration::ImportMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "portable-dump")]
#[command(about = "Vendor-neutral relational database export/import with portable archives", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Abort if any target table already has rows (safe default)
    FailIfNotEmpty,
    /// Clear all target tables before inserting (destructive)
    Truncate,
}

impl From<ModeArg> for ImportMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::FailIfNotEmpty => ImportMode::FailIfNotEmpty,
            ModeArg::Truncate => ImportMode::Truncate,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Export the full schema contents into a portable archive
    Export {
        /// Database connection URL (postgresql://... or a SQLite file path)
        #[arg(long)]
        database: String,
        /// TOML file overriding the built-in table registry
        #[arg(long)]
        schema: Option<PathBuf>,
        /// Destination archive path
        archive: PathBuf,
    },
    /// Import a portable archive into the target database
    Import {
        /// Database connection URL (postgresql://... or a SQLite file path)
        #[arg(long)]
        database: String,
        /// TOML file overriding the built-in table registry
        #[arg(long)]
        schema: Option<PathBuf>,
        /// How to treat existing rows in the target
        #[arg(long, value_enum, default_value = "fail-if-not-empty")]
        mode: ModeArg,
        /// Skip the confirmation prompt for truncate mode
        #[arg(short = 'y', long)]
        yes: bool,
        /// Archive to import
        archive: PathBuf,
    },
    /// Check an archive's structure without touching any database
    Validate {
        /// Archive to inspect
        archive: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging - default to INFO level if RUST_LOG not set
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            database,
            schema,
            archive,
        } => commands::export(&database, schema.as_deref(), &archive).await,
        Commands::Import {
            database,
            schema,
            mode,
            yes,
            archive,
        } => commands::import(&database, schema.as_deref(), &archive, mode.into(), yes).await,
        Commands::Validate { archive } => commands::validate(&archive),
    }
}
