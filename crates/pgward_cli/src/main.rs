mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pgward_core::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pgward", version, about = "PostgreSQL backup management CLI tool")]
struct Cli {
    /// Path to the config file (default: platform config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Create backups
    Backup {
        #[command(subcommand)]
        kind: BackupKind,
    },
    /// Restore backups
    Restore {
        #[command(subcommand)]
        kind: RestoreKind,
    },
    /// List available backups
    List,
    /// Show container and database status
    Status,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the resolved configuration
    Show,
    /// Write a starter config file
    Init,
    /// Print the config file location
    Path,
}

#[derive(Subcommand, Debug)]
enum BackupKind {
    /// pg_dump of one database, or every configured database
    Logical {
        #[arg(long)]
        db: Option<String>,
    },
    /// WAL-G base backup from the backup container
    Walg,
}

#[derive(Subcommand, Debug)]
enum RestoreKind {
    /// Feed a logical dump back through psql
    Logical {
        /// Dump file on the target host
        file: String,
        #[arg(long)]
        db: String,
    },
    /// Fetch a WAL-G base backup into the data directory
    Walg {
        #[arg(default_value = "LATEST")]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    commands::run(cli.command, &config_path).await
}
