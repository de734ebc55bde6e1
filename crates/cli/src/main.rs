//! NeYisek CLI - database migrations and seed data.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! neyisek migrate
//!
//! # Load categories, users and restaurants from a YAML file
//! neyisek seed crates/cli/seed/example.yaml
//!
//! # Check a seed file without writing anything
//! neyisek seed --dry-run crates/cli/seed/example.yaml
//!
//! # Show row counts per collection
//! neyisek seed stats
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "neyisek")]
#[command(author, version, about = "NeYisek CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the catalog from a YAML file
    Seed(SeedArgs),
}

#[derive(Args)]
#[command(args_conflicts_with_subcommands = true)]
struct SeedArgs {
    #[command(subcommand)]
    action: Option<SeedAction>,

    /// Path to the YAML seed file
    file: Option<PathBuf>,

    /// Validate the file without writing
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum SeedAction {
    /// Show row counts per collection
    Stats,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "neyisek=info,neyisek_server=info".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed(args) => match (args.action, args.file) {
            (Some(SeedAction::Stats), _) => commands::seed::stats().await?,
            (None, Some(file)) => commands::seed::from_file(&file, args.dry_run).await?,
            (None, None) => return Err("seed needs a file path or `stats`".into()),
        },
    }
    Ok(())
}
