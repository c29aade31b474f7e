mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;

use catalog_server::config::AppConfig;

/// Maintenance commands for the product catalog.
///
/// Reads the same configuration as the server (`config/config.toml` and
/// `CATALOG__*` environment variables).
#[derive(Parser, Debug)]
#[command(name = "catalog", version)]
struct Cli {
    /// Log at DEBUG level.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write, inspect and delete a scratch blob on the configured storage backend
    StorageCheck,
    /// Copy every product from the relational database to the Supabase table
    MigrateSupabase {
        /// Report what would be copied without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Create a staff account, or promote and reset the password of an existing one
    CreateAdmin {
        username: String,
        #[arg(long, env = "CATALOG_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    let config = AppConfig::load()?;

    match cli.command {
        Commands::StorageCheck => commands::storage_check(&config).await,
        Commands::MigrateSupabase { dry_run } => commands::migrate_supabase(&config, dry_run).await,
        Commands::CreateAdmin { username, password } => {
            commands::create_admin(&config, &username, &password).await
        }
    }
}
