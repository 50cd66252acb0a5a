mod app;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vulnwatch_config::{ConfigLoad, ConfigLoader, ConfigLoaderOptions, EnvConfig};
use vulnwatch_core::database::PostgresDatabase;

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "vulnwatch")]
#[command(about = "Continuous vulnerability monitoring for projects and container images")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to a vulnwatch.toml file
    #[arg(long, global = true, env = "VULNWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Path to a .env file (defaults to ./.env when present)
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Reconcile projects with the tracker, then scan projects and images
    Run,
    #[command(subcommand)]
    Db(DbCommand),
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    /// Apply database migrations and exit
    Migrate,
    /// Drop the projects, images and dast tables and exit
    Drop,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command.as_ref().unwrap_or(&Command::Run) {
        Command::Run => {
            let ConfigLoad { config, warnings } = loader(&cli)
                .load()
                .context("failed to load configuration")?;

            if config.metadata.env_file_loaded {
                info!("loaded .env file");
            }
            if let Some(path) = &config.metadata.config_path {
                info!(path = %path.display(), "configuration file loaded");
            }
            for warning in &warnings.items {
                match &warning.hint {
                    Some(hint) => {
                        warn!(message = %warning.message, hint = %hint, "configuration warning")
                    }
                    None => warn!(message = %warning.message, "configuration warning"),
                }
            }

            app::run(config).await
        }
        Command::Db(DbCommand::Migrate) => {
            let db = connect_for_maintenance(&cli).await?;
            db.migrate().await.context("database migration failed")?;
            db.close().await;
            info!("Database migrations applied successfully");
            Ok(())
        }
        Command::Db(DbCommand::Drop) => {
            let db = connect_for_maintenance(&cli).await?;
            db.drop_tables().await.context("failed to drop tables")?;
            db.close().await;
            info!("Database tables dropped");
            Ok(())
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn,hyper=warn,reqwest=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn loader(cli: &Cli) -> ConfigLoader {
    ConfigLoader::with_options(ConfigLoaderOptions {
        config_path: cli.config.clone(),
        env_file: cli.env_file.clone(),
    })
}

/// Maintenance commands only need the database URL.
async fn connect_for_maintenance(cli: &Cli) -> anyhow::Result<PostgresDatabase> {
    let loaded = match &cli.env_file {
        Some(path) => dotenvy::from_path(path).map(|_| ()),
        None => dotenvy::dotenv().map(|_| ()),
    };
    match loaded {
        Ok(()) | Err(dotenvy::Error::Io(_)) => {}
        Err(err) => return Err(err).context("failed to read .env file"),
    }

    let env = EnvConfig::gather();
    let url = env
        .database_url
        .context("environment variable needed: DB_CONNECT_URL")?;
    let max_connections = env
        .database_max_connections
        .and_then(|raw| raw.trim().parse().ok());

    PostgresDatabase::connect(&url, max_connections)
        .await
        .context("failed to connect to PostgreSQL")
}
