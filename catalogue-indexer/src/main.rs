use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use catalogue_indexer::{commands, logging, Config, Dependencies, IndexingError};

#[derive(Parser)]
#[command(name = "catalogue-indexer")]
#[command(about = "Re-index and migrate catalogue search indices", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh popularity data of an index in place
    Popularity {
        /// Index or index group alias to refresh
        index: String,
        /// Refresh every document, not only migrated formats
        #[arg(long)]
        all: bool,
    },
    /// Copy every document from one index into another
    Resync {
        source: String,
        destination: String,
    },
    /// Build a new index for a group, backfill it and switch the alias
    Migrate {
        group: String,
        /// Run the targeted pass over every document
        #[arg(long)]
        all: bool,
    },
    /// Print the merged index configuration
    Schema {
        /// Schema configuration directory (default: SCHEMA_CONFIG_DIR)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    logging::init();

    let cli = Cli::parse();

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<(), IndexingError> {
    let config = Config::from_env()?;

    if let Commands::Schema { dir } = &command {
        let dir = dir.clone().unwrap_or_else(|| config.schema_config_dir.clone());
        let configuration = commands::schema_configuration(&dir)?;
        println!("{}", serde_json::to_string_pretty(&configuration)?);
        return Ok(());
    }

    let deps = Dependencies::new(config).await?;

    let result = match command {
        Commands::Popularity { index, all } => {
            commands::popularity(&deps, &index, all)
                .await
                .map(|summary| {
                    info!(
                        records = summary.records,
                        batches = summary.batches,
                        "Popularity refresh dispatched"
                    )
                })
        }
        Commands::Resync {
            source,
            destination,
        } => commands::resync(&deps, &source, &destination)
            .await
            .map(|summary| {
                info!(
                    records = summary.records,
                    batches = summary.batches,
                    "Resync dispatched"
                )
            }),
        Commands::Migrate { group, all } => {
            commands::migrate(&deps, &group, all).await.map(|report| {
                info!(
                    group = %report.group,
                    old_index = %report.old_index,
                    new_index = %report.new_index,
                    "Migration complete"
                )
            })
        }
        Commands::Schema { .. } => Ok(()),
    };

    info!("Waiting for queued batches");
    deps.shutdown().await;

    result
}
