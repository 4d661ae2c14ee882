//! toll: tollgate CLI client
//!
//! Query and inspect a running tolld.

use clap::{Parser, Subcommand};
use tollgate::client::GatewayClient;
use tollgate::{BatchEntity, BatchRequest, DataGateway, DataRequest};

/// Tollgate CLI client
#[derive(Parser)]
#[command(name = "toll")]
#[command(version = tollgate::PKG_VERSION)]
#[command(about = "Tollgate data gateway client")]
struct Args {
    /// Server address
    #[arg(
        short,
        long,
        env = "TOLLD_ADDRESS",
        default_value = "http://127.0.0.1:9742"
    )]
    address: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check service health
    Health,

    /// Fetch one data type for one entity
    Fetch {
        /// Entity name or identifier
        entity: String,
        /// Data type, e.g. "profile"
        data_type: String,
        /// Company website hint
        #[arg(short, long)]
        website: Option<String>,
        /// Skip the fresh-cache shortcut
        #[arg(short, long)]
        force: bool,
    },

    /// Fetch data types for several entities as one batch
    Batch {
        /// Entity names
        #[arg(required = true)]
        entities: Vec<String>,
        /// Data types to fetch for every entity (repeatable)
        #[arg(short = 't', long = "type", required = true)]
        data_types: Vec<String>,
        /// Skip the fresh-cache shortcut
        #[arg(short, long)]
        force: bool,
    },

    /// Show budget status (all providers, or one)
    Budget {
        provider: Option<String>,
    },

    /// Show cache statistics
    Cache,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let client = GatewayClient::new(&args.address)?;

    match args.command {
        Command::Health => {
            let health = client.health().await?;
            println!("tolld {}", health.version);
            println!("status: {}", health.status);
        }

        Command::Fetch {
            entity,
            data_type,
            website,
            force,
        } => {
            let mut request = DataRequest::new(entity, data_type).force_refresh(force);
            if let Some(website) = website {
                request = request.website(website);
            }
            let envelope = client.fetch(&request).await?;
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }

        Command::Batch {
            entities,
            data_types,
            force,
        } => {
            let request = entities
                .into_iter()
                .fold(BatchRequest::new(data_types), |req, name| {
                    req.entity(BatchEntity::new(name))
                })
                .force_refresh(force);
            let response = client.batch(&request).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Command::Budget { provider } => match provider {
            Some(provider) => {
                let status = client.budget_status(&provider).await?;
                println!("{}", serde_json::to_string_pretty(&status)?);
            }
            None => {
                for status in client.budget_statuses().await? {
                    println!(
                        "{:<16} spent {:>10} of {:>10} (remaining {}, resets {})",
                        status.provider,
                        status.spent_amount,
                        status.cap_amount,
                        status.remaining,
                        status.period_end
                    );
                }
            }
        },

        Command::Cache => {
            let stats = client.cache_stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}
