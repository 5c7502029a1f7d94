use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use friendcheck_core::{tier, RecognitionBackend, Session};
use friendcheck_rekognition::{RekognitionClient, RekognitionConfig};
use std::path::PathBuf;
use std::sync::Arc;

mod session;

#[derive(Parser)]
#[command(name = "friendcheck", about = "Recognise your friends, even without your glasses")]
struct Cli {
    /// AWS region (overrides FRIENDCHECK_REGION)
    #[arg(long, global = true)]
    region: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a session: teach the robot your friends, then check photos.
    /// Without files, reads commands from stdin.
    Session {
        /// Photo of a friend to enroll (repeatable)
        #[arg(short, long)]
        enroll: Vec<PathBuf>,
        /// Photo to check against enrolled friends (repeatable)
        #[arg(short, long)]
        check: Vec<PathBuf>,
        /// Emit one JSON object per event
        #[arg(long)]
        json: bool,
    },
    /// Show the confidence tier for a similarity score (0-100)
    Tier {
        #[arg(allow_negative_numbers = true)]
        score: f32,
    },
    /// List live collections on the backend
    List,
    /// Show effective configuration
    Status,
}

fn backend_config(region: Option<String>) -> Result<RekognitionConfig> {
    let mut config = RekognitionConfig::load().context("loading configuration")?;
    if let Some(region) = region {
        config.region = region;
        config.validate()?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Session {
            enroll,
            check,
            json,
        } => {
            let config = backend_config(cli.region)?;
            let client = RekognitionClient::new(&config).context("building backend client")?;
            let session =
                Session::new(Arc::new(client)).with_max_image_bytes(config.max_image_bytes);
            let reporter = session::Reporter { json };

            session::start(&session, &reporter).await?;
            if enroll.is_empty() && check.is_empty() {
                session::run_interactive(&session, &reporter).await?;
            } else {
                session::run_batch(&session, &reporter, &enroll, &check).await;
            }
        }
        Commands::Tier { score } => match tier(score) {
            Ok(t) => println!("{score}: {t} ({})", t.message()),
            Err(e) => anyhow::bail!("{e}"),
        },
        Commands::List => {
            let config = backend_config(cli.region)?;
            let client = RekognitionClient::new(&config).context("building backend client")?;
            let ids = client
                .list_collections()
                .await
                .context("listing collections")?;
            if ids.is_empty() {
                println!("No live collections");
            }
            for id in &ids {
                println!("{id}");
            }
        }
        Commands::Status => {
            let config = backend_config(cli.region)?;
            let status = serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "region": config.region,
                "endpoint": config.rekognition_endpoint(),
                "identity_endpoint": config.identity_endpoint(),
                "credentials": config.credential_source(),
                "identity_pool_configured": config.identity_pool_id.is_some(),
                "list_page_size": config.list_page_size,
                "max_image_bytes": config.max_image_bytes,
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}
