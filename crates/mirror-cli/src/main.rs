//! `mirror` command-line tool.
//!
//! Runs the student detail and bundle services directly, without the HTTP
//! layer. Configuration comes from the same environment variables as the API.

use anyhow::Context;
use clap::{Parser, Subcommand};
use mirror_cli::{init_tracing, overrides, storage_key_for};
use mirror_core::{Clock, Config, SystemClock};
use mirror_services::{create_storage, MirrorCaches, StudentDetailService};
use serde::Serialize;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "mirror", about = "Origin attachment mirror")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a student record and print it with temporary attachment URLs
    Detail {
        /// Student ID on the origin system
        id: String,
        /// Origin base URL (overrides ORIGIN_BASE_URL)
        #[arg(long)]
        base_url: Option<String>,
        /// Origin API key (overrides ORIGIN_API_KEY)
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Bundle a reviewed student's attachments into a ZIP
    Bundle {
        /// Student ID on the origin system
        id: String,
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Print the storage key an attachment would be mirrored to
    Key {
        record_id: String,
        field: String,
        source_url: String,
        /// Content type used when the URL has no extension
        #[arg(long)]
        content_type: Option<String>,
        /// Base URL for relative sources
        #[arg(long)]
        base_url: Option<String>,
        /// Storage prefix
        #[arg(long, default_value = mirror_core::constants::MIRROR_PATH_PREFIX)]
        prefix: String,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

async fn detail_service() -> anyhow::Result<StudentDetailService> {
    let config = Config::from_env().context("Failed to load configuration")?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let storage = create_storage(&config)
        .await
        .context("Failed to initialize storage")?;
    let caches = Arc::new(MirrorCaches::from_config(&config, clock.clone()));
    StudentDetailService::from_config(&config, storage, caches, clock)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Detail {
            id,
            base_url,
            api_key,
        } => {
            let service = detail_service().await?;
            let detail = service
                .get_student_detail(&id, &overrides(base_url, api_key))
                .await?;
            print_json(&detail)?;
        }
        Commands::Bundle {
            id,
            base_url,
            api_key,
        } => {
            let service = detail_service().await?;
            let bundle = service
                .bundle_attachments(&id, &overrides(base_url, api_key))
                .await?;
            print_json(&bundle)?;
        }
        Commands::Key {
            record_id,
            field,
            source_url,
            content_type,
            base_url,
            prefix,
        } => {
            let key = storage_key_for(
                &prefix,
                &record_id,
                &field,
                &source_url,
                base_url.as_deref(),
                content_type.as_deref(),
            );
            println!("{}", key);
        }
    }

    Ok(())
}
