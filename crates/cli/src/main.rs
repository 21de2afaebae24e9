//! cachesnap entry point.
//!
//! Opens a browser on the configured page, collects its Cache Storage and
//! writes the snapshot JSON. Logging goes to stderr so the snapshot file is
//! the only output.

use anyhow::Result;
use cachesnap_core::{AppConfig, format_size};
use tracing_subscriber::EnvFilter;

mod run;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(target_url = %config.target_url, surface = ?config.surface, "collecting cache storage");

    match run::run(&config).await {
        Ok(summary) => {
            tracing::info!(
                path = %config.output_path.display(),
                containers = summary.containers,
                entries = summary.entries,
                total_size = %format_size(summary.total_size),
                "snapshot saved"
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("collection failed: {e}");
            Err(e.into())
        }
    }
}
