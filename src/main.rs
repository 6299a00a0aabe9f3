//! pdfforge - HTTP service that merges, splits and compresses PDF documents.

use clap::Parser;
use std::process;
use tracing::{Level, error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use pdfforge::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    let config = match cli.to_config() {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            process::exit(err.exit_code());
        }
    };

    info!("{} v{}", pdfforge::NAME, pdfforge::VERSION);

    if let Err(err) = pdfforge::server::serve(config).await {
        error!("{err}");
        process::exit(err.exit_code());
    }

    Ok(())
}
