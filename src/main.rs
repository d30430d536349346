use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use http_ingest::{Config, Server};

const DEFAULT_CONFIG: &str = "config.toml";

#[derive(Debug, Parser)]
#[command(name = "http-ingest", about = "Reads and decodes raw HTTP/1.1 requests")]
struct Args {
    /// Path to the TOML config file (defaults to ./config.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listening host
    #[arg(long)]
    host: Option<String>,

    /// Override the listening port
    #[arg(short, long)]
    port: Option<u16>,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "http_ingest=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // An explicit --config must exist; the default file is optional.
    let mut config = match args.config {
        Some(path) => Config::load(&path)?,
        None if PathBuf::from(DEFAULT_CONFIG).exists() => Config::load(DEFAULT_CONFIG.as_ref())?,
        None => {
            info!("no {} found, using defaults", DEFAULT_CONFIG);
            Config::default()
        }
    };
    if let Some(host) = args.host {
        config.bind_address = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    let mut server = Server::bind(config)?;
    server.stop_on_interrupt()?;
    server.run();
    Ok(())
}
