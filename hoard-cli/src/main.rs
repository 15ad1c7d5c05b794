use std::net::Ipv4Addr;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use hoard_engine::{clear_store, CacheProxy, ProxyConfig};

mod cli;
mod error;

use cli::{CliArgs, Command};
use error::AppError;

fn main() {
    if let Err(e) = bootstrap() {
        eprintln!("Error: {e}");
        error!(error = ?e, "Application failed");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn bootstrap() -> Result<(), AppError> {
    let args = CliArgs::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::Initialization(e.to_string()))?;

    match args.command {
        Command::Start {
            origin,
            port,
            cache_dir,
        } => {
            info!(origin = %origin, cache_dir = %cache_dir.display(), "starting caching proxy");
            let config = ProxyConfig::new(origin, cache_dir);
            let proxy = CacheProxy::new(config)?;

            let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await?;
            info!("Caching proxy running on http://localhost:{port}/");
            proxy.serve(listener).await?;
        }
        Command::ClearCache { cache_dir } => {
            clear_store(&cache_dir).await?;
            println!("Cache cleared");
        }
    }

    Ok(())
}
