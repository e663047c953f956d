//! RF Control Service
//!
//! Serves Configure / GetStatus / GetInfo requests for simulated RF devices
//! over JSON lines on TCP.

mod settings;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use rf_control::{RequestHandler, RfControlServer};
use rf_device::DeviceRegistry;
use settings::Settings;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "rf-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file; defaults to the XDG config location
    #[arg(value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the effective settings to the settings file and exit
    #[arg(long)]
    write_config: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "rf_server=info,rf_control=info,rf_device=info,rf_protocol=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let loaded = match &args.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let mut settings = match loaded {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if args.write_config {
        let saved = match &args.config {
            Some(path) => settings.save_to(path).map(|()| path.clone()),
            None => settings.save(),
        };
        return match saved {
            Ok(path) => {
                tracing::info!("Wrote settings to {}", path.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!("{}", e);
                ExitCode::FAILURE
            }
        };
    }

    settings.apply_env();
    tracing::info!("Starting RF control service");

    let registry = Arc::new(DeviceRegistry::simulated(settings.simulator.clone()));
    let handler = Arc::new(RequestHandler::new(registry));
    let server = RfControlServer::new(handler, settings.server.clone());

    let listener = match server.bind().await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Interrupt received, stopping");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                // Dropping the sender would stop the server
                tracing::warn!("Cannot listen for interrupt: {}", e);
                std::future::pending::<()>().await;
            }
        }
    });

    match server.run(listener, shutdown_rx).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}
