//! RF control command-line client
//!
//! One-shot commands against a running rf-server. The exit code is non-zero
//! when the service reports failure.

mod output;

use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rf_control::RfControlClient;
use rf_protocol::{parse_bandwidth, parse_frequency, ConfigureRequest, DEFAULT_PORT};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "rf-client")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Control service address
    #[arg(long, default_value_t = format!("127.0.0.1:{}", DEFAULT_PORT))]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Apply RF settings to a device
    Set {
        device_id: String,

        /// Center frequency, e.g. 2.4GHz or 915MHz
        #[arg(short = 'f', long, value_parser = parse_frequency)]
        frequency: Option<f64>,

        /// Gain in dB
        #[arg(short = 'g', long, allow_negative_numbers = true)]
        gain: Option<f64>,

        /// Bandwidth, e.g. 20MHz
        #[arg(short = 'b', long, value_parser = parse_bandwidth)]
        bandwidth: Option<f64>,

        /// Antenna port (TX/RX or RX2)
        #[arg(short = 'a', long)]
        antenna: Option<String>,
    },
    /// Show the current device status
    Status { device_id: String },
    /// Show static device information
    Info { device_id: String },
    /// Show the instrument identification string
    Identify { device_id: String },
    /// Retry the handshake of a disconnected device
    Reconnect { device_id: String },
    /// List devices known to the service
    List,
}

/// Rendered output of one command and whether the service reported success
#[derive(Debug)]
struct Outcome {
    text: String,
    success: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("ERROR: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<bool> {
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(async {
        let mut client = RfControlClient::connect(&cli.server)
            .await
            .with_context(|| format!("Failed to connect to {}", cli.server))?;
        let outcome = execute(&mut client, cli.command).await?;
        print!("{}", outcome.text);
        Ok(outcome.success)
    })
}

async fn execute<S>(client: &mut RfControlClient<S>, command: Command) -> Result<Outcome>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let outcome = match command {
        Command::Set {
            device_id,
            frequency,
            gain,
            bandwidth,
            antenna,
        } => {
            let request = ConfigureRequest {
                device_id,
                frequency,
                gain,
                bandwidth,
                antenna,
            };
            if request.is_empty() {
                bail!("Nothing to set. Pass at least one of -f, -g, -b or -a.");
            }

            let mut text = output::format_request(&request);
            let response = client
                .configure(request)
                .await
                .context("Configure request failed")?;
            text.push('\n');
            text.push_str(&output::format_configure(&response));
            Outcome {
                text,
                success: response.success,
            }
        }
        Command::Status { device_id } => {
            let status = client
                .get_status(&device_id)
                .await
                .context("Status request failed")?;
            Outcome {
                text: output::format_status(&status),
                success: status.connected,
            }
        }
        Command::Info { device_id } => {
            let info = client
                .get_info(&device_id)
                .await
                .context("Info request failed")?;
            Outcome {
                text: output::format_info(&info),
                success: true,
            }
        }
        Command::Identify { device_id } => {
            let response = client
                .identify(&device_id)
                .await
                .context("Identify request failed")?;
            let success = !response.idn.starts_with("Error");
            Outcome {
                text: output::format_identify(&response),
                success,
            }
        }
        Command::Reconnect { device_id } => {
            let status = client
                .reconnect(&device_id)
                .await
                .context("Reconnect request failed")?;
            Outcome {
                text: output::format_status(&status),
                success: status.connected,
            }
        }
        Command::List => {
            let device_ids = client
                .list_devices()
                .await
                .context("List request failed")?;
            Outcome {
                text: output::format_device_list(&device_ids),
                success: true,
            }
        }
    };
    Ok(outcome)
}
