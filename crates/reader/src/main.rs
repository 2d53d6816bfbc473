//! mcu-rfid reader
//!
//! Polls an RFID reader attached to a practicum MCU board over USB and
//! prints each raw read to standard output.

use anyhow::{Context, Result};
use clap::Parser;
use common::setup_logging;
use reader::config::{ReaderConfig, parse_duration};
use reader::reader::{list_boards, run};
use reader::usb::UsbBoardProvider;
use reader::{RunOutcome, StopReason};
use std::process::ExitCode;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "read-rfid")]
#[command(
    author,
    version,
    about = "Read RFID data from a USB-attached MCU board"
)]
#[command(long_about = "
Finds the first MCU board on the USB bus (V-USB ID 16c0:05dc by default),
prints its manufacturer and product strings, then issues a vendor control
read every second and prints the returned bytes.

EXAMPLES:
    # Poll the first board forever
    read-rfid

    # Take ten readings and exit
    read-rfid --count 10

    # List attached boards
    read-rfid --list-devices

CONFIGURATION:
    The reader looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/mcu-rfid/reader.toml
    3. /etc/mcu-rfid/reader.toml
    4. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<std::path::PathBuf>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// List MCU boards and exit
    #[arg(long)]
    list_devices: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Stop after this many reads
    #[arg(short = 'n', long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    count: Option<u64>,

    /// Delay before each read (e.g. 1s, 500ms)
    #[arg(short, long, value_name = "DURATION", value_parser = parse_duration)]
    interval: Option<Duration>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    if args.save_config {
        let config = ReaderConfig::default();
        let path = ReaderConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = if let Some(ref path) = args.config {
        ReaderConfig::load(Some(path.clone())).context("Failed to load configuration")?
    } else {
        ReaderConfig::load_or_default()
    };

    if let Some(count) = args.count {
        config.poll.count = Some(count);
    }
    if let Some(interval) = args.interval {
        config.poll.interval = interval;
    }
    config.validate().context("Invalid configuration")?;

    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.reader.log_level);
    setup_logging(log_level).context("Failed to setup logging")?;

    info!("mcu-rfid reader v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Looking for boards {:04x}:{:04x}",
        config.board.vendor_id, config.board.product_id
    );

    let provider = UsbBoardProvider::new(
        config.board.vendor_id,
        config.board.product_id,
        config.board.timeout(),
    )
    .context("Failed to initialize USB")?;

    let mut stdout = std::io::stdout();

    if args.list_devices {
        list_boards(&provider, &mut stdout)?;
        return Ok(ExitCode::SUCCESS);
    }

    match run(&provider, &config.poll, &mut stdout, shutdown_signal()).await {
        Ok(RunOutcome::NoBoard) => Ok(ExitCode::from(1)),
        Ok(RunOutcome::Stopped(summary)) => {
            match summary.reason {
                StopReason::CountReached => info!("Done after {} read(s)", summary.reads),
                StopReason::Shutdown => info!("Shutdown complete"),
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!("Reader failed: {:#}", e);
            Err(e)
        }
    }
}

/// Resolve on Ctrl+C
///
/// Never resolves if the signal handler cannot be installed.
async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down gracefully..."),
        Err(e) => {
            error!("Error waiting for Ctrl+C: {}", e);
            std::future::pending::<()>().await
        }
    }
}
