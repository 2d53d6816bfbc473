//! The reader loop
//!
//! Startup finds the first compatible board, announces it on the output and
//! hands it to the USB worker thread. Polling then waits one interval, issues
//! the configured control read and prints the returned bytes verbatim, until
//! the read count is reached, shutdown is requested or a read fails.
//!
//! Read results are written with the `Debug` rendering of a byte slice, e.g.
//! `[2, 26, 63, 0, 123]`, one line per read.

use crate::config::PollSettings;
use crate::worker::spawn_board_worker;
use anyhow::{Context, Result};
use common::{Board, BoardBridge, BoardProvider, create_board_bridge};
use std::future::Future;
use std::io::Write;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};

/// Printed when enumeration finds no board
pub const NO_BOARD_MESSAGE: &str = "*** No MCU board found.";

/// Printed once the first board has been opened
pub const BOARD_FOUND_MESSAGE: &str = "*** MCU board found";

/// How a run ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Enumeration was empty; nothing was opened or read
    NoBoard,
    /// Polling ended
    Stopped(PollSummary),
}

/// Result of the polling phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSummary {
    /// Reads printed
    pub reads: u64,
    pub reason: StopReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The configured read count was reached
    CountReached,
    /// The shutdown future completed
    Shutdown,
}

/// Open the first board the provider enumerates and announce it
///
/// Returns `None` after printing [`NO_BOARD_MESSAGE`] when there is none.
pub fn open_first_board<P, W>(provider: &P, out: &mut W) -> Result<Option<P::Board>>
where
    P: BoardProvider,
    W: Write,
{
    let descriptors = provider
        .enumerate()
        .context("Failed to enumerate USB devices")?;

    let Some(first) = descriptors.first() else {
        writeln!(out, "{}", NO_BOARD_MESSAGE)?;
        out.flush()?;
        return Ok(None);
    };

    if descriptors.len() > 1 {
        debug!(
            "{} boards attached, using the first one enumerated",
            descriptors.len()
        );
    }

    // Identity strings are read through this handle; the board is opened once.
    let board = provider.open(first).context("Failed to open MCU board")?;
    writeln!(out, "{}", BOARD_FOUND_MESSAGE)?;
    out.flush()?;

    let vendor = board
        .vendor_name()
        .context("Failed to read manufacturer string")?;
    let device = board
        .device_name()
        .context("Failed to read product string")?;
    info!("Opened board: {} {}", vendor, device);

    writeln!(out, "*** Device manufacturer: {}", vendor)?;
    writeln!(out, "*** Device name: {}", device)?;
    out.flush()?;

    Ok(Some(board))
}

/// Poll the board behind `bridge` and print every result
///
/// Each read is preceded by one full interval. A failed read ends polling
/// with an error; nothing is printed for it.
pub async fn poll_board<W, S>(
    bridge: &BoardBridge,
    settings: &PollSettings,
    out: &mut W,
    shutdown: S,
) -> Result<PollSummary>
where
    W: Write,
    S: Future<Output = ()>,
{
    let read = settings.control_read();
    let mut ticker = interval_at(Instant::now() + settings.interval, settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut reads = 0u64;
    info!(
        "Polling request {:#x} ({} bytes) every {:?}",
        read.request, read.length, settings.interval
    );

    loop {
        if settings.count.is_some_and(|limit| reads >= limit) {
            info!("Read count reached ({})", reads);
            return Ok(PollSummary {
                reads,
                reason: StopReason::CountReached,
            });
        }

        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("Polling stopped after {} read(s)", reads);
                return Ok(PollSummary {
                    reads,
                    reason: StopReason::Shutdown,
                });
            }
            _ = ticker.tick() => {}
        }

        let data = match bridge.control_read(read).await {
            Ok(data) => data,
            Err(common::Error::Usb(e)) if e.is_disconnect() => {
                error!("Board disconnected after {} read(s)", reads);
                return Err(anyhow::Error::new(e).context("MCU board disconnected"));
            }
            Err(e) => {
                error!("Read {} failed: {}", reads + 1, e);
                return Err(anyhow::Error::new(e).context("Control read failed"));
            }
        };

        if data.len() != read.length as usize {
            warn!(
                "Read {} returned {} of {} bytes",
                reads + 1,
                data.len(),
                read.length
            );
        }

        writeln!(out, "{:?}", data)?;
        out.flush()?;
        reads += 1;
    }
}

/// Full run: open the first board, poll it, release it
///
/// The board lives on the USB worker thread for the whole polling phase and
/// is released before this returns, on success and on error alike.
pub async fn run<P, W, S>(
    provider: &P,
    settings: &PollSettings,
    out: &mut W,
    shutdown: S,
) -> Result<RunOutcome>
where
    P: BoardProvider,
    W: Write,
    S: Future<Output = ()>,
{
    let Some(board) = open_first_board(provider, out)? else {
        return Ok(RunOutcome::NoBoard);
    };

    let (bridge, worker) = create_board_bridge();
    let worker_handle =
        spawn_board_worker(board, worker).context("Failed to spawn USB worker thread")?;

    let result = poll_board(&bridge, settings, out, shutdown).await;

    info!("Shutting down USB subsystem...");
    if let Err(e) = bridge.shutdown().await {
        // The worker already exited and dropped the board.
        debug!("USB worker not reachable for shutdown: {}", e);
    }
    drop(bridge);

    match worker_handle.join() {
        Ok(served) => debug!("USB worker served {} read(s)", served),
        Err(e) => error!("USB worker thread panicked: {:?}", e),
    }

    result.map(RunOutcome::Stopped)
}

/// Print every compatible board the provider can see
pub fn list_boards<P, W>(provider: &P, out: &mut W) -> Result<usize>
where
    P: BoardProvider,
    W: Write,
{
    let descriptors = provider
        .enumerate()
        .context("Failed to enumerate USB devices")?;

    if descriptors.is_empty() {
        writeln!(out, "No MCU boards found.")?;
    } else {
        writeln!(out, "Found {} MCU board(s):", descriptors.len())?;
        for (i, descriptor) in descriptors.iter().enumerate() {
            writeln!(out, "  [{}] {}", i, provider.describe(descriptor))?;
        }
    }

    Ok(descriptors.len())
}
