//! Async channel bridge between Tokio runtime and USB thread

use crate::types::{ControlRead, UsbError};
use async_channel::{Receiver, Sender, bounded};

/// Commands from Tokio runtime to USB thread
#[derive(Debug)]
pub enum BoardCommand {
    /// Issue a vendor control read on the open board
    ControlRead {
        /// Request to send
        read: ControlRead,
        /// Channel to send response back
        response: tokio::sync::oneshot::Sender<Result<Vec<u8>, UsbError>>,
    },

    /// Shutdown the USB thread gracefully
    Shutdown,
}

/// Handle for Tokio runtime (async)
#[derive(Clone)]
pub struct BoardBridge {
    cmd_tx: Sender<BoardCommand>,
}

impl BoardBridge {
    /// Send a command to the USB thread
    pub async fn send_command(&self, cmd: BoardCommand) -> crate::Result<()> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Run a control read on the USB thread and wait for its result
    pub async fn control_read(&self, read: ControlRead) -> crate::Result<Vec<u8>> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.send_command(BoardCommand::ControlRead { read, response: tx })
            .await?;

        let result = rx
            .await
            .map_err(|_| crate::Error::Channel("USB thread dropped the request".to_string()))?;
        Ok(result?)
    }

    /// Ask the USB thread to release the board and exit
    pub async fn shutdown(&self) -> crate::Result<()> {
        self.send_command(BoardCommand::Shutdown).await
    }
}

/// Handle for USB thread (blocking)
pub struct BoardWorker {
    cmd_rx: Receiver<BoardCommand>,
}

impl BoardWorker {
    /// Receive a command from Tokio runtime (blocking)
    pub fn recv_command(&self) -> crate::Result<BoardCommand> {
        self.cmd_rx
            .recv_blocking()
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Receive a command from inside a Tokio task
    pub async fn recv_command_async(&self) -> crate::Result<BoardCommand> {
        self.cmd_rx
            .recv()
            .await
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }
}

/// Create the channel bridge between Tokio and USB thread
///
/// Returns (BoardBridge for Tokio, BoardWorker for USB thread)
pub fn create_board_bridge() -> (BoardBridge, BoardWorker) {
    // Reads are issued one at a time; a small buffer is plenty.
    let (cmd_tx, cmd_rx) = bounded(16);

    (BoardBridge { cmd_tx }, BoardWorker { cmd_rx })
}
