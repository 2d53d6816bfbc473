//! USB worker thread
//!
//! Dedicated thread that owns the opened board and serves control reads for
//! the Tokio runtime. Blocking rusb calls never run on the async executor.
//!
//! The board is dropped, and with it the device handle released, when the
//! thread receives `Shutdown` or every bridge handle has been dropped.

use common::{Board, BoardCommand, BoardWorker};
use std::thread::JoinHandle;
use tracing::{debug, info};

/// USB worker thread
pub struct BoardWorkerThread<B: Board> {
    /// The one open board of this run
    board: B,
    /// Communication channel with Tokio runtime
    worker: BoardWorker,
}

impl<B: Board> BoardWorkerThread<B> {
    pub fn new(board: B, worker: BoardWorker) -> Self {
        Self { board, worker }
    }

    /// Serve commands until `Shutdown` or until the bridge goes away
    ///
    /// Returns the number of reads served.
    pub fn run(mut self) -> u64 {
        info!("USB worker thread started");
        let mut served = 0u64;

        loop {
            match self.worker.recv_command() {
                Ok(BoardCommand::ControlRead { read, response }) => {
                    let result = self.board.control_read(&read);
                    served += 1;
                    if response.send(result).is_err() {
                        debug!("Read result dropped: requester went away");
                    }
                }
                Ok(BoardCommand::Shutdown) => {
                    info!("USB worker shutting down");
                    break;
                }
                Err(e) => {
                    debug!("Command channel closed: {}", e);
                    break;
                }
            }
        }

        drop(self.board);
        info!("USB worker thread stopped after {} read(s)", served);
        served
    }
}

/// Spawn the USB worker thread
///
/// The thread takes ownership of `board` and runs until a Shutdown command
/// is received or the bridge is dropped.
pub fn spawn_board_worker<B>(board: B, worker: BoardWorker) -> std::io::Result<JoinHandle<u64>>
where
    B: Board + 'static,
{
    std::thread::Builder::new()
        .name("usb-worker".to_string())
        .spawn(move || BoardWorkerThread::new(board, worker).run())
}
