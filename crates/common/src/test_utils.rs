//! Test utilities for mcu-rfid
//!
//! Provides in-memory [`Board`] and [`BoardProvider`] implementations and
//! helper functions for testing across crates. Compiled for this crate's own
//! tests and, in dependents, through the `test-utils` feature.
//!
//! # Example
//!
//! ```
//! use common::board::{Board, BoardProvider};
//! use common::test_utils::{MockBoard, MockProvider};
//! use common::types::ControlRead;
//!
//! let provider = MockProvider::new(vec![
//!     MockBoard::new("Acme", "RFIDReaderV1").with_response(vec![1, 2, 3, 4, 5]),
//! ]);
//! let descriptors = provider.enumerate().unwrap();
//! let mut board = provider.open(&descriptors[0]).unwrap();
//! assert_eq!(board.vendor_name().unwrap(), "Acme");
//! assert_eq!(board.control_read(&ControlRead::default()).unwrap(), vec![1, 2, 3, 4, 5]);
//! ```

use crate::board::{Board, BoardProvider};
use crate::types::{BoardInfo, ControlRead, MCU_PRODUCT_ID, MCU_VENDOR_ID, UsbError};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Default test timeout (5 seconds)
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared record of the control reads a mock board received
pub type ReadLog = Arc<Mutex<Vec<ControlRead>>>;

/// In-memory board
///
/// Answers every read with the same configured bytes, optionally failing
/// once a given number of reads has been served. Clones share one read log.
#[derive(Debug, Clone)]
pub struct MockBoard {
    vendor: String,
    device: String,
    response: Vec<u8>,
    fail_after: Option<(usize, UsbError)>,
    string_error: Option<UsbError>,
    reads: ReadLog,
}

impl MockBoard {
    pub fn new(vendor: &str, device: &str) -> Self {
        Self {
            vendor: vendor.to_string(),
            device: device.to_string(),
            response: Vec::new(),
            fail_after: None,
            string_error: None,
            reads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Bytes returned by every successful read
    pub fn with_response(mut self, response: Vec<u8>) -> Self {
        self.response = response;
        self
    }

    /// Serve `reads` successful reads, then fail every later one with `error`
    pub fn failing_after(mut self, reads: usize, error: UsbError) -> Self {
        self.fail_after = Some((reads, error));
        self
    }

    /// Fail every string descriptor request with `error`
    pub fn with_unreadable_strings(mut self, error: UsbError) -> Self {
        self.string_error = Some(error);
        self
    }

    /// Handle on the log of received reads
    pub fn read_log(&self) -> ReadLog {
        Arc::clone(&self.reads)
    }

    /// Number of reads received so far
    pub fn read_count(&self) -> usize {
        self.reads.lock().map(|r| r.len()).unwrap_or(0)
    }
}

impl Board for MockBoard {
    fn vendor_name(&self) -> Result<String, UsbError> {
        match &self.string_error {
            Some(error) => Err(error.clone()),
            None => Ok(self.vendor.clone()),
        }
    }

    fn device_name(&self) -> Result<String, UsbError> {
        match &self.string_error {
            Some(error) => Err(error.clone()),
            None => Ok(self.device.clone()),
        }
    }

    fn control_read(&mut self, read: &ControlRead) -> Result<Vec<u8>, UsbError> {
        let mut reads = self.reads.lock().map_err(|e| UsbError::Other {
            message: e.to_string(),
        })?;
        let served = reads.len();
        reads.push(*read);

        match &self.fail_after {
            Some((after, error)) if served >= *after => Err(error.clone()),
            _ => Ok(self.response.clone()),
        }
    }
}

/// In-memory provider over a fixed list of boards
///
/// Descriptors are positions in the list. Opens and describes are recorded
/// in call order.
#[derive(Debug, Clone, Default)]
pub struct MockProvider {
    boards: Vec<MockBoard>,
    opened: Arc<Mutex<Vec<usize>>>,
    described: Arc<Mutex<Vec<usize>>>,
}

impl MockProvider {
    pub fn new(boards: Vec<MockBoard>) -> Self {
        Self {
            boards,
            opened: Arc::new(Mutex::new(Vec::new())),
            described: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Provider that finds nothing
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Positions of the boards opened so far
    pub fn opened(&self) -> Vec<usize> {
        self.opened.lock().map(|o| o.clone()).unwrap_or_default()
    }

    /// Positions passed to `describe` so far
    pub fn described(&self) -> Vec<usize> {
        self.described.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

impl BoardProvider for MockProvider {
    type Descriptor = usize;
    type Board = MockBoard;

    fn enumerate(&self) -> Result<Vec<usize>, UsbError> {
        Ok((0..self.boards.len()).collect())
    }

    fn open(&self, descriptor: &usize) -> Result<MockBoard, UsbError> {
        let board = self.boards.get(*descriptor).ok_or(UsbError::NotFound)?;
        if let Ok(mut opened) = self.opened.lock() {
            opened.push(*descriptor);
        }
        Ok(board.clone())
    }

    fn describe(&self, descriptor: &usize) -> BoardInfo {
        if let Ok(mut described) = self.described.lock() {
            described.push(*descriptor);
        }
        let board = self.boards.get(*descriptor);
        create_mock_board_info(
            (*descriptor as u8).wrapping_add(1),
            board.map(|b| b.vendor.as_str()),
            board.map(|b| b.device.as_str()),
        )
    }
}

/// Create a mock BoardInfo with the MCU board IDs on bus 1
pub fn create_mock_board_info(
    device_address: u8,
    manufacturer: Option<&str>,
    product: Option<&str>,
) -> BoardInfo {
    BoardInfo {
        vendor_id: MCU_VENDOR_ID,
        product_id: MCU_PRODUCT_ID,
        bus_number: 1,
        device_address,
        manufacturer: manufacturer.map(str::to_string),
        product: product.map(str::to_string),
    }
}

/// Run an async operation with a timeout
///
/// # Example
/// ```ignore
/// use common::test_utils::{with_timeout, DEFAULT_TEST_TIMEOUT};
///
/// #[tokio::test]
/// async fn test_with_timeout() {
///     let result = with_timeout(DEFAULT_TEST_TIMEOUT, async { 42 }).await.unwrap();
///     assert_eq!(result, 42);
/// }
/// ```
pub async fn with_timeout<T, F>(duration: Duration, future: F) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, future)
        .await
        .map_err(|_| TimeoutError { duration })
}

/// Error returned when a test times out
#[derive(Debug)]
pub struct TimeoutError {
    /// The timeout duration that was exceeded
    pub duration: Duration,
}

impl std::fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Test timed out after {:?}", self.duration)
    }
}

impl std::error::Error for TimeoutError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_board_records_reads() {
        let mut board = MockBoard::new("Acme", "RFIDReaderV1").with_response(vec![9; 5]);
        let log = board.read_log();

        board.control_read(&ControlRead::default()).unwrap();
        board.control_read(&ControlRead::new(2, 8)).unwrap();

        let reads = log.lock().unwrap();
        assert_eq!(reads.len(), 2);
        assert_eq!(reads[1].request, 2);
        assert_eq!(reads[1].length, 8);
    }

    #[test]
    fn test_mock_board_fails_after() {
        let mut board = MockBoard::new("Acme", "RFIDReaderV1")
            .with_response(vec![1])
            .failing_after(1, UsbError::Timeout);

        assert!(board.control_read(&ControlRead::default()).is_ok());
        assert_eq!(
            board.control_read(&ControlRead::default()),
            Err(UsbError::Timeout)
        );
        assert_eq!(board.read_count(), 2);
    }

    #[test]
    fn test_mock_provider_open_shares_log() {
        let board = MockBoard::new("Acme", "RFIDReaderV1");
        let provider = MockProvider::new(vec![board.clone()]);

        let mut opened = provider.open(&0).unwrap();
        opened.control_read(&ControlRead::default()).unwrap();

        assert_eq!(board.read_count(), 1);
        assert_eq!(provider.opened(), vec![0]);
        assert_eq!(provider.open(&1).unwrap_err(), UsbError::NotFound);
    }

    #[test]
    fn test_mock_provider_describe() {
        let provider = MockProvider::new(vec![MockBoard::new("Acme", "RFIDReaderV1")]);
        let info = provider.describe(&0);

        assert_eq!(info.vendor_id, MCU_VENDOR_ID);
        assert_eq!(info.device_address, 1);
        assert_eq!(info.manufacturer.as_deref(), Some("Acme"));
        assert_eq!(info.product.as_deref(), Some("RFIDReaderV1"));
        assert_eq!(provider.described(), vec![0]);
    }

    #[test]
    fn test_mock_board_unreadable_strings() {
        let mut board = MockBoard::new("Acme", "RFIDReaderV1")
            .with_response(vec![1])
            .with_unreadable_strings(UsbError::Pipe);

        assert_eq!(board.vendor_name(), Err(UsbError::Pipe));
        assert_eq!(board.device_name(), Err(UsbError::Pipe));
        assert_eq!(board.control_read(&ControlRead::default()), Ok(vec![1]));
    }

    #[tokio::test]
    async fn test_with_timeout_success() {
        let result = with_timeout(DEFAULT_TEST_TIMEOUT, async { 42 }).await;

        assert!(result.is_ok());
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_with_timeout_failure() {
        let result = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            42
        })
        .await;

        assert!(result.is_err());
    }
}
