//! Common utilities for mcu-rfid
//!
//! This crate provides the pieces shared by the reader binary and its tests:
//! USB type definitions, the device-access traits, error handling, logging
//! setup, and the async channel bridge for USB thread communication.

pub mod board;
pub mod channel;
pub mod error;
pub mod logging;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;

pub use board::{Board, BoardProvider};
pub use channel::{BoardBridge, BoardCommand, BoardWorker, create_board_bridge};
pub use error::{Error, Result};
pub use logging::setup_logging;
pub use types::{BoardInfo, ControlRead, UsbError};
