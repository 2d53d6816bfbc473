//! MCU board RFID reader
//!
//! Finds the first practicum MCU board on the USB bus, prints its identity
//! and then polls it for RFID data, printing each raw result.

pub mod config;
pub mod reader;
pub mod usb;
pub mod worker;

pub use config::ReaderConfig;
pub use reader::{PollSummary, RunOutcome, StopReason};
