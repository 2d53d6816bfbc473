//! USB type definitions shared between the reader and its tests
//!
//! Descriptor summaries, control read requests and the transfer error
//! conditions reported by the device-access layer.

use std::fmt;
use thiserror::Error;

/// Vendor ID of the practicum MCU boards (V-USB shared ID)
pub const MCU_VENDOR_ID: u16 = 0x16c0;

/// Product ID of the practicum MCU boards (V-USB shared ID)
pub const MCU_PRODUCT_ID: u16 = 0x05dc;

/// Vendor request that returns the latest RFID block
pub const RQ_READ: u8 = 1;

/// Length of the RFID block returned by [`RQ_READ`]
pub const RQ_READ_LENGTH: u16 = 5;

/// Summary of a discovered board
///
/// Built from the USB device descriptor. The string fields are only
/// populated when the device could be opened to read them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardInfo {
    /// USB Vendor ID
    pub vendor_id: u16,
    /// USB Product ID
    pub product_id: u16,
    /// Bus number on the host
    pub bus_number: u8,
    /// Device address on the bus
    pub device_address: u8,
    /// Manufacturer string (if available)
    pub manufacturer: Option<String>,
    /// Product string (if available)
    pub product: Option<String>,
}

impl fmt::Display for BoardInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:04x} bus {:03} device {:03} - {} {}",
            self.vendor_id,
            self.product_id,
            self.bus_number,
            self.device_address,
            self.manufacturer.as_deref().unwrap_or("Unknown Manufacturer"),
            self.product.as_deref().unwrap_or("Unknown Product"),
        )
    }
}

/// Vendor control read (device to host)
///
/// Sent on endpoint 0 with `bmRequestType = IN | VENDOR | DEVICE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlRead {
    /// Request byte (bRequest)
    pub request: u8,
    /// Value parameter (wValue)
    pub value: u16,
    /// Index parameter (wIndex)
    pub index: u16,
    /// Number of bytes to read (wLength)
    pub length: u16,
}

impl ControlRead {
    /// Create a read with zero value and index
    pub fn new(request: u8, length: u16) -> Self {
        Self {
            request,
            value: 0,
            index: 0,
            length,
        }
    }
}

impl Default for ControlRead {
    /// The RFID poll request
    fn default() -> Self {
        Self::new(RQ_READ, RQ_READ_LENGTH)
    }
}

/// USB transfer error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsbError {
    /// Transfer timed out
    #[error("transfer timed out")]
    Timeout,
    /// Endpoint stalled (request not supported by the firmware)
    #[error("pipe error (request stalled)")]
    Pipe,
    /// Device was disconnected
    #[error("device disconnected")]
    NoDevice,
    /// Device or entity not found
    #[error("entity not found")]
    NotFound,
    /// Device is busy
    #[error("device busy")]
    Busy,
    /// Device sent more data than requested
    #[error("overflow")]
    Overflow,
    /// I/O error
    #[error("input/output error")]
    Io,
    /// Invalid parameter
    #[error("invalid parameter")]
    InvalidParam,
    /// Access denied (permissions)
    #[error("access denied (insufficient permissions)")]
    Access,
    /// Other error with message
    #[error("{message}")]
    Other { message: String },
}

impl UsbError {
    /// Whether the error means the board is gone
    pub fn is_disconnect(&self) -> bool {
        matches!(self, UsbError::NoDevice)
    }
}
