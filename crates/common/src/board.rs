//! Device-access seam
//!
//! The reader talks to hardware only through these two traits. The rusb
//! implementation lives in the reader crate; `test_utils` (feature
//! `test-utils`) provides in-memory ones.

use crate::types::{BoardInfo, ControlRead, UsbError};

/// An opened MCU board
///
/// Implementations are moved onto the USB worker thread and used from
/// there exclusively.
pub trait Board: Send {
    /// Manufacturer string descriptor
    fn vendor_name(&self) -> Result<String, UsbError>;

    /// Product string descriptor
    fn device_name(&self) -> Result<String, UsbError>;

    /// Issue a vendor control read and return the bytes received
    fn control_read(&mut self, read: &ControlRead) -> Result<Vec<u8>, UsbError>;
}

/// Enumerates and opens compatible boards
pub trait BoardProvider {
    /// Discovered but not yet opened board
    type Descriptor;
    /// Handle type produced by [`BoardProvider::open`]
    type Board: Board + 'static;

    /// List currently attached compatible boards, in enumeration order
    fn enumerate(&self) -> Result<Vec<Self::Descriptor>, UsbError>;

    /// Open a handle to a discovered board
    fn open(&self, descriptor: &Self::Descriptor) -> Result<Self::Board, UsbError>;

    /// Descriptor summary for listings and logs
    fn describe(&self, descriptor: &Self::Descriptor) -> BoardInfo;
}
