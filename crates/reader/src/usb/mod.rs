//! USB subsystem
//!
//! rusb-backed implementation of the board access traits:
//! - Enumeration of compatible boards by VID:PID
//! - Opening a board and reading its string descriptors
//! - Vendor control reads with rusb error mapping
//!
//! Everything here is blocking. The opened board is handed to the worker
//! thread, which is the only place transfers are issued from.

pub mod device;
pub mod manager;
pub mod transfers;

pub use device::McuBoard;
pub use manager::UsbBoardProvider;
