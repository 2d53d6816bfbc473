//! MCU board handle
//!
//! Wraps an opened rusb device handle together with its cached device
//! descriptor.

use crate::usb::transfers::{
    IdentityString, execute_control_read, map_rusb_error, read_identity_string,
};
use common::{Board, ControlRead, UsbError};
use rusb::{Context, Device, DeviceDescriptor, DeviceHandle};
use std::time::Duration;
use tracing::debug;

/// An opened practicum MCU board
///
/// The underlying libusb handle is closed when this value is dropped.
pub struct McuBoard {
    handle: DeviceHandle<Context>,
    descriptor: DeviceDescriptor,
    timeout: Duration,
    bus_number: u8,
    device_address: u8,
}

impl McuBoard {
    /// Open a board
    ///
    /// `timeout` applies to every control read issued on the handle.
    pub fn open(device: &Device<Context>, timeout: Duration) -> Result<Self, UsbError> {
        let descriptor = device.device_descriptor().map_err(map_rusb_error)?;
        let handle = device.open().map_err(map_rusb_error)?;

        debug!(
            "Opened board: bus={}, addr={}",
            device.bus_number(),
            device.address()
        );

        Ok(Self {
            handle,
            descriptor,
            timeout,
            bus_number: device.bus_number(),
            device_address: device.address(),
        })
    }
}

impl Board for McuBoard {
    fn vendor_name(&self) -> Result<String, UsbError> {
        read_identity_string(
            &self.handle,
            &self.descriptor,
            IdentityString::Manufacturer,
            self.timeout,
        )
    }

    fn device_name(&self) -> Result<String, UsbError> {
        read_identity_string(
            &self.handle,
            &self.descriptor,
            IdentityString::Product,
            self.timeout,
        )
    }

    fn control_read(&mut self, read: &ControlRead) -> Result<Vec<u8>, UsbError> {
        execute_control_read(&self.handle, read, self.timeout)
    }
}

impl Drop for McuBoard {
    fn drop(&mut self) {
        debug!(
            "Releasing board: bus={}, addr={}",
            self.bus_number, self.device_address
        );
    }
}
