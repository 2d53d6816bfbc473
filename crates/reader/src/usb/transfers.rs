//! USB transfer execution
//!
//! Vendor control reads on endpoint 0, string descriptor reads and the
//! mapping from rusb errors to [`UsbError`].

use common::{ControlRead, UsbError};
use rusb::{Context, DeviceDescriptor, DeviceHandle, Direction, Recipient, RequestType};
use std::time::Duration;
use tracing::debug;

/// bmRequestType for a vendor read addressed to the device (0xC0)
pub fn vendor_in_request_type() -> u8 {
    rusb::request_type(Direction::In, RequestType::Vendor, Recipient::Device)
}

/// Execute a vendor control read
///
/// Returns the bytes the device actually sent, which may be fewer than
/// requested. Short reads are not logged here; callers decide.
pub fn execute_control_read(
    handle: &DeviceHandle<Context>,
    read: &ControlRead,
    timeout: Duration,
) -> Result<Vec<u8>, UsbError> {
    debug!(
        "Control read: request={:#x}, value={:#x}, index={:#x}, length={}",
        read.request, read.value, read.index, read.length
    );

    let mut buffer = vec![0u8; read.length as usize];
    match handle.read_control(
        vendor_in_request_type(),
        read.request,
        read.value,
        read.index,
        &mut buffer,
        timeout,
    ) {
        Ok(len) => {
            debug!("Control read returned {} of {} bytes", len, buffer.len());
            buffer.truncate(len);
            Ok(buffer)
        }
        Err(e) => {
            debug!("Control read failed: {}", e);
            Err(map_rusb_error(e))
        }
    }
}

/// String descriptors that identify a board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityString {
    Manufacturer,
    Product,
}

/// Read an identity string in the device's first supported language
///
/// The descriptor is UTF-16 on the wire and decoded as such. Devices that
/// report no languages fall back to the language-less ASCII request.
pub fn read_identity_string(
    handle: &DeviceHandle<Context>,
    descriptor: &DeviceDescriptor,
    which: IdentityString,
    timeout: Duration,
) -> Result<String, UsbError> {
    let languages = handle.read_languages(timeout).map_err(map_rusb_error)?;

    let result = match (languages.first().copied(), which) {
        (Some(lang), IdentityString::Manufacturer) => {
            handle.read_manufacturer_string(lang, descriptor, timeout)
        }
        (Some(lang), IdentityString::Product) => handle.read_product_string(lang, descriptor, timeout),
        (None, IdentityString::Manufacturer) => handle.read_manufacturer_string_ascii(descriptor),
        (None, IdentityString::Product) => handle.read_product_string_ascii(descriptor),
    };
    result.map_err(map_rusb_error)
}

/// Map rusb::Error to UsbError
pub fn map_rusb_error(err: rusb::Error) -> UsbError {
    match err {
        rusb::Error::Timeout => UsbError::Timeout,
        rusb::Error::Pipe => UsbError::Pipe,
        rusb::Error::NoDevice => UsbError::NoDevice,
        rusb::Error::NotFound => UsbError::NotFound,
        rusb::Error::Busy => UsbError::Busy,
        rusb::Error::Overflow => UsbError::Overflow,
        rusb::Error::Io => UsbError::Io,
        rusb::Error::InvalidParam => UsbError::InvalidParam,
        rusb::Error::Access => UsbError::Access,
        _ => UsbError::Other {
            message: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_rusb_error() {
        assert_eq!(map_rusb_error(rusb::Error::Timeout), UsbError::Timeout);
        assert_eq!(map_rusb_error(rusb::Error::Pipe), UsbError::Pipe);
        assert_eq!(map_rusb_error(rusb::Error::NoDevice), UsbError::NoDevice);
        assert_eq!(map_rusb_error(rusb::Error::NotFound), UsbError::NotFound);
        assert_eq!(map_rusb_error(rusb::Error::Access), UsbError::Access);
        assert!(matches!(
            map_rusb_error(rusb::Error::NotSupported),
            UsbError::Other { .. }
        ));
    }

    #[test]
    fn test_vendor_in_request_type() {
        // IN (0x80) | VENDOR (0x40) | DEVICE (0x00)
        assert_eq!(vendor_in_request_type(), 0xc0);
    }
}
