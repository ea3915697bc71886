//! Naming and lifecycle wrapper around one hardware device.

use std::rc::Rc;

use crate::{Error, Result};
use crate::hal::{DeviceRef, Session};

/// Maps one attribute read to its displayable value. Read failures and empty
/// strings both mean "attribute absent"; neither may abort label construction.
fn attr(read: Result<String>) -> Option<String> {
    match read {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

pub struct HardwareDevice {
    device: Option<DeviceRef>,
    session: Option<Session>,
    open: bool,
}

impl HardwareDevice {
    pub fn new(device: DeviceRef) -> HardwareDevice {
        HardwareDevice { device: Some(device), session: None, open: false }
    }

    /// Wrapper with no underlying device; labels report it as invalid and
    /// `open` fails.
    pub fn invalid() -> HardwareDevice {
        HardwareDevice { device: None, session: None, open: false }
    }

    pub fn device(&self) -> Option<&DeviceRef> {
        self.device.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Builds the long-form label from every attribute the driver can
    /// produce, in the fixed order vendor, model, version, serial number,
    /// connection id. Pure read; never fails.
    pub fn full_name(&self) -> String {
        let Some(device) = &self.device else {
            return "(Invalid Device)".to_owned();
        };
        let device = device.borrow();

        let mut parts = Vec::new();
        parts.extend(attr(device.vendor()));
        parts.extend(attr(device.model()));
        parts.extend(attr(device.version()));
        if let Some(serial) = attr(device.serial_number()) {
            parts.push(format!("[S/N: {}]", serial));
        }
        if let Some(connection_id) = attr(device.connection_id()) {
            parts.push(format!("({})", connection_id));
        }

        if parts.is_empty() {
            return "(Disconnected Device)".to_owned();
        }
        parts.join(" ")
    }

    /// Builds the device-list label: vendor and model only, unless another
    /// device in `devices` carries the same vendor and model, in which case
    /// version and serial number (or, lacking a serial, connection id) are
    /// appended to tell the two apart.
    pub fn display_name(&self, devices: &[HardwareDevice]) -> String {
        let Some(device) = &self.device else {
            return "(Invalid Device)".to_owned();
        };

        // If another device shares our vendor and model, the short label is
        // ambiguous and more attributes are needed.
        let multiple_dev = devices.iter().any(|other| self.conflicts_with(other));

        let device = device.borrow();
        let mut parts = Vec::new();
        parts.extend(attr(device.vendor()));
        parts.extend(attr(device.model()));

        if multiple_dev {
            parts.extend(attr(device.version()));
            match attr(device.serial_number()) {
                Some(serial) =>
                    parts.push(format!("[S/N: {}]", serial)),
                // no serial to go by; fall back to where the device is plugged in
                None =>
                    parts.extend(attr(device.connection_id())
                        .map(|connection_id| format!("({})", connection_id))),
            }
        }

        if parts.is_empty() {
            return "(Disconnected Device)".to_owned();
        }
        parts.join(" ")
    }

    /// True when `other` is a different device whose vendor and model exactly
    /// match ours. A device whose attributes cannot be read never conflicts.
    fn conflicts_with(&self, other: &HardwareDevice) -> bool {
        let (Some(this), Some(that)) = (&self.device, &other.device) else {
            return false;
        };
        if Rc::ptr_eq(this, that) {
            return false;
        }
        let this = this.borrow();
        let that = that.borrow();
        match (this.vendor(), this.model(), that.vendor(), that.model()) {
            (Ok(this_vendor), Ok(this_model), Ok(that_vendor), Ok(that_model)) =>
                this_vendor == that_vendor && this_model == that_model,
            _ => false,
        }
    }

    /// Opens the underlying device and creates a session around it. Reopening
    /// an already open device closes it first. An open failure from the
    /// driver is surfaced to the caller and leaves the device closed.
    pub fn open(&mut self) -> Result<()> {
        if self.open {
            self.close();
        }

        let Some(device) = &self.device else {
            return Err(Error::Disconnected);
        };
        device.borrow_mut().open()?;
        self.open = true;

        let mut session = Session::new();
        session.add_device(Rc::clone(device));
        self.session = Some(session);
        log::debug!("opened {}", self.full_name());
        Ok(())
    }

    /// Closes the underlying device and tears down the session. Safe to call
    /// at any time, including when the device was never opened.
    pub fn close(&mut self) {
        if self.open {
            if let Some(device) = &self.device {
                if let Err(error) = device.borrow_mut().close() {
                    log::warn!("failed to close device: {}", error);
                }
            }
        }

        if let Some(session) = &mut self.session {
            session.remove_devices();
        }
        self.session = None;
        self.open = false;
    }
}

impl Drop for HardwareDevice {
    fn drop(&mut self) {
        self.close();
    }
}
