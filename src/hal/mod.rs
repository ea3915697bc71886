//! Seam to the hardware abstraction library that performs the actual device I/O.

use std::cell::RefCell;
use std::rc::Rc;

use crate::Result;

pub mod demo;

/// Identifier for a device property accessed through the generic
/// config-get/config-set capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    /// Operating mode of the acquisition engine, as a driver-defined string
    /// such as `"mixed-signal"`.
    DeviceMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelType {
    Logic,
    Analog,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub name: String,
    pub channel_type: ChannelType,
    pub enabled: bool,
}

impl Channel {
    pub fn logic(name: &str, enabled: bool) -> Channel {
        Channel { name: name.to_owned(), channel_type: ChannelType::Logic, enabled }
    }

    pub fn analog(name: &str, enabled: bool) -> Channel {
        Channel { name: name.to_owned(), channel_type: ChannelType::Analog, enabled }
    }
}

/// Interface provided by the hardware abstraction library for one enumerated
/// device.
///
/// Every attribute getter may fail independently with [`Error::Unsupported`]
/// when the driver does not populate that field; callers treat such failures
/// as "attribute absent" and never abort on them.
///
/// [`Error::Unsupported`]: crate::Error::Unsupported
pub trait DeviceAccess {
    fn vendor(&self) -> Result<String>;
    fn model(&self) -> Result<String>;
    fn version(&self) -> Result<String>;
    fn serial_number(&self) -> Result<String>;
    fn connection_id(&self) -> Result<String>;

    fn channels(&self) -> Result<Vec<Channel>>;

    fn config_get(&self, key: ConfigKey) -> Result<String>;
    fn config_set(&mut self, key: ConfigKey, value: &str) -> Result<()>;

    fn open(&mut self) -> Result<()>;
    fn close(&mut self) -> Result<()>;
}

/// Shared handle to one device. Everything here runs on the single UI thread,
/// and sibling scans need shared identity, hence `Rc` rather than ownership.
pub type DeviceRef = Rc<RefCell<dyn DeviceAccess>>;

/// Membership bookkeeping for an acquisition session created around an open
/// device.
#[derive(Default)]
pub struct Session {
    devices: Vec<DeviceRef>,
}

impl Session {
    pub fn new() -> Session {
        Session { devices: Vec::new() }
    }

    pub fn add_device(&mut self, device: DeviceRef) {
        self.devices.push(device);
        log::debug!("session now holds {} device(s)", self.devices.len());
    }

    pub fn remove_devices(&mut self) {
        self.devices.clear();
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }
}
