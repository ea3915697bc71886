//! In-memory [`DeviceAccess`] implementation used by the `jumperless-test`
//! binary and the test suite. No hardware required; attribute values, channel
//! lists and failure modes are all scriptable.

use std::cell::RefCell;
use std::rc::Rc;

use crate::{Error, Result};
use super::{Channel, ConfigKey, DeviceAccess, DeviceRef};

pub struct DemoDevice {
    vendor: Option<String>,
    model: Option<String>,
    version: Option<String>,
    serial_number: Option<String>,
    connection_id: Option<String>,
    channels: Vec<Channel>,
    mode: Option<String>,
    opened: bool,
    fail_open: bool,
    fail_channels: bool,
    open_count: usize,
    close_count: usize,
    config_sets: Vec<(ConfigKey, String)>,
}

impl DemoDevice {
    pub fn new(vendor: &str, model: &str) -> DemoDevice {
        DemoDevice {
            vendor: Some(vendor.to_owned()),
            model: Some(model.to_owned()),
            version: None,
            serial_number: None,
            connection_id: None,
            channels: Vec::new(),
            mode: None,
            opened: false,
            fail_open: false,
            fail_channels: false,
            open_count: 0,
            close_count: 0,
            config_sets: Vec::new(),
        }
    }

    /// Device whose every attribute read fails, like a board that dropped off
    /// the bus after enumeration.
    pub fn blank() -> DemoDevice {
        DemoDevice {
            vendor: None,
            model: None,
            ..DemoDevice::new("", "")
        }
    }

    pub fn with_version(mut self, version: &str) -> DemoDevice {
        self.version = Some(version.to_owned());
        self
    }

    pub fn with_serial_number(mut self, serial_number: &str) -> DemoDevice {
        self.serial_number = Some(serial_number.to_owned());
        self
    }

    pub fn with_connection_id(mut self, connection_id: &str) -> DemoDevice {
        self.connection_id = Some(connection_id.to_owned());
        self
    }

    pub fn with_channels(mut self, channels: Vec<Channel>) -> DemoDevice {
        self.channels = channels;
        self
    }

    pub fn with_mode(mut self, mode: &str) -> DemoDevice {
        self.mode = Some(mode.to_owned());
        self
    }

    pub fn into_ref(self) -> DeviceRef {
        Rc::new(RefCell::new(self))
    }

    pub fn set_channel_enabled(&mut self, index: usize, enabled: bool) {
        self.channels[index].enabled = enabled;
    }

    pub fn fail_open(&mut self, fail: bool) {
        self.fail_open = fail;
    }

    pub fn fail_channel_reads(&mut self, fail: bool) {
        self.fail_channels = fail;
    }

    pub fn is_opened(&self) -> bool {
        self.opened
    }

    pub fn open_count(&self) -> usize {
        self.open_count
    }

    pub fn close_count(&self) -> usize {
        self.close_count
    }

    /// Every `config_set` call observed so far, in order.
    pub fn config_sets(&self) -> &[(ConfigKey, String)] {
        &self.config_sets
    }
}

fn attr(value: &Option<String>) -> Result<String> {
    value.clone().ok_or(Error::Unsupported)
}

impl DeviceAccess for DemoDevice {
    fn vendor(&self) -> Result<String> {
        attr(&self.vendor)
    }

    fn model(&self) -> Result<String> {
        attr(&self.model)
    }

    fn version(&self) -> Result<String> {
        attr(&self.version)
    }

    fn serial_number(&self) -> Result<String> {
        attr(&self.serial_number)
    }

    fn connection_id(&self) -> Result<String> {
        attr(&self.connection_id)
    }

    fn channels(&self) -> Result<Vec<Channel>> {
        if self.fail_channels {
            return Err(Error::Driver("channel read failed".into()));
        }
        Ok(self.channels.clone())
    }

    fn config_get(&self, key: ConfigKey) -> Result<String> {
        match key {
            ConfigKey::DeviceMode => attr(&self.mode),
        }
    }

    fn config_set(&mut self, key: ConfigKey, value: &str) -> Result<()> {
        self.config_sets.push((key, value.to_owned()));
        match key {
            ConfigKey::DeviceMode => self.mode = Some(value.to_owned()),
        }
        Ok(())
    }

    fn open(&mut self) -> Result<()> {
        if self.fail_open {
            return Err(Error::Driver("failed to claim USB interface".into()));
        }
        self.open_count += 1;
        self.opened = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.close_count += 1;
        self.opened = false;
        Ok(())
    }
}
