//! Trigger and channel configuration state for the Jumperless settings panel.
//!
//! This is the UI-toolkit-independent half of the settings widget: it holds
//! the edited trigger parameters, polls the bound device's channel list on a
//! fixed interval, and nudges the device to rebuild its frame header when the
//! enabled channel set changes.

use std::time::Duration;

use crate::hal::{ChannelType, ConfigKey, DeviceRef};

/// How often the owning event loop should call
/// [`ConfigPanel::update_channel_status`] while a device is bound.
pub const UPDATE_INTERVAL: Duration = Duration::from_millis(500);

/// Mode re-applied during a reconfiguration nudge when the current mode
/// cannot be read back.
const DEFAULT_MODE: &str = "mixed-signal";

const TRIGGER_CHANNEL_MAX: u8 = 7;
const TRIGGER_VOLTAGE_MIN: f64 = -10.0;
const TRIGGER_VOLTAGE_MAX: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerType {
    #[default]
    None,
    Python,
    Gpio,
    ThresholdRising,
    ThresholdFalling,
}

impl TriggerType {
    /// Wire code used by the firmware for this trigger type.
    pub fn code(self) -> u32 {
        match self {
            Self::None             => 0,
            Self::Python           => 1,
            Self::Gpio             => 2,
            Self::ThresholdRising  => 4,
            Self::ThresholdFalling => 5,
        }
    }

    pub fn is_threshold(self) -> bool {
        matches!(self, Self::ThresholdRising | Self::ThresholdFalling)
    }
}

/// Acquisition modes understood by the firmware. Normally the firmware picks
/// a mode from the enabled channel set on its own; explicit selection remains
/// available for drivers that expose the mode key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    DigitalOnly,
    MixedSignal,
    AnalogOnly,
}

impl CaptureMode {
    pub fn mode_string(self) -> &'static str {
        match self {
            Self::DigitalOnly => "digital-only",
            Self::MixedSignal => "mixed-signal",
            Self::AnalogOnly  => "analog-only",
        }
    }
}

/// Trigger settings encoded the way the firmware expects them.
///
/// For the threshold types, `mask` carries the ADC channel index and
/// `pattern` carries the IEEE 754 bit pattern of the threshold voltage as
/// a 32-bit float. For every other type both words are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerCommand {
    pub trigger_type: TriggerType,
    pub mask: u32,
    pub pattern: u32,
}

pub struct ConfigPanel {
    device: Option<DeviceRef>,
    trigger_type: TriggerType,
    trigger_channel: u8,
    trigger_voltage: f64,
    debug_enabled: bool,
    // suppresses edit-handler side effects during programmatic updates
    updating: bool,
    // last observed enabled-channel counts; -1 means "never observed"
    last_digital_enabled: i32,
    last_analog_enabled: i32,
    status: String,
    config_changed: Option<Box<dyn FnMut()>>,
}

impl ConfigPanel {
    pub fn new() -> ConfigPanel {
        ConfigPanel {
            device: None,
            trigger_type: TriggerType::None,
            trigger_channel: 0,
            trigger_voltage: 2.5,
            debug_enabled: false,
            updating: false,
            last_digital_enabled: -1,
            last_analog_enabled: -1,
            status: "None".to_owned(),
            config_changed: None,
        }
    }

    /// Registers the notification fired whenever a user edit changes the
    /// configuration.
    pub fn on_config_changed(&mut self, callback: impl FnMut() + 'static) {
        self.config_changed = Some(Box::new(callback));
    }

    pub fn set_device(&mut self, device: Option<DeviceRef>) {
        log::debug!("set_device: {}", if device.is_some() { "device bound" } else { "no device" });
        self.device = device;
        self.update_visibility();
    }

    pub fn device(&self) -> Option<&DeviceRef> {
        self.device.as_ref()
    }

    pub fn update_visibility(&mut self) {
        if self.is_jumperless_device() {
            log::debug!("Jumperless device detected, enabling configuration controls");
        }

        // apply defaults for the newly bound device without firing the edit
        // handlers back at it
        self.updating = true;
        self.set_debug_enabled(false);
        self.updating = false;

        self.update_channel_status();
    }

    /// Current channel summary, e.g. `"D:4 A:2 (A0,A1)"`, `"No Device"` or
    /// `"Error"`.
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn trigger_type(&self) -> TriggerType {
        self.trigger_type
    }

    pub fn trigger_channel(&self) -> u8 {
        self.trigger_channel
    }

    pub fn trigger_voltage(&self) -> f64 {
        self.trigger_voltage
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug_enabled
    }

    /// The channel and voltage sub-controls only apply to the two threshold
    /// trigger types.
    pub fn threshold_controls_visible(&self) -> bool {
        self.trigger_type.is_threshold()
    }

    pub fn set_trigger_type(&mut self, trigger_type: TriggerType) {
        self.trigger_type = trigger_type;
        if self.updating || self.device.is_none() {
            return;
        }
        log::debug!("trigger type changed to {:?}", trigger_type);
        self.send_trigger_command();
        self.notify_config_changed();
    }

    pub fn set_trigger_channel(&mut self, channel: u8) {
        self.trigger_channel = channel.min(TRIGGER_CHANNEL_MAX);
        if self.updating || self.device.is_none() {
            return;
        }
        log::debug!("trigger channel changed to {}", self.trigger_channel);
        self.send_trigger_command();
        self.notify_config_changed();
    }

    pub fn set_trigger_voltage(&mut self, voltage: f64) {
        self.trigger_voltage = voltage.clamp(TRIGGER_VOLTAGE_MIN, TRIGGER_VOLTAGE_MAX);
        if self.updating || self.device.is_none() {
            return;
        }
        log::debug!("trigger voltage changed to {}", self.trigger_voltage);
        self.send_trigger_command();
        self.notify_config_changed();
    }

    pub fn set_debug_enabled(&mut self, enabled: bool) {
        self.debug_enabled = enabled;
        if self.updating || self.device.is_none() {
            return;
        }
        log::debug!("debug mode changed to {}", enabled);
        self.notify_config_changed();
    }

    /// Encodes the current trigger settings.
    pub fn trigger_command(&self) -> TriggerCommand {
        let mut mask = 0;
        let mut pattern = 0;
        if self.trigger_type.is_threshold() {
            mask = self.trigger_channel as u32;
            // the firmware reinterprets the pattern word as a float, so the
            // exact bit layout must be preserved
            pattern = (self.trigger_voltage as f32).to_bits();
        }
        TriggerCommand { trigger_type: self.trigger_type, mask, pattern }
    }

    fn send_trigger_command(&self) {
        if self.device.is_none() {
            log::warn!("cannot send trigger command without a device");
            return;
        }
        let command = self.trigger_command();
        log::debug!("trigger command: type={} mask={:#x} pattern={:#x}",
            command.trigger_type.code(), command.mask, command.pattern);
        // There is no transport for this command yet; the firmware protocol
        // does not define a trigger message, so the encoded command is
        // log-only until one exists.
    }

    /// Selects an acquisition mode explicitly through the generic config key.
    pub fn send_mode_command(&mut self, mode: CaptureMode) {
        let Some(device) = self.device.clone() else {
            log::warn!("cannot send mode command without a device");
            return;
        };
        match device.borrow_mut().config_set(ConfigKey::DeviceMode, mode.mode_string()) {
            Ok(()) =>
                log::debug!("sent mode command: {}", mode.mode_string()),
            Err(error) =>
                log::warn!("failed to send mode command: {}", error),
        };
    }

    /// Re-reads the channel list of the bound device, refreshes the status
    /// summary, and on an enabled-channel-set change nudges a Jumperless
    /// device into rebuilding its frame header.
    pub fn update_channel_status(&mut self) {
        let Some(device) = self.device.clone() else {
            self.status = "No Device".to_owned();
            return;
        };

        let channels = match device.borrow().channels() {
            Ok(channels) => channels,
            Err(error) => {
                log::warn!("failed to read channel status: {}", error);
                self.status = "Error".to_owned();
                return;
            }
        };

        let mut digital_enabled = 0;
        let mut analog_enabled = 0;
        let mut analog_names = Vec::new();
        for channel in &channels {
            if !channel.enabled {
                continue;
            }
            match channel.channel_type {
                ChannelType::Logic => digital_enabled += 1,
                ChannelType::Analog => {
                    analog_enabled += 1;
                    analog_names.push(channel.name
                        .split(' ').next().unwrap_or("").to_owned());
                }
            }
        }

        let mut channels_changed = false;
        if self.last_digital_enabled != digital_enabled ||
                self.last_analog_enabled != analog_enabled {
            channels_changed = true;
            log::debug!("channel configuration changed: digital {} -> {}, analog {} -> {}",
                self.last_digital_enabled, digital_enabled,
                self.last_analog_enabled, analog_enabled);
            self.last_digital_enabled = digital_enabled;
            self.last_analog_enabled = analog_enabled;
        }

        self.status = compose_status(digital_enabled, analog_enabled, &analog_names);

        // Only the Jumperless firmware needs an explicit nudge to recompute
        // its frame header after channels are enabled or disabled.
        if channels_changed && self.is_jumperless_device() {
            log::debug!("requesting updated header after channel configuration change");
            self.request_header_update();
        }
    }

    /// Forces the device to rebuild its frame header by re-applying its
    /// current mode. The value written is unchanged; the write itself is what
    /// makes the firmware recompute. Best effort: failures are logged and
    /// ignored.
    fn request_header_update(&self) {
        let Some(device) = &self.device else {
            return;
        };

        let mode = match device.borrow().config_get(ConfigKey::DeviceMode) {
            Ok(mode) => mode,
            Err(_) => {
                log::debug!("using default {} mode for reconfiguration", DEFAULT_MODE);
                DEFAULT_MODE.to_owned()
            }
        };

        log::debug!("triggering device reconfiguration with mode {:?}", mode);
        if let Err(error) = device.borrow_mut().config_set(ConfigKey::DeviceMode, &mode) {
            log::warn!("failed to trigger device reconfiguration: {}", error);
        }
    }

    /// True when the bound device looks like a member of the Jumperless
    /// family. This is a substring match on human-readable vendor and model
    /// strings and can false-positive on unrelated devices whose model
    /// happens to contain one of the markers.
    pub fn is_jumperless_device(&self) -> bool {
        let Some(device) = &self.device else {
            return false;
        };
        let device = device.borrow();
        let vendor = device.vendor().unwrap_or_default().to_lowercase();
        let model = device.model().unwrap_or_default().to_lowercase();
        vendor.contains("jumperless") ||
            model.contains("jumperless") ||
            model.contains("mixed-signal")
    }

    fn notify_config_changed(&mut self) {
        if let Some(callback) = self.config_changed.as_mut() {
            callback();
        }
    }
}

impl Default for ConfigPanel {
    fn default() -> Self {
        Self::new()
    }
}

fn compose_status(digital: i32, analog: i32, analog_names: &[String]) -> String {
    // up to three analog channel names fit next to the counts
    let annotate = |status: String| {
        if analog <= 3 {
            format!("{} ({})", status, analog_names.join(","))
        } else {
            status
        }
    };
    if digital > 0 && analog > 0 {
        annotate(format!("D:{} A:{}", digital, analog))
    } else if digital > 0 {
        format!("D:{}", digital)
    } else if analog > 0 {
        annotate(format!("A:{}", analog))
    } else {
        "None".to_owned()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hal::{Channel, DeviceAccess};
    use crate::hal::demo::DemoDevice;

    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn jumperless_device() -> Rc<RefCell<DemoDevice>> {
        Rc::new(RefCell::new(
            DemoDevice::new("Jumperless", "Mixed-Signal Analyzer")
                .with_mode("mixed-signal")
                .with_channels(vec![
                    Channel::logic("D0", true),
                    Channel::logic("D1", true),
                    Channel::analog("A0 (probe)", true),
                    Channel::analog("A1", false),
                ])))
    }

    fn device_ref(device: &Rc<RefCell<DemoDevice>>) -> DeviceRef {
        device.clone()
    }

    fn mode_sets(device: &Rc<RefCell<DemoDevice>>) -> usize {
        device.borrow().config_sets().iter()
            .filter(|(key, _)| *key == ConfigKey::DeviceMode)
            .count()
    }

    #[test]
    fn test_compose_status() {
        let names = |names: &[&str]| -> Vec<String> {
            names.iter().map(|name| name.to_string()).collect()
        };
        assert_eq!(compose_status(0, 0, &[]), "None");
        assert_eq!(compose_status(4, 0, &[]), "D:4");
        assert_eq!(compose_status(0, 2, &names(&["A0", "A1"])), "A:2 (A0,A1)");
        assert_eq!(compose_status(3, 1, &names(&["A0"])), "D:3 A:1 (A0)");
        assert_eq!(compose_status(1, 4, &names(&["A0", "A1", "A2", "A3"])), "D:1 A:4");
    }

    #[test]
    fn test_status_without_device() {
        let mut panel = ConfigPanel::new();
        assert_eq!(panel.status(), "None");
        panel.update_channel_status();
        assert_eq!(panel.status(), "No Device");
    }

    #[test]
    fn test_status_reflects_channels() {
        let device = jumperless_device();
        let mut panel = ConfigPanel::new();
        panel.set_device(Some(device_ref(&device)));
        assert_eq!(panel.status(), "D:2 A:1 (A0)");
    }

    #[test]
    fn test_status_error_keeps_count_memo() {
        let device = jumperless_device();
        let mut panel = ConfigPanel::new();
        panel.set_device(Some(device_ref(&device)));
        let nudges = mode_sets(&device);

        device.borrow_mut().fail_channel_reads(true);
        panel.update_channel_status();
        assert_eq!(panel.status(), "Error");

        // counts were not clobbered by the failed poll, so recovery with the
        // same channel set is not a change
        device.borrow_mut().fail_channel_reads(false);
        panel.update_channel_status();
        assert_eq!(panel.status(), "D:2 A:1 (A0)");
        assert_eq!(mode_sets(&device), nudges);
    }

    #[test]
    fn test_unchanged_poll_does_not_nudge() {
        let device = jumperless_device();
        let mut panel = ConfigPanel::new();
        panel.set_device(Some(device_ref(&device)));
        // binding polls once, and the counts go from unknown to observed
        assert_eq!(mode_sets(&device), 1);

        panel.update_channel_status();
        panel.update_channel_status();
        assert_eq!(mode_sets(&device), 1);
    }

    #[test]
    fn test_channel_change_nudges_exactly_once() {
        let device = jumperless_device();
        let mut panel = ConfigPanel::new();
        panel.set_device(Some(device_ref(&device)));
        let nudges = mode_sets(&device);

        device.borrow_mut().set_channel_enabled(3, true);
        panel.update_channel_status();
        assert_eq!(panel.status(), "D:2 A:2 (A0,A1)");
        assert_eq!(mode_sets(&device), nudges + 1);

        panel.update_channel_status();
        assert_eq!(mode_sets(&device), nudges + 1);
    }

    #[test]
    fn test_nudge_reapplies_current_mode() {
        let device = jumperless_device();
        let mut panel = ConfigPanel::new();
        panel.set_device(Some(device_ref(&device)));
        let sets = device.borrow().config_sets().to_vec();
        assert_eq!(sets.last().unwrap(), &(ConfigKey::DeviceMode, "mixed-signal".to_owned()));
    }

    #[test]
    fn test_nudge_defaults_mode_when_unreadable() {
        let device = Rc::new(RefCell::new(
            DemoDevice::new("Jumperless", "Mixed-Signal Analyzer")
                .with_channels(vec![Channel::logic("D0", true)])));
        let mut panel = ConfigPanel::new();
        panel.set_device(Some(device_ref(&device)));
        assert_eq!(device.borrow().config_get(ConfigKey::DeviceMode).unwrap(),
            "mixed-signal");
    }

    #[test]
    fn test_foreign_device_is_not_nudged() {
        let device = Rc::new(RefCell::new(
            DemoDevice::new("Acme", "X1")
                .with_channels(vec![Channel::logic("D0", true)])));
        let mut panel = ConfigPanel::new();
        panel.set_device(Some(device_ref(&device)));
        assert_eq!(panel.status(), "D:1");
        assert_eq!(mode_sets(&device), 0);
    }

    #[test]
    fn test_jumperless_detection() {
        let mut panel = ConfigPanel::new();
        assert!(!panel.is_jumperless_device());

        panel.set_device(Some(DemoDevice::new("jumperless", "Analyzer").into_ref()));
        assert!(panel.is_jumperless_device());
        panel.set_device(Some(DemoDevice::new("Acme", "Mixed-Signal Scope").into_ref()));
        assert!(panel.is_jumperless_device());
        panel.set_device(Some(DemoDevice::new("Acme", "X1").into_ref()));
        assert!(!panel.is_jumperless_device());
        panel.set_device(Some(DemoDevice::blank().into_ref()));
        assert!(!panel.is_jumperless_device());
    }

    #[test]
    fn test_trigger_command_threshold_encoding() {
        let device = jumperless_device();
        let mut panel = ConfigPanel::new();
        panel.set_device(Some(device_ref(&device)));
        panel.set_trigger_type(TriggerType::ThresholdRising);
        panel.set_trigger_channel(7);
        panel.set_trigger_voltage(2.5);

        let command = panel.trigger_command();
        assert_eq!(command.mask, 7);
        assert_eq!(f32::from_bits(command.pattern), 2.5);
    }

    #[test]
    fn test_trigger_command_non_threshold_is_zero() {
        let mut panel = ConfigPanel::new();
        panel.set_trigger_channel(7);
        panel.set_trigger_voltage(2.5);
        for trigger_type in [TriggerType::None, TriggerType::Python, TriggerType::Gpio] {
            panel.set_trigger_type(trigger_type);
            let command = panel.trigger_command();
            assert_eq!((command.mask, command.pattern), (0, 0));
        }
    }

    #[test]
    fn test_trigger_parameter_clamping() {
        let mut panel = ConfigPanel::new();
        panel.set_trigger_channel(200);
        panel.set_trigger_voltage(-99.0);
        assert_eq!(panel.trigger_channel(), 7);
        assert_eq!(panel.trigger_voltage(), -10.0);
    }

    #[test]
    fn test_threshold_controls_visibility() {
        let mut panel = ConfigPanel::new();
        assert!(!panel.threshold_controls_visible());
        panel.set_trigger_type(TriggerType::ThresholdFalling);
        assert!(panel.threshold_controls_visible());
        panel.set_trigger_type(TriggerType::Gpio);
        assert!(!panel.threshold_controls_visible());
    }

    #[test]
    fn test_programmatic_defaults_do_not_notify() {
        let device = jumperless_device();
        let mut panel = ConfigPanel::new();
        let notified = Rc::new(Cell::new(0));
        let counter = notified.clone();
        panel.on_config_changed(move || counter.set(counter.get() + 1));

        // binding applies defaults under the updating guard
        panel.set_device(Some(device_ref(&device)));
        assert_eq!(notified.get(), 0);

        panel.set_trigger_voltage(1.0);
        assert_eq!(notified.get(), 1);
        panel.set_debug_enabled(true);
        assert_eq!(notified.get(), 2);
    }

    #[test]
    fn test_edits_without_device_are_inert() {
        let mut panel = ConfigPanel::new();
        let notified = Rc::new(Cell::new(0));
        let counter = notified.clone();
        panel.on_config_changed(move || counter.set(counter.get() + 1));

        panel.set_trigger_type(TriggerType::ThresholdRising);
        panel.set_trigger_voltage(1.0);
        panel.set_debug_enabled(true);
        assert_eq!(notified.get(), 0);
        // the edited values are still held for when a device is bound
        assert_eq!(panel.trigger_type(), TriggerType::ThresholdRising);
        assert!(panel.debug_enabled());
    }

    #[test]
    fn test_send_mode_command() {
        let device = Rc::new(RefCell::new(DemoDevice::new("Acme", "X1")));
        let mut panel = ConfigPanel::new();
        panel.set_device(Some(device_ref(&device)));
        panel.send_mode_command(CaptureMode::AnalogOnly);
        assert_eq!(device.borrow().config_get(ConfigKey::DeviceMode).unwrap(),
            "analog-only");
    }
}
