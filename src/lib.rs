mod hal;
mod device;
mod panel;

#[derive(Debug)]
pub enum Error {
    Unsupported,
    Disconnected,
    Driver(Box<dyn std::error::Error + Sync + Send + 'static>),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Unsupported =>
                write!(f, "attribute or configuration key not supported"),
            Self::Disconnected =>
                write!(f, "device not connected"),
            Self::Driver(error) =>
                write!(f, "driver error: {}", error),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Driver(error) => Some(error.as_ref()),
            _ => None
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::Driver(error.into())
    }
}

pub type Result<T> =
    core::result::Result<T, Error>;

pub use hal::{
    ConfigKey,
    ChannelType,
    Channel,
    DeviceAccess,
    DeviceRef,
    Session,
};

pub use hal::demo::DemoDevice;

pub use device::HardwareDevice;

pub use panel::{
    TriggerType,
    CaptureMode,
    TriggerCommand,
    ConfigPanel,
    UPDATE_INTERVAL,
};
