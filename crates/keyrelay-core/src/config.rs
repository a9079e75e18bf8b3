// Keyrelay Runtime Configuration
// Source path, virtual device identity and loop timing

use std::path::PathBuf;
use std::time::Duration;

/// Name the virtual device registers under unless overridden
pub const DEFAULT_DEVICE_NAME: &str = "NiseFootPedal";
pub const DEFAULT_VENDOR_ID: u16 = 0xDEAD;
pub const DEFAULT_PRODUCT_ID: u16 = 0xBEEF;
pub const DEFAULT_VERSION: u16 = 1;

/// Upper bound on how long the loop waits before re-checking for shutdown
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(100);
pub const MAX_POLL_TIMEOUT: Duration = Duration::from_secs(10);

/// UINPUT_MAX_NAME_SIZE, including the trailing NUL
const UINPUT_MAX_NAME_SIZE: usize = 80;

/// Errors found while validating a configuration
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Virtual device name must not be empty")]
    EmptyDeviceName,

    #[error("Virtual device name is {0} bytes, the limit is {max}", max = UINPUT_MAX_NAME_SIZE - 1)]
    DeviceNameTooLong(usize),

    #[error("Virtual device name must not contain NUL bytes")]
    DeviceNameNul,

    #[error("Poll timeout must be between 1ms and {}ms, got {}ms", MAX_POLL_TIMEOUT.as_millis(), .0.as_millis())]
    InvalidPollTimeout(Duration),
}

/// Identity the virtual device presents to the rest of the system.
/// The bus type is always USB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub name: String,
    pub vendor_id: u16,
    pub product_id: u16,
    pub version: u16,
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self {
            name: DEFAULT_DEVICE_NAME.to_string(),
            vendor_id: DEFAULT_VENDOR_ID,
            product_id: DEFAULT_PRODUCT_ID,
            version: DEFAULT_VERSION,
        }
    }
}

impl DeviceIdentity {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::EmptyDeviceName);
        }
        if self.name.as_bytes().contains(&0) {
            return Err(ConfigError::DeviceNameNul);
        }
        if self.name.len() >= UINPUT_MAX_NAME_SIZE {
            return Err(ConfigError::DeviceNameTooLong(self.name.len()));
        }
        Ok(())
    }
}

/// Everything a relay run needs besides the profile, which is fixed at build time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Event device to grab, e.g. /dev/input/event5
    pub device_path: PathBuf,
    pub identity: DeviceIdentity,
    pub poll_timeout: Duration,
}

impl RelayConfig {
    pub fn new(device_path: impl Into<PathBuf>) -> Self {
        Self {
            device_path: device_path.into(),
            identity: DeviceIdentity::default(),
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }

    pub fn with_identity(mut self, identity: DeviceIdentity) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.identity.validate()?;
        if self.poll_timeout < Duration::from_millis(1) || self.poll_timeout > MAX_POLL_TIMEOUT {
            return Err(ConfigError::InvalidPollTimeout(self.poll_timeout));
        }
        Ok(())
    }
}
