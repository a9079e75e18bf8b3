// Keyrelay Input Layer
// Source device access, exclusive grab and event records

mod device;
mod event;

pub use device::is_virtual_device;
#[cfg(feature = "linux-devices")]
pub use device::SourceDevice;
pub use event::{
    is_key_event, EventTime, InputEvent, EV_KEY, EV_SYN, INPUT_EVENT_SIZE, SYN_REPORT,
};

use std::io;
use std::time::Duration;

/// Errors raised by the source device
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Failed to open input device {path}: {source}")]
    Open { path: String, source: io::Error },

    #[error("Refusing to read from our own virtual device '{0}'")]
    OwnVirtualDevice(String),

    #[error("Failed to grab input device (is another process holding it?): {0}")]
    Grab(#[source] io::Error),

    #[error("Failed to release input device grab: {0}")]
    Release(#[source] io::Error),

    #[error("Failed waiting for input: {0}")]
    Wait(#[source] io::Error),

    #[error("Input device disconnected")]
    Disconnected,

    #[error("Failed to read event: {0}")]
    Read(#[source] io::Error),

    #[error("Short read from input device: got {got} of {expected} bytes")]
    ShortRead { got: usize, expected: usize },
}

impl InputError {
    /// Whether the failure only costs the current tick
    pub fn is_transient(&self) -> bool {
        matches!(self, InputError::Read(_) | InputError::ShortRead { .. })
    }
}

/// Outcome of a bounded wait on the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// An event can be read without blocking
    Ready,
    /// The timeout elapsed with nothing to read
    TimedOut,
    /// A signal arrived during the wait
    Interrupted,
}

/// Where events come from.
///
/// Implemented by the grabbed evdev device and by in-memory doubles in tests.
pub trait EventSource {
    /// Take exclusive ownership of the device's events
    fn acquire_grab(&mut self) -> Result<(), InputError>;

    /// Wait up to `timeout` for an event to become readable
    fn wait_readable(&mut self, timeout: Duration) -> Result<Readiness, InputError>;

    /// Read exactly one event
    fn read_event(&mut self) -> Result<InputEvent, InputError>;

    /// Give the grab back. Calling it when no grab is held is a no-op.
    fn release_grab(&mut self) -> Result<(), InputError>;
}
