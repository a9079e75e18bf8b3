// Keyrelay Output Layer
// Virtual device declaration, emission and teardown

mod capabilities;
mod state;

#[cfg(feature = "linux-devices")]
mod uinput;

pub use capabilities::CapabilitySet;
pub use state::PressedKeyState;

#[cfg(feature = "linux-devices")]
pub use uinput::VirtualKeyboard;

use crate::input::InputEvent;
use crate::Key;

/// Error types for uinput operations
#[derive(Debug, thiserror::Error)]
pub enum UInputError {
    #[error("Failed to create virtual device: {0}")]
    DeviceCreation(String),

    #[error("Virtual device declares no key capabilities")]
    NoCapabilities,

    #[error("Virtual device does not declare keys the profile can emit: {}", format_keys(.0))]
    UndeclaredKeys(Vec<Key>),

    #[error("Failed to write event: {0}")]
    WriteError(String),

    #[error("Failed to destroy virtual device: {0}")]
    Destroy(#[source] std::io::Error),

    #[error("Device not initialized")]
    NotInitialized,
}

fn format_keys(keys: &[Key]) -> String {
    keys.iter()
        .map(|key| key.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Destination of forwarded events.
///
/// Implemented by the uinput keyboard and by in-memory doubles in tests.
pub trait EventSink {
    /// Write one event to the device
    fn emit(&mut self, event: &InputEvent) -> Result<(), UInputError>;

    /// Remove the device. Calling it again, or on a device that was never
    /// created, is a no-op.
    fn destroy(&mut self) -> Result<(), UInputError>;
}
