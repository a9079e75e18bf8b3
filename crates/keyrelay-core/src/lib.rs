// Keyrelay Core Library
// Grab one input device, remap its keys, re-emit through a virtual keyboard

pub mod action;
pub mod config;
pub mod event;
pub mod input;
pub mod key;
pub mod output;
pub mod profile;
pub mod session;
pub mod shutdown;

pub use action::Action;
pub use config::{ConfigError, DeviceIdentity, RelayConfig};
pub use event::{EventLoop, EventLoopError, EventLoopResult, LoopState, LoopStats};
pub use input::{is_key_event, is_virtual_device, EventSource, InputError, InputEvent};
pub use key::Key;
pub use output::{CapabilitySet, EventSink, PressedKeyState, UInputError};
pub use profile::{ProfileError, ProfileId, RemapProfile, ACTIVE_PROFILE};
pub use session::{RunSummary, Session, SessionError, TeardownReport};
pub use shutdown::ShutdownController;

#[cfg(feature = "linux-devices")]
pub use input::SourceDevice;
#[cfg(feature = "linux-devices")]
pub use output::VirtualKeyboard;
#[cfg(feature = "linux-devices")]
pub use session::{open_devices, relay};
