// Keyrelay uinput Output Layer
// Virtual keyboard creation, event emission and destroy

use std::io;
use std::os::unix::io::{AsRawFd, RawFd};

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, BusType, InputId};

use super::{CapabilitySet, EventSink, UInputError};
use crate::config::DeviceIdentity;
use crate::input::{InputEvent, INPUT_EVENT_SIZE};
use crate::Key;

/// `_IO('U', 2)`
const UI_DEV_DESTROY: u64 = 0x5502;

/// Write one `struct input_event` exactly as given.
///
/// No SYN_REPORT is added; frame boundaries are whatever the caller writes.
fn write_record(fd: RawFd, event: &InputEvent) -> io::Result<()> {
    let raw = event.to_raw();
    let written = unsafe {
        libc::write(
            fd,
            &raw as *const libc::input_event as *const libc::c_void,
            INPUT_EVENT_SIZE,
        )
    };

    if written < 0 {
        return Err(io::Error::last_os_error());
    }
    if written as usize != INPUT_EVENT_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::WriteZero,
            format!("short write: {} of {} bytes", written, INPUT_EVENT_SIZE),
        ));
    }
    Ok(())
}

fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Virtual uinput keyboard that forwarded events are written to
pub struct VirtualKeyboard {
    device: Option<VirtualDevice>,
    capabilities: CapabilitySet,
    name: String,
}

impl VirtualKeyboard {
    /// Declare `capabilities` and create the device node.
    ///
    /// Fails with `NoCapabilities` when nothing was declared, and with
    /// `DeviceCreation` when /dev/uinput cannot be opened (missing module,
    /// permissions) or the kernel rejects the device.
    pub fn create(
        identity: &DeviceIdentity,
        capabilities: &CapabilitySet,
    ) -> Result<Self, UInputError> {
        if capabilities.is_empty() {
            return Err(UInputError::NoCapabilities);
        }

        // EV_KEY is implied by with_keys
        let mut keys = AttributeSet::<evdev::Key>::new();
        for key in capabilities.iter() {
            keys.insert(evdev::Key::new(key.code()));
        }

        let device = VirtualDeviceBuilder::new()
            .map_err(|e: io::Error| UInputError::DeviceCreation(e.to_string()))?
            .name(&identity.name)
            .input_id(InputId::new(
                BusType::BUS_USB,
                identity.vendor_id,
                identity.product_id,
                identity.version,
            ))
            .with_keys(&keys)
            .map_err(|e: io::Error| UInputError::DeviceCreation(e.to_string()))?
            .build()
            .map_err(|e: io::Error| UInputError::DeviceCreation(e.to_string()))?;

        // evdev opens /dev/uinput blocking; writes must never stall the loop
        set_nonblocking(device.as_raw_fd())
            .map_err(|e| UInputError::DeviceCreation(e.to_string()))?;

        log::info!(
            "Created virtual device '{}' ({:04x}:{:04x}) declaring {} keys",
            identity.name,
            identity.vendor_id,
            identity.product_id,
            capabilities.len()
        );

        Ok(Self {
            device: Some(device),
            capabilities: capabilities.clone(),
            name: identity.name.clone(),
        })
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub fn is_created(&self) -> bool {
        self.device.is_some()
    }
}

impl EventSink for VirtualKeyboard {
    fn emit(&mut self, event: &InputEvent) -> Result<(), UInputError> {
        let device = self.device.as_ref().ok_or(UInputError::NotInitialized)?;

        if event.is_key() && !self.capabilities.contains(Key(event.code)) {
            // Only reachable if the source emits a key it never advertised
            log::warn!("Forwarding undeclared key {}; the kernel will drop it", Key(event.code));
        }

        write_record(device.as_raw_fd(), event)
            .map_err(|e| UInputError::WriteError(e.to_string()))
    }

    fn destroy(&mut self) -> Result<(), UInputError> {
        let Some(device) = self.device.take() else {
            return Ok(());
        };

        let result = unsafe { libc::ioctl(device.as_raw_fd(), UI_DEV_DESTROY as _) };
        let failure = (result < 0).then(io::Error::last_os_error);
        // The fd is closed whether or not the ioctl succeeded
        drop(device);

        match failure {
            Some(e) => Err(UInputError::Destroy(e)),
            None => {
                log::info!("Destroyed virtual device '{}'", self.name);
                Ok(())
            }
        }
    }
}

impl Drop for VirtualKeyboard {
    fn drop(&mut self) {
        if let Err(e) = self.destroy() {
            log::warn!("{}", e);
        }
    }
}
