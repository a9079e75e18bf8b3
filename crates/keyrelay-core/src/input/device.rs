// Keyrelay Input Layer - Source Device
// Opening, grabbing and reading the physical event device

#[cfg(feature = "linux-devices")]
use std::io;
#[cfg(feature = "linux-devices")]
use std::mem::MaybeUninit;
#[cfg(feature = "linux-devices")]
use std::os::unix::io::AsRawFd;
#[cfg(feature = "linux-devices")]
use std::path::{Path, PathBuf};
#[cfg(feature = "linux-devices")]
use std::time::Duration;

#[cfg(feature = "linux-devices")]
use evdev::Device;

#[cfg(feature = "linux-devices")]
use super::{EventSource, InputError, InputEvent, Readiness, INPUT_EVENT_SIZE};
#[cfg(feature = "linux-devices")]
use crate::Key;

/// Check if a source device is the virtual device this process creates.
///
/// Reading from it would feed our own output back into the loop.
pub fn is_virtual_device(name: &str, virtual_name: &str) -> bool {
    name == virtual_name
}

/// The physical event device, opened for the lifetime of a relay run.
///
/// The grab is released on drop, so every exit path (early return, panic
/// unwinding, fatal loop error) hands the keyboard back to the system.
#[cfg(feature = "linux-devices")]
pub struct SourceDevice {
    device: Device,
    path: PathBuf,
    grabbed: bool,
}

#[cfg(feature = "linux-devices")]
impl SourceDevice {
    /// Open an event device such as /dev/input/event5
    pub fn open(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let path = path.as_ref();
        let device = Device::open(path).map_err(|source| InputError::Open {
            path: path.display().to_string(),
            source,
        })?;

        log::info!(
            "Opened input device {} ({})",
            path.display(),
            device.name().unwrap_or("Unknown")
        );

        Ok(Self {
            device,
            path: path.to_path_buf(),
            grabbed: false,
        })
    }

    pub fn name(&self) -> &str {
        self.device.name().unwrap_or("Unknown")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_grabbed(&self) -> bool {
        self.grabbed
    }

    /// Key codes the device advertises (empty if it reports none)
    pub fn supported_keys(&self) -> Vec<Key> {
        self.device
            .supported_keys()
            .map(|keys| keys.iter().map(|key| Key(key.code())).collect())
            .unwrap_or_default()
    }
}

#[cfg(feature = "linux-devices")]
impl EventSource for SourceDevice {
    fn acquire_grab(&mut self) -> Result<(), InputError> {
        self.device.grab().map_err(InputError::Grab)?;
        self.grabbed = true;
        log::info!("Grabbed {}", self.path.display());
        Ok(())
    }

    fn wait_readable(&mut self, timeout: Duration) -> Result<Readiness, InputError> {
        let mut poll_fd = libc::pollfd {
            fd: self.device.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as i32;

        let poll_result = unsafe { libc::poll(&mut poll_fd, 1, timeout_ms) };

        if poll_result < 0 {
            let err = io::Error::last_os_error();
            // EINTR just means a signal was delivered; the caller re-checks
            // the termination flag.
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(Readiness::Interrupted);
            }
            return Err(InputError::Wait(err));
        }

        if poll_result == 0 {
            return Ok(Readiness::TimedOut);
        }

        // A removed evdev node reports HUP/ERR and every read fails with ENODEV
        if poll_fd.revents & (libc::POLLHUP | libc::POLLERR | libc::POLLNVAL) != 0 {
            return Err(InputError::Disconnected);
        }

        if poll_fd.revents & libc::POLLIN != 0 {
            Ok(Readiness::Ready)
        } else {
            Ok(Readiness::TimedOut)
        }
    }

    fn read_event(&mut self) -> Result<InputEvent, InputError> {
        let mut raw = MaybeUninit::<libc::input_event>::uninit();

        let read = unsafe {
            libc::read(
                self.device.as_raw_fd(),
                raw.as_mut_ptr() as *mut libc::c_void,
                INPUT_EVENT_SIZE,
            )
        };

        if read < 0 {
            return Err(InputError::Read(io::Error::last_os_error()));
        }
        if read as usize != INPUT_EVENT_SIZE {
            return Err(InputError::ShortRead {
                got: read as usize,
                expected: INPUT_EVENT_SIZE,
            });
        }

        // The kernel filled the whole record
        let raw = unsafe { raw.assume_init() };
        Ok(InputEvent::from_raw(&raw))
    }

    fn release_grab(&mut self) -> Result<(), InputError> {
        if !self.grabbed {
            return Ok(());
        }
        self.grabbed = false;
        self.device.ungrab().map_err(InputError::Release)?;
        log::info!("Released grab on {}", self.path.display());
        Ok(())
    }
}

#[cfg(feature = "linux-devices")]
impl Drop for SourceDevice {
    fn drop(&mut self) {
        if let Err(e) = self.release_grab() {
            log::warn!("{}", e);
        }
    }
}
