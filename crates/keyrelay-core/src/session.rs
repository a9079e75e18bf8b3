// Keyrelay Session
// Ordered acquisition, loop run and reverse-order teardown of both devices

use std::fmt;

use crate::config::ConfigError;
use crate::event::{EventLoop, EventLoopError, LoopStats};
use crate::input::{EventSource, InputError};
use crate::output::{EventSink, UInputError};

/// Errors that end a relay session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Output(#[from] UInputError),

    #[error(transparent)]
    Loop(#[from] EventLoopError),

    #[error("Session already torn down")]
    Closed,
}

/// What teardown managed to do.
///
/// Release failures are recorded here and logged; they never replace the
/// outcome of the run itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub grab_released: bool,
    pub keys_released: usize,
    pub device_destroyed: bool,
    pub warnings: Vec<String>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    fn warn(&mut self, message: String) {
        log::warn!("{}", message);
        self.warnings.push(message);
    }
}

impl fmt::Display for TeardownReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "grab released: {}, held keys released: {}, device destroyed: {}",
            self.grab_released, self.keys_released, self.device_destroyed
        )?;
        if !self.warnings.is_empty() {
            write!(f, " ({} warning(s))", self.warnings.len())?;
        }
        Ok(())
    }
}

/// Outcome of a session that shut down cleanly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub stats: LoopStats,
    pub teardown: TeardownReport,
}

/// One relay run over an opened source and a created sink.
///
/// The session owns both devices. Teardown runs exactly once: explicitly at
/// the end of [`Session::run`], or from `Drop` on any other exit path.
pub struct Session<'p, S: EventSource, O: EventSink> {
    source: Option<S>,
    sink: Option<O>,
    event_loop: EventLoop<'p>,
}

impl<'p, S: EventSource, O: EventSink> Session<'p, S, O> {
    pub fn new(source: S, sink: O, event_loop: EventLoop<'p>) -> Self {
        Self {
            source: Some(source),
            sink: Some(sink),
            event_loop,
        }
    }

    pub fn event_loop(&self) -> &EventLoop<'p> {
        &self.event_loop
    }

    pub fn is_closed(&self) -> bool {
        self.source.is_none() && self.sink.is_none()
    }

    /// Grab the source, relay until termination or a fatal error, tear down.
    ///
    /// Teardown happens on every path out of here, including a failed grab.
    pub fn run(&mut self) -> Result<RunSummary, SessionError> {
        let (Some(source), Some(sink)) = (self.source.as_mut(), self.sink.as_mut()) else {
            return Err(SessionError::Closed);
        };

        if let Err(e) = source.acquire_grab() {
            self.teardown();
            return Err(e.into());
        }

        let result = self.event_loop.run(source, sink);
        let teardown = self.teardown();

        match result {
            Ok(stats) => {
                log::info!("Relay stopped: {}", stats);
                Ok(RunSummary { stats, teardown })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Release the grab, lift held keys, destroy the virtual device and
    /// close both handles.
    ///
    /// Every step runs even if an earlier one failed. A second call finds
    /// nothing left to release and returns an empty report.
    pub fn teardown(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();

        if let Some(mut source) = self.source.take() {
            match source.release_grab() {
                Ok(()) => report.grab_released = true,
                Err(e) => report.warn(e.to_string()),
            }
        }

        if let Some(mut sink) = self.sink.take() {
            match self.event_loop.release_held(&mut sink) {
                Ok(count) => report.keys_released = count,
                Err(e) => report.warn(format!("Failed to release held keys: {}", e)),
            }
            match sink.destroy() {
                Ok(()) => report.device_destroyed = true,
                Err(e) => report.warn(e.to_string()),
            }
        }

        self.event_loop.finish();
        report
    }
}

impl<S: EventSource, O: EventSink> Drop for Session<'_, S, O> {
    fn drop(&mut self) {
        if !self.is_closed() {
            log::debug!("Session dropped before teardown");
            self.teardown();
        }
    }
}

#[cfg(feature = "linux-devices")]
mod devices {
    use super::*;
    use crate::config::RelayConfig;
    use crate::input::{is_virtual_device, SourceDevice};
    use crate::output::{CapabilitySet, VirtualKeyboard};
    use crate::profile::RemapProfile;
    use crate::shutdown::ShutdownController;

    /// Open the source and create a virtual keyboard that can emit everything
    /// the loop will forward from it.
    ///
    /// If creation fails the source is dropped before any grab was taken.
    pub fn open_devices(
        config: &RelayConfig,
        profile: &RemapProfile,
    ) -> Result<(SourceDevice, VirtualKeyboard), SessionError> {
        config.validate()?;

        let source = SourceDevice::open(&config.device_path)?;
        if is_virtual_device(source.name(), &config.identity.name) {
            return Err(InputError::OwnVirtualDevice(source.name().to_string()).into());
        }

        let source_keys = source.supported_keys();
        log::debug!("Source advertises {} keys", source_keys.len());

        // derive covers every key the loop can forward from these source keys;
        // create rejects an empty set
        let capabilities = CapabilitySet::derive(profile, &source_keys);

        let sink = VirtualKeyboard::create(&config.identity, &capabilities)?;
        Ok((source, sink))
    }

    /// Open both devices and relay until `shutdown` is requested
    pub fn relay(
        config: &RelayConfig,
        profile: &RemapProfile,
        shutdown: ShutdownController,
    ) -> Result<RunSummary, SessionError> {
        let (source, sink) = open_devices(config, profile)?;
        let event_loop = EventLoop::new(profile, shutdown, config.poll_timeout);
        Session::new(source, sink, event_loop).run()
    }
}

#[cfg(feature = "linux-devices")]
pub use devices::{open_devices, relay};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputEvent, Readiness};
    use crate::profile::{ProfileId, RemapProfile};
    use crate::shutdown::ShutdownController;
    use std::time::Duration;

    struct IdleSource {
        grab_fails: bool,
        release_fails: bool,
    }

    impl EventSource for IdleSource {
        fn acquire_grab(&mut self) -> Result<(), InputError> {
            if self.grab_fails {
                return Err(InputError::Grab(std::io::Error::from_raw_os_error(libc::EBUSY)));
            }
            Ok(())
        }

        fn wait_readable(&mut self, _timeout: Duration) -> Result<Readiness, InputError> {
            Ok(Readiness::TimedOut)
        }

        fn read_event(&mut self) -> Result<InputEvent, InputError> {
            Err(InputError::ShortRead { got: 0, expected: 24 })
        }

        fn release_grab(&mut self) -> Result<(), InputError> {
            if self.release_fails {
                return Err(InputError::Release(std::io::Error::from_raw_os_error(libc::ENODEV)));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct NullSink {
        destroy_fails: bool,
    }

    impl EventSink for NullSink {
        fn emit(&mut self, _event: &InputEvent) -> Result<(), UInputError> {
            Ok(())
        }

        fn destroy(&mut self) -> Result<(), UInputError> {
            if self.destroy_fails {
                return Err(UInputError::Destroy(std::io::Error::from_raw_os_error(libc::ENODEV)));
            }
            Ok(())
        }
    }

    fn session_with(
        source: IdleSource,
        sink: NullSink,
        shutdown: &ShutdownController,
    ) -> Session<'static, IdleSource, NullSink> {
        let profile = RemapProfile::builtin(ProfileId::EightBitdoZero2);
        let event_loop = EventLoop::new(profile, shutdown.clone(), Duration::from_millis(1));
        Session::new(source, sink, event_loop)
    }

    fn session(source: IdleSource, shutdown: &ShutdownController) -> Session<'static, IdleSource, NullSink> {
        session_with(source, NullSink::default(), shutdown)
    }

    #[test]
    fn test_run_after_shutdown_request() {
        let shutdown = ShutdownController::new();
        shutdown.request();
        let mut session = session(
            IdleSource {
                grab_fails: false,
                release_fails: false,
            },
            &shutdown,
        );

        let summary = session.run().unwrap();
        assert_eq!(summary.stats, LoopStats::default());
        assert!(summary.teardown.grab_released);
        assert!(summary.teardown.device_destroyed);
        assert!(summary.teardown.is_clean());
        assert!(session.is_closed());
        assert_eq!(session.event_loop().state(), crate::event::LoopState::Stopped);
    }

    #[test]
    fn test_second_run_is_closed() {
        let shutdown = ShutdownController::new();
        shutdown.request();
        let mut session = session(
            IdleSource {
                grab_fails: false,
                release_fails: false,
            },
            &shutdown,
        );

        session.run().unwrap();
        assert!(matches!(session.run(), Err(SessionError::Closed)));
    }

    #[test]
    fn test_grab_failure_still_tears_down() {
        let shutdown = ShutdownController::new();
        let mut session = session(
            IdleSource {
                grab_fails: true,
                release_fails: false,
            },
            &shutdown,
        );

        let err = session.run().unwrap_err();
        assert!(matches!(err, SessionError::Input(InputError::Grab(_))));
        assert!(session.is_closed());
    }

    #[test]
    fn test_release_failure_is_reported_not_fatal() {
        let shutdown = ShutdownController::new();
        shutdown.request();
        let mut session = session(
            IdleSource {
                grab_fails: false,
                release_fails: true,
            },
            &shutdown,
        );

        let summary = session.run().unwrap();
        assert!(!summary.teardown.grab_released);
        assert!(summary.teardown.device_destroyed);
        assert_eq!(summary.teardown.warnings.len(), 1);
    }

    #[test]
    fn test_destroy_failure_is_reported_not_fatal() {
        let shutdown = ShutdownController::new();
        shutdown.request();
        let mut session = session_with(
            IdleSource {
                grab_fails: false,
                release_fails: false,
            },
            NullSink { destroy_fails: true },
            &shutdown,
        );

        let summary = session.run().unwrap();
        assert!(summary.teardown.grab_released);
        assert!(!summary.teardown.device_destroyed);
        assert_eq!(
            summary.teardown.warnings,
            vec!["Failed to destroy virtual device: No such device (os error 19)".to_string()]
        );
        assert!(session.is_closed());
    }

    #[test]
    fn test_teardown_twice_is_empty() {
        let shutdown = ShutdownController::new();
        let mut session = session(
            IdleSource {
                grab_fails: false,
                release_fails: false,
            },
            &shutdown,
        );

        let first = session.teardown();
        assert!(first.grab_released && first.device_destroyed);
        assert_eq!(session.teardown(), TeardownReport::default());
    }

    #[test]
    fn test_report_display() {
        let report = TeardownReport {
            grab_released: true,
            keys_released: 2,
            device_destroyed: true,
            warnings: vec!["x".to_string()],
        };
        assert_eq!(
            report.to_string(),
            "grab released: true, held keys released: 2, device destroyed: true (1 warning(s))"
        );
    }

    #[test]
    fn test_error_messages() {
        let err = SessionError::from(InputError::Disconnected);
        assert_eq!(err.to_string(), "Input device disconnected");

        let err = SessionError::from(EventLoopError::from(UInputError::WriteError(
            "Broken pipe".to_string(),
        )));
        assert_eq!(err.to_string(), "Output device error: Failed to write event: Broken pipe");
    }
}
