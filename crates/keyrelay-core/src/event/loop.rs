// Keyrelay Event Loop
// Wait, read one event, remap keys, forward, re-check the termination flag

use std::fmt;
use std::time::Duration;

use crate::input::{EventSource, InputError, InputEvent, Readiness};
use crate::output::{EventSink, PressedKeyState, UInputError};
use crate::profile::RemapProfile;
use crate::shutdown::ShutdownController;
use crate::Action;

/// Result type for event loop operations
pub type EventLoopResult<T> = Result<T, EventLoopError>;

/// Errors that end the loop
#[derive(Debug, thiserror::Error)]
pub enum EventLoopError {
    #[error("Input device error: {0}")]
    Input(#[from] InputError),

    #[error("Output device error: {0}")]
    Output(#[from] UInputError),
}

/// Loop lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting for and forwarding events
    Running,
    /// Termination observed (or a fatal error hit); teardown pending
    Draining,
    /// Grab released and virtual device destroyed
    Stopped,
}

/// What one iteration did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Nothing to read within the timeout, or the wait was interrupted
    Idle,
    /// The read failed; nothing was forwarded this tick
    Skipped,
    /// The event was forwarded (after remapping, for key events)
    Forwarded(InputEvent),
}

/// Counters reported at shutdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub forwarded: u64,
    pub remapped: u64,
    pub skipped_reads: u64,
    pub idle_ticks: u64,
}

impl fmt::Display for LoopStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} forwarded ({} remapped), {} skipped reads, {} idle ticks",
            self.forwarded, self.remapped, self.skipped_reads, self.idle_ticks
        )
    }
}

/// Single-threaded capture -> remap -> inject loop.
///
/// The only blocking point is the bounded wait on the source, so a
/// termination request is honoured within one `poll_timeout`.
pub struct EventLoop<'p> {
    profile: &'p RemapProfile,
    shutdown: ShutdownController,
    poll_timeout: Duration,
    state: LoopState,
    stats: LoopStats,
    held: PressedKeyState,
}

impl<'p> EventLoop<'p> {
    pub fn new(profile: &'p RemapProfile, shutdown: ShutdownController, poll_timeout: Duration) -> Self {
        Self {
            profile,
            shutdown,
            poll_timeout,
            state: LoopState::Running,
            stats: LoopStats::default(),
            held: PressedKeyState::new(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn profile(&self) -> &RemapProfile {
        self.profile
    }

    /// Keys pressed on the output side and not yet released
    pub fn held_keys(&self) -> &PressedKeyState {
        &self.held
    }

    /// Apply the profile: key events get their code mapped, everything
    /// else is returned untouched.
    pub fn translate(&self, event: InputEvent) -> InputEvent {
        if event.is_key() {
            event.with_code(self.profile.map(event.code))
        } else {
            event
        }
    }

    /// Run one iteration: bounded wait, read one event, forward it.
    pub fn tick<S, O>(&mut self, source: &mut S, sink: &mut O) -> EventLoopResult<Tick>
    where
        S: EventSource + ?Sized,
        O: EventSink + ?Sized,
    {
        match source.wait_readable(self.poll_timeout)? {
            Readiness::TimedOut | Readiness::Interrupted => {
                self.stats.idle_ticks += 1;
                return Ok(Tick::Idle);
            }
            Readiness::Ready => {}
        }

        let event = match source.read_event() {
            Ok(event) => event,
            Err(e) if e.is_transient() => {
                log::debug!("Skipping tick: {}", e);
                self.stats.skipped_reads += 1;
                return Ok(Tick::Skipped);
            }
            Err(e) => return Err(e.into()),
        };

        let out = self.translate(event);
        sink.emit(&out)?;

        self.stats.forwarded += 1;
        if out.code != event.code {
            self.stats.remapped += 1;
            log::trace!("{} -> {}", event, out);
        } else {
            log::trace!("{}", out);
        }
        self.track(&out);

        Ok(Tick::Forwarded(out))
    }

    /// Loop until termination is requested or a fatal error occurs.
    ///
    /// Either way the loop ends in `Draining`; the caller tears down the
    /// devices and then calls [`EventLoop::finish`].
    pub fn run<S, O>(&mut self, source: &mut S, sink: &mut O) -> EventLoopResult<LoopStats>
    where
        S: EventSource + ?Sized,
        O: EventSink + ?Sized,
    {
        log::info!(
            "Relaying with profile '{}' ({} entries)",
            self.profile.name(),
            self.profile.len()
        );

        while self.state == LoopState::Running {
            if self.shutdown.is_requested() {
                log::info!("Termination requested, draining");
                self.state = LoopState::Draining;
                break;
            }

            if let Err(e) = self.tick(source, sink) {
                log::error!("Event loop stopped: {}", e);
                self.state = LoopState::Draining;
                return Err(e);
            }
        }

        Ok(self.stats)
    }

    /// Emit a release for every key still held on the output side.
    ///
    /// Returns how many keys were released.
    pub fn release_held<O>(&mut self, sink: &mut O) -> Result<usize, UInputError>
    where
        O: EventSink + ?Sized,
    {
        let keys = self.held.take_all();
        if keys.is_empty() {
            return Ok(0);
        }

        for key in &keys {
            sink.emit(&InputEvent::key(*key, Action::Release))?;
        }
        sink.emit(&InputEvent::syn_report())?;
        log::debug!("Released {} held key(s)", keys.len());
        Ok(keys.len())
    }

    /// Mark the loop stopped once the devices are gone
    pub fn finish(&mut self) {
        self.state = LoopState::Stopped;
    }

    fn track(&mut self, event: &InputEvent) {
        if let (Some(key), Some(action)) = (event.key_code(), event.action()) {
            self.held.apply(key, action);
        }
    }
}
