// Keyrelay Shutdown Control
// Termination flag shared between the signal path and the event loop

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Owns the termination flag.
///
/// The signal path only ever sets it and the event loop only ever reads it,
/// so a single atomic boolean is all the synchronisation needed. Clones share
/// the same flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownController {
    requested: Arc<AtomicBool>,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to stop at its next flag check
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Route SIGTERM and SIGINT to the termination flag.
    ///
    /// The handlers only store into the atomic; no thread is spawned.
    #[cfg(feature = "linux-devices")]
    pub fn install_signal_handlers(&self) -> std::io::Result<()> {
        use signal_hook::consts::{SIGINT, SIGTERM};

        for signal in [SIGTERM, SIGINT] {
            signal_hook::flag::register(signal, Arc::clone(&self.requested))?;
        }
        log::debug!("Installed SIGTERM/SIGINT handlers");
        Ok(())
    }
}
