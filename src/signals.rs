// Process shutdown signals
// Interactive and run modes block for a while; SIGINT/SIGTERM/SIGHUP are
// latched into a flag their loops poll between ticks, so an interrupted
// invocation still gets to stop the player and clean up its marker.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ShutdownSignals {
    raised: Arc<AtomicBool>,
}

impl ShutdownSignals {
    /// Install the handlers. Registration is process-global and permanent;
    /// call once near startup.
    #[cfg(unix)]
    pub fn register() -> io::Result<Self> {
        use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};

        let raised = Arc::new(AtomicBool::new(false));
        for signal in [SIGINT, SIGTERM, SIGHUP] {
            signal_hook::flag::register(signal, Arc::clone(&raised))?;
        }
        Ok(Self { raised })
    }

    #[cfg(not(unix))]
    pub fn register() -> io::Result<Self> {
        Ok(Self {
            raised: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Whether a shutdown signal has arrived since registration.
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Relaxed)
    }

    /// A handle with no handlers behind it, for exercising the loops that
    /// poll one.
    #[cfg(test)]
    pub(crate) fn inert() -> Self {
        Self {
            raised: Arc::new(AtomicBool::new(false)),
        }
    }
}
