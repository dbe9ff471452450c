//! Process-wide shutdown latch observed by the acceptor, every connection
//! worker, and the periodic timestamp emitter.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::info;

/// A one-shot, process-wide flag. Starts `true` (running); a signal
/// handler flips it to `false` exactly once.
#[derive(Clone)]
pub struct ShutdownLatch {
    running: Arc<AtomicBool>,
}

impl Default for ShutdownLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownLatch {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Registers a SIGINT/SIGTERM handler that clears the latch. Signal
    /// delivery does only this: no non-trivial work happens in the signal
    /// context itself.
    pub fn install_signal_handler(&self) -> anyhow::Result<()> {
        let flag = Arc::clone(&self.running);
        ctrlc::set_handler(move || {
            info!("shutdown signal received");
            flag.store(false, Ordering::SeqCst);
        })?;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_running_and_stops_once() {
        let latch = ShutdownLatch::new();
        assert!(latch.is_running());
        latch.stop();
        assert!(!latch.is_running());
    }

    #[test]
    fn handle_shares_state_with_latch() {
        let latch = ShutdownLatch::new();
        let handle = latch.handle();
        handle.store(false, Ordering::SeqCst);
        assert!(!latch.is_running());
    }
}
