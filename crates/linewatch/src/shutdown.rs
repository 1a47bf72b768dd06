//! Cooperative shutdown: a shared stop flag every worker loop polls, set by
//! end-of-stream, the operator, or a termination signal.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use tracing::{info, warn};

#[derive(Clone, Default)]
pub struct Shutdown {
    stop: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every worker to finish its current iteration and exit.
    pub fn trigger(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Sleep for `duration`, waking early when shutdown is triggered.
    /// Returns false when the sleep was cut short.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_triggered() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(Duration::from_millis(100)));
        }
    }

    /// Route SIGINT/SIGTERM to the stop flag. The handler does nothing
    /// else; workers observe the flag on their next iteration.
    pub fn install_signal_handler(&self) {
        let stop = self.clone();
        if let Err(err) = ctrlc::set_handler(move || {
            info!("termination signal received");
            stop.trigger();
        }) {
            warn!("failed to install termination signal handler: {err}");
        }
    }
}
