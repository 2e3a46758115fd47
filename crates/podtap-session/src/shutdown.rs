//! Single-shot cancellation between the termination listener and the
//! session's main flow.

use std::sync::mpsc::{self, Receiver, Sender};

/// Fires the paired [`ShutdownSignal`] at most once.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: Option<Sender<()>>,
}

impl ShutdownTrigger {
    /// Requests termination. Calls after the first are ignored.
    pub fn fire(&mut self) {
        if let Some(tx) = self.tx.take() {
            tracing::info!("termination requested");
            let _ = tx.send(());
        }
    }
}

/// The point the main flow blocks on until termination is requested.
#[derive(Debug)]
pub struct ShutdownSignal {
    rx: Receiver<()>,
}

impl ShutdownSignal {
    /// Blocks until the trigger fires or is dropped.
    ///
    /// There is no timeout.
    pub fn wait(self) {
        // A dropped trigger can never fire, so it counts as a request.
        let _ = self.rx.recv();
    }
}

/// Creates a connected trigger/signal pair.
#[must_use]
pub fn channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = mpsc::channel();
    (ShutdownTrigger { tx: Some(tx) }, ShutdownSignal { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_returns_after_fire() {
        let (mut trigger, signal) = channel();
        let handle = std::thread::spawn(move || trigger.fire());
        signal.wait();
        handle.join().unwrap();
    }

    #[test]
    fn repeated_fire_is_ignored() {
        let (mut trigger, signal) = channel();
        trigger.fire();
        trigger.fire();
        drop(trigger);
        signal.wait();
    }

    #[test]
    fn dropped_trigger_releases_waiter() {
        let (trigger, signal) = channel();
        drop(trigger);
        signal.wait();
    }
}
