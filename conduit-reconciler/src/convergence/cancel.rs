//! Cooperative cancellation for state waits

use std::time::Duration;
use tokio::sync::watch;

/// Create a cancellation pair; sending `true` cancels every clone of the
/// receiving side
pub fn cancellation() -> (watch::Sender<bool>, Cancellation) {
    let (tx, rx) = watch::channel(false);
    (tx, Cancellation { rx })
}

/// Receiving side of a cancellation signal
#[derive(Debug, Clone)]
pub struct Cancellation {
    rx: watch::Receiver<bool>,
}

impl Cancellation {
    /// A signal that is never raised
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Sleep for `delay`, waking early if the signal is raised
    pub(crate) async fn sleep(&mut self, delay: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            Ok(()) = self.rx.changed() => {}
        }
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::never()
    }
}
