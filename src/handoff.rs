// Single-use completion signal backing the synchronous handoff protocol.
//
// A worker that needs a main-loop side effect fully committed before it can
// proceed posts a closure that finishes by completing one end of a
// rendezvous pair, then blocks on the other end until the main loop has run
// the closure. `UiHandle::call` packages that whole sequence; this module
// only provides the signal.
//
// Each pair is consumed by value, so "producer signals once, exactly one
// consumer waits" is enforced by the type system rather than by lock/unlock
// discipline spread across two call sites.

use thiserror::Error;
use tokio::sync::oneshot;

/// The main loop went away without running the posted closure, so the
/// completion side was dropped unfired.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("main loop dropped the posted task before completing it")]
pub struct Disconnected;

/// Producer half of a rendezvous; completed exactly once, by value.
pub struct Completion<T>(oneshot::Sender<T>);

/// Consumer half of a rendezvous; blocks the calling worker until the
/// producer fires.
pub struct Rendezvous<T>(oneshot::Receiver<T>);

/// Create a connected completion/rendezvous pair.
pub fn rendezvous<T>() -> (Completion<T>, Rendezvous<T>) {
    let (tx, rx) = oneshot::channel();
    (Completion(tx), Rendezvous(rx))
}

impl<T> Completion<T> {
    /// Publish the result and wake the waiting worker.
    ///
    /// If the waiter has already gone away the value is dropped; the
    /// UI-side effect it described has still been committed by this point.
    pub fn complete(self, value: T) {
        let _ = self.0.send(value);
    }
}

impl<T> Rendezvous<T> {
    /// Block until the paired [`Completion`] fires.
    ///
    /// Must not be called from the main-loop thread: the completion can
    /// only fire from a queued item, which would never get to run.
    pub fn wait(self) -> Result<T, Disconnected> {
        self.0.blocking_recv().map_err(|_| Disconnected)
    }
}
