// Main-loop task queue - delivers work items to the thread owning UiState
//
// Workers never touch UiState directly: they post FnOnce closures here and
// the owning thread executes them one at a time, run-to-completion, in the
// order each sender submitted them. No ordering is promised between items
// from different senders. This is the single concurrency bridge between the
// worker pool and UI-owned state.

use crate::handoff::{self, Disconnected};
use crate::state::UiState;
use tokio::sync::mpsc;

type UiTask = Box<dyn FnOnce(&mut UiState) + Send>;

enum Envelope {
    Task(UiTask),
    Shutdown,
}

/// Sender half: post closures to the main loop from any thread.
#[derive(Clone)]
pub struct UiHandle {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl UiHandle {
    /// Enqueue `task` to run on the main-loop thread.
    ///
    /// Returns immediately; there is no completion notification and no
    /// backpressure, so a producer that outruns the loop grows the queue
    /// without bound. After shutdown the task is silently dropped.
    pub fn post<F>(&self, task: F)
    where
        F: FnOnce(&mut UiState) + Send + 'static,
    {
        if self.tx.send(Envelope::Task(Box::new(task))).is_err() {
            tracing::debug!("main loop has shut down; dropping posted task");
        }
    }

    /// Post `task` and block until the main loop has executed it, then
    /// return its result.
    ///
    /// This is the synchronous handoff: when it returns `Ok`, the UI-side
    /// effect is fully committed and visible. Never call this from the
    /// main-loop thread itself; the loop cannot run the task while blocked
    /// here.
    pub fn call<F, T>(&self, task: F) -> Result<T, Disconnected>
    where
        F: FnOnce(&mut UiState) -> T + Send + 'static,
        T: Send + 'static,
    {
        let (done, waiter) = handoff::rendezvous();
        self.post(move |state| done.complete(task(state)));
        waiter.wait()
    }

    /// Ask the loop to exit after draining everything posted before this.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Envelope::Shutdown);
    }
}

/// The main loop: owns [`UiState`] and drains the queue.
pub struct MainLoop {
    rx: mpsc::UnboundedReceiver<Envelope>,
    state: UiState,
}

impl MainLoop {
    /// Wrap `state` in a loop and hand back the cloneable posting handle.
    pub fn new(state: UiState) -> (Self, UiHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx, state }, UiHandle { tx })
    }

    /// Run until shutdown is requested or every handle is dropped.
    ///
    /// Each task runs to completion before the next is dequeued; no two
    /// tasks ever execute concurrently.
    pub fn run(mut self) {
        while let Some(envelope) = self.rx.blocking_recv() {
            match envelope {
                Envelope::Task(task) => task(&mut self.state),
                Envelope::Shutdown => break,
            }
        }
        tracing::debug!("main loop finished");
    }
}
