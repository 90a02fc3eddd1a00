// Worker task launcher with per-kind single-flight enforcement.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// The kinds of one-shot background work a user action can start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Search,
    Send,
    Screenshot,
    Benchmark,
    Script,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Search => "search",
            Self::Send => "send",
            Self::Screenshot => "screenshot",
            Self::Benchmark => "benchmark",
            Self::Script => "script",
        };
        f.write_str(name)
    }
}

/// Launch refusals.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchError {
    #[error("a {0} task is already running")]
    Busy(TaskKind),
}

/// Spawns one detached worker per user action on the runtime's blocking
/// pool.
///
/// The launcher retains the join handle of the last task of each kind and
/// refuses to start another until it has finished, so single-flight per
/// kind holds even if a frontend forgets to disable the triggering control.
/// Completion is observable only through whatever the job itself posts to
/// the main loop; the handle is kept purely as the guard and never joined.
pub struct TaskLauncher {
    runtime: Handle,
    running: Mutex<HashMap<TaskKind, JoinHandle<()>>>,
}

impl TaskLauncher {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            running: Mutex::new(HashMap::new()),
        }
    }

    /// Start `job` as a detached worker of the given kind.
    ///
    /// Returns [`LaunchError::Busy`] while the previous same-kind task is
    /// still in flight. Tasks of different kinds run concurrently.
    pub fn spawn<F>(&self, kind: TaskKind, job: F) -> Result<(), LaunchError>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut running = self.running.lock().unwrap();
        if let Some(handle) = running.get(&kind) {
            if !handle.is_finished() {
                return Err(LaunchError::Busy(kind));
            }
        }

        tracing::debug!("spawning {kind} worker");
        let handle = self.runtime.spawn_blocking(job);
        running.insert(kind, handle);
        Ok(())
    }

    /// Whether a task of this kind is currently in flight.
    pub fn is_running(&self, kind: TaskKind) -> bool {
        self.running
            .lock()
            .unwrap()
            .get(&kind)
            .is_some_and(|handle| !handle.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    fn test_runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .build()
            .unwrap()
    }

    fn wait_until_finished(launcher: &TaskLauncher, kind: TaskKind) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while launcher.is_running(kind) {
            assert!(Instant::now() < deadline, "task never finished");
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_same_kind_spawn_refused_while_running() {
        let runtime = test_runtime();
        let launcher = TaskLauncher::new(runtime.handle().clone());
        let (release_tx, release_rx) = mpsc::channel::<()>();

        launcher
            .spawn(TaskKind::Send, move || {
                release_rx.recv().unwrap();
            })
            .unwrap();

        assert!(launcher.is_running(TaskKind::Send));
        assert_eq!(
            launcher.spawn(TaskKind::Send, || {}),
            Err(LaunchError::Busy(TaskKind::Send))
        );

        release_tx.send(()).unwrap();
        wait_until_finished(&launcher, TaskKind::Send);

        // Retired tasks may be relaunched.
        launcher.spawn(TaskKind::Send, || {}).unwrap();
        wait_until_finished(&launcher, TaskKind::Send);
    }

    #[test]
    fn test_different_kinds_run_concurrently() {
        let runtime = test_runtime();
        let launcher = TaskLauncher::new(runtime.handle().clone());
        let (release_tx, release_rx) = mpsc::channel::<()>();

        launcher
            .spawn(TaskKind::Search, move || {
                release_rx.recv().unwrap();
            })
            .unwrap();

        launcher.spawn(TaskKind::Benchmark, || {}).unwrap();

        release_tx.send(()).unwrap();
        wait_until_finished(&launcher, TaskKind::Search);
        wait_until_finished(&launcher, TaskKind::Benchmark);
    }
}
