//! Shared harness for integration tests: the full application core wired to
//! the loopback simulators, with the main loop running on its own thread.

use benchlab::instrument::InstrumentTransport;
use benchlab::models::{Selection, SelectionStore, Settings};
use benchlab::sim::{SimBenchmark, SimChartBackend, SimChartLog, SimInstrument, SimScreenshot, SimTransport};
use benchlab::state::{UiEvent, UiState};
use benchlab::tasks::{TaskKind, TaskLauncher};
use benchlab::ui::event_loop::{MainLoop, UiHandle};
use benchlab::ui::{AppController, Facilities};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

pub struct TestApp {
    pub controller: AppController,
    pub ui: UiHandle,
    pub chart_log: SimChartLog,
    pub selection: SelectionStore,
    _runtime: tokio::runtime::Runtime,
    loop_thread: Option<std::thread::JoinHandle<()>>,
}

#[allow(dead_code)]
impl TestApp {
    pub fn new() -> Self {
        Self::with_transport(Arc::new(SimTransport::new(default_roster())))
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self::build(Arc::new(SimTransport::new(default_roster())), settings)
    }

    pub fn with_transport(transport: Arc<dyn InstrumentTransport>) -> Self {
        Self::build(transport, Settings::default())
    }

    pub fn build(transport: Arc<dyn InstrumentTransport>, settings: Settings) -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .worker_threads(2)
            .build()
            .expect("runtime");

        let (backend, chart_log) = SimChartBackend::new();
        let selection = SelectionStore::new();
        let state = UiState::new(Box::new(backend), selection.clone());
        let (main_loop, ui) = MainLoop::new(state);
        let loop_thread = std::thread::spawn(move || main_loop.run());

        let launcher = TaskLauncher::new(runtime.handle().clone());
        let facilities = Facilities {
            transport,
            screenshot: Arc::new(SimScreenshot),
            benchmark: Arc::new(SimBenchmark),
        };
        let controller = AppController::new(ui.clone(), launcher, facilities, settings, selection.clone());

        Self {
            controller,
            ui,
            chart_log,
            selection,
            _runtime: runtime,
            loop_thread: Some(loop_thread),
        }
    }

    /// Put a selection in place without going through a search.
    pub fn select(&self, address: &str, id: &str) {
        self.selection.set(Some(Selection {
            address: address.to_string(),
            id: id.to_string(),
        }));
    }

    /// Block until the given task kind has finished and every item it
    /// posted has been executed by the main loop.
    pub fn wait_for(&self, kind: TaskKind) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.controller.launcher().is_running(kind) {
            assert!(
                Instant::now() < deadline,
                "timed out waiting for {kind} task"
            );
            std::thread::sleep(Duration::from_millis(2));
        }
        self.barrier();
    }

    /// Queue barrier: returns after everything posted so far has run.
    pub fn barrier(&self) {
        self.ui.call(|_| ()).expect("main loop gone");
    }

    /// Read a snapshot out of UI state.
    pub fn snapshot<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&UiState) -> T + Send + 'static,
        T: Send + 'static,
    {
        self.ui.call(move |state| f(state)).expect("main loop gone")
    }

    pub fn script_log(&self) -> Vec<String> {
        self.snapshot(|state| state.script_log.clone())
    }

    pub fn instrument_ids(&self) -> Vec<String> {
        self.snapshot(|state| state.instruments.iter().map(|r| r.id.clone()).collect())
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.ui.shutdown();
        if let Some(handle) = self.loop_thread.take() {
            let _ = handle.join();
        }
    }
}

pub fn default_roster() -> Vec<SimInstrument> {
    vec![
        SimInstrument::new("10.0.0.1", "SIM,ALPHA,0001,1.0"),
        SimInstrument::new("10.0.0.2", "SIM,BETA,0002,1.0"),
    ]
}

/// Drain currently buffered events matching a filter into a vector.
#[allow(dead_code)]
pub fn drain_events(rx: &mut broadcast::Receiver<UiEvent>) -> Vec<UiEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
