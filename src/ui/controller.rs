// AppController - wires user actions to background workers
//
// The controller is the target of every frontend callback: it snapshots the
// selection and settings at launch time, enforces single-flight through the
// launcher, and hands the service bodies their inputs. It owns no UI state
// itself; results flow back through the main-loop queue.

use crate::instrument::{BenchmarkRunner, InstrumentTransport, ScreenshotCapture};
use crate::models::{SelectionStore, Settings};
use crate::services::benchmark::{self, BenchmarkJob};
use crate::services::discovery::{self, DiscoveryCollector, SearchJob};
use crate::services::scpi::{self, ScpiJob};
use crate::services::screenshot::{self, ScreenshotJob};
use crate::services::script::{self, CancelToken, ScriptJob};
use crate::tasks::{LaunchError, TaskKind, TaskLauncher};
use crate::ui::event_loop::UiHandle;
use std::sync::Arc;

/// External facilities the controller dispatches work to.
pub struct Facilities {
    pub transport: Arc<dyn InstrumentTransport>,
    pub screenshot: Arc<dyn ScreenshotCapture>,
    pub benchmark: Arc<dyn BenchmarkRunner>,
}

pub struct AppController {
    ui: UiHandle,
    launcher: TaskLauncher,
    facilities: Facilities,
    settings: Settings,
    selection: SelectionStore,
    collector: Arc<DiscoveryCollector>,
    script_cancel: CancelToken,
}

impl AppController {
    pub fn new(
        ui: UiHandle,
        launcher: TaskLauncher,
        facilities: Facilities,
        settings: Settings,
        selection: SelectionStore,
    ) -> Self {
        let collector = Arc::new(DiscoveryCollector::new(ui.clone()));
        Self {
            ui,
            launcher,
            facilities,
            settings,
            selection,
            collector,
            script_cancel: CancelToken::new(),
        }
    }

    /// Handle to the main loop, for frontends that post directly.
    pub fn ui(&self) -> &UiHandle {
        &self.ui
    }

    pub fn launcher(&self) -> &TaskLauncher {
        &self.launcher
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Mark the instrument at `index` in the UI list as selected.
    pub fn select_instrument(&self, index: usize) {
        self.ui.post(move |state| state.select_instrument(index));
    }

    /// Start an instrument search.
    pub fn start_search(&self) -> Result<(), LaunchError> {
        let job = SearchJob {
            ui: self.ui.clone(),
            transport: self.facilities.transport.clone(),
            collector: self.collector.clone(),
            selection: self.selection.clone(),
            mode: self.settings.discover_mode(),
            timeout: self.settings.discover_timeout(),
        };
        self.launcher
            .spawn(TaskKind::Search, move || discovery::run_search(job))
    }

    /// Send one SCPI command to the selected instrument.
    pub fn send_command(&self, command: impl Into<String>) -> Result<(), LaunchError> {
        let job = ScpiJob {
            ui: self.ui.clone(),
            transport: self.facilities.transport.clone(),
            selection: self.selection.snapshot(),
            command: command.into(),
            settings: self.settings.clone(),
        };
        self.launcher
            .spawn(TaskKind::Send, move || scpi::run_send(job))
    }

    /// Grab a screenshot from the selected instrument.
    pub fn grab_screenshot(&self) -> Result<(), LaunchError> {
        let job = ScreenshotJob {
            ui: self.ui.clone(),
            capture: self.facilities.screenshot.clone(),
            selection: self.selection.snapshot(),
            timeout: self.settings.screenshot_timeout(),
        };
        self.launcher
            .spawn(TaskKind::Screenshot, move || screenshot::run_grab(job))
    }

    /// Run a request-throughput benchmark against the selected instrument.
    pub fn start_benchmark(&self, requests: u32) -> Result<(), LaunchError> {
        let job = BenchmarkJob {
            ui: self.ui.clone(),
            runner: self.facilities.benchmark.clone(),
            selection: self.selection.snapshot(),
            protocol: self.settings.com_protocol,
            raw_port: self.settings.raw_port,
            requests,
        };
        self.launcher
            .spawn(TaskKind::Benchmark, move || benchmark::run_benchmark(job))
    }

    /// Run a script on a worker. The previous run must have finished; the
    /// worker resets the stop flag itself at the start of the run.
    pub fn run_script(
        &self,
        source: impl Into<String>,
        chunk_name: impl Into<String>,
    ) -> Result<(), LaunchError> {
        let job = ScriptJob {
            ui: self.ui.clone(),
            selection: self.selection.snapshot(),
            source: source.into(),
            chunk_name: chunk_name.into(),
            cancel: self.script_cancel.clone(),
        };
        self.launcher.spawn(TaskKind::Script, move || {
            script::run_script(job);
        })
    }

    /// Ask the running script to stop at its next statement boundary.
    pub fn stop_script(&self) {
        self.script_cancel.request_stop();
    }
}
