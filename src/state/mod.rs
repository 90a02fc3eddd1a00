// UI state
//
// UiState is owned by the main-loop thread and mutated only by posted
// closures. Every mutating method emits a UiEvent over a broadcast channel
// so a frontend can mirror changes without polling.

use crate::charts::{ChartBackend, ChartError, ChartHandle, ChartRegistry};
use crate::instrument::ScreenshotImage;
use crate::models::{ChartSpec, InstrumentRecord, Selection, SelectionStore};
use crate::tasks::TaskKind;
use camino::Utf8Path;
use tokio::sync::broadcast;

/// Severity of a transient notice shown in the info bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

/// Transient, dismissible notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub text: String,
}

/// One line in the SCPI console log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScpiLogLine {
    /// True for a request we sent, false for an instrument response.
    pub sent: bool,
    pub text: String,
}

/// Change events emitted when UI state is modified.
#[derive(Clone, Debug, PartialEq)]
pub enum UiEvent {
    InstrumentAdded { address: String, id: String },
    InstrumentListCleared,
    SelectionChanged { selection: Option<Selection> },
    NoticeShown { severity: Severity, text: String },
    NoticeHidden,
    ScpiLogAppended { line: String },
    ScriptLogAppended { line: String },
    ScreenshotReady { format: String, filename: String },
    BenchmarkProgress { fraction: f64 },
    BenchmarkResult { text: String },
    ChartOpened { handle: ChartHandle },
    ChartClosed { handle: ChartHandle },
    TaskFinished { kind: TaskKind },
}

/// State owned by the main-loop thread.
///
/// Everything here is mutated exclusively by closures executed on that
/// thread; workers reach it only through `UiHandle`. The selection is
/// mirrored into a [`SelectionStore`] so launching code can snapshot it
/// without a round trip through the queue.
pub struct UiState {
    pub instruments: Vec<InstrumentRecord>,
    pub selection: SelectionStore,
    pub notice: Option<Notice>,
    pub scpi_log: Vec<ScpiLogLine>,
    pub script_log: Vec<String>,
    pub screenshot: Option<ScreenshotImage>,
    pub benchmark_fraction: f64,
    pub benchmark_result: Option<String>,
    pub charts: ChartRegistry,
    backend: Box<dyn ChartBackend>,
    events: broadcast::Sender<UiEvent>,
}

impl UiState {
    pub fn new(backend: Box<dyn ChartBackend>, selection: SelectionStore) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            instruments: Vec::new(),
            selection,
            notice: None,
            scpi_log: Vec::new(),
            script_log: Vec::new(),
            screenshot: None,
            benchmark_fraction: 0.0,
            benchmark_result: None,
            charts: ChartRegistry::new(),
            backend,
            events,
        }
    }

    /// Subscribe to state change events.
    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: UiEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    // --- instrument list ---

    pub fn clear_instruments(&mut self) {
        self.instruments.clear();
        self.emit(UiEvent::InstrumentListCleared);
    }

    pub fn add_instrument(&mut self, record: InstrumentRecord) {
        self.emit(UiEvent::InstrumentAdded {
            address: record.address.clone(),
            id: record.id.clone(),
        });
        self.instruments.push(record);
    }

    /// Selection handler: record the instrument at `index` as current.
    /// An out-of-range index clears the selection.
    pub fn select_instrument(&mut self, index: usize) {
        let selection = self.instruments.get(index).map(|record| Selection {
            address: record.address.clone(),
            id: record.id.clone(),
        });
        self.selection.set(selection.clone());
        self.emit(UiEvent::SelectionChanged { selection });
    }

    // --- notices ---

    pub fn show_error(&mut self, text: impl Into<String>) {
        self.show_notice(Severity::Error, text.into());
    }

    pub fn show_info(&mut self, text: impl Into<String>) {
        self.show_notice(Severity::Info, text.into());
    }

    fn show_notice(&mut self, severity: Severity, text: String) {
        self.notice = Some(Notice {
            severity,
            text: text.clone(),
        });
        self.emit(UiEvent::NoticeShown { severity, text });
    }

    pub fn hide_notice(&mut self) {
        if self.notice.take().is_some() {
            self.emit(UiEvent::NoticeHidden);
        }
    }

    // --- logs ---

    pub fn append_scpi_log(&mut self, sent: bool, line: impl Into<String>) {
        let line = line.into();
        self.emit(UiEvent::ScpiLogAppended { line: line.clone() });
        self.scpi_log.push(ScpiLogLine { sent, text: line });
    }

    pub fn append_script_log(&mut self, line: impl Into<String>) {
        let line = line.into();
        self.emit(UiEvent::ScriptLogAppended { line: line.clone() });
        self.script_log.push(line);
    }

    // --- screenshot / benchmark ---

    pub fn set_screenshot(&mut self, image: ScreenshotImage) {
        self.emit(UiEvent::ScreenshotReady {
            format: image.format.clone(),
            filename: image.suggested_filename.clone(),
        });
        self.screenshot = Some(image);
    }

    /// Write the captured screenshot to disk. File I/O failures surface as
    /// an error notice, not a console line.
    pub fn save_screenshot(&mut self, path: &Utf8Path) {
        let Some(image) = &self.screenshot else {
            self.show_error("No screenshot to save");
            return;
        };
        match std::fs::write(path, &image.data) {
            Ok(()) => tracing::info!("screenshot saved to {path}"),
            Err(e) => self.show_error(format!("Failed to save {path}: {e}")),
        }
    }

    pub fn reset_benchmark(&mut self) {
        self.benchmark_fraction = 0.0;
        self.benchmark_result = None;
        self.emit(UiEvent::BenchmarkProgress { fraction: 0.0 });
    }

    pub fn set_benchmark_fraction(&mut self, fraction: f64) {
        self.benchmark_fraction = fraction;
        self.emit(UiEvent::BenchmarkProgress { fraction });
    }

    pub fn set_benchmark_result(&mut self, text: String) {
        self.benchmark_result = Some(text.clone());
        self.emit(UiEvent::BenchmarkResult { text });
    }

    // --- charts ---

    /// Open a chart window and register it; the handle is valid once this
    /// returns, which a worker observes through the handoff.
    pub fn create_chart(&mut self, spec: ChartSpec) -> Result<ChartHandle, ChartError> {
        let handle = self.charts.create(spec, self.backend.as_mut())?;
        self.emit(UiEvent::ChartOpened { handle });
        Ok(handle)
    }

    /// Close a chart window and release its slot.
    pub fn close_chart(&mut self, handle: ChartHandle) -> Result<(), ChartError> {
        self.charts.close(handle)?;
        self.emit(UiEvent::ChartClosed { handle });
        Ok(())
    }

    /// Worker completion item; frontends re-enable the triggering control.
    pub fn task_finished(&mut self, kind: TaskKind) {
        tracing::debug!("{kind} worker finished");
        self.emit(UiEvent::TaskFinished { kind });
    }
}
