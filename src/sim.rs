// Loopback implementations of the instrument facilities.
//
// These back the demo binary and the test suite: a transport that answers
// discovery from a fixed roster (optionally repeating each response, the
// way broadcast replies arrive in the field), connections with a handful of
// canned SCPI queries, and a chart backend that records its windows and
// writes real files on save.

use crate::charts::{BackendError, ChartBackend, ChartWindow};
use crate::instrument::{
    BenchmarkRunner, Connection, DiscoveryObserver, InstrumentTransport, ScreenshotCapture,
    ScreenshotImage, TransportError,
};
use crate::models::{ChartSpec, ComProtocol, DiscoverMode};
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt::Write as _;
use std::fs;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// One simulated instrument on the bench.
#[derive(Debug, Clone)]
pub struct SimInstrument {
    pub address: String,
    pub id: String,
}

impl SimInstrument {
    pub fn new(address: &str, id: &str) -> Self {
        Self {
            address: address.to_string(),
            id: id.to_string(),
        }
    }
}

/// Simulated discovery and connection transport.
pub struct SimTransport {
    instruments: Vec<SimInstrument>,
    /// How many times each instrument answers one discovery probe.
    pub responses_per_probe: usize,
    /// Force every connect attempt to fail.
    pub fail_connect: bool,
}

impl SimTransport {
    pub fn new(instruments: Vec<SimInstrument>) -> Self {
        Self {
            instruments,
            responses_per_probe: 1,
            fail_connect: false,
        }
    }
}

impl InstrumentTransport for SimTransport {
    fn discover(
        &self,
        _timeout: Duration,
        mode: DiscoverMode,
        observer: &dyn DiscoveryObserver,
    ) -> Result<(), TransportError> {
        if mode == DiscoverMode::Vxi11Broadcast {
            observer.broadcast("255.255.255.255", "sim0");
        }
        for instrument in &self.instruments {
            for _ in 0..self.responses_per_probe {
                observer.instrument(&instrument.address, &instrument.id);
            }
        }
        Ok(())
    }

    fn connect(
        &self,
        address: &str,
        _port: u16,
        _timeout: Duration,
        _protocol: ComProtocol,
    ) -> Result<Box<dyn Connection>, TransportError> {
        if self.fail_connect {
            return Err(TransportError::Connect);
        }
        let instrument = self
            .instruments
            .iter()
            .find(|i| i.address == address)
            .ok_or(TransportError::Connect)?;
        Ok(Box::new(SimConnection {
            id: instrument.id.clone(),
            pending: None,
        }))
    }
}

/// Connection to a simulated instrument with a few canned SCPI queries.
pub struct SimConnection {
    id: String,
    pending: Option<Vec<u8>>,
}

impl Connection for SimConnection {
    fn send(&mut self, data: &[u8], _timeout: Duration) -> Result<(), TransportError> {
        let command = String::from_utf8_lossy(data).trim().to_string();
        self.pending = match command.as_str() {
            "*IDN?" => Some(self.id.clone().into_bytes()),
            "*OPC?" => Some(b"1".to_vec()),
            c if c.ends_with('?') => Some(b"0".to_vec()),
            _ => None,
        };
        Ok(())
    }

    fn receive(&mut self, _timeout: Duration) -> Result<Vec<u8>, TransportError> {
        self.pending.take().ok_or(TransportError::Receive)
    }
}

/// Screenshot source returning a fixed image blob.
pub struct SimScreenshot;

impl ScreenshotCapture for SimScreenshot {
    fn capture(
        &self,
        address: &str,
        _timeout: Duration,
    ) -> Result<ScreenshotImage, TransportError> {
        Ok(ScreenshotImage {
            data: vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a],
            format: "png".to_string(),
            suggested_filename: format!("{address}-screenshot.png"),
        })
    }
}

/// Benchmark loop that answers instantly.
pub struct SimBenchmark;

impl BenchmarkRunner for SimBenchmark {
    fn run(
        &self,
        _address: &str,
        _port: u16,
        _protocol: ComProtocol,
        requests: u32,
        progress: &mut dyn FnMut(u32),
    ) -> Result<f64, TransportError> {
        let start = Instant::now();
        for count in 0..requests {
            progress(count);
        }
        let elapsed = start.elapsed().as_secs_f64().max(1e-6);
        Ok(f64::from(requests) / elapsed)
    }
}

/// Observable state of one simulated chart window.
#[derive(Debug, Default)]
pub struct SimWindowData {
    pub title: String,
    pub points: Vec<(f64, f64)>,
    pub value: Option<f64>,
    pub visible: bool,
    pub saved_files: Vec<Utf8PathBuf>,
}

pub type SharedWindow = Arc<Mutex<SimWindowData>>;

/// Shared view of the windows a [`SimChartBackend`] has opened; lets a test
/// observe window state from outside the main loop.
#[derive(Clone, Default)]
pub struct SimChartLog {
    windows: Arc<Mutex<Vec<SharedWindow>>>,
}

impl SimChartLog {
    pub fn window_count(&self) -> usize {
        self.windows.lock().unwrap().len()
    }

    pub fn window(&self, index: usize) -> Option<SharedWindow> {
        self.windows.lock().unwrap().get(index).cloned()
    }

    pub fn last(&self) -> Option<SharedWindow> {
        self.windows.lock().unwrap().last().cloned()
    }
}

/// Chart backend recording every window it opens.
///
/// `save_csv` writes the plotted points as `x,y` lines; `save_png` writes a
/// small binary blob. Both produce non-empty files so save paths can be
/// verified on storage.
pub struct SimChartBackend {
    log: SimChartLog,
    /// Force every open attempt to fail.
    pub fail_open: bool,
}

impl SimChartBackend {
    pub fn new() -> (Self, SimChartLog) {
        let log = SimChartLog::default();
        (
            Self {
                log: log.clone(),
                fail_open: false,
            },
            log,
        )
    }
}

impl ChartBackend for SimChartBackend {
    fn open_window(&mut self, spec: &ChartSpec) -> Result<Box<dyn ChartWindow>, BackendError> {
        if self.fail_open {
            return Err(BackendError::Open("simulated open failure".to_string()));
        }
        let state = Arc::new(Mutex::new(SimWindowData {
            title: spec.title.clone(),
            visible: true,
            ..SimWindowData::default()
        }));
        self.log.windows.lock().unwrap().push(state.clone());
        Ok(Box::new(SimChartWindow { state }))
    }
}

struct SimChartWindow {
    state: SharedWindow,
}

impl ChartWindow for SimChartWindow {
    fn plot_point(&mut self, x: f64, y: f64) {
        self.state.lock().unwrap().points.push((x, y));
    }

    fn set_value(&mut self, value: f64) {
        self.state.lock().unwrap().value = Some(value);
    }

    fn save_csv(&mut self, path: &Utf8Path) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        let mut csv = String::from("x,y\n");
        for (x, y) in &state.points {
            let _ = writeln!(csv, "{x},{y}");
        }
        fs::write(path, csv)?;
        state.saved_files.push(path.to_path_buf());
        Ok(())
    }

    fn save_png(&mut self, path: &Utf8Path) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        let mut blob = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
        blob.extend_from_slice(state.title.as_bytes());
        fs::write(path, blob)?;
        state.saved_files.push(path.to_path_buf());
        Ok(())
    }

    fn close(&mut self) {
        self.state.lock().unwrap().visible = false;
    }

    fn is_visible(&self) -> bool {
        self.state.lock().unwrap().visible
    }
}
