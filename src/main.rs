//! benchlab - Remote instrument workbench core
//!
//! Headless demo entry point. It wires the main loop, task launcher and
//! controller against the loopback simulators, then drives one session end
//! to end: discover instruments, select one, query it, benchmark it, grab a
//! screenshot and run a chart-drawing script. A real frontend would
//! subscribe to the same `UiEvent` stream and call the same controller
//! methods from its widget callbacks.
//!
//! # Execution Flow
//!
//! 1. Initialize logging -> logs/benchlab.<date>
//! 2. Create tokio runtime (workers run on its blocking pool)
//! 3. Load settings from benchlab-data/benchlab.yaml (defaults if absent)
//! 4. Build UiState + MainLoop and the AppController
//! 5. Run the demo session on a driver thread while the main thread drains
//!    the queue
//! 6. Shut the runtime down with a timeout

use anyhow::Result;
use benchlab::models::SelectionStore;
use benchlab::sim::{SimBenchmark, SimChartBackend, SimInstrument, SimScreenshot, SimTransport};
use benchlab::state::UiState;
use benchlab::tasks::{TaskKind, TaskLauncher};
use benchlab::ui::event_loop::{MainLoop, UiHandle};
use benchlab::ui::{AppController, Facilities};
use benchlab::{APP_NAME, SettingsManager, VERSION};
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEMO_SCRIPT: &str = r#"
let chart = chart_new("line", "Demo sweep", "t [s]", "V", 10.0, 5.0, 600, true);
let x = 0.0;
while x < 10.0 {
    chart_plot(chart, x, x / 2.0);
    x += 1.0;
}
print(`plotted up to x = ${x}`);
print(`instrument: ${selected_id()}`);
chart_close(chart);
"#;

fn main() -> Result<()> {
    let _guard = benchlab::logging::setup_logging("logs", false, true)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(4)
        .thread_name("benchlab-worker")
        .build()?;

    let settings = SettingsManager::new("benchlab-data")?.load()?;

    // The simulated bench: two instruments, each answering every discovery
    // probe twice the way repeated broadcast responses do in the field.
    let mut transport = SimTransport::new(vec![
        SimInstrument::new("10.0.0.42", "SIM,SCOPE-1000,1234,1.0"),
        SimInstrument::new("10.0.0.43", "SIM,PSU-200,5678,1.0"),
    ]);
    transport.responses_per_probe = 2;

    let facilities = Facilities {
        transport: Arc::new(transport),
        screenshot: Arc::new(SimScreenshot),
        benchmark: Arc::new(SimBenchmark),
    };

    let (backend, _chart_log) = SimChartBackend::new();
    let selection = SelectionStore::new();
    let state = UiState::new(Box::new(backend), selection.clone());
    let mut events = state.subscribe();
    let (main_loop, ui) = MainLoop::new(state);

    let launcher = TaskLauncher::new(runtime.handle().clone());
    let controller = AppController::new(ui.clone(), launcher, facilities, settings, selection);

    // Event mirror: a stand-in for a real frontend.
    std::thread::spawn(move || {
        while let Ok(event) = events.blocking_recv() {
            tracing::info!(?event, "ui event");
        }
    });

    // The driver plays the user; the main thread plays the GUI event loop.
    let driver_ui = ui.clone();
    let driver = std::thread::spawn(move || demo_session(&controller, &driver_ui));

    main_loop.run();

    driver.join().expect("demo driver panicked")?;

    runtime.shutdown_timeout(Duration::from_secs(5));
    tracing::info!("Application shutdown complete");
    Ok(())
}

/// Block until the given task kind has finished and everything it posted
/// has been drained by the main loop.
fn wait_for(controller: &AppController, ui: &UiHandle, kind: TaskKind) -> Result<()> {
    let deadline = Instant::now() + Duration::from_secs(10);
    while controller.launcher().is_running(kind) {
        if Instant::now() > deadline {
            anyhow::bail!("timed out waiting for {kind} task");
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    // Queue barrier: our call runs after every post the worker made.
    ui.call(|_| ())?;
    Ok(())
}

fn demo_session(controller: &AppController, ui: &UiHandle) -> Result<()> {
    controller.start_search()?;
    wait_for(controller, ui, TaskKind::Search)?;

    controller.select_instrument(0);

    controller.send_command("*IDN?")?;
    wait_for(controller, ui, TaskKind::Send)?;

    controller.start_benchmark(100)?;
    wait_for(controller, ui, TaskKind::Benchmark)?;

    controller.grab_screenshot()?;
    wait_for(controller, ui, TaskKind::Screenshot)?;

    controller.run_script(DEMO_SCRIPT, "demo.rhai")?;
    wait_for(controller, ui, TaskKind::Script)?;

    let summary = ui.call(|state| {
        format!(
            "{} instruments, {} SCPI lines, {} script lines, benchmark: {}",
            state.instruments.len(),
            state.scpi_log.len(),
            state.script_log.len(),
            state.benchmark_result.as_deref().unwrap_or("-")
        )
    })?;
    tracing::info!("demo session done: {summary}");

    ui.shutdown();
    Ok(())
}
