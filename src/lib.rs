// benchlab - Remote instrument workbench core
//
// This is the library crate containing the concurrency bridge between
// background workers and the main loop, the chart registry, the scripting
// engine bridge and the worker services. The binary crate (main.rs)
// provides a headless demo entry point.

pub mod charts;
pub mod config;
pub mod handoff;
pub mod instrument;
pub mod logging;
pub mod models;
pub mod services;
pub mod sim;
pub mod state;
pub mod tasks;
pub mod ui;

// Re-export commonly used types for convenience
pub use charts::{ChartError, ChartHandle, ChartRegistry};
pub use config::SettingsManager;
pub use models::{ChartKind, ChartSpec, InstrumentRecord, Selection, Settings};
pub use state::{UiEvent, UiState};
pub use tasks::{TaskKind, TaskLauncher};
pub use ui::event_loop::{MainLoop, UiHandle};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
