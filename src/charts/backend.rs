// Seam to the chart rendering facility.
//
// The registry owns windows only through these traits; how a window is
// drawn, decorated or torn down belongs to the frontend. `crate::sim`
// provides the loopback implementation used by tests and the demo binary.

use crate::models::ChartSpec;
use camino::Utf8Path;
use thiserror::Error;

/// Error surfaced by a chart backend operation.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open chart window: {0}")]
    Open(String),

    #[error("failed to save chart: {0}")]
    Save(#[from] std::io::Error),
}

/// One open chart window, owned by the main loop through the registry.
pub trait ChartWindow: Send {
    /// Append a point to a line/scatter series.
    fn plot_point(&mut self, x: f64, y: f64);

    /// Set the displayed value of a number/gauge chart.
    fn set_value(&mut self, value: f64);

    /// Write the plotted series as CSV. Returns only once the file is on
    /// storage.
    fn save_csv(&mut self, path: &Utf8Path) -> Result<(), BackendError>;

    /// Render the chart to a PNG file. Returns only once the file is on
    /// storage.
    fn save_png(&mut self, path: &Utf8Path) -> Result<(), BackendError>;

    /// Close the window.
    fn close(&mut self);

    /// Whether the window is currently constructed and shown.
    fn is_visible(&self) -> bool;
}

/// Factory for chart windows; implemented by the rendering facility.
pub trait ChartBackend: Send {
    fn open_window(&mut self, spec: &ChartSpec) -> Result<Box<dyn ChartWindow>, BackendError>;
}
