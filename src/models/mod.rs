// Data models
//
// Plain data types shared between the main loop, the workers and the
// script bridge. Nothing here touches the queue or the task launcher.

pub mod chart;
pub mod instrument;
pub mod settings;

pub use chart::{ChartKind, ChartSpec};
pub use instrument::{InstrumentRecord, Selection, SelectionStore};
pub use settings::{ComProtocol, DiscoverMode, Settings};
