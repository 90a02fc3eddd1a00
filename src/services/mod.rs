//! Worker service bodies.
//!
//! Each submodule is the body of one background task kind: instrument
//! search, SCPI send/receive, screenshot grab, throughput benchmark and
//! script execution. The bodies are framework-free: they take their inputs
//! as a job struct snapshotted at launch, reach UI-owned state only through
//! posted closures, and always post their completion item, so they run the
//! same under the demo binary, a real frontend, or the test suite.

pub mod benchmark;
pub mod discovery;
pub mod scpi;
pub mod screenshot;
pub mod script;

pub use benchmark::BenchmarkJob;
pub use discovery::{DiscoveryCollector, SearchJob};
pub use scpi::ScpiJob;
pub use screenshot::ScreenshotJob;
pub use script::{CancelToken, ScriptJob, ScriptOutcome};
