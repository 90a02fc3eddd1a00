// Interfaces to the external instrument facilities.
//
// The wire-level discovery/transport protocol, screenshot capture and the
// benchmark request loop are external collaborators; this module defines
// the seams the workers consume. `crate::sim` provides loopback
// implementations for the demo binary and the test suite.

use crate::models::{ComProtocol, DiscoverMode};
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the instrument facilities.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Error connecting")]
    Connect,

    #[error("Error sending")]
    Send,

    #[error("No response received")]
    Receive,

    #[error("Operation timed out")]
    Timeout,

    #[error("{0}")]
    Other(String),
}

/// Callbacks delivered during a discovery run.
///
/// May be invoked from more than one producer thread concurrently (a
/// broadcast listener and a directed-query prober can overlap, and repeated
/// responses to one broadcast all arrive); implementations must tolerate
/// interleaved calls and duplicate identifiers.
pub trait DiscoveryObserver: Send + Sync {
    /// A broadcast probe went out on a local interface.
    fn broadcast(&self, address: &str, interface: &str);

    /// An instrument answered.
    fn instrument(&self, address: &str, id: &str);
}

/// Instrument discovery and connection facility.
pub trait InstrumentTransport: Send + Sync {
    /// Run one discovery pass, blocking until the timeout elapses.
    fn discover(
        &self,
        timeout: Duration,
        mode: DiscoverMode,
        observer: &dyn DiscoveryObserver,
    ) -> Result<(), TransportError>;

    /// Open a connection to one instrument. `port` is ignored for VXI-11.
    fn connect(
        &self,
        address: &str,
        port: u16,
        timeout: Duration,
        protocol: ComProtocol,
    ) -> Result<Box<dyn Connection>, TransportError>;
}

/// One open instrument connection. Dropping the value disconnects.
pub trait Connection: Send {
    fn send(&mut self, data: &[u8], timeout: Duration) -> Result<(), TransportError>;

    fn receive(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError>;
}

/// A captured instrument screenshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenshotImage {
    pub data: Vec<u8>,
    /// Image format tag, e.g. "png" or "bmp".
    pub format: String,
    pub suggested_filename: String,
}

/// Screenshot capture facility.
pub trait ScreenshotCapture: Send + Sync {
    fn capture(&self, address: &str, timeout: Duration) -> Result<ScreenshotImage, TransportError>;
}

/// Request-throughput benchmark facility.
pub trait BenchmarkRunner: Send + Sync {
    /// Issue `requests` round-trips against the instrument, invoking
    /// `progress` with the zero-based running count after each one.
    /// Returns the measured throughput in requests per second.
    fn run(
        &self,
        address: &str,
        port: u16,
        protocol: ComProtocol,
        requests: u32,
        progress: &mut dyn FnMut(u32),
    ) -> Result<f64, TransportError>;
}
