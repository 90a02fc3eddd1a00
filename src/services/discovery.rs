//! Discovery collector and the search worker.

use crate::instrument::{DiscoveryObserver, InstrumentTransport};
use crate::models::{DiscoverMode, InstrumentRecord, SelectionStore};
use crate::tasks::TaskKind;
use crate::ui::event_loop::UiHandle;
use indexmap::IndexSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Deduplicates discovery notifications from concurrent producers and
/// appends new instruments to the UI list in first-seen order.
///
/// The mutex is held across the whole scan-decide-post span, so the
/// check-then-act is atomic: two producers reporting the same identifier at
/// the same time cannot both append it, and appends reach the queue in
/// exactly the order identifiers were first seen.
pub struct DiscoveryCollector {
    ui: UiHandle,
    seen: Mutex<IndexSet<String>>,
}

impl DiscoveryCollector {
    pub fn new(ui: UiHandle) -> Self {
        Self {
            ui,
            seen: Mutex::new(IndexSet::new()),
        }
    }

    /// Start a new search: forget previous results and clear the UI list.
    pub fn begin_search(&self) {
        let mut seen = self.seen.lock().unwrap();
        seen.clear();
        self.ui.post(|state| state.clear_instruments());
    }

    /// Record one discovery notification, appending to the UI list iff the
    /// identifier has not been seen in this search.
    pub fn notify(&self, address: &str, id: &str) {
        let mut seen = self.seen.lock().unwrap();
        if seen.insert(id.to_string()) {
            let record = InstrumentRecord {
                address: address.to_string(),
                id: id.to_string(),
            };
            self.ui.post(move |state| state.add_instrument(record));
        }
        drop(seen);
    }

    /// Identifiers seen in the current search, first-seen order.
    pub fn seen_ids(&self) -> Vec<String> {
        self.seen.lock().unwrap().iter().cloned().collect()
    }
}

impl DiscoveryObserver for DiscoveryCollector {
    fn broadcast(&self, _address: &str, interface: &str) {
        let text = format!("Broadcasting on interface {interface}");
        self.ui.post(move |state| state.show_info(text));
    }

    fn instrument(&self, address: &str, id: &str) {
        self.notify(address, id);
    }
}

/// Inputs for one search worker run.
pub struct SearchJob {
    pub ui: UiHandle,
    pub transport: Arc<dyn InstrumentTransport>,
    pub collector: Arc<DiscoveryCollector>,
    pub selection: SelectionStore,
    pub mode: DiscoverMode,
    pub timeout: Duration,
}

/// Search worker body: clear previous results, run one discovery pass,
/// report completion. The selection is dropped up front because the list it
/// pointed into is being replaced.
pub fn run_search(job: SearchJob) {
    tracing::info!(mode = ?job.mode, "instrument search started");

    job.selection.clear();
    job.collector.begin_search();

    if let Err(e) = job
        .transport
        .discover(job.timeout, job.mode, job.collector.as_ref())
    {
        tracing::warn!("discovery failed: {e}");
        let text = e.to_string();
        job.ui.post(move |state| state.show_error(text));
    }

    job.ui.post(|state| {
        state.hide_notice();
        state.task_finished(TaskKind::Search);
    });
}
