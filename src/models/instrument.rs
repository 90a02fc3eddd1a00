use std::sync::{Arc, RwLock};

/// A discovered instrument as shown in the UI instrument list.
///
/// Uniqueness in the list is keyed by `id`; the discovery collector
/// guarantees each identifier appears at most once, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentRecord {
    /// Network address the instrument answered from
    pub address: String,
    /// Identification string reported by the instrument
    pub id: String,
}

/// The most recently user-selected instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub address: String,
    pub id: String,
}

/// Shared holder for the current selection.
///
/// Written only by the selection handler running on the main loop. Worker
/// tasks take a [`snapshot`](Self::snapshot) once at launch and use it for
/// their whole run, so a selection change never races an in-flight worker.
#[derive(Debug, Clone, Default)]
pub struct SelectionStore {
    inner: Arc<RwLock<Option<Selection>>>,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current selection.
    pub fn set(&self, selection: Option<Selection>) {
        *self.inner.write().unwrap() = selection;
    }

    /// Clone the current selection.
    pub fn snapshot(&self) -> Option<Selection> {
        self.inner.read().unwrap().clone()
    }

    /// Drop the selection; a new search invalidates the list it pointed into.
    pub fn clear(&self) {
        self.set(None);
    }
}
