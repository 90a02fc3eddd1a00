// Chart handle registry
//
// Fixed-capacity slot table owning every chart window the UI has opened.
// Handles handed to workers and scripts are (index, generation) pairs, so a
// handle kept past its slot's release is rejected even after the slot has
// been reused for a new chart. Per-slot lifecycle:
//
//   Free -> (allocate) -> Constructing -> (window opened) -> Live
//        <- (close / window destroyed, generation bumped) <-
//
// Only Live slots accept operations. The registry is owned by `UiState`;
// all mutation happens on the main-loop thread.

pub mod backend;

pub use backend::{BackendError, ChartBackend, ChartWindow};

use crate::models::{ChartKind, ChartSpec};
use camino::Utf8Path;
use std::fmt;
use thiserror::Error;

/// Number of slots in the registry; far above any realistic chart count, so
/// the linear allocation scan stays cheap in practice.
pub const CHART_CAPACITY: usize = 1024;

/// Reference to a registry slot, valid only while that slot stays live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChartHandle {
    index: u32,
    generation: u32,
}

impl ChartHandle {
    /// Pack into the integer form handed to scripts.
    pub fn to_raw(self) -> i64 {
        (i64::from(self.generation) << 32) | i64::from(self.index)
    }

    /// Recover a handle from its script-facing integer form.
    pub fn from_raw(raw: i64) -> Option<Self> {
        if raw < 0 {
            return None;
        }
        Some(Self {
            index: (raw & 0xffff_ffff) as u32,
            generation: (raw >> 32) as u32,
        })
    }
}

impl fmt::Display for ChartHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_raw())
    }
}

/// Errors reported by chart registry operations.
#[derive(Error, Debug)]
pub enum ChartError {
    #[error("chart handle {0} does not refer to a live chart")]
    InvalidHandle(i64),

    #[error("chart registry is full ({CHART_CAPACITY} slots)")]
    RegistryFull,

    #[error("chart has no CSV data")]
    NoCsvData,

    #[error("unknown chart kind")]
    UnknownKind,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Data kept for one live chart.
pub struct ChartEntry {
    pub spec: ChartSpec,
    pub window: Box<dyn ChartWindow>,
    pub last_point: Option<(f64, f64)>,
    pub last_value: Option<f64>,
}

enum SlotState {
    Free,
    Constructing,
    Live(ChartEntry),
}

struct Slot {
    generation: u32,
    state: SlotState,
}

/// Fixed-capacity table of chart slots.
pub struct ChartRegistry {
    slots: Vec<Slot>,
}

impl Default for ChartRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartRegistry {
    pub fn new() -> Self {
        Self::with_capacity(CHART_CAPACITY)
    }

    /// Registry with a non-default slot count; tests use small tables to
    /// exercise exhaustion.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || Slot {
            generation: 0,
            state: SlotState::Free,
        });
        Self { slots }
    }

    /// Allocate a slot and open the window for it.
    ///
    /// The slot passes through Constructing while the backend opens the
    /// window and is returned to Free if that fails, so a failed open
    /// leaks nothing.
    pub fn create(
        &mut self,
        spec: ChartSpec,
        backend: &mut dyn ChartBackend,
    ) -> Result<ChartHandle, ChartError> {
        if spec.kind == ChartKind::Unknown {
            return Err(ChartError::UnknownKind);
        }

        let index = self
            .slots
            .iter()
            .position(|slot| matches!(slot.state, SlotState::Free))
            .ok_or(ChartError::RegistryFull)?;

        self.slots[index].state = SlotState::Constructing;

        let window = match backend.open_window(&spec) {
            Ok(window) => window,
            Err(e) => {
                self.slots[index].state = SlotState::Free;
                return Err(e.into());
            }
        };

        let handle = ChartHandle {
            index: index as u32,
            generation: self.slots[index].generation,
        };
        self.slots[index].state = SlotState::Live(ChartEntry {
            spec,
            window,
            last_point: None,
            last_value: None,
        });

        tracing::debug!(handle = %handle, "chart window opened");
        Ok(handle)
    }

    fn slot_mut(&mut self, handle: ChartHandle) -> Result<&mut Slot, ChartError> {
        let raw = handle.to_raw();
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .ok_or(ChartError::InvalidHandle(raw))?;
        if slot.generation != handle.generation {
            return Err(ChartError::InvalidHandle(raw));
        }
        Ok(slot)
    }

    fn resolve(&mut self, handle: ChartHandle) -> Result<&mut ChartEntry, ChartError> {
        let raw = handle.to_raw();
        match &mut self.slot_mut(handle)?.state {
            SlotState::Live(entry) => Ok(entry),
            _ => Err(ChartError::InvalidHandle(raw)),
        }
    }

    pub fn plot(&mut self, handle: ChartHandle, x: f64, y: f64) -> Result<(), ChartError> {
        let entry = self.resolve(handle)?;
        entry.last_point = Some((x, y));
        entry.window.plot_point(x, y);
        Ok(())
    }

    pub fn set_value(&mut self, handle: ChartHandle, value: f64) -> Result<(), ChartError> {
        let entry = self.resolve(handle)?;
        entry.last_value = Some(value);
        entry.window.set_value(value);
        Ok(())
    }

    pub fn save_csv(&mut self, handle: ChartHandle, path: &Utf8Path) -> Result<(), ChartError> {
        let entry = self.resolve(handle)?;
        if !entry.spec.kind.has_csv_data() {
            return Err(ChartError::NoCsvData);
        }
        entry.window.save_csv(path)?;
        Ok(())
    }

    pub fn save_png(&mut self, handle: ChartHandle, path: &Utf8Path) -> Result<(), ChartError> {
        let entry = self.resolve(handle)?;
        entry.window.save_png(path)?;
        Ok(())
    }

    /// Close the window and release the slot.
    pub fn close(&mut self, handle: ChartHandle) -> Result<(), ChartError> {
        self.resolve(handle)?.window.close();
        let slot = self.slot_mut(handle)?;
        Self::release(slot);
        Ok(())
    }

    /// The rendering facility observed the window being destroyed (for
    /// example the user closed it); release the slot without another close
    /// call. Stale handles are ignored, the slot is already gone.
    pub fn on_window_destroyed(&mut self, handle: ChartHandle) {
        if let Ok(slot) = self.slot_mut(handle) {
            if matches!(slot.state, SlotState::Live(_)) {
                Self::release(slot);
            }
        }
    }

    fn release(slot: &mut Slot) {
        slot.state = SlotState::Free;
        // Invalidates every handle minted for the old occupant.
        slot.generation = slot.generation.wrapping_add(1);
    }

    pub fn is_live(&self, handle: ChartHandle) -> bool {
        self.slots
            .get(handle.index as usize)
            .is_some_and(|slot| {
                slot.generation == handle.generation && matches!(slot.state, SlotState::Live(_))
            })
    }

    pub fn live_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot.state, SlotState::Live(_)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimChartBackend;

    fn line_spec(title: &str) -> ChartSpec {
        ChartSpec::line(title, "x", "y", 10.0, 10.0, 600, false)
    }

    #[test]
    fn test_create_and_plot() {
        let (mut backend, log) = SimChartBackend::new();
        let mut registry = ChartRegistry::new();

        let handle = registry.create(line_spec("one"), &mut backend).unwrap();
        assert!(registry.is_live(handle));
        registry.plot(handle, 1.0, 2.0).unwrap();

        let window = log.last().unwrap();
        assert!(window.lock().unwrap().visible);
        assert_eq!(window.lock().unwrap().points, vec![(1.0, 2.0)]);
    }

    #[test]
    fn test_registry_full_is_reported() {
        let (mut backend, _log) = SimChartBackend::new();
        let mut registry = ChartRegistry::with_capacity(2);

        registry.create(line_spec("a"), &mut backend).unwrap();
        registry.create(line_spec("b"), &mut backend).unwrap();

        let err = registry.create(line_spec("c"), &mut backend).unwrap_err();
        assert!(matches!(err, ChartError::RegistryFull));
    }

    #[test]
    fn test_close_frees_slot_for_reuse() {
        let (mut backend, _log) = SimChartBackend::new();
        let mut registry = ChartRegistry::with_capacity(1);

        let first = registry.create(line_spec("a"), &mut backend).unwrap();
        registry.close(first).unwrap();
        assert_eq!(registry.live_count(), 0);

        let second = registry.create(line_spec("b"), &mut backend).unwrap();
        assert!(registry.is_live(second));
        assert_ne!(first, second);
    }

    #[test]
    fn test_stale_handle_rejected_after_slot_reuse() {
        let (mut backend, log) = SimChartBackend::new();
        let mut registry = ChartRegistry::with_capacity(1);

        let stale = registry.create(line_spec("old"), &mut backend).unwrap();
        registry.close(stale).unwrap();
        let fresh = registry.create(line_spec("new"), &mut backend).unwrap();

        let err = registry.plot(stale, 1.0, 1.0).unwrap_err();
        assert!(matches!(err, ChartError::InvalidHandle(_)));

        // The new occupant of the slot was not touched.
        registry.plot(fresh, 3.0, 4.0).unwrap();
        let window = log.last().unwrap();
        assert_eq!(window.lock().unwrap().points, vec![(3.0, 4.0)]);
    }

    #[test]
    fn test_operations_on_never_allocated_handle() {
        let (_backend, _log) = SimChartBackend::new();
        let mut registry = ChartRegistry::new();

        let bogus = ChartHandle::from_raw(7).unwrap();
        assert!(matches!(
            registry.plot(bogus, 0.0, 0.0),
            Err(ChartError::InvalidHandle(7))
        ));
        assert!(ChartHandle::from_raw(-1).is_none());
    }

    #[test]
    fn test_unknown_kind_refused_without_allocating() {
        let (mut backend, log) = SimChartBackend::new();
        let mut registry = ChartRegistry::with_capacity(1);

        let spec = ChartSpec {
            kind: ChartKind::Unknown,
            ..line_spec("bad")
        };
        assert!(matches!(
            registry.create(spec, &mut backend),
            Err(ChartError::UnknownKind)
        ));
        assert_eq!(log.window_count(), 0);
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_failed_open_returns_slot_to_free() {
        let (mut backend, _log) = SimChartBackend::new();
        backend.fail_open = true;
        let mut registry = ChartRegistry::with_capacity(1);

        assert!(matches!(
            registry.create(line_spec("a"), &mut backend),
            Err(ChartError::Backend(_))
        ));

        backend.fail_open = false;
        registry.create(line_spec("b"), &mut backend).unwrap();
    }

    #[test]
    fn test_save_csv_refused_for_gauges() {
        let (mut backend, _log) = SimChartBackend::new();
        let mut registry = ChartRegistry::new();

        let spec = ChartSpec::linear_gauge("Load", "%", 0.0, 100.0, 400);
        let handle = registry.create(spec, &mut backend).unwrap();

        let err = registry
            .save_csv(handle, Utf8Path::new("/tmp/never-written.csv"))
            .unwrap_err();
        assert!(matches!(err, ChartError::NoCsvData));
    }

    #[test]
    fn test_handle_raw_round_trip() {
        let handle = ChartHandle {
            index: 17,
            generation: 3,
        };
        assert_eq!(ChartHandle::from_raw(handle.to_raw()), Some(handle));
    }
}
