use std::sync::{Arc, Mutex};

use crate::scheduler::IndicatorId;

/// Side-effect sink toggled around each turn (an LED on the reference board).
/// Fire-and-forget: the scheduler never looks at the outcome.
pub trait Indicator: Send + Sync {
    fn activate(&self, id: IndicatorId);
    fn deactivate(&self, id: IndicatorId);
}

/// An indicator that stays lit until the guard is dropped, including when the
/// turn that lit it unwinds.
#[must_use = "dropping the guard turns the indicator off immediately"]
pub struct LitIndicator {
    sink: Arc<dyn Indicator>,
    id: IndicatorId,
}

impl LitIndicator {
    pub fn on(sink: Arc<dyn Indicator>, id: IndicatorId) -> Self {
        sink.activate(id);
        Self { sink, id }
    }

    pub fn off(self) {
        drop(self);
    }
}

impl Drop for LitIndicator {
    fn drop(&mut self) {
        self.sink.deactivate(self.id);
    }
}

/// Logs indicator changes instead of driving hardware.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogIndicator;

impl Indicator for LogIndicator {
    fn activate(&self, id: IndicatorId) {
        tracing::debug!(indicator = %id, "Indicator on");
    }

    fn deactivate(&self, id: IndicatorId) {
        tracing::debug!(indicator = %id, "Indicator off");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorChange {
    On(IndicatorId),
    Off(IndicatorId),
}

/// Records every change, for inspecting a run afterwards.
#[derive(Debug, Clone, Default)]
pub struct RecordingIndicator {
    changes: Arc<Mutex<Vec<IndicatorChange>>>,
}

impl RecordingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, change: IndicatorChange) {
        match self.changes.lock() {
            Ok(mut changes) => changes.push(change),
            Err(poisoned) => poisoned.into_inner().push(change),
        }
    }

    pub fn changes(&self) -> Vec<IndicatorChange> {
        match self.changes.lock() {
            Ok(changes) => changes.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Largest number of indicators lit at the same time.
    pub fn max_lit(&self) -> usize {
        let mut lit = 0usize;
        let mut max = 0usize;
        for change in self.changes() {
            match change {
                IndicatorChange::On(_) => {
                    lit += 1;
                    max = max.max(lit);
                }
                IndicatorChange::Off(_) => lit = lit.saturating_sub(1),
            }
        }
        max
    }
}

impl Indicator for RecordingIndicator {
    fn activate(&self, id: IndicatorId) {
        self.push(IndicatorChange::On(id));
    }

    fn deactivate(&self, id: IndicatorId) {
        self.push(IndicatorChange::Off(id));
    }
}
