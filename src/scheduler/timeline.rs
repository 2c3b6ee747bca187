use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::scheduler::job::JobState;

/// Something that happened to a job while the scheduler was running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimelineEvent {
    TurnStarted {
        job: String,
        at_ms: u64,
        remaining: u64,
    },
    TurnEnded {
        job: String,
        at_ms: u64,
        consumed: u64,
        remaining: u64,
    },
    Completed {
        job: String,
        at_ms: u64,
    },
    StateChanged {
        job: String,
        at_ms: u64,
        state: JobState,
    },
}

impl TimelineEvent {
    pub fn job(&self) -> &str {
        match self {
            TimelineEvent::TurnStarted { job, .. }
            | TimelineEvent::TurnEnded { job, .. }
            | TimelineEvent::Completed { job, .. }
            | TimelineEvent::StateChanged { job, .. } => job,
        }
    }

    pub fn at_ms(&self) -> u64 {
        match self {
            TimelineEvent::TurnStarted { at_ms, .. }
            | TimelineEvent::TurnEnded { at_ms, .. }
            | TimelineEvent::Completed { at_ms, .. }
            | TimelineEvent::StateChanged { at_ms, .. } => *at_ms,
        }
    }
}

/// Append-only event log shared by all scheduling loops of one run.
///
/// Turn events are recorded while the gate is held, so their order is the
/// order in which jobs actually ran.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    events: Arc<Mutex<Vec<TimelineEvent>>>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: TimelineEvent) {
        tracing::trace!(?event, "timeline");
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }

    pub fn events(&self) -> Vec<TimelineEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Jobs in the order they completed.
    pub fn completion_order(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                TimelineEvent::Completed { job, .. } => Some(job),
                _ => None,
            })
            .collect()
    }

    /// States `job` passed through, in order.
    pub fn states(&self, job: &str) -> Vec<JobState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                TimelineEvent::StateChanged { job: j, state, .. } if j == job => Some(state),
                _ => None,
            })
            .collect()
    }

    /// Check that turns never overlap: every `TurnStarted` is followed by the
    /// matching `TurnEnded` of the same job before any other turn starts.
    /// Returns the first offending event on failure.
    pub fn check_mutual_exclusion(&self) -> Result<(), TimelineEvent> {
        let mut running: Option<(String, u64)> = None;
        for event in self.events() {
            match &event {
                TimelineEvent::TurnStarted { job, at_ms, .. } => {
                    if running.is_some() {
                        return Err(event);
                    }
                    running = Some((job.clone(), *at_ms));
                }
                TimelineEvent::TurnEnded { job, at_ms, .. } => match &running {
                    Some((current, started)) if current == job && started <= at_ms => {
                        running = None;
                    }
                    _ => return Err(event),
                },
                TimelineEvent::Completed { .. } | TimelineEvent::StateChanged { .. } => {}
            }
        }
        match running {
            Some((job, at_ms)) => Err(TimelineEvent::TurnStarted {
                job,
                at_ms,
                remaining: 0,
            }),
            None => Ok(()),
        }
    }
}
