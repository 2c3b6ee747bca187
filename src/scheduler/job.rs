use serde::Serialize;

use crate::error::{Result, SchedError};

/// Opaque handle to an external indicator (an LED pin on the reference board).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct IndicatorId(pub u32);

impl std::fmt::Display for IndicatorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobState {
    Pending,
    Waiting,
    Running,
    Yielded,
    Completed,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Pending => write!(f, "pending"),
            JobState::Waiting => write!(f, "waiting"),
            JobState::Running => write!(f, "running"),
            JobState::Yielded => write!(f, "yielded"),
            JobState::Completed => write!(f, "completed"),
        }
    }
}

/// Immutable description of one unit of schedulable work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    identity: String,
    total_runtime: u64,
    indicator: IndicatorId,
}

impl JobSpec {
    /// Build a descriptor. Empty identities and zero runtimes are rejected
    /// here so nothing invalid ever reaches a scheduling loop.
    pub fn new(
        identity: impl Into<String>,
        total_runtime: u64,
        indicator: IndicatorId,
    ) -> Result<Self> {
        let identity = identity.into();
        if identity.trim().is_empty() {
            return Err(SchedError::EmptyIdentity);
        }
        if total_runtime == 0 {
            return Err(SchedError::InvalidRuntime { identity });
        }
        Ok(Self {
            identity,
            total_runtime,
            indicator,
        })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn total_runtime(&self) -> u64 {
        self.total_runtime
    }

    pub fn indicator(&self) -> IndicatorId {
        self.indicator
    }
}

/// Mutable bookkeeping for one job. Owned by that job's scheduling loop and
/// only advanced while the loop holds the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobProgress {
    remaining: u64,
    completed: bool,
    turns: Vec<u64>,
}

impl JobProgress {
    pub fn new(spec: &JobSpec) -> Self {
        Self {
            remaining: spec.total_runtime(),
            completed: false,
            turns: Vec::new(),
        }
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn turns(&self) -> &[u64] {
        &self.turns
    }

    /// Record a turn that consumed `amount`. Never underflows.
    pub fn consume(&mut self, amount: u64) {
        debug_assert!(amount <= self.remaining, "turn longer than remaining work");
        let amount = amount.min(self.remaining);
        self.remaining -= amount;
        self.turns.push(amount);
    }

    /// Flag the job as done. Returns false if it was already flagged or still
    /// has work left.
    pub fn mark_completed(&mut self) -> bool {
        if self.completed || self.remaining != 0 {
            return false;
        }
        self.completed = true;
        true
    }
}

/// Outcome of one job's scheduling loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub identity: String,
    pub indicator: IndicatorId,
    pub total_runtime: u64,
    pub turns: Vec<u64>,
    pub state: JobState,
    /// Milliseconds since the run started when the job completed
    pub completed_at_ms: Option<u64>,
}

impl JobReport {
    pub fn consumed(&self) -> u64 {
        self.turns.iter().sum()
    }
}
