use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedError};
use crate::scheduler::job::{IndicatorId, JobSpec};
use crate::scheduler::ordering::OrderingPolicy;

/// Time slice granted to a job per turn, in milliseconds.
pub const DEFAULT_QUANTUM_MS: u64 = 1000;

/// Pause between a job releasing the gate and asking for it again.
pub const DEFAULT_INTER_TURN_DELAY_MS: u64 = 1000;

/// How much work a job may do before it has to hand the gate back.
///
/// `Unbounded` turns the scheduler into run-to-completion: every job gets a
/// single turn that covers its whole runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantum {
    Fixed(u64),
    Unbounded,
}

impl Quantum {
    /// Length of the next turn for a job with `remaining` work left.
    pub fn slice(&self, remaining: u64) -> u64 {
        match self {
            Quantum::Fixed(quantum) => remaining.min(*quantum),
            Quantum::Unbounded => remaining,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Quantum::Fixed(0) => Err(SchedError::InvalidQuantum),
            _ => Ok(()),
        }
    }
}

impl Default for Quantum {
    fn default() -> Self {
        Quantum::Fixed(DEFAULT_QUANTUM_MS)
    }
}

impl std::fmt::Display for Quantum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Quantum::Fixed(ms) => write!(f, "{}ms", ms),
            Quantum::Unbounded => write!(f, "unbounded"),
        }
    }
}

/// One entry of the static job list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    pub runtime_ms: u64,
    /// Indicator wired to this job (an LED pin on the reference board)
    #[serde(default)]
    pub indicator: u32,
}

impl JobConfig {
    pub fn new(name: impl Into<String>, runtime_ms: u64, indicator: u32) -> Self {
        Self {
            name: name.into(),
            runtime_ms,
            indicator,
        }
    }

    /// Parse the CLI form `NAME:RUNTIME[:INDICATOR]`.
    ///
    /// The name may not contain `:`; the indicator defaults to 0.
    pub fn parse(spec: &str) -> Result<Self> {
        let parts: Vec<&str> = spec.split(':').collect();
        let (name, runtime, indicator) = match parts.as_slice() {
            [name, runtime] => (*name, *runtime, None),
            [name, runtime, indicator] => (*name, *runtime, Some(*indicator)),
            _ => {
                return Err(SchedError::Config(format!(
                    "invalid job {:?}, expected NAME:RUNTIME[:INDICATOR]",
                    spec
                )))
            }
        };

        let runtime_ms = runtime.trim().parse::<u64>().map_err(|e| {
            SchedError::Config(format!("invalid runtime {:?} for job {:?}: {}", runtime, name, e))
        })?;
        let indicator = match indicator {
            Some(raw) => raw.trim().parse::<u32>().map_err(|e| {
                SchedError::Config(format!("invalid indicator {:?} for job {:?}: {}", raw, name, e))
            })?,
            None => 0,
        };

        Ok(Self::new(name.trim(), runtime_ms, indicator))
    }

    pub fn to_spec(&self) -> Result<JobSpec> {
        JobSpec::new(
            self.name.clone(),
            self.runtime_ms,
            IndicatorId(self.indicator),
        )
    }
}

/// Scheduler configuration. The default reproduces the reference board setup:
/// four jobs, 1000ms quantum, shortest job spawned first.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub quantum: Quantum,
    pub inter_turn_delay_ms: u64,
    pub ordering: OrderingPolicy,
    pub jobs: Vec<JobConfig>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            quantum: Quantum::default(),
            inter_turn_delay_ms: DEFAULT_INTER_TURN_DELAY_MS,
            ordering: OrderingPolicy::ShortestFirst,
            jobs: vec![
                JobConfig::new("Task 1", 2500, 3),
                JobConfig::new("Task 2", 3500, 7),
                JobConfig::new("Task 3", 1500, 11),
                JobConfig::new("Task 4", 2000, 15),
            ],
        }
    }
}

impl SchedulerConfig {
    /// Config with the default timing but no jobs.
    pub fn empty() -> Self {
        Self {
            jobs: Vec::new(),
            ..Default::default()
        }
    }

    pub fn with_job(mut self, name: impl Into<String>, runtime_ms: u64, indicator: u32) -> Self {
        self.jobs.push(JobConfig::new(name, runtime_ms, indicator));
        self
    }

    pub fn with_quantum(mut self, quantum: Quantum) -> Self {
        self.quantum = quantum;
        self
    }

    pub fn with_inter_turn_delay(mut self, delay_ms: u64) -> Self {
        self.inter_turn_delay_ms = delay_ms;
        self
    }

    pub fn with_ordering(mut self, ordering: OrderingPolicy) -> Self {
        self.ordering = ordering;
        self
    }

    /// Validate the whole config and build the job descriptors in input order.
    pub fn job_specs(&self) -> Result<Vec<JobSpec>> {
        self.quantum.validate()?;
        self.jobs.iter().map(JobConfig::to_spec).collect()
    }

    /// Load a job list from a JSON array of `{"name", "runtime_ms", "indicator"}`.
    pub async fn jobs_from_json_file(path: impl AsRef<Path>) -> Result<Vec<JobConfig>> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            SchedError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| SchedError::Config(format!("failed to parse {}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantum_slices_to_remaining() {
        let quantum = Quantum::Fixed(1000);
        assert_eq!(quantum.slice(2500), 1000);
        assert_eq!(quantum.slice(1000), 1000);
        assert_eq!(quantum.slice(500), 500);
        assert_eq!(Quantum::Unbounded.slice(3500), 3500);
    }

    #[test]
    fn zero_quantum_is_rejected() {
        assert_eq!(Quantum::Fixed(0).validate(), Err(SchedError::InvalidQuantum));
        assert!(Quantum::Fixed(1).validate().is_ok());
        assert!(Quantum::Unbounded.validate().is_ok());
    }

    #[test]
    fn scheduler_config_default() {
        let cfg = SchedulerConfig::default();
        assert_eq!(cfg.quantum, Quantum::Fixed(1000));
        assert_eq!(cfg.inter_turn_delay_ms, 1000);
        assert_eq!(cfg.ordering, OrderingPolicy::ShortestFirst);
        let runtimes: Vec<u64> = cfg.jobs.iter().map(|j| j.runtime_ms).collect();
        assert_eq!(runtimes, vec![2500, 3500, 1500, 2000]);
        let leds: Vec<u32> = cfg.jobs.iter().map(|j| j.indicator).collect();
        assert_eq!(leds, vec![3, 7, 11, 15]);
    }

    #[test]
    fn scheduler_config_builders() {
        let cfg = SchedulerConfig::empty()
            .with_job("a", 10, 1)
            .with_job("b", 20, 2)
            .with_quantum(Quantum::Unbounded)
            .with_inter_turn_delay(5)
            .with_ordering(OrderingPolicy::AsGiven);
        assert_eq!(cfg.jobs.len(), 2);
        assert_eq!(cfg.jobs[1].name, "b");
        assert_eq!(cfg.quantum, Quantum::Unbounded);
        assert_eq!(cfg.inter_turn_delay_ms, 5);
        assert_eq!(cfg.ordering, OrderingPolicy::AsGiven);
    }

    #[test]
    fn job_specs_reject_zero_runtime() {
        let cfg = SchedulerConfig::empty().with_job("ok", 10, 0).with_job("bad", 0, 0);
        assert_eq!(
            cfg.job_specs().unwrap_err(),
            SchedError::InvalidRuntime {
                identity: "bad".to_string()
            }
        );
    }

    #[test]
    fn job_specs_reject_zero_quantum() {
        let cfg = SchedulerConfig::default().with_quantum(Quantum::Fixed(0));
        assert_eq!(cfg.job_specs().unwrap_err(), SchedError::InvalidQuantum);
    }

    #[test]
    fn parse_job_with_and_without_indicator() {
        assert_eq!(
            JobConfig::parse("Task 1:2500:3").unwrap(),
            JobConfig::new("Task 1", 2500, 3)
        );
        assert_eq!(
            JobConfig::parse("build:750").unwrap(),
            JobConfig::new("build", 750, 0)
        );
    }

    #[test]
    fn parse_job_rejects_malformed_input() {
        assert!(matches!(JobConfig::parse("noruntime"), Err(SchedError::Config(_))));
        assert!(matches!(JobConfig::parse("a:b:c:d"), Err(SchedError::Config(_))));
        assert!(matches!(JobConfig::parse("a:fast"), Err(SchedError::Config(_))));
        assert!(matches!(JobConfig::parse("a:10:led"), Err(SchedError::Config(_))));
    }

    #[tokio::test]
    async fn jobs_load_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        std::fs::write(
            &path,
            r#"[{"name": "a", "runtime_ms": 1200, "indicator": 4}, {"name": "b", "runtime_ms": 300}]"#,
        )
        .unwrap();

        let jobs = SchedulerConfig::jobs_from_json_file(&path).await.unwrap();
        assert_eq!(
            jobs,
            vec![JobConfig::new("a", 1200, 4), JobConfig::new("b", 300, 0)]
        );
    }

    #[tokio::test]
    async fn jobs_from_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = SchedulerConfig::jobs_from_json_file(dir.path().join("missing.json")).await;
        assert!(matches!(result, Err(SchedError::Config(_))));
    }
}
