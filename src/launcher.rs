use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::config::{Quantum, SchedulerConfig};
use crate::error::{Result, SchedError};
use crate::scheduler::{order_jobs, AdmissionGate, GateStats, JobReport, JobSet, Timeline, TimelineEvent};
use crate::worker::{
    DiagnosticSink, Indicator, LogIndicator, SchedulingLoop, TokioClock, TracingSink, TurnContext,
    WorkSimulator,
};

pub type JobFuture = Pin<Box<dyn Future<Output = JobReport> + Send + 'static>>;

/// Task-spawning facility. Failing to spawn is fatal to that job only.
pub trait Spawner: Send + Sync {
    fn spawn(&self, identity: &str, job: JobFuture) -> Result<JoinHandle<JobReport>>;
}

/// Spawns scheduling loops onto the current tokio runtime.
///
/// An optional cap on the number of live tasks models a kernel that runs out
/// of memory for new tasks. A slot is freed when its task finishes, panics or
/// is aborted, so the same spawner can serve several runs.
#[derive(Debug, Default)]
pub struct TokioSpawner {
    max_tasks: Option<usize>,
    spawned: AtomicUsize,
    live: Arc<AtomicUsize>,
}

impl TokioSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_tasks(max_tasks: usize) -> Self {
        Self {
            max_tasks: Some(max_tasks),
            ..Self::default()
        }
    }

    /// Tasks spawned over the spawner's lifetime.
    pub fn spawned(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }

    /// Spawned tasks that have not finished yet.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

/// Holds one of the spawner's task slots until the task is gone.
struct TaskSlot(Arc<AtomicUsize>);

impl Drop for TaskSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Spawner for TokioSpawner {
    fn spawn(&self, identity: &str, job: JobFuture) -> Result<JoinHandle<JobReport>> {
        let handle = tokio::runtime::Handle::try_current().map_err(|e| SchedError::SpawnFailed {
            identity: identity.to_string(),
            reason: e.to_string(),
        })?;

        let max = self.max_tasks;
        let reserved = self
            .live
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match max {
                Some(max) if n >= max => None,
                _ => Some(n + 1),
            });
        if let Err(live) = reserved {
            return Err(SchedError::SpawnFailed {
                identity: identity.to_string(),
                reason: format!("task limit reached with {} tasks live", live),
            });
        }
        self.spawned.fetch_add(1, Ordering::SeqCst);

        let slot = TaskSlot(self.live.clone());
        Ok(handle.spawn(async move {
            let _slot = slot;
            job.await
        }))
    }
}

/// Builds the job set and starts one scheduling loop per job.
pub struct Launcher<W: WorkSimulator = TokioClock> {
    job_set: JobSet,
    quantum: Quantum,
    inter_turn_delay_ms: u64,
    clock: W,
    indicator: Arc<dyn Indicator>,
    diagnostics: Arc<dyn DiagnosticSink>,
    spawner: Arc<dyn Spawner>,
}

impl Launcher<TokioClock> {
    /// Validate `config` and order its jobs. Invalid jobs are rejected here,
    /// before anything is spawned.
    pub fn new(config: &SchedulerConfig) -> Result<Self> {
        let specs = config.job_specs()?;
        let job_set = order_jobs(specs, config.ordering);

        tracing::info!(
            jobs = job_set.len(),
            quantum = %config.quantum,
            inter_turn_delay_ms = config.inter_turn_delay_ms,
            ordering = ?config.ordering,
            "Job set ready"
        );

        Ok(Self {
            job_set,
            quantum: config.quantum,
            inter_turn_delay_ms: config.inter_turn_delay_ms,
            clock: TokioClock::new(),
            indicator: Arc::new(LogIndicator),
            diagnostics: Arc::new(TracingSink),
            spawner: Arc::new(TokioSpawner::new()),
        })
    }
}

impl<W: WorkSimulator> Launcher<W> {
    pub fn with_clock<C: WorkSimulator>(self, clock: C) -> Launcher<C> {
        Launcher {
            job_set: self.job_set,
            quantum: self.quantum,
            inter_turn_delay_ms: self.inter_turn_delay_ms,
            clock,
            indicator: self.indicator,
            diagnostics: self.diagnostics,
            spawner: self.spawner,
        }
    }

    pub fn with_indicator(mut self, indicator: Arc<dyn Indicator>) -> Self {
        self.indicator = indicator;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_spawner(mut self, spawner: Arc<dyn Spawner>) -> Self {
        self.spawner = spawner;
        self
    }

    pub fn job_set(&self) -> &JobSet {
        &self.job_set
    }

    /// Create a fresh gate and spawn every job in job-set order.
    ///
    /// Must be called from within a tokio runtime. Jobs that fail to spawn are
    /// listed in [`Launch::failures`]; the rest run normally.
    pub fn launch(&self) -> Launch {
        let gate = Arc::new(AdmissionGate::new());
        let timeline = Timeline::new();
        let ctx = TurnContext {
            gate: gate.clone(),
            clock: self.clock.clone(),
            quantum: self.quantum,
            inter_turn_delay_ms: self.inter_turn_delay_ms,
            indicator: self.indicator.clone(),
            diagnostics: self.diagnostics.clone(),
            timeline: timeline.clone(),
            origin_ms: self.clock.now_ms(),
        };

        let mut handles = Vec::with_capacity(self.job_set.len());
        let mut failures = Vec::new();

        for spec in &self.job_set {
            let identity = spec.identity().to_string();
            let job = SchedulingLoop::new(spec.clone(), ctx.clone());

            match self.spawner.spawn(&identity, Box::pin(job.run())) {
                Ok(handle) => {
                    tracing::debug!(job = %identity, "Job spawned");
                    handles.push((identity, handle));
                }
                Err(e) => {
                    tracing::error!(job = %identity, error = %e, "Failed to spawn job");
                    failures.push(e);
                }
            }
        }

        Launch {
            gate,
            timeline,
            handles,
            failures,
            started_at: Utc::now(),
        }
    }

    /// Launch and wait for every spawned job to finish.
    pub async fn run(&self) -> RunReport {
        self.launch().join().await
    }
}

/// A started run.
pub struct Launch {
    gate: Arc<AdmissionGate>,
    timeline: Timeline,
    handles: Vec<(String, JoinHandle<JobReport>)>,
    failures: Vec<SchedError>,
    started_at: DateTime<Utc>,
}

impl Launch {
    pub fn gate(&self) -> &Arc<AdmissionGate> {
        &self.gate
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Jobs that could not be spawned.
    pub fn failures(&self) -> &[SchedError] {
        &self.failures
    }

    /// Identities of the jobs that were spawned, in spawn order.
    pub fn spawned(&self) -> Vec<&str> {
        self.handles.iter().map(|(id, _)| id.as_str()).collect()
    }

    /// Wait for every spawned loop. A loop that panicked is reported as
    /// [`SchedError::TaskPanicked`] alongside spawn failures.
    pub async fn join(self) -> RunReport {
        let mut jobs = Vec::with_capacity(self.handles.len());
        let mut failures = self.failures;

        for (identity, handle) in self.handles {
            match handle.await {
                Ok(report) => jobs.push(report),
                Err(e) => {
                    tracing::error!(job = %identity, error = %e, "Job task failed");
                    failures.push(SchedError::TaskPanicked { identity });
                }
            }
        }

        // Stable: jobs with equal completion times keep spawn order
        jobs.sort_by_key(|j| j.completed_at_ms.unwrap_or(u64::MAX));

        let gate = self.gate.stats();
        tracing::info!(
            completed = jobs.len(),
            failed = failures.len(),
            acquires = gate.acquires,
            releases = gate.releases,
            "Run finished"
        );

        RunReport {
            started_at: self.started_at,
            finished_at: Utc::now(),
            jobs,
            failures,
            gate,
            timeline: self.timeline.events(),
        }
    }
}

/// Result of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Completed jobs in completion order
    pub jobs: Vec<JobReport>,
    #[serde(serialize_with = "serialize_errors")]
    pub failures: Vec<SchedError>,
    pub gate: GateStats,
    pub timeline: Vec<TimelineEvent>,
}

impl RunReport {
    pub fn completion_order(&self) -> Vec<&str> {
        self.jobs.iter().map(|j| j.identity.as_str()).collect()
    }

    pub fn job(&self, identity: &str) -> Option<&JobReport> {
        self.jobs.iter().find(|j| j.identity == identity)
    }

    /// `Err` with the first failure if any job was not spawned or did not finish.
    pub fn into_result(self) -> Result<Self> {
        match self.failures.first() {
            Some(e) => Err(e.clone()),
            None => Ok(self),
        }
    }
}

fn serialize_errors<S: serde::Serializer>(
    errors: &[SchedError],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(errors.iter().map(|e| e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawner_without_runtime_fails() {
        let spawner = TokioSpawner::new();
        let result = spawner.spawn(
            "orphan",
            Box::pin(async {
                JobReport {
                    identity: "orphan".to_string(),
                    indicator: crate::scheduler::IndicatorId(0),
                    total_runtime: 1,
                    turns: vec![1],
                    state: crate::scheduler::JobState::Completed,
                    completed_at_ms: Some(1),
                }
            }),
        );
        assert!(matches!(result, Err(SchedError::SpawnFailed { .. })));
        assert_eq!(spawner.spawned(), 0);
        assert_eq!(spawner.live(), 0);
    }

    #[test]
    fn launcher_rejects_invalid_config() {
        let cfg = SchedulerConfig::empty().with_job("zero", 0, 1);
        assert!(matches!(
            Launcher::new(&cfg),
            Err(SchedError::InvalidRuntime { .. })
        ));
    }

    #[tokio::test]
    async fn run_report_serializes_to_json() {
        let cfg = SchedulerConfig::empty().with_job("a", 1500, 3);
        let launcher = Launcher::new(&cfg)
            .unwrap()
            .with_clock(crate::worker::InstantClock::new());

        let report = launcher.run().await;
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["jobs"][0]["identity"], "a");
        assert_eq!(json["jobs"][0]["state"], "Completed");
        assert_eq!(json["jobs"][0]["turns"], serde_json::json!([1000, 500]));
        assert_eq!(json["timeline"][0]["kind"], "state_changed");
        assert_eq!(json["timeline"][0]["state"], "Waiting");
        assert_eq!(json["failures"], serde_json::json!([]));
    }

    #[test]
    fn launcher_orders_default_jobs() {
        let launcher = Launcher::new(&SchedulerConfig::default()).unwrap();
        assert_eq!(
            launcher.job_set().identities(),
            vec!["Task 3", "Task 4", "Task 1", "Task 2"]
        );
    }
}
