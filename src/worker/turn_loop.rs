use std::sync::Arc;

use crate::config::Quantum;
use crate::scheduler::{
    AdmissionGate, JobProgress, JobReport, JobSpec, JobState, Timeline, TimelineEvent,
};
use crate::worker::clock::WorkSimulator;
use crate::worker::diagnostics::{finished_line, running_line, DiagnosticSink};
use crate::worker::indicator::{Indicator, LitIndicator};

/// Everything a scheduling loop shares with the other loops of the same run.
#[derive(Clone)]
pub struct TurnContext<W: WorkSimulator> {
    pub gate: Arc<AdmissionGate>,
    pub clock: W,
    pub quantum: Quantum,
    pub inter_turn_delay_ms: u64,
    pub indicator: Arc<dyn Indicator>,
    pub diagnostics: Arc<dyn DiagnosticSink>,
    pub timeline: Timeline,
    /// Clock reading taken when the run started; report times are relative to it
    pub origin_ms: u64,
}

impl<W: WorkSimulator> TurnContext<W> {
    fn elapsed_ms(&self) -> u64 {
        self.clock.now_ms().saturating_sub(self.origin_ms)
    }
}

/// Per-job scheduling loop.
///
/// Repeatedly takes the gate, runs one quantum (or whatever is left), and
/// gives the gate back. Between turns it pauses for the inter-turn delay.
/// When no work is left it marks the job completed and returns its report.
///
/// The gate permit lives only for the duration of a turn and is dropped
/// before any exit, so the gate is free again whether the job completes,
/// yields, or panics mid-turn. The indicator guard is dropped before the
/// permit, so it is dark by the time the next job is admitted.
///
/// Every state change is recorded in the run's [`Timeline`].
pub struct SchedulingLoop<W: WorkSimulator> {
    spec: JobSpec,
    progress: JobProgress,
    state: JobState,
    ctx: TurnContext<W>,
}

impl<W: WorkSimulator> SchedulingLoop<W> {
    pub fn new(spec: JobSpec, ctx: TurnContext<W>) -> Self {
        let progress = JobProgress::new(&spec);
        Self {
            spec,
            progress,
            state: JobState::Pending,
            ctx,
        }
    }

    pub fn spec(&self) -> &JobSpec {
        &self.spec
    }

    fn transition(&mut self, to: JobState) {
        tracing::trace!(job = %self.spec.identity(), from = %self.state, to = %to, "State change");
        self.state = to;
        self.ctx.timeline.record(TimelineEvent::StateChanged {
            job: self.spec.identity().to_string(),
            at_ms: self.ctx.elapsed_ms(),
            state: to,
        });
    }

    /// Drive the job to completion.
    pub async fn run(mut self) -> JobReport {
        let gate = self.ctx.gate.clone();

        loop {
            self.transition(JobState::Waiting);
            let permit = gate.acquire().await;
            self.transition(JobState::Running);

            self.run_turn().await;
            permit.release();

            if self.progress.remaining() == 0 {
                return self.retire();
            }

            self.transition(JobState::Yielded);
            self.ctx.clock.pause(self.ctx.inter_turn_delay_ms).await;
        }
    }

    /// One turn. Must only be called while holding the gate.
    async fn run_turn(&mut self) {
        let identity = self.spec.identity().to_string();
        let indicator = self.spec.indicator();
        let remaining = self.progress.remaining();
        let turn = self.ctx.quantum.slice(remaining);

        self.ctx.timeline.record(TimelineEvent::TurnStarted {
            job: identity.clone(),
            at_ms: self.ctx.elapsed_ms(),
            remaining,
        });
        let lit = LitIndicator::on(self.ctx.indicator.clone(), indicator);
        self.ctx.diagnostics.line(&running_line(&identity, remaining));
        tracing::debug!(job = %identity, remaining, turn, "Turn started");

        self.ctx.clock.run_for(turn).await;
        self.progress.consume(turn);

        lit.off();
        self.ctx.timeline.record(TimelineEvent::TurnEnded {
            job: identity.clone(),
            at_ms: self.ctx.elapsed_ms(),
            consumed: turn,
            remaining: self.progress.remaining(),
        });
        tracing::debug!(
            job = %identity,
            consumed = turn,
            remaining = self.progress.remaining(),
            "Turn ended"
        );
    }

    /// Mark completed and report. Called after the gate has been released.
    fn retire(mut self) -> JobReport {
        let completed_at = self.ctx.elapsed_ms();
        let first_completion = self.progress.mark_completed();
        debug_assert!(first_completion, "job retired twice or with work left");
        self.transition(JobState::Completed);

        self.ctx.timeline.record(TimelineEvent::Completed {
            job: self.spec.identity().to_string(),
            at_ms: completed_at,
        });
        self.ctx.diagnostics.line(&finished_line(self.spec.identity()));
        tracing::info!(
            job = %self.spec.identity(),
            turns = self.progress.turns().len(),
            completed_at_ms = completed_at,
            "Job completed"
        );

        JobReport {
            identity: self.spec.identity().to_string(),
            indicator: self.spec.indicator(),
            total_runtime: self.spec.total_runtime(),
            turns: self.progress.turns().to_vec(),
            state: self.state,
            completed_at_ms: Some(completed_at),
        }
    }
}
