use std::sync::Arc;

use proptest::prelude::*;
use quantum_sched::config::{Quantum, SchedulerConfig};
use quantum_sched::error::SchedError;
use quantum_sched::scheduler::{
    order_jobs, AdmissionGate, IndicatorId, JobSpec, OrderingPolicy, Timeline,
};
use quantum_sched::worker::{InstantClock, MemorySink, RecordingIndicator, SchedulingLoop, TurnContext};

fn spec(name: &str, runtime: u64) -> JobSpec {
    JobSpec::new(name, runtime, IndicatorId(0)).unwrap()
}

fn instant_context(quantum: Quantum) -> TurnContext<InstantClock> {
    TurnContext {
        gate: Arc::new(AdmissionGate::new()),
        clock: InstantClock::new(),
        quantum,
        inter_turn_delay_ms: 1000,
        indicator: Arc::new(RecordingIndicator::new()),
        diagnostics: Arc::new(MemorySink::new()),
        timeline: Timeline::new(),
        origin_ms: 0,
    }
}

#[test]
fn test_ordering_example() {
    let set = order_jobs(
        vec![spec("A", 2500), spec("B", 3500), spec("C", 1500), spec("D", 2000)],
        OrderingPolicy::ShortestFirst,
    );
    let ordered: Vec<(&str, u64)> = set
        .jobs()
        .iter()
        .map(|j| (j.identity(), j.total_runtime()))
        .collect();
    assert_eq!(
        ordered,
        vec![("C", 1500), ("D", 2000), ("A", 2500), ("B", 3500)]
    );
}

#[test]
fn test_zero_runtime_rejected_at_construction() {
    let cfg = SchedulerConfig::empty()
        .with_job("fine", 100, 1)
        .with_job("broken", 0, 2);
    assert_eq!(
        cfg.job_specs(),
        Err(SchedError::InvalidRuntime {
            identity: "broken".to_string()
        })
    );
}

#[tokio::test]
async fn test_quantum_slicing_2500() {
    let report = SchedulingLoop::new(spec("A", 2500), instant_context(Quantum::Fixed(1000)))
        .run()
        .await;
    assert_eq!(report.turns, vec![1000, 1000, 500]);
}

#[tokio::test]
async fn test_job_shorter_than_quantum() {
    let report = SchedulingLoop::new(spec("tiny", 500), instant_context(Quantum::Fixed(1000)))
        .run()
        .await;
    assert_eq!(report.turns, vec![500]);
}

#[tokio::test]
async fn test_job_equal_to_quantum_multiple() {
    let report = SchedulingLoop::new(spec("even", 3000), instant_context(Quantum::Fixed(1000)))
        .run()
        .await;
    assert_eq!(report.turns, vec![1000, 1000, 1000]);
}

proptest! {
    #[test]
    fn prop_shortest_first_is_stable_sort(runtimes in proptest::collection::vec(1u64..5000, 0..40)) {
        let specs: Vec<JobSpec> = runtimes
            .iter()
            .enumerate()
            .map(|(i, &r)| spec(&format!("job-{}", i), r))
            .collect();

        let set = order_jobs(specs, OrderingPolicy::ShortestFirst);
        prop_assert_eq!(set.len(), runtimes.len());

        let positions: Vec<(u64, usize)> = set
            .jobs()
            .iter()
            .map(|j| {
                let index: usize = j.identity()["job-".len()..].parse().unwrap();
                (j.total_runtime(), index)
            })
            .collect();
        for pair in positions.windows(2) {
            // Ascending by runtime, ties in input order
            prop_assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn prop_turns_sum_to_total(total in 1u64..20_000, quantum in 1u64..3000) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let report = rt.block_on(
            SchedulingLoop::new(spec("job", total), instant_context(Quantum::Fixed(quantum))).run(),
        );

        prop_assert_eq!(report.consumed(), total);
        prop_assert_eq!(report.turns.len() as u64, total.div_ceil(quantum));
        let (last, full) = report.turns.split_last().unwrap();
        prop_assert!(full.iter().all(|&t| t == quantum));
        prop_assert!(*last > 0 && *last <= quantum);
    }
}
