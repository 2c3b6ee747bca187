use crate::scheduler::job::JobSpec;

/// Order in which scheduling loops are spawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderingPolicy {
    /// Shortest total runtime first, ties kept in input order
    #[default]
    ShortestFirst,
    /// Keep the configured order
    AsGiven,
}

/// Ordered, frozen job set. Built once, never reordered or resized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSet {
    jobs: Vec<JobSpec>,
}

impl JobSet {
    pub fn jobs(&self) -> &[JobSpec] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn identities(&self) -> Vec<&str> {
        self.jobs.iter().map(JobSpec::identity).collect()
    }
}

impl<'a> IntoIterator for &'a JobSet {
    type Item = &'a JobSpec;
    type IntoIter = std::slice::Iter<'a, JobSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.jobs.iter()
    }
}

/// Apply the ordering policy once. Only spawn order depends on this; actual
/// execution order comes out of gate contention.
pub fn order_jobs(mut jobs: Vec<JobSpec>, policy: OrderingPolicy) -> JobSet {
    match policy {
        // `sort_by_key` is stable, so equal runtimes keep their input position
        OrderingPolicy::ShortestFirst => jobs.sort_by_key(JobSpec::total_runtime),
        OrderingPolicy::AsGiven => {}
    }
    JobSet { jobs }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::job::IndicatorId;

    fn spec(name: &str, runtime: u64) -> JobSpec {
        JobSpec::new(name, runtime, IndicatorId(0)).unwrap()
    }

    #[test]
    fn shortest_first_orders_by_runtime() {
        let set = order_jobs(
            vec![spec("A", 2500), spec("B", 3500), spec("C", 1500), spec("D", 2000)],
            OrderingPolicy::ShortestFirst,
        );
        assert_eq!(set.identities(), vec!["C", "D", "A", "B"]);
    }

    #[test]
    fn shortest_first_keeps_ties_in_input_order() {
        let set = order_jobs(
            vec![spec("x", 300), spec("y", 100), spec("z", 300), spec("w", 100)],
            OrderingPolicy::ShortestFirst,
        );
        assert_eq!(set.identities(), vec!["y", "w", "x", "z"]);
    }

    #[test]
    fn as_given_keeps_input_order() {
        let set = order_jobs(
            vec![spec("A", 2500), spec("B", 3500), spec("C", 1500)],
            OrderingPolicy::AsGiven,
        );
        assert_eq!(set.identities(), vec!["A", "B", "C"]);
    }

    #[test]
    fn empty_set() {
        let set = order_jobs(Vec::new(), OrderingPolicy::ShortestFirst);
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
    }
}
