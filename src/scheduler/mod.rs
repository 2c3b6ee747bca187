pub mod gate;
pub mod job;
pub mod ordering;
pub mod timeline;

pub use gate::{AdmissionGate, GatePermit, GateStats};
pub use job::{IndicatorId, JobProgress, JobReport, JobSpec, JobState};
pub use ordering::{order_jobs, JobSet, OrderingPolicy};
pub use timeline::{Timeline, TimelineEvent};
