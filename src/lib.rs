pub mod config;
pub mod error;
pub mod launcher;
pub mod scheduler;
pub mod worker;

pub use config::{JobConfig, Quantum, SchedulerConfig};
pub use error::{Result, SchedError};
pub use launcher::{Launch, Launcher, RunReport, Spawner, TokioSpawner};
