//! Per-job execution side of the scheduler.
//!
//! This module holds the scheduling loop and the collaborators it calls out to:
//! - **Work simulation**: [`WorkSimulator`] stands in for computation and delays
//! - **Indicators**: [`Indicator`] is toggled on at the start of a turn and off at the end
//! - **Diagnostics**: [`DiagnosticSink`] receives the human-readable progress lines
//!
//! # Turn Flow
//!
//! 1. [`SchedulingLoop::run`] waits on the shared admission gate
//! 2. Runs `min(remaining, quantum)` of simulated work with the indicator lit
//! 3. Releases the gate, then either retires the job or pauses and goes again

pub mod clock;
pub mod diagnostics;
pub mod indicator;
pub mod turn_loop;

pub use clock::{InstantClock, TokioClock, WorkSimulator};
pub use diagnostics::{DiagnosticSink, MemorySink, StdoutSink, TracingSink};
pub use indicator::{Indicator, IndicatorChange, LitIndicator, LogIndicator, RecordingIndicator};
pub use turn_loop::{SchedulingLoop, TurnContext};
