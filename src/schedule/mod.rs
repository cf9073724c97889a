// src/schedule/mod.rs

//! Time-based scheduling: eligibility rules, last-run markers, the
//! fan-out over due tasks, single task runs and the crontab trigger.

pub mod clock;
pub mod crontab;
pub mod fanout;
pub mod marker;
pub mod task_run;

pub use clock::{Eligibility, SkipReason, TimeField};
pub use fanout::{FanOutSummary, ScheduleFanOut, SelfInvocation};
pub use marker::MarkerStore;
pub use task_run::{TaskRunOptions, TaskRunOutcome, history_line, run_task, split_params};
