// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`process`] holds the data model: `CommandLine`, `ProcessSpec`,
//!   `ProcessHandle` and `FinishedResult`.
//! - `group` kills a child together with everything it forked.
//! - [`executor`] owns the polling loop that runs a batch of specs
//!   concurrently with per-process timeouts.
//! - [`backend`] provides the `BatchExecutor` trait so callers can be tested
//!   against a fake executor.

pub mod backend;
pub mod executor;
mod group;
pub mod process;

pub use backend::BatchExecutor;
pub use executor::{ConcurrentExecutor, TICK};
pub use process::{
    Callback, CommandLine, FinishedResult, ProcessHandle, ProcessSpec, ProcessStatus,
};
