// src/exec/backend.rs

//! Pluggable batch executor abstraction.
//!
//! Callers that submit batches (the command runner and the schedule fan-out)
//! talk to a `BatchExecutor` instead of [`ConcurrentExecutor`] directly. This
//! makes it easy to swap in a fake in tests that records the submitted
//! command lines and synthesizes results without spawning anything.

use std::future::Future;
use std::pin::Pin;

use crate::exec::executor::ConcurrentExecutor;
use crate::exec::process::{FinishedResult, ProcessSpec};

/// Trait abstracting how a batch of process specs is executed.
///
/// Implementations must invoke each spec's callback exactly once for every
/// result they return.
pub trait BatchExecutor: Send {
    fn run_batch(
        &mut self,
        specs: Vec<ProcessSpec>,
    ) -> Pin<Box<dyn Future<Output = Vec<FinishedResult>> + Send + '_>>;
}

impl BatchExecutor for ConcurrentExecutor {
    fn run_batch(
        &mut self,
        specs: Vec<ProcessSpec>,
    ) -> Pin<Box<dyn Future<Output = Vec<FinishedResult>> + Send + '_>> {
        Box::pin(async move { self.run(specs).await })
    }
}
