use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Local;
use cronfan::exec::{BatchExecutor, FinishedResult, ProcessSpec, ProcessStatus};

/// One spec as the fake executor saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitted {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Option<Duration>,
}

/// A fake executor that:
/// - records every submitted spec, batch by batch
/// - answers each with a Completed result (exit 0, empty output)
/// - invokes the spec's callback, like the real executor does.
#[derive(Debug, Clone, Default)]
pub struct FakeExecutor {
    batches: Arc<Mutex<Vec<Vec<Submitted>>>>,
    stdout: Option<String>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every result carries this stdout.
    pub fn with_stdout(mut self, stdout: &str) -> Self {
        self.stdout = Some(stdout.to_string());
        self
    }

    pub fn batches(&self) -> Vec<Vec<Submitted>> {
        self.batches.lock().unwrap().clone()
    }

    /// All submitted specs, flattened.
    pub fn submitted(&self) -> Vec<Submitted> {
        self.batches().into_iter().flatten().collect()
    }
}

impl BatchExecutor for FakeExecutor {
    fn run_batch(
        &mut self,
        specs: Vec<ProcessSpec>,
    ) -> Pin<Box<dyn Future<Output = Vec<FinishedResult>> + Send + '_>> {
        Box::pin(async move {
            let mut batch = Vec::new();
            let mut results = Vec::new();

            for spec in specs {
                let (command, timeout, callback) = spec.into_parts();
                batch.push(Submitted {
                    program: command.program().to_string(),
                    args: command.get_args().to_vec(),
                    timeout,
                });

                let now = Local::now();
                let result = FinishedResult {
                    command: command.to_string(),
                    pid: None,
                    started_at: now,
                    ended_at: now,
                    elapsed: Duration::ZERO,
                    stdout: self.stdout.clone().unwrap_or_default(),
                    stderr: String::new(),
                    status: ProcessStatus::Completed,
                    exit_code: Some(0),
                    stop_signal: None,
                };
                if let Some(callback) = callback {
                    callback(&result);
                }
                results.push(result);
            }

            self.batches.lock().unwrap().push(batch);
            results
        })
    }
}
