pub mod builders;
pub mod fake_executor;

use std::sync::{Arc, Mutex, Once};

use cronfan::task::{Task, TaskDefinition, TaskFuture};
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// In-process task that records the params of every run.
#[derive(Debug)]
pub struct CountingTask {
    definition: TaskDefinition,
    runs: Arc<Mutex<Vec<Vec<String>>>>,
}

impl CountingTask {
    pub fn new(definition: TaskDefinition) -> Self {
        Self {
            definition,
            runs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared view of the recorded runs.
    pub fn runs(&self) -> Arc<Mutex<Vec<Vec<String>>>> {
        Arc::clone(&self.runs)
    }
}

impl Task for CountingTask {
    fn definition(&self) -> &TaskDefinition {
        &self.definition
    }

    fn run<'a>(&'a self, params: &'a [String]) -> TaskFuture<'a> {
        Box::pin(async move {
            self.runs.lock().unwrap().push(params.to_vec());
            Ok(())
        })
    }
}
