// src/main.rs

use cronfan::{cli, logging, run};
use tracing::warn;

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("cronfan error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    logging::init_logging(args.log_level, args.log_file.as_deref())?;

    // Dropping the command future on Ctrl-C runs its shutdown hook and
    // kills any child it spawned.
    tokio::select! {
        res = run(args) => res,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted");
            Ok(())
        }
    }
}
