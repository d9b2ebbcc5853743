use anyhow::Context;
use dlqueue_core::logging;
use std::future::Future;
use std::time::Duration;

mod cli;

use crate::cli::CliCommand;

/// How long in-flight blocking transfers may keep the process alive after
/// the command returns (e.g. on Ctrl-C).
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

fn main() {
    // Initialize logging as early as possible; fall back to stderr if the
    // state directory is unavailable.
    if let Err(err) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("file logging unavailable, using stderr: {:#}", err);
    }

    if let Err(err) = run_with_runtime(CliCommand::run_from_args(), SHUTDOWN_GRACE) {
        eprintln!("dlqueue error: {:#}", err);
        std::process::exit(1);
    }
}

/// Drive `command` on a fresh multi-threaded runtime, then give blocking
/// tasks at most `grace` to finish instead of joining them unboundedly.
fn run_with_runtime<F>(command: F, grace: Duration) -> anyhow::Result<()>
where
    F: Future<Output = anyhow::Result<()>>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start tokio runtime")?;
    let result = runtime.block_on(command);
    runtime.shutdown_timeout(grace);
    result
}
