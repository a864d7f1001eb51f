use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::fmt;

/// Directory the rolling diagnostic logs are written to.
pub const LOG_DIRECTORY: &str = "logs";

/// Install a file-based subscriber with daily rotation.
///
/// The returned guard must be held for as long as the program runs; dropping
/// it flushes and stops the background writer.
pub fn setup_logging(app_name: &str) -> WorkerGuard {
    let file_appender = rolling::daily(LOG_DIRECTORY, format!("{}.log", app_name));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // A second init (e.g. from tests) is harmless, the first subscriber wins
    let _ = fmt()
        .with_writer(non_blocking)
        .with_ansi(false) // Disable ANSI colors in log files
        .with_level(true)
        .try_init();

    guard
}
