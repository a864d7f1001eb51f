use std::io;
use std::process::ExitCode;
use tracing::{error, info, warn};

use adc_instrumentation::instrument::{run_instrumentation, RunnerConfig, RunnerError};
use adc_instrumentation::logging::setup_logging;

fn main() -> ExitCode {
    let _guard = setup_logging("run");
    info!("Starting instrumentation runner");

    let args: Vec<String> = std::env::args().collect();
    let config = match RunnerConfig::from_env(&args) {
        Ok(config) => config,
        Err(e) => {
            warn!("{}", e);
            print_usage(args.first().map(String::as_str).unwrap_or("run"));
            return ExitCode::FAILURE;
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match run_instrumentation(&config, &mut out) {
        Ok(summary) => {
            if summary.child_failed() {
                match summary.exit_code() {
                    Some(code) => eprintln!("Subprocess exited with error code: {}", code),
                    None => eprintln!("Subprocess terminated by signal"),
                }
            }
            info!("Runner shutting down");
            ExitCode::SUCCESS
        }
        Err(RunnerError::NotFound { program }) => {
            eprintln!("Error: The application '{}' was not found.", program);
            eprintln!("Please ensure you have built the project with 'cmake .. && make'");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Runner failed: {}", e);
            eprintln!("An unexpected error occurred: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} <i2c-bus> <i2c-address-hex> <config-file>", program);
    eprintln!("Example: {} /dev/i2c-1 0x48 configA", program);
}
