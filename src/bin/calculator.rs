use std::io;
use std::process::ExitCode;
use tracing::{error, info};

use adc_instrumentation::logging::setup_logging;
use adc_instrumentation::resolution::{run_calculator, AdcParameters};

fn main() -> ExitCode {
    let _guard = setup_logging("calculator");

    let params = AdcParameters::default();
    info!("Starting resolution calculator with {:?}", params);

    let stdin = io::stdin();
    let stdout = io::stdout();
    match run_calculator(&params, &mut stdin.lock(), &mut stdout.lock()) {
        Ok(reports) => {
            let met = reports.iter().filter(|r| r.met).count();
            info!("{} channels evaluated, {} met the condition", reports.len(), met);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Calculator failed: {}", e);
            eprintln!("An error occurred: {}", e);
            ExitCode::FAILURE
        }
    }
}
