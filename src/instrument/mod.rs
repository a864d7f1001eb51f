pub mod config;
pub mod csv_log;
pub mod runner;

pub use config::{OutputFormat, RunnerConfig};
pub use csv_log::CsvLogger;
pub use runner::{run_instrumentation, RunSummary, RunnerError};
