use std::path::PathBuf;

use super::runner::{Result, RunnerError};

/// Executable launched when `INSTRUMENTATION_APP` is not set.
pub const DEFAULT_PROGRAM: &str = "./build/instrumentation-app";

pub const PROGRAM_ENV: &str = "INSTRUMENTATION_APP";
pub const CSV_ENABLE_ENV: &str = "CSV_LOGGING_ENABLE";
pub const OUTPUT_ENV: &str = "RUNNER_OUTPUT";

/// How parsed measurements are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Configuration for one run of the instrumentation application
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub program: PathBuf,        // Executable to launch
    pub bus: String,             // I2C bus, e.g. /dev/i2c-1
    pub address: String,         // I2C address in hex, e.g. 0x48
    pub config_name: String,     // Configuration passed through to the app
    pub csv_logging: bool,       // Append parsed records to a CSV file
    pub csv_directory: PathBuf,  // Where the CSV file is created
    pub output: OutputFormat,    // Console format for parsed records
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
            bus: "/dev/i2c-1".to_string(),
            address: "0x48".to_string(),
            config_name: "configA".to_string(),
            csv_logging: false,
            csv_directory: PathBuf::from("logs"),
            output: OutputFormat::Text,
        }
    }
}

impl RunnerConfig {
    /// Build the configuration from the process arguments and environment.
    pub fn from_env(args: &[String]) -> Result<Self> {
        Self::from_parts(args, |key| std::env::var(key).ok())
    }

    /// `args` includes the program name in position 0, as `std::env::args` does.
    pub fn from_parts<F>(args: &[String], lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let [_, bus, address, config_name] = args else {
            return Err(RunnerError::Usage(format!(
                "expected 3 arguments, got {}",
                args.len().saturating_sub(1)
            )));
        };

        let mut config = RunnerConfig {
            bus: bus.clone(),
            address: address.clone(),
            config_name: config_name.clone(),
            ..Default::default()
        };

        if let Some(program) = lookup(PROGRAM_ENV).filter(|p| !p.is_empty()) {
            config.program = PathBuf::from(program);
        }
        config.csv_logging = lookup(CSV_ENABLE_ENV)
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        config.output = match lookup(OUTPUT_ENV) {
            Some(v) if v.eq_ignore_ascii_case("json") => OutputFormat::Json,
            _ => OutputFormat::Text,
        };

        Ok(config)
    }

    /// Positional arguments handed to the application
    pub fn program_args(&self) -> [&str; 3] {
        [self.bus.as_str(), self.address.as_str(), self.config_name.as_str()]
    }

    /// The full command line, for display
    pub fn command_line(&self) -> String {
        format!("{} {}", self.program.display(), self.program_args().join(" "))
    }
}
