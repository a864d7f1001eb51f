//! Drives the instrumentation application and classifies its output.

use std::io::{self, BufRead, BufReader, Write};
use std::process::{Command, ExitStatus};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::config::{OutputFormat, RunnerConfig};
use super::csv_log::CsvLogger;
use crate::measurement::{parse_measurement_line, Measurement};

/// Prefix for application output that is not a measurement
pub const PASSTHROUGH_TAG: &str = "[C-APP]";

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("The application '{program}' was not found")]
    NotFound { program: String },

    #[error("Failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Usage error: {0}")]
    Usage(String),
}

pub type Result<T> = std::result::Result<T, RunnerError>;

/// Line counts for one pass over the application's output
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StreamCounts {
    pub measurements: usize,
    pub passthrough: usize,
}

/// Outcome of a completed run
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub counts: StreamCounts,
    pub status: ExitStatus,
}

impl RunSummary {
    /// `true` when the application exited with a non-zero code or a signal
    pub fn child_failed(&self) -> bool {
        !self.status.success()
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.status.code()
    }
}

/// Launch the application, print its output as it arrives and reap it.
///
/// Stdout and stderr of the child share a single pipe, so lines are seen in
/// the order the child wrote them. A non-zero exit of the child is returned
/// in the summary, not as an error.
pub fn run_instrumentation<W: Write>(config: &RunnerConfig, out: &mut W) -> Result<RunSummary> {
    let command_line = config.command_line();
    info!("Starting subprocess with command: {}", command_line);
    writeln!(out, "Starting subprocess with command: {}", command_line)?;

    let mut csv_logger = open_csv_logger(config);

    let (reader, writer) = io::pipe()?;
    let mut command = Command::new(&config.program);
    command
        .args(config.program_args())
        .stdout(writer.try_clone()?)
        .stderr(writer);

    let mut child = command.spawn().map_err(|e| spawn_error(config, e))?;
    // Release our copies of the write end, otherwise the read loop never sees EOF
    drop(command);
    info!("Subprocess started with pid {}", child.id());

    let streamed = process_stream(
        BufReader::new(reader),
        out,
        config.output,
        csv_logger.as_mut(),
    );

    let counts = match streamed {
        Ok(counts) => counts,
        Err(e) => {
            error!("Reading subprocess output failed: {}", e);
            let _ = child.kill();
            let _ = child.wait();
            return Err(e);
        }
    };

    let status = child.wait()?;
    match status.code() {
        Some(0) => info!("Subprocess exited cleanly"),
        Some(code) => warn!("Subprocess exited with error code: {}", code),
        None => warn!("Subprocess terminated by signal"),
    }
    info!(
        "Run finished: {} measurements, {} passthrough lines",
        counts.measurements, counts.passthrough
    );
    if let Some(logger) = &csv_logger {
        info!("{} rows written to {}", logger.rows(), logger.path().display());
    }

    Ok(RunSummary { counts, status })
}

/// Classify every line of `reader` and print the result to `out`.
///
/// Each line is handled as soon as it is read. A failing CSV log is
/// reported once and then abandoned; the console output continues.
pub fn process_stream<R, W>(
    mut reader: R,
    out: &mut W,
    format: OutputFormat,
    mut csv_logger: Option<&mut CsvLogger>,
) -> Result<StreamCounts>
where
    R: BufRead,
    W: Write,
{
    let mut counts = StreamCounts::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);

        match parse_measurement_line(&line) {
            Some(measurement) => {
                write_measurement(out, &measurement, format)?;
                if let Some(logger) = csv_logger.as_deref_mut() {
                    if let Err(e) = logger.log(&measurement) {
                        warn!("Disabling CSV log after write failure: {}", e);
                        eprintln!("Warning: CSV logging stopped: {}", e);
                        csv_logger = None;
                    }
                }
                counts.measurements += 1;
            }
            None => {
                debug!("Passthrough line: {}", line.trim());
                writeln!(out, "{} {}", PASSTHROUGH_TAG, line.trim())?;
                counts.passthrough += 1;
            }
        }
        out.flush()?;
    }

    Ok(counts)
}

fn write_measurement<W: Write>(out: &mut W, measurement: &Measurement, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => writeln!(out, "{}", measurement)?,
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, measurement)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn open_csv_logger(config: &RunnerConfig) -> Option<CsvLogger> {
    if !config.csv_logging {
        debug!("CSV logging disabled");
        return None;
    }
    match CsvLogger::create(&config.csv_directory) {
        Ok(logger) => Some(logger),
        Err(e) => {
            warn!("Could not create CSV log in {}: {}", config.csv_directory.display(), e);
            eprintln!("Warning: CSV logging disabled: {}", e);
            None
        }
    }
}

fn spawn_error(config: &RunnerConfig, source: io::Error) -> RunnerError {
    let program = config.program.display().to_string();
    if source.kind() == io::ErrorKind::NotFound {
        error!("Application not found: {}", program);
        RunnerError::NotFound { program }
    } else {
        error!("Failed to launch {}: {}", program, source);
        RunnerError::Spawn { program, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run_stream(input: &[u8], format: OutputFormat) -> (StreamCounts, String) {
        let mut out = Vec::new();
        let counts = process_stream(Cursor::new(input), &mut out, format, None).unwrap();
        (counts, String::from_utf8(out).unwrap())
    }

    #[test]
    fn measurement_and_status_lines_keep_their_order() {
        let input = b"Status: booting sensors...\n\
A0: corrente-bateria-bombordo | ADC:  7581 | Value:    -0.29 A\n\
Sensors ready\n";
        let (counts, out) = run_stream(input, OutputFormat::Text);
        assert_eq!(counts, StreamCounts { measurements: 1, passthrough: 2 });
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            [
                "[C-APP] Status: booting sensors...",
                "Measurement(channel=0, field_name=corrente-bateria-bombordo, adc=7581, value=-0.29, unit=A)",
                "[C-APP] Sensors ready",
            ]
        );
    }

    #[test]
    fn last_line_without_newline_is_processed() {
        let (counts, out) = run_stream(b"first\r\nA1: x | ADC: 5 | Value: 0.5 V", OutputFormat::Text);
        assert_eq!(counts, StreamCounts { measurements: 1, passthrough: 1 });
        assert!(out.starts_with("[C-APP] first\n"));
    }

    #[test]
    fn invalid_utf8_becomes_passthrough() {
        let (counts, out) = run_stream(b"\xff\xfe garbage\n", OutputFormat::Text);
        assert_eq!(counts.passthrough, 1);
        assert!(out.starts_with(PASSTHROUGH_TAG));
    }

    #[test]
    fn json_format_prints_one_object_per_record() {
        let (_, out) = run_stream(b"A2: tensao | ADC: 100 | Value: 12.5 V\n", OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(value["channel"], 2);
        assert_eq!(value["adc"], 100);
        assert_eq!(value["value"], 12.5);
        assert_eq!(value["unit"], "V");
    }

    #[test]
    fn missing_program_is_not_found() {
        let config = RunnerConfig {
            program: "/nonexistent/build/instrumentation-app".into(),
            ..Default::default()
        };
        let mut out = Vec::new();
        let err = run_instrumentation(&config, &mut out).unwrap_err();
        assert!(matches!(err, RunnerError::NotFound { .. }));
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use tempfile::TempDir;

        /// Runs `script` through `/bin/sh`, which receives the script path as
        /// its first positional argument.
        fn run_script(script: &str, config: RunnerConfig) -> (RunSummary, String, TempDir) {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("fake-app.sh");
            std::fs::write(&path, script).unwrap();
            let config = RunnerConfig {
                program: "/bin/sh".into(),
                bus: path.display().to_string(),
                ..config
            };
            let mut out = Vec::new();
            let summary = run_instrumentation(&config, &mut out).unwrap();
            (summary, String::from_utf8(out).unwrap(), dir)
        }

        #[test]
        fn merges_stderr_and_reports_exit_code() {
            let script = "echo 'Status: booting sensors...' >&2\n\
echo 'A0: corrente | ADC: 7581 | Value: -0.29 A'\n\
echo \"args: $1 $2\"\n\
exit 3\n";
            let (summary, out, _dir) = run_script(script, RunnerConfig::default());
            assert!(summary.child_failed());
            assert_eq!(summary.exit_code(), Some(3));
            assert_eq!(summary.counts, StreamCounts { measurements: 1, passthrough: 2 });

            let lines: Vec<&str> = out.lines().collect();
            assert!(lines[0].starts_with("Starting subprocess with command: /bin/sh "));
            assert_eq!(lines[1], "[C-APP] Status: booting sensors...");
            assert!(lines[2].starts_with("Measurement(channel=0, field_name=corrente"));
            assert_eq!(lines[3], "[C-APP] args: 0x48 configA");
        }

        #[test]
        fn clean_exit_is_not_a_failure() {
            let (summary, _, _dir) = run_script("echo done\n", RunnerConfig::default());
            assert!(!summary.child_failed());
            assert_eq!(summary.exit_code(), Some(0));
        }

        #[test]
        fn csv_log_receives_parsed_records() {
            let logs = TempDir::new().unwrap();
            let config = RunnerConfig {
                csv_logging: true,
                csv_directory: logs.path().to_path_buf(),
                ..Default::default()
            };
            let script = "echo 'A1: tensao | ADC: 10 | Value: 1.5 V'\necho noise\n";
            let (summary, _, _dir) = run_script(script, config);
            assert_eq!(summary.counts.measurements, 1);

            let files: Vec<_> = std::fs::read_dir(logs.path()).unwrap().collect();
            assert_eq!(files.len(), 1);
            let contents = std::fs::read_to_string(files[0].as_ref().unwrap().path()).unwrap();
            assert_eq!(contents.lines().count(), 2);
            assert!(contents.contains(",1,tensao,10,1.5,V"));
        }
    }
}
