use chrono::Utc;
use csv::Writer;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

use super::runner::Result;
use crate::measurement::{Measurement, MeasurementRow};

/// Appends parsed measurements to a timestamped CSV file as they arrive.
pub struct CsvLogger {
    writer: Writer<File>,
    path: PathBuf,
    rows: usize,
}

impl CsvLogger {
    /// Create `<directory>/measurements_YYYY-MM-DD_HH-MM-SS.csv`.
    pub fn create(directory: &Path) -> Result<Self> {
        let file_name = chrono::Local::now()
            .format("measurements_%Y-%m-%d_%H-%M-%S.csv")
            .to_string();

        fs::create_dir_all(directory)?;
        let path = directory.join(file_name);
        let writer = Writer::from_writer(File::create(&path)?);

        info!("CSV logging enabled, writing to {}", path.display());
        Ok(CsvLogger { writer, path, rows: 0 })
    }

    pub fn log(&mut self, measurement: &Measurement) -> Result<()> {
        let row = MeasurementRow::new(Utc::now().to_rfc3339(), measurement);
        self.writer.serialize(row)?;
        // Flush per row so the file is usable while the app is still running
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
}
