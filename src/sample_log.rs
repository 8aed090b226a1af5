//! Append-only external log of accepted samples.
//!
//! When enabled, every sample the acquisition loop accepts is appended as a
//! `timestamp,value` line. Write failures are reported to the operator but
//! never abort acquisition.

use std::path::{Path, PathBuf};

use crate::error::{AppResult, FlowError};
use crate::sample::Sample;

/// CSV-backed sample log.
pub struct SampleLog {
    path: PathBuf,
    #[cfg(feature = "storage_csv")]
    writer: csv::Writer<std::fs::File>,
}

impl SampleLog {
    /// Create the log file (truncating an existing one) and write the
    /// header row.
    #[cfg(feature = "storage_csv")]
    pub fn create(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = std::fs::File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);
        writer
            .write_record(["timestamp", "value"])
            .map_err(|e| FlowError::SampleLog(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| FlowError::SampleLog(e.to_string()))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer,
        })
    }

    #[cfg(not(feature = "storage_csv"))]
    pub fn create(_path: &Path) -> AppResult<Self> {
        Err(FlowError::FeatureNotEnabled("storage_csv"))
    }

    /// Append one accepted sample.
    #[cfg(feature = "storage_csv")]
    pub fn append(&mut self, sample: &Sample) -> AppResult<()> {
        self.writer
            .write_record([
                format!("{:.3}", sample.elapsed_secs),
                sample.value.to_string(),
            ])
            .map_err(|e| FlowError::SampleLog(e.to_string()))?;
        // Flush per sample: the log is an external collaborator that may be
        // tailed while the session runs
        self.writer
            .flush()
            .map_err(|e| FlowError::SampleLog(e.to_string()))?;
        Ok(())
    }

    #[cfg(not(feature = "storage_csv"))]
    pub fn append(&mut self, _sample: &Sample) -> AppResult<()> {
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(all(test, feature = "storage_csv"))]
mod tests {
    use super::*;

    #[test]
    fn appends_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.csv");

        let mut log = SampleLog::create(&path).unwrap();
        log.append(&Sample::new(0.0, 12.5)).unwrap();
        log.append(&Sample::new(1.0, 13.0)).unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines[0], "timestamp,value");
        assert_eq!(lines[1], "0.000,12.5");
        assert_eq!(lines[2], "1.000,13");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/samples.csv");
        assert!(SampleLog::create(&path).is_ok());
        assert!(path.exists());
    }
}
