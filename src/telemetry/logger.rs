//! # JSONL Sample Logger
//!
//! One line per sent report:
//!
//! ```text
//! {"timestamp":"2026-10-18T09:12:01.250+00:00","quaternion":{"w":1.0,"x":0.0,"y":0.0,"z":0.0},
//!  "angles":{"yaw":0.0,"pitch":0.0,"roll":0.0},"axes":{"x":0,...,"rz":16383,...}}
//! ```
//!
//! Files are named `orientation_<YYYYmmdd_HHMMSS>_<index>.jsonl`, so name
//! order is creation order.

use chrono::Utc;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::TelemetryConfig;
use crate::error::Result;
use crate::gamepad::AxisReport;
use crate::orientation::{EulerAngles, MappedOrientation, Quaternion};

const FILE_PREFIX: &str = "orientation_";
const FILE_EXTENSION: &str = "jsonl";

/// One JSONL line
#[derive(Debug, Serialize)]
pub struct SampleRecord<'a> {
    pub timestamp: String,
    pub quaternion: &'a Quaternion,
    pub angles: &'a EulerAngles,
    pub axes: &'a AxisReport,
}

/// Rotating JSONL writer for orientation samples
#[derive(Debug)]
pub struct TelemetryLogger {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    current_path: Option<PathBuf>,
    records_in_file: usize,
    file_index: u64,
}

impl TelemetryLogger {
    /// Create a logger writing into `config.log_dir` (created if missing)
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        let dir = PathBuf::from(&config.log_dir);
        fs::create_dir_all(&dir)?;
        info!("Telemetry logging to {}", dir.display());

        Ok(Self {
            dir,
            max_records_per_file: config.max_records_per_file,
            max_files_to_keep: config.max_files_to_keep,
            writer: None,
            current_path: None,
            records_in_file: 0,
            file_index: 0,
        })
    }

    /// Append one sample
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be opened or written
    pub fn record(&mut self, quaternion: &Quaternion, mapped: &MappedOrientation) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        let record = SampleRecord {
            timestamp: Utc::now().to_rfc3339(),
            quaternion,
            angles: &mapped.angles,
            axes: &mapped.report,
        };

        if let Some(writer) = self.writer.as_mut() {
            serde_json::to_writer(&mut *writer, &record)?;
            writer.write_all(b"\n")?;
        }
        self.records_in_file += 1;
        Ok(())
    }

    /// Flush buffered lines to disk
    pub fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    /// File currently written to
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    fn rotate(&mut self) -> Result<()> {
        self.flush()?;

        let name = format!(
            "{}{}_{:04}.{}",
            FILE_PREFIX,
            Utc::now().format("%Y%m%d_%H%M%S"),
            self.file_index,
            FILE_EXTENSION
        );
        let path = self.dir.join(name);
        self.file_index += 1;

        let file = File::create(&path)?;
        debug!("Opened telemetry file {}", path.display());

        self.writer = Some(BufWriter::new(file));
        self.current_path = Some(path);
        self.records_in_file = 0;

        self.prune()
    }

    /// Delete the oldest files beyond `max_files_to_keep`
    fn prune(&self) -> Result<()> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_telemetry_file(path))
            .collect();

        if files.len() <= self.max_files_to_keep {
            return Ok(());
        }

        files.sort();
        let excess = files.len() - self.max_files_to_keep;
        for path in &files[..excess] {
            debug!("Removing old telemetry file {}", path.display());
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

impl Drop for TelemetryLogger {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

fn is_telemetry_file(path: &Path) -> bool {
    let name_matches = path
        .file_name()
        .and_then(|name| name.to_str())
        .map_or(false, |name| name.starts_with(FILE_PREFIX));
    let extension_matches = path.extension().map_or(false, |ext| ext == FILE_EXTENSION);
    name_matches && extension_matches
}
