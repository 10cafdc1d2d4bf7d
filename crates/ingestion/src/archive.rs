//! ArchiveReader - JSON Lines observation archive
//!
//! Layout: `<root>/<sensor-id>/<version>/*.jsonl`, one `ObservationRecord`
//! per line. A file whose name starts with a `YYYY-MM-DD` date holds
//! observations from that day and, for orbits crossing midnight, the next
//! one. Files whose two-day span cannot intersect the window are skipped.

use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate, NaiveTime};
use contracts::{
    ContractError, ObservationReader, ObservationRecord, SensorSpec, TimeWindow, DATE_FORMAT,
};
use tracing::{debug, instrument};

/// Archive file extension
pub const ARCHIVE_EXTENSION: &str = "jsonl";

/// Reader over a directory tree of JSON Lines files
#[derive(Debug, Clone)]
pub struct ArchiveReader {
    root: PathBuf,
}

impl ArchiveReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one sensor version
    pub fn sensor_dir(&self, sensor: &SensorSpec) -> PathBuf {
        self.root.join(sensor.id.as_str()).join(&sensor.version)
    }

    async fn list_files(
        &self,
        dir: &Path,
        window: &TimeWindow,
    ) -> std::io::Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_archive = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(ARCHIVE_EXTENSION));
            if is_archive && may_overlap(&path, window) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Days covered by a file named after its start day
const FILE_SPAN_DAYS: i64 = 2;

/// Whether a file named after a day can hold observations of `window`
fn may_overlap(path: &Path, window: &TimeWindow) -> bool {
    let day = path
        .file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.get(..10))
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, DATE_FORMAT).ok());
    match day {
        Some(day) => {
            let start = day.and_time(NaiveTime::MIN).and_utc();
            TimeWindow::new(start, start + Duration::days(FILE_SPAN_DAYS))
                .intersect(window)
                .is_some()
        }
        None => true,
    }
}

impl ObservationReader for ArchiveReader {
    #[instrument(
        name = "archive_read",
        skip(self, sensor),
        fields(sensor = %sensor.id, version = %sensor.version, window = %window)
    )]
    async fn read(
        &self,
        sensor: &SensorSpec,
        window: &TimeWindow,
    ) -> Result<Vec<ObservationRecord>, ContractError> {
        let dir = self.sensor_dir(sensor);
        let files = match self.list_files(&dir, window).await {
            Ok(files) => files,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ContractError::source_missing(
                    sensor.id.as_str(),
                    *window,
                    format!("archive directory {} does not exist", dir.display()),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for file in &files {
            let content = tokio::fs::read_to_string(file).await?;
            for (line_no, line) in content.lines().enumerate() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let record: ObservationRecord = serde_json::from_str(line).map_err(|e| {
                    ContractError::source_corrupt(
                        sensor.id.as_str(),
                        *window,
                        format!("{}:{}: {e}", file.display(), line_no + 1),
                    )
                })?;
                if window.contains(record.timestamp) {
                    records.push(record);
                }
            }
        }

        debug!(files = files.len(), records = records.len(), "archive scanned");
        if records.is_empty() {
            return Err(ContractError::source_missing(
                sensor.id.as_str(),
                *window,
                "no observations in window",
            ));
        }
        Ok(records)
    }
}
