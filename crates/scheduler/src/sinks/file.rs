//! FileSink - JSON Lines output, one file per record kind

use contracts::{ContractError, OutputRecord, ResultSink};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Output directory
    pub base_path: PathBuf,
    /// File name prefix, usually the run name
    pub file_prefix: Option<String>,
}

impl FileSinkConfig {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            file_prefix: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = Some(prefix.into());
        self
    }

    /// Output file for a record kind
    pub fn path_for(&self, kind: &str) -> PathBuf {
        let file_name = match &self.file_prefix {
            Some(prefix) => format!("{prefix}-{kind}.jsonl"),
            None => format!("{kind}.jsonl"),
        };
        self.base_path.join(file_name)
    }
}

/// Sink that appends records to JSON Lines files
///
/// Keys of records already on disk are loaded at start, so re-delivered
/// records and re-runs into the same directory do not duplicate output.
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    writers: HashMap<&'static str, BufWriter<File>>,
    seen: HashSet<String>,
    written: u64,
    duplicates: u64,
}

impl FileSink {
    /// Create a new FileSink
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        fs::create_dir_all(&config.base_path)?;

        let mut seen = HashSet::new();
        for kind in ["observation", "matchup"] {
            load_keys(&config.path_for(kind), &mut seen)?;
        }
        if !seen.is_empty() {
            debug!(existing = seen.len(), "FileSink resuming over existing output");
        }

        Ok(Self {
            name: name.into(),
            config,
            writers: HashMap::new(),
            seen,
            written: 0,
            duplicates: 0,
        })
    }

    pub fn config(&self) -> &FileSinkConfig {
        &self.config
    }

    fn writer_for(&mut self, kind: &'static str) -> std::io::Result<&mut BufWriter<File>> {
        if !self.writers.contains_key(kind) {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.config.path_for(kind))?;
            self.writers.insert(kind, BufWriter::new(file));
        }
        self.writers
            .get_mut(kind)
            .ok_or_else(|| std::io::Error::other("writer missing after open"))
    }

    fn write_record(&mut self, record: &OutputRecord) -> std::io::Result<()> {
        let line = serde_json::to_string(record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let writer = self.writer_for(record.kind_name())?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")
    }
}

fn load_keys(path: &Path, seen: &mut HashSet<String>) -> std::io::Result<()> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    for line in BufReader::new(file).lines() {
        let line = line?;
        match serde_json::from_str::<OutputRecord>(&line) {
            Ok(record) => {
                seen.insert(record.record_key());
            }
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable output line"),
        }
    }
    Ok(())
}

impl ResultSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn append(&mut self, record: &OutputRecord) -> Result<(), ContractError> {
        let key = record.record_key();
        if self.seen.contains(&key) {
            self.duplicates += 1;
            return Ok(());
        }
        self.write_record(record)
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        self.seen.insert(key);
        self.written += 1;
        Ok(())
    }

    #[instrument(name = "file_sink_flush", skip(self), fields(sink = %self.name))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        for writer in self.writers.values_mut() {
            writer
                .flush()
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        }
        Ok(())
    }

    #[instrument(name = "file_sink_close", skip(self), fields(sink = %self.name))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.flush().await?;
        self.writers.clear();
        info!(
            sink = %self.name,
            written = self.written,
            duplicates = self.duplicates,
            path = %self.config.base_path.display(),
            "FileSink closed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use contracts::{MatchupRecord, ObservationRecord};
    use std::collections::BTreeMap;

    fn observation(i: u32) -> ObservationRecord {
        ObservationRecord::new(
            "avhrr-n18",
            Utc.with_ymd_and_hms(2012, 2, 1, 0, i, 0).unwrap(),
            1.0,
            2.0,
            format!("orbit-7:{i}"),
        )
    }

    fn matchup(i: u32) -> OutputRecord {
        MatchupRecord {
            primary_obs_ref: observation(i).obs_ref(),
            secondary_obs_ref: observation(i + 1).obs_ref(),
            time_delta_ms: 60_000,
            spatial_distance_km: 0.5,
            values: BTreeMap::new(),
        }
        .into()
    }

    fn line_count(path: &Path) -> usize {
        fs::read_to_string(path).unwrap().lines().count()
    }

    #[tokio::test]
    async fn test_file_sink_writes_per_kind() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = FileSinkConfig::new(temp_dir.path()).with_prefix("usecase02");
        let mut sink = FileSink::new("file", config.clone()).unwrap();

        sink.append(&observation(1).into()).await.unwrap();
        sink.append(&matchup(1)).await.unwrap();
        sink.append(&matchup(2)).await.unwrap();
        sink.close().await.unwrap();

        assert_eq!(line_count(&config.path_for("observation")), 1);
        assert_eq!(line_count(&config.path_for("matchup")), 2);
        assert!(temp_dir.path().join("usecase02-matchup.jsonl").exists());
    }

    #[tokio::test]
    async fn test_file_sink_is_idempotent_across_reopen() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = FileSinkConfig::new(temp_dir.path());

        let mut sink = FileSink::new("file", config.clone()).unwrap();
        sink.append(&matchup(1)).await.unwrap();
        sink.append(&matchup(1)).await.unwrap();
        sink.close().await.unwrap();
        assert_eq!(line_count(&config.path_for("matchup")), 1);

        let mut reopened = FileSink::new("file", config.clone()).unwrap();
        reopened.append(&matchup(1)).await.unwrap();
        reopened.append(&matchup(3)).await.unwrap();
        reopened.close().await.unwrap();
        assert_eq!(line_count(&config.path_for("matchup")), 2);
    }
}
