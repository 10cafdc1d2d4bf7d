//! MemorySink - collects records in shared memory

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use contracts::{ContractError, OutputRecord, ResultSink};

#[derive(Debug, Default)]
struct Inner {
    records: Vec<OutputRecord>,
    keys: HashSet<String>,
    duplicates: u64,
}

/// Shared view of the records a `MemorySink` collected
#[derive(Debug, Clone, Default)]
pub struct MemoryRecords {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryRecords {
    /// Distinct records in arrival order
    pub fn records(&self) -> Vec<OutputRecord> {
        self.inner
            .lock()
            .map(|inner| inner.records.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends skipped because the record key was already present
    pub fn duplicates(&self) -> u64 {
        self.inner.lock().map(|inner| inner.duplicates).unwrap_or(0)
    }
}

/// In-memory, key-deduplicating sink for tests and embedding
pub struct MemorySink {
    name: String,
    shared: MemoryRecords,
}

impl MemorySink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shared: MemoryRecords::default(),
        }
    }

    /// Handle that stays readable after the sink is moved into a worker
    pub fn records(&self) -> MemoryRecords {
        self.shared.clone()
    }
}

impl ResultSink for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn append(&mut self, record: &OutputRecord) -> Result<(), ContractError> {
        let mut inner = self
            .shared
            .inner
            .lock()
            .map_err(|_| ContractError::sink_write(&self.name, "record store poisoned"))?;
        if inner.keys.insert(record.record_key()) {
            inner.records.push(record.clone());
        } else {
            inner.duplicates += 1;
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use contracts::ObservationRecord;

    #[tokio::test]
    async fn test_duplicate_appends_are_idempotent() {
        let mut sink = MemorySink::new("mem");
        let records = sink.records();
        let record: OutputRecord = ObservationRecord::new(
            "bottle-sst",
            Utc.with_ymd_and_hms(1999, 9, 9, 9, 9, 9).unwrap(),
            1.0,
            2.0,
            "cast-9",
        )
        .into();

        sink.append(&record).await.unwrap();
        sink.append(&record).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records.duplicates(), 1);
    }
}
