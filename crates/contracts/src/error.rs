//! Layered error definitions
//!
//! Categorized by source: config / registration / source data / job / sink

use thiserror::Error;

use crate::TimeWindow;

/// Why a reader could not deliver observations for a window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceDataKind {
    /// No readable input for the window (sparse coverage)
    Missing,
    /// Input exists but is malformed
    Corrupt,
}

impl std::fmt::Display for SourceDataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "missing"),
            Self::Corrupt => write!(f, "corrupt"),
        }
    }
}

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Registration Errors =====
    /// A sensor role was registered twice
    #[error("duplicate {role} sensor: '{existing}' already registered, rejected '{rejected}'")]
    DuplicateRole {
        role: String,
        existing: String,
        rejected: String,
    },

    /// Registered sensors have no common validity interval
    #[error("sensors {sensors:?} have no overlapping validity interval")]
    EmptyInterval { sensors: Vec<String> },

    // ===== Job Errors =====
    /// Reader could not deliver observations
    #[error("{kind} source data for sensor '{sensor_id}' in {window}: {message}")]
    SourceData {
        sensor_id: String,
        window: TimeWindow,
        kind: SourceDataKind,
        message: String,
    },

    /// Job exceeded its execution timeout
    #[error("job {job_id} timed out after {timeout_ms}ms")]
    JobTimeout { job_id: u64, timeout_ms: u64 },

    /// Host could not accept or finish the job
    #[error("host '{host}' unavailable: {message}")]
    HostUnavailable { host: String, message: String },

    /// Collocation could not be computed
    #[error("matchup computation error: {message}")]
    MatchupComputation { message: String },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create missing source data error
    pub fn source_missing(
        sensor_id: impl Into<String>,
        window: TimeWindow,
        message: impl Into<String>,
    ) -> Self {
        Self::SourceData {
            sensor_id: sensor_id.into(),
            window,
            kind: SourceDataKind::Missing,
            message: message.into(),
        }
    }

    /// Create corrupt source data error
    pub fn source_corrupt(
        sensor_id: impl Into<String>,
        window: TimeWindow,
        message: impl Into<String>,
    ) -> Self {
        Self::SourceData {
            sensor_id: sensor_id.into(),
            window,
            kind: SourceDataKind::Corrupt,
            message: message.into(),
        }
    }

    /// Create host unavailable error
    pub fn host_unavailable(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HostUnavailable {
            host: host.into(),
            message: message.into(),
        }
    }

    /// Create matchup computation error
    pub fn matchup(message: impl Into<String>) -> Self {
        Self::MatchupComputation {
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Errors that must abort a run before any job is created
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigParse { .. }
                | Self::ConfigValidation { .. }
                | Self::DuplicateRole { .. }
                | Self::EmptyInterval { .. }
        )
    }

    /// Per-job errors worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::SourceData { kind, .. } => *kind == SourceDataKind::Corrupt,
            Self::JobTimeout { .. }
            | Self::HostUnavailable { .. }
            | Self::MatchupComputation { .. }
            | Self::SinkWrite { .. }
            | Self::Io(_)
            | Self::Other(_) => true,
            _ => false,
        }
    }

    /// Missing input is an expected, empty outcome rather than a failure
    pub fn is_missing_source(&self) -> bool {
        matches!(
            self,
            Self::SourceData {
                kind: SourceDataKind::Missing,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn window() -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2010, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2010, 2, 1, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_classification() {
        assert!(ContractError::config_validation("f", "bad").is_fatal());
        assert!(!ContractError::config_validation("f", "bad").is_retryable());

        let missing = ContractError::source_missing("avhrr-n18", window(), "no files");
        assert!(missing.is_missing_source());
        assert!(!missing.is_retryable());

        let corrupt = ContractError::source_corrupt("avhrr-n18", window(), "bad line");
        assert!(corrupt.is_retryable());
        assert!(!corrupt.is_fatal());

        assert!(ContractError::JobTimeout {
            job_id: 1,
            timeout_ms: 10
        }
        .is_retryable());
        assert!(ContractError::host_unavailable("node1", "down").is_retryable());
        assert!(ContractError::matchup("nan latitude").is_retryable());
    }

    #[test]
    fn test_display_contains_context() {
        let err = ContractError::source_corrupt("hirs-n18", window(), "line 3");
        let text = err.to_string();
        assert!(text.contains("corrupt"), "got: {text}");
        assert!(text.contains("hirs-n18"), "got: {text}");
    }
}
