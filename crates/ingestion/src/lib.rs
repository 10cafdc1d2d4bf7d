//! # Ingestion
//!
//! Single-sensor observation ingestion.
//!
//! Responsibilities:
//! - Read a sensor's observations for one time window via `ObservationReader`
//! - Normalize them into canonical `ObservationRecord`s
//! - Classify missing input (empty success) and corrupt input (retryable)
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{ArchiveReader, IngestionEngine};
//!
//! let engine = IngestionEngine::new(ArchiveReader::new("/data/archive"));
//! let records = engine.ingest(&sensor, &window).await?;
//! ```
//!
//! ## Mock Testing
//!
//! ```ignore
//! use ingestion::{GroundTrack, MockObservationReader};
//!
//! let reader = MockObservationReader::new().with_track("avhrr-n18", GroundTrack::default());
//! ```

mod archive;
mod engine;
mod metrics;
mod mock;
mod normalize;

pub use archive::{ArchiveReader, ARCHIVE_EXTENSION};
pub use engine::IngestionEngine;
pub use metrics::{IngestionMetrics, MetricsSnapshot};
pub use mock::{GroundTrack, MockObservationReader};
pub use normalize::{normalize, wrap_longitude};
