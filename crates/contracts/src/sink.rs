//! ResultSink trait - append-only record consumer
//!
//! Defines the abstract interface for result sinks.

use crate::{ContractError, OutputRecord};

/// Record output trait
///
/// Records arrive out of order from independent windows, and the same record
/// may be delivered more than once after a retry. Implementations should key
/// appends on [`OutputRecord::record_key`].
#[trait_variant::make(ResultSink: Send)]
pub trait LocalResultSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Append one record
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn append(&mut self, record: &OutputRecord) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
