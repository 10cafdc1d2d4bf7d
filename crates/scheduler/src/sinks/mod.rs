//! Result sink implementations

mod file;
mod log;
mod memory;

pub use file::{FileSink, FileSinkConfig};
pub use log::LogSink;
pub use memory::{MemoryRecords, MemorySink};
