//! Storage layer for logsync-daemon
//!
//! The syncer consumes three collaborators: the log record store, the
//! execution reader and the pipeline gate. The in-memory backend implements
//! all three.

mod memory;
mod traits;

pub use memory::{InMemoryStorage, Seed};
pub use traits::{ExecutionReader, LogRecordStore, PipelineGate, StorageResult};
