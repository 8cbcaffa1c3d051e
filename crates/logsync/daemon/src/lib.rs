//! Log Sync Daemon library
//!
//! This module provides the core components for the log sync daemon:
//! - Collaborator traits and the in-memory storage backend
//! - Build engine adapters
//! - The periodic log sync loop
//! - Configuration loading

pub mod config;
pub mod engine;
pub mod error;
pub mod storage;
pub mod syncer;

pub use config::{DaemonConfig, PersistFailurePolicy, SyncerConfig};
pub use engine::{HttpEngine, InMemoryEngine, PipelineEngine};
pub use error::{DaemonError, DaemonResult, EngineError, StorageError};
pub use storage::{ExecutionReader, InMemoryStorage, LogRecordStore, PipelineGate, Seed};
pub use syncer::{CycleOutcome, CycleReport, LogSyncer, LogSyncerBuilder};
