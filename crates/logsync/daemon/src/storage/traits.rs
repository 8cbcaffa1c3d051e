//! Storage trait definitions

use crate::error::StorageError;
use async_trait::async_trait;
use logsync_types::{ExecutionLogRecord, LabelSelector, PipelineExecution, Scope};

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence for execution log records
#[async_trait]
pub trait LogRecordStore: Send + Sync {
    /// List records in scope whose labels match the selector.
    ///
    /// An empty result is not an error.
    async fn list_log_records(
        &self,
        scope: &Scope,
        selector: &LabelSelector,
    ) -> StorageResult<Vec<ExecutionLogRecord>>;

    /// Replace a record. The store owns conflict resolution; a stale
    /// `resource_version` surfaces as [`StorageError::Conflict`].
    async fn update_log_record(
        &self,
        record: ExecutionLogRecord,
    ) -> StorageResult<ExecutionLogRecord>;
}

/// Read access to pipeline executions
#[async_trait]
pub trait ExecutionReader: Send + Sync {
    /// Get an execution; a missing one is [`StorageError::NotFound`].
    async fn get_execution(&self, namespace: &str, name: &str) -> StorageResult<PipelineExecution>;
}

/// Whether pipeline execution is deployed for a scope
#[async_trait]
pub trait PipelineGate: Send + Sync {
    async fn is_pipeline_enabled(&self, scope: &Scope) -> bool;
}
