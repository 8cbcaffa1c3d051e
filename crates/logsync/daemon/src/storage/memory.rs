//! In-memory storage implementation

use super::traits::*;
use crate::error::{DaemonResult, StorageError};
use async_trait::async_trait;
use logsync_types::{ClusterPipeline, ExecutionLogRecord, LabelSelector, PipelineExecution, Scope};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

type ObjectKey = (String, String);

fn object_key(namespace: &str, name: &str) -> ObjectKey {
    (namespace.to_string(), name.to_string())
}

/// Initial contents for an in-memory store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub cluster_pipelines: Vec<ClusterPipeline>,

    #[serde(default)]
    pub executions: Vec<PipelineExecution>,

    #[serde(default)]
    pub log_records: Vec<ExecutionLogRecord>,
}

impl Seed {
    /// Read a JSON seed file
    pub fn from_file(path: impl AsRef<Path>) -> DaemonResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            StorageError::InvalidData(format!("{}: {}", path.display(), e)).into()
        })
    }
}

/// In-memory storage for development and testing
///
/// Records and executions are kept ordered by `(namespace, name)` so list
/// results come back in a stable order.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    cluster_pipelines: Arc<RwLock<HashMap<String, ClusterPipeline>>>,
    executions: Arc<RwLock<BTreeMap<ObjectKey, PipelineExecution>>>,
    log_records: Arc<RwLock<BTreeMap<ObjectKey, ExecutionLogRecord>>>,
}

impl InMemoryStorage {
    /// Create a new in-memory storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a storage populated from a seed
    pub async fn from_seed(seed: Seed) -> StorageResult<Self> {
        let storage = Self::new();
        for pipeline in seed.cluster_pipelines {
            storage.upsert_cluster_pipeline(pipeline).await;
        }
        for execution in seed.executions {
            storage.upsert_execution(execution).await;
        }
        for record in seed.log_records {
            storage.create_log_record(record).await?;
        }
        Ok(storage)
    }

    pub async fn upsert_cluster_pipeline(&self, pipeline: ClusterPipeline) {
        let mut pipelines = self.cluster_pipelines.write().await;
        pipelines.insert(pipeline.cluster_name.clone(), pipeline);
    }

    /// Create or replace an execution
    pub async fn upsert_execution(&self, execution: PipelineExecution) {
        let mut executions = self.executions.write().await;
        executions.insert(object_key(&execution.namespace, &execution.name), execution);
    }

    #[cfg(test)]
    pub async fn delete_execution(&self, namespace: &str, name: &str) -> bool {
        let mut executions = self.executions.write().await;
        executions.remove(&object_key(namespace, name)).is_some()
    }

    /// Create a log record; its version starts at 1.
    pub async fn create_log_record(
        &self,
        mut record: ExecutionLogRecord,
    ) -> StorageResult<ExecutionLogRecord> {
        let mut records = self.log_records.write().await;
        let key = object_key(&record.namespace, &record.name);
        if records.contains_key(&key) {
            return Err(StorageError::Conflict(format!(
                "log record {} already exists",
                record.qualified_name()
            )));
        }
        record.resource_version = 1;
        records.insert(key, record.clone());
        Ok(record)
    }

    pub async fn get_log_record(&self, namespace: &str, name: &str) -> Option<ExecutionLogRecord> {
        let records = self.log_records.read().await;
        records.get(&object_key(namespace, name)).cloned()
    }
}

#[async_trait]
impl LogRecordStore for InMemoryStorage {
    async fn list_log_records(
        &self,
        scope: &Scope,
        selector: &LabelSelector,
    ) -> StorageResult<Vec<ExecutionLogRecord>> {
        let records = self.log_records.read().await;
        Ok(records
            .values()
            .filter(|r| selector.selects(scope, r))
            .cloned()
            .collect())
    }

    async fn update_log_record(
        &self,
        mut record: ExecutionLogRecord,
    ) -> StorageResult<ExecutionLogRecord> {
        let mut records = self.log_records.write().await;
        let stored = records
            .get_mut(&object_key(&record.namespace, &record.name))
            .ok_or_else(|| {
                StorageError::NotFound(format!("log record {}", record.qualified_name()))
            })?;

        if stored.resource_version != record.resource_version {
            return Err(StorageError::Conflict(format!(
                "log record {} has version {}, update was based on {}",
                record.qualified_name(),
                stored.resource_version,
                record.resource_version
            )));
        }

        record.resource_version += 1;
        *stored = record.clone();
        Ok(record)
    }
}

#[async_trait]
impl ExecutionReader for InMemoryStorage {
    async fn get_execution(&self, namespace: &str, name: &str) -> StorageResult<PipelineExecution> {
        let executions = self.executions.read().await;
        executions
            .get(&object_key(namespace, name))
            .cloned()
            .ok_or_else(|| {
                StorageError::NotFound(format!("pipeline execution {}/{}", namespace, name))
            })
    }
}

#[async_trait]
impl PipelineGate for InMemoryStorage {
    async fn is_pipeline_enabled(&self, scope: &Scope) -> bool {
        let pipelines = self.cluster_pipelines.read().await;
        pipelines
            .get(&scope.cluster)
            .map_or(false, |p| p.deploy)
    }
}
