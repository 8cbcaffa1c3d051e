//! Execution log records
//!
//! One record per (execution, stage, step) whose log is being mirrored.
//! Records are created by the execution controller; the syncer only
//! rewrites `message` and `labels`.

use crate::{PipelineExecutionKey, Scope};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label carrying the sync status of a record.
///
/// `"false"` while the underlying step may still produce output, `"true"`
/// once the record is final. Records are selected for sync on `"false"`.
pub const FINISH_LABEL: &str = "pipeline.management.cattle.io/finish";

const FINISHED: &str = "true";
const IN_PROGRESS: &str = "false";

/// Persisted log of one pipeline step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionLogRecord {
    pub namespace: String,

    pub name: String,

    /// `"<clusterPipelineName>:<executionName>"`
    pub pipeline_execution_name: String,

    /// Index into the execution's stages
    pub stage: usize,

    /// Index into the stage's steps
    pub step: usize,

    /// Log text, plus any error annotations appended by the syncer
    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    /// Store-assigned version for optimistic concurrency
    #[serde(default)]
    pub resource_version: u64,
}

impl ExecutionLogRecord {
    /// Create an in-progress record for a step of an execution.
    ///
    /// The record name is derived as `<execution>-<stage>-<step>`.
    pub fn for_step(
        namespace: impl Into<String>,
        key: &PipelineExecutionKey,
        stage: usize,
        step: usize,
    ) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(FINISH_LABEL.to_string(), IN_PROGRESS.to_string());

        Self {
            namespace: namespace.into(),
            name: format!("{}-{}-{}", key.execution_name, stage, step),
            pipeline_execution_name: key.to_string(),
            stage,
            step,
            message: String::new(),
            labels,
            resource_version: 0,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.labels.get(FINISH_LABEL).map(String::as_str) == Some(FINISHED)
    }

    pub fn is_in_progress(&self) -> bool {
        self.labels.get(FINISH_LABEL).map(String::as_str) == Some(IN_PROGRESS)
    }

    /// Mark the record final. There is no way back.
    pub fn mark_finished(&mut self) {
        self.labels
            .insert(FINISH_LABEL.to_string(), FINISHED.to_string());
    }

    /// Append an annotation on its own line.
    pub fn append_note(&mut self, note: impl std::fmt::Display) {
        self.message.push('\n');
        self.message.push_str(&note.to_string());
    }

    /// `namespace/name`, for logging
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// Equality selector over record labels
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelSelector {
    pub key: String,
    pub value: String,
}

impl LabelSelector {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Records still being synced
    pub fn in_progress() -> Self {
        Self::new(FINISH_LABEL, IN_PROGRESS)
    }

    /// Records already marked finished
    pub fn finished() -> Self {
        Self::new(FINISH_LABEL, FINISHED)
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        labels.get(&self.key) == Some(&self.value)
    }

    /// Scope and label filter combined
    pub fn selects(&self, scope: &Scope, record: &ExecutionLogRecord) -> bool {
        scope.contains(&record.namespace) && self.matches(&record.labels)
    }
}

impl std::fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}
