//! Composite back-reference from a log record to its execution

use crate::KeyError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator between the cluster pipeline name and the execution name
pub const KEY_SEPARATOR: char = ':';

/// Parsed `"<clusterPipelineName>:<executionName>"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PipelineExecutionKey {
    pub cluster_pipeline_name: String,
    pub execution_name: String,
}

impl PipelineExecutionKey {
    pub fn new(cluster_pipeline_name: impl Into<String>, execution_name: impl Into<String>) -> Self {
        Self {
            cluster_pipeline_name: cluster_pipeline_name.into(),
            execution_name: execution_name.into(),
        }
    }

    /// Split on the separator; anything other than exactly two parts is rejected.
    pub fn parse(key: &str) -> Result<Self, KeyError> {
        let mut parts = key.split(KEY_SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(pipeline), Some(execution), None) => Ok(Self::new(pipeline, execution)),
            _ => Err(KeyError {
                key: key.to_string(),
            }),
        }
    }
}

impl FromStr for PipelineExecutionKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PipelineExecutionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.cluster_pipeline_name, KEY_SEPARATOR, self.execution_name
        )
    }
}
