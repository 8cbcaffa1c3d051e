//! Error types for log sync data

use thiserror::Error;

/// A composite execution key that does not split into exactly two parts
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid pipeline execution name - {key}")]
pub struct KeyError {
    pub key: String,
}

/// A stage or step position that does not exist in an execution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("stage {stage} out of range ({len} stages)")]
    Stage { stage: usize, len: usize },

    #[error("step {step} out of range in stage {stage} ({len} steps)")]
    Step { stage: usize, step: usize, len: usize },
}
