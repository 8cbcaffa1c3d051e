//! Log Sync Types - Core types for pipeline execution log sync
//!
//! A pipeline execution is a single run of a pipeline. It is split into
//! stages, and each stage into steps. The build engine runs the steps and
//! keeps their logs; an `ExecutionLogRecord` mirrors the log of one step
//! into the record store so clients can read it without talking to the
//! engine.
//!
//! ## Key Concepts
//!
//! - **PipelineExecution**: ordered stages of ordered steps, each with a `StepState`
//! - **ExecutionLogRecord**: persisted log text for one (execution, stage, step)
//! - **PipelineExecutionKey**: `"<clusterPipelineName>:<executionName>"` back-reference
//! - **Finish label**: `"false"` while a record is synced, `"true"` once it is final
//! - **Scope**: the cluster (and optionally namespace) a syncer is responsible for

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod execution;
pub mod key;
pub mod record;
pub mod scope;

pub use error::{IndexError, KeyError};
pub use execution::{PipelineExecution, Stage, Step, StepState};
pub use key::{PipelineExecutionKey, KEY_SEPARATOR};
pub use record::{ExecutionLogRecord, LabelSelector, FINISH_LABEL};
pub use scope::{ClusterPipeline, Scope};
