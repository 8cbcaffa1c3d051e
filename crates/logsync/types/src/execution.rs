//! Pipeline execution types
//!
//! Executions are owned by the execution subsystem. The log syncer only
//! reads them to find out where a step is in its lifecycle.

use crate::IndexError;
use serde::{Deserialize, Serialize};

/// State of a single pipeline step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepState {
    /// Scheduled but not started; the engine has no log yet
    Waiting,
    /// Running
    Building,
    /// Finished successfully
    Success,
    /// Finished with an error
    Failed,
    /// Never ran
    Skipped,
}

impl StepState {
    /// Waiting and Building are active; every other state is terminal.
    pub fn is_active(&self) -> bool {
        matches!(self, StepState::Waiting | StepState::Building)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Whether the engine can have log output for this step.
    pub fn has_started(&self) -> bool {
        !matches!(self, StepState::Waiting)
    }
}

impl std::fmt::Display for StepState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StepState::Waiting => "Waiting",
            StepState::Building => "Building",
            StepState::Success => "Success",
            StepState::Failed => "Failed",
            StepState::Skipped => "Skipped",
        };
        f.write_str(s)
    }
}

/// One step of a stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Step name as declared in the pipeline
    #[serde(default)]
    pub name: String,

    /// Last observed state
    pub state: StepState,
}

impl Step {
    pub fn new(name: impl Into<String>, state: StepState) -> Self {
        Self {
            name: name.into(),
            state,
        }
    }
}

/// One stage of an execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    #[serde(default)]
    pub name: String,

    /// Ordered steps
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Stage {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }
}

/// A single run of a cluster pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineExecution {
    /// Namespace the execution lives in
    pub namespace: String,

    /// Execution name, unique within the namespace
    pub name: String,

    /// Name of the cluster pipeline this run belongs to
    #[serde(default)]
    pub pipeline_name: String,

    /// Ordered stages
    #[serde(default)]
    pub stages: Vec<Stage>,
}

impl PipelineExecution {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        pipeline_name: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            pipeline_name: pipeline_name.into(),
            stages: Vec::new(),
        }
    }

    /// Builder-style stage append
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Look up a step by position.
    pub fn step(&self, stage: usize, step: usize) -> Result<&Step, IndexError> {
        let s = self.stages.get(stage).ok_or(IndexError::Stage {
            stage,
            len: self.stages.len(),
        })?;
        s.steps.get(step).ok_or(IndexError::Step {
            stage,
            step,
            len: s.steps.len(),
        })
    }

    /// Mutable step lookup with the same bounds checks as [`Self::step`]
    pub fn step_mut(&mut self, stage: usize, step: usize) -> Result<&mut Step, IndexError> {
        let len = self.stages.len();
        let s = self
            .stages
            .get_mut(stage)
            .ok_or(IndexError::Stage { stage, len })?;
        let len = s.steps.len();
        s.steps
            .get_mut(step)
            .ok_or(IndexError::Step { stage, step, len })
    }

    pub fn step_state(&self, stage: usize, step: usize) -> Result<StepState, IndexError> {
        self.step(stage, step).map(|s| s.state)
    }
}
