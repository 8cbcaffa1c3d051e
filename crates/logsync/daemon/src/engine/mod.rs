//! Build engine access
//!
//! The engine runs pipeline steps and keeps their logs. The syncer only
//! needs a reachability check and per-step log text.

mod http;
mod memory;

pub use http::HttpEngine;
pub use memory::InMemoryEngine;

use crate::error::EngineResult;
use async_trait::async_trait;
use logsync_types::PipelineExecution;

/// Build engine operations used by the syncer
#[async_trait]
pub trait PipelineEngine: Send + Sync {
    /// Cheap reachability check, run once per cycle before any record work
    async fn pre_check(&self) -> EngineResult<()>;

    /// Full log text of one step
    async fn get_step_log(
        &self,
        execution: &PipelineExecution,
        stage: usize,
        step: usize,
    ) -> EngineResult<String>;
}
