//! In-process engine for development and testing

use super::PipelineEngine;
use crate::error::{EngineError, EngineResult};
use async_trait::async_trait;
use logsync_types::PipelineExecution;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

type StepRef = (String, String, usize, usize);

/// Engine whose logs and reachability are set by the caller
#[derive(Debug)]
pub struct InMemoryEngine {
    reachable: AtomicBool,
    logs: RwLock<HashMap<StepRef, Result<String, String>>>,
    pre_checks: AtomicUsize,
    log_fetches: AtomicUsize,
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEngine {
    /// A reachable engine with no logs
    pub fn new() -> Self {
        Self {
            reachable: AtomicBool::new(true),
            logs: RwLock::new(HashMap::new()),
            pre_checks: AtomicUsize::new(0),
            log_fetches: AtomicUsize::new(0),
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Set the full log text of a step
    pub async fn set_log(
        &self,
        namespace: &str,
        execution: &str,
        stage: usize,
        step: usize,
        text: impl Into<String>,
    ) {
        let mut logs = self.logs.write().await;
        logs.insert(step_ref(namespace, execution, stage, step), Ok(text.into()));
    }

    /// Make log retrieval for a step fail
    pub async fn set_log_error(
        &self,
        namespace: &str,
        execution: &str,
        stage: usize,
        step: usize,
        reason: impl Into<String>,
    ) {
        let mut logs = self.logs.write().await;
        logs.insert(step_ref(namespace, execution, stage, step), Err(reason.into()));
    }

    /// Number of `pre_check` calls so far
    pub fn pre_check_calls(&self) -> usize {
        self.pre_checks.load(Ordering::SeqCst)
    }

    /// Number of `get_step_log` calls so far
    pub fn log_fetch_calls(&self) -> usize {
        self.log_fetches.load(Ordering::SeqCst)
    }
}

fn step_ref(namespace: &str, execution: &str, stage: usize, step: usize) -> StepRef {
    (namespace.to_string(), execution.to_string(), stage, step)
}

#[async_trait]
impl PipelineEngine for InMemoryEngine {
    async fn pre_check(&self) -> EngineResult<()> {
        self.pre_checks.fetch_add(1, Ordering::SeqCst);
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(EngineError::Unreachable("engine is offline".to_string()))
        }
    }

    async fn get_step_log(
        &self,
        execution: &PipelineExecution,
        stage: usize,
        step: usize,
    ) -> EngineResult<String> {
        self.log_fetches.fetch_add(1, Ordering::SeqCst);
        let logs = self.logs.read().await;
        match logs.get(&step_ref(&execution.namespace, &execution.name, stage, step)) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(reason)) => Err(EngineError::LogUnavailable(reason.clone())),
            None => Err(EngineError::LogUnavailable(format!(
                "no log for {}/{} stage {} step {}",
                execution.namespace, execution.name, stage, step
            ))),
        }
    }
}
