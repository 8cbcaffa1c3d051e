//! Builder for LogSyncer
//!
//! Every collaborator is injected; nothing is looked up globally.

use super::LogSyncer;
use crate::config::SyncerConfig;
use crate::engine::PipelineEngine;
use crate::error::{DaemonError, DaemonResult};
use crate::storage::{ExecutionReader, LogRecordStore, PipelineGate};
use logsync_types::Scope;
use std::sync::Arc;

/// Builder for constructing a LogSyncer with all dependencies
pub struct LogSyncerBuilder {
    scope: Scope,
    config: SyncerConfig,
    record_store: Option<Arc<dyn LogRecordStore>>,
    execution_reader: Option<Arc<dyn ExecutionReader>>,
    gate: Option<Arc<dyn PipelineGate>>,
    engine: Option<Arc<dyn PipelineEngine>>,
}

impl LogSyncerBuilder {
    /// Create a new builder for the given scope
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            config: SyncerConfig::default(),
            record_store: None,
            execution_reader: None,
            gate: None,
            engine: None,
        }
    }

    /// Set the loop configuration
    pub fn with_config(mut self, config: SyncerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the log record store
    pub fn with_record_store(mut self, store: Arc<dyn LogRecordStore>) -> Self {
        self.record_store = Some(store);
        self
    }

    /// Set the execution reader
    pub fn with_execution_reader(mut self, reader: Arc<dyn ExecutionReader>) -> Self {
        self.execution_reader = Some(reader);
        self
    }

    /// Set the pipeline gate
    pub fn with_gate(mut self, gate: Arc<dyn PipelineGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Use one backend as record store, execution reader and gate
    pub fn with_storage<S>(self, storage: Arc<S>) -> Self
    where
        S: LogRecordStore + ExecutionReader + PipelineGate + 'static,
    {
        self.with_record_store(storage.clone())
            .with_execution_reader(storage.clone())
            .with_gate(storage)
    }

    /// Set the build engine
    pub fn with_engine(mut self, engine: Arc<dyn PipelineEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Build the syncer
    pub fn build(self) -> DaemonResult<LogSyncer> {
        self.config.validate()?;

        let record_store = self
            .record_store
            .ok_or_else(|| DaemonError::Config("record_store required".into()))?;
        let execution_reader = self
            .execution_reader
            .ok_or_else(|| DaemonError::Config("execution_reader required".into()))?;
        let gate = self
            .gate
            .ok_or_else(|| DaemonError::Config("gate required".into()))?;
        let engine = self
            .engine
            .ok_or_else(|| DaemonError::Config("engine required".into()))?;

        Ok(LogSyncer::new(
            self.scope,
            self.config,
            record_store,
            execution_reader,
            gate,
            engine,
        ))
    }
}
