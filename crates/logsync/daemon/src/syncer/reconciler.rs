//! Sync loop and per-record reconciliation

use super::{CycleBackoff, CycleOutcome, CycleReport};
use crate::config::{PersistFailurePolicy, SyncerConfig};
use crate::engine::PipelineEngine;
use crate::error::StorageError;
use crate::storage::{ExecutionReader, LogRecordStore, PipelineGate};
use logsync_types::{
    ExecutionLogRecord, LabelSelector, PipelineExecution, PipelineExecutionKey, Scope, StepState,
};
use std::sync::Arc;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};

/// What happened to one record during a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordOutcome {
    /// Step has not started; record untouched
    Waiting,
    /// Log text refreshed
    Synced { finished: bool },
    /// Structural fault annotated and record finished
    Faulted,
    /// The store rejected the update
    PersistFailed,
}

/// Keeps in-progress execution log records in step with the build engine
pub struct LogSyncer {
    scope: Scope,
    config: SyncerConfig,
    records: Arc<dyn LogRecordStore>,
    executions: Arc<dyn ExecutionReader>,
    gate: Arc<dyn PipelineGate>,
    engine: Arc<dyn PipelineEngine>,
}

impl LogSyncer {
    /// Create a new syncer. Prefer [`super::LogSyncerBuilder`], which validates the config.
    pub fn new(
        scope: Scope,
        config: SyncerConfig,
        records: Arc<dyn LogRecordStore>,
        executions: Arc<dyn ExecutionReader>,
        gate: Arc<dyn PipelineGate>,
        engine: Arc<dyn PipelineEngine>,
    ) -> Self {
        Self {
            scope,
            config,
            records,
            executions,
            gate,
            engine,
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Run sync cycles until `cancel` fires.
    ///
    /// The first cycle starts one interval after the call. Cancellation is
    /// only observed between cycles; a running cycle always completes.
    pub async fn run(&self, cancel: CancellationToken) {
        let interval = self.config.interval();
        let mut backoff = CycleBackoff::new(interval, self.config.max_backoff());
        let mut next_cycle = Instant::now() + interval;

        info!(
            scope = %self.scope,
            interval_secs = interval.as_secs(),
            "Log syncer started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = sleep_until(next_cycle) => {}
            }

            let started = Instant::now();
            let outcome = self.sync_once().await;
            let delay = backoff.next_delay(outcome.is_failure());
            if delay > interval {
                warn!(
                    scope = %self.scope,
                    failures = backoff.consecutive_failures(),
                    delay_secs = delay.as_secs(),
                    "Sync cycle failed, backing off"
                );
            }
            next_cycle = started + delay;
        }

        info!(scope = %self.scope, "Log syncer stopped");
    }

    /// Run one sync cycle. Failures are logged and reported, never returned.
    #[instrument(skip(self), fields(scope = %self.scope))]
    pub async fn sync_once(&self) -> CycleOutcome {
        if !self.gate.is_pipeline_enabled(&self.scope).await {
            return CycleOutcome::Disabled;
        }

        if let Err(e) = self.engine.pre_check().await {
            error!(error = %e, "Error checking pipeline engine");
            return CycleOutcome::EngineUnavailable;
        }

        let records = match self
            .records
            .list_log_records(&self.scope, &LabelSelector::in_progress())
            .await
        {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "Error listing pipeline execution logs");
                return CycleOutcome::ListFailed;
            }
        };

        let mut report = CycleReport::new(records.len());

        for record in records {
            match self.sync_record(record).await {
                RecordOutcome::Waiting => report.skipped_waiting += 1,
                RecordOutcome::Synced { finished } => {
                    report.synced += 1;
                    if finished {
                        report.finished += 1;
                    }
                }
                RecordOutcome::Faulted => {
                    report.faulted += 1;
                    report.finished += 1;
                }
                RecordOutcome::PersistFailed => {
                    report.persist_failures += 1;
                    if self.config.persist_failure_policy == PersistFailurePolicy::Abort {
                        report.aborted = true;
                        break;
                    }
                }
            }
        }

        debug!(
            listed = report.listed,
            synced = report.synced,
            finished = report.finished,
            faulted = report.faulted,
            persist_failures = report.persist_failures,
            "Sync pipeline execution log complete"
        );

        CycleOutcome::Completed(report)
    }

    /// Reconcile one in-progress record
    async fn sync_record(&self, mut record: ExecutionLogRecord) -> RecordOutcome {
        let key = match PipelineExecutionKey::parse(&record.pipeline_execution_name) {
            Ok(key) => key,
            Err(e) => {
                warn!(record = %record.qualified_name(), error = %e, "Malformed pipeline execution name");
                return self.finish_with_note(record, e).await;
            }
        };

        let execution = match self
            .executions
            .get_execution(&record.namespace, &key.execution_name)
            .await
        {
            Ok(execution) => execution,
            Err(e) => {
                error!(record = %record.qualified_name(), error = %e, "Error get pipeline execution");
                return self
                    .finish_with_note(record, format!("Error get pipeline execution - {}", e))
                    .await;
            }
        };

        let state = match execution.step_state(record.stage, record.step) {
            Ok(state) => state,
            Err(e) => {
                error!(record = %record.qualified_name(), error = %e, "Invalid stage/step index");
                let note = format!(
                    "Invalid stage/step index - stage {}, step {}",
                    record.stage, record.step
                );
                return self.finish_with_note(record, note).await;
            }
        };

        if !state.has_started() {
            trace!(record = %record.qualified_name(), "Step not started, skipping");
            return RecordOutcome::Waiting;
        }

        let log = match self
            .engine
            .get_step_log(&execution, record.stage, record.step)
            .await
        {
            Ok(log) => log,
            Err(e) => {
                error!(record = %record.qualified_name(), error = %e, "Error get pipeline execution log");
                return self
                    .finish_with_note(record, format!("Error get pipeline execution log - {}", e))
                    .await;
            }
        };
        record.message = log;

        let current = self.current_state(&record, state).await;
        let finished = current.is_terminal();

        // The step ended while its log was being fetched; fetch once more so
        // the final record holds the complete output.
        if finished && state.is_active() {
            match self
                .engine
                .get_step_log(&execution, record.stage, record.step)
                .await
            {
                Ok(log) => record.message = log,
                Err(e) => {
                    warn!(
                        record = %record.qualified_name(),
                        error = %e,
                        "Error fetching final log, keeping earlier text"
                    );
                }
            }
        }

        if finished {
            record.mark_finished();
        }

        match self.persist(record).await {
            Ok(()) => RecordOutcome::Synced { finished },
            Err(_) => RecordOutcome::PersistFailed,
        }
    }

    /// Re-read the step state after a log fetch, falling back to the state
    /// observed before it.
    async fn current_state(&self, record: &ExecutionLogRecord, before: StepState) -> StepState {
        let key = match PipelineExecutionKey::parse(&record.pipeline_execution_name) {
            Ok(key) => key,
            Err(_) => return before,
        };

        match self
            .executions
            .get_execution(&record.namespace, &key.execution_name)
            .await
        {
            Ok(execution) => step_state_or(&execution, record, before),
            Err(e) => {
                debug!(record = %record.qualified_name(), error = %e, "Step state re-read failed");
                before
            }
        }
    }

    /// Record a permanent fault: annotate, finish, persist.
    async fn finish_with_note(
        &self,
        mut record: ExecutionLogRecord,
        note: impl std::fmt::Display,
    ) -> RecordOutcome {
        record.append_note(note);
        record.mark_finished();

        match self.persist(record).await {
            Ok(()) => RecordOutcome::Faulted,
            Err(_) => RecordOutcome::PersistFailed,
        }
    }

    async fn persist(&self, record: ExecutionLogRecord) -> Result<(), StorageError> {
        let name = record.qualified_name();
        match self.records.update_log_record(record).await {
            Ok(_) => Ok(()),
            Err(e) => {
                error!(record = %name, error = %e, "Error update pipeline execution log");
                Err(e)
            }
        }
    }
}

fn step_state_or(
    execution: &PipelineExecution,
    record: &ExecutionLogRecord,
    fallback: StepState,
) -> StepState {
    execution
        .step_state(record.stage, record.step)
        .unwrap_or(fallback)
}
