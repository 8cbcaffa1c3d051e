//! Full sync cycles against the in-memory backends, with failure injection

use async_trait::async_trait;
use logsync_daemon::storage::StorageResult;
use logsync_daemon::{
    CycleOutcome, EngineError, ExecutionReader, InMemoryEngine, InMemoryStorage, LogRecordStore,
    LogSyncer, LogSyncerBuilder, PersistFailurePolicy, PipelineEngine, PipelineGate,
    StorageError, SyncerConfig,
};
use logsync_types::{
    ClusterPipeline, ExecutionLogRecord, LabelSelector, PipelineExecution, PipelineExecutionKey,
    Scope, Stage, Step, StepState,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

const NS: &str = "p-ns";

/// Record store that rejects updates for chosen records and counts calls
struct FlakyStore {
    inner: Arc<InMemoryStorage>,
    failing: HashSet<String>,
    fail_lists: AtomicBool,
    lists: AtomicUsize,
    updates: AtomicUsize,
}

impl FlakyStore {
    fn new(inner: Arc<InMemoryStorage>, failing: &[&str]) -> Self {
        Self {
            inner,
            failing: failing.iter().map(|s| s.to_string()).collect(),
            fail_lists: AtomicBool::new(false),
            lists: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
        }
    }

    fn fail_lists(&self, fail: bool) {
        self.fail_lists.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl LogRecordStore for FlakyStore {
    async fn list_log_records(
        &self,
        scope: &Scope,
        selector: &LabelSelector,
    ) -> StorageResult<Vec<ExecutionLogRecord>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(StorageError::Query("list timed out".to_string()));
        }
        self.inner.list_log_records(scope, selector).await
    }

    async fn update_log_record(
        &self,
        record: ExecutionLogRecord,
    ) -> StorageResult<ExecutionLogRecord> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&record.name) {
            return Err(StorageError::Connection("store unavailable".to_string()));
        }
        self.inner.update_log_record(record).await
    }
}

/// Engine that finishes the step while its log is being read
struct FinishingEngine {
    inner: InMemoryEngine,
    storage: Arc<InMemoryStorage>,
    /// Fail every fetch after the one that finished the step
    fail_after_finish: bool,
    finished: AtomicBool,
}

impl FinishingEngine {
    fn new(inner: InMemoryEngine, storage: Arc<InMemoryStorage>) -> Self {
        Self {
            inner,
            storage,
            fail_after_finish: false,
            finished: AtomicBool::new(false),
        }
    }

    fn failing_after_finish(mut self) -> Self {
        self.fail_after_finish = true;
        self
    }
}

#[async_trait]
impl PipelineEngine for FinishingEngine {
    async fn pre_check(&self) -> Result<(), EngineError> {
        self.inner.pre_check().await
    }

    async fn get_step_log(
        &self,
        execution: &PipelineExecution,
        stage: usize,
        step: usize,
    ) -> Result<String, EngineError> {
        if self.fail_after_finish && self.finished.load(Ordering::SeqCst) {
            return Err(EngineError::LogUnavailable("engine restarted".to_string()));
        }
        let log = self.inner.get_step_log(execution, stage, step).await?;

        let mut current = self
            .storage
            .get_execution(&execution.namespace, &execution.name)
            .await
            .map_err(|e| EngineError::InvalidResponse(e.to_string()))?;
        if let Ok(s) = current.step_mut(stage, step) {
            if s.state == StepState::Building {
                s.state = StepState::Success;
                self.storage.upsert_execution(current).await;
                self.finished.store(true, Ordering::SeqCst);
                self.inner
                    .set_log(&execution.namespace, &execution.name, stage, step, format!("{}\nL3", log))
                    .await;
            }
        }

        Ok(log)
    }
}

async fn enabled_storage() -> Arc<InMemoryStorage> {
    let storage = Arc::new(InMemoryStorage::new());
    storage
        .upsert_cluster_pipeline(ClusterPipeline::new("local", true))
        .await;
    storage
}

async fn add_building_step(storage: &InMemoryStorage, engine: &InMemoryEngine, execution: &str) {
    storage
        .upsert_execution(
            PipelineExecution::new(NS, execution, "cp-1")
                .with_stage(Stage::new("build", vec![Step::new("make", StepState::Building)])),
        )
        .await;
    storage
        .create_log_record(ExecutionLogRecord::for_step(
            NS,
            &PipelineExecutionKey::new("cp-1", execution),
            0,
            0,
        ))
        .await
        .unwrap();
    engine
        .set_log(NS, execution, 0, 0, format!("{} running", execution))
        .await;
}

fn syncer_with(
    storage: Arc<InMemoryStorage>,
    records: Arc<dyn LogRecordStore>,
    engine: Arc<dyn PipelineEngine>,
    policy: PersistFailurePolicy,
) -> LogSyncer {
    LogSyncerBuilder::new(Scope::cluster("local"))
        .with_config(SyncerConfig {
            persist_failure_policy: policy,
            ..Default::default()
        })
        .with_record_store(records)
        .with_execution_reader(storage.clone() as Arc<dyn ExecutionReader>)
        .with_gate(storage as Arc<dyn PipelineGate>)
        .with_engine(engine)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_persist_failure_continue_policy() {
    let storage = enabled_storage().await;
    let engine = Arc::new(InMemoryEngine::new());
    for execution in ["exec-a", "exec-b", "exec-c"] {
        add_building_step(&storage, &engine, execution).await;
    }
    let store = Arc::new(FlakyStore::new(storage.clone(), &["exec-b-0-0"]));
    let syncer = syncer_with(
        storage.clone(),
        store.clone(),
        engine.clone(),
        PersistFailurePolicy::Continue,
    );

    let outcome = syncer.sync_once().await;
    let report = outcome.report().unwrap();
    assert_eq!(report.listed, 3);
    assert_eq!(report.synced, 2);
    assert_eq!(report.persist_failures, 1);
    assert!(!report.aborted);
    assert!(!outcome.is_failure());

    let c = storage.get_log_record(NS, "exec-c-0-0").await.unwrap();
    assert_eq!(c.message, "exec-c running");
}

#[tokio::test]
async fn test_persist_failure_abort_policy() {
    let storage = enabled_storage().await;
    let engine = Arc::new(InMemoryEngine::new());
    for execution in ["exec-a", "exec-b", "exec-c"] {
        add_building_step(&storage, &engine, execution).await;
    }
    let store = Arc::new(FlakyStore::new(storage.clone(), &["exec-b-0-0"]));
    let syncer = syncer_with(
        storage.clone(),
        store.clone(),
        engine.clone(),
        PersistFailurePolicy::Abort,
    );

    let outcome = syncer.sync_once().await;
    let report = outcome.report().unwrap();
    assert_eq!(report.synced, 1);
    assert_eq!(report.persist_failures, 1);
    assert!(report.aborted);
    assert!(outcome.is_failure());

    assert_eq!(engine.log_fetch_calls(), 2);
    let c = storage.get_log_record(NS, "exec-c-0-0").await.unwrap();
    assert_eq!(c.message, "");
    assert!(c.is_in_progress());
}

#[tokio::test]
async fn test_abort_policy_applies_to_faulted_records() {
    let storage = enabled_storage().await;
    let engine = Arc::new(InMemoryEngine::new());
    let mut broken =
        ExecutionLogRecord::for_step(NS, &PipelineExecutionKey::new("cp-1", "exec-0"), 0, 0);
    broken.pipeline_execution_name = "malformed".to_string();
    storage.create_log_record(broken).await.unwrap();
    add_building_step(&storage, &engine, "exec-z").await;

    let store = Arc::new(FlakyStore::new(storage.clone(), &["exec-0-0-0"]));
    let syncer = syncer_with(
        storage.clone(),
        store.clone(),
        engine.clone(),
        PersistFailurePolicy::Abort,
    );

    let report = syncer.sync_once().await.report().cloned().unwrap();
    assert!(report.aborted);
    assert_eq!(store.updates.load(Ordering::SeqCst), 1);
    assert_eq!(engine.log_fetch_calls(), 0);

    // The failed record was never persisted, so it is retried next cycle.
    let stored = storage.get_log_record(NS, "exec-0-0-0").await.unwrap();
    assert!(stored.is_in_progress());
}

#[tokio::test]
async fn test_step_finishing_during_fetch_marks_record_finished() {
    let storage = enabled_storage().await;
    let inner = InMemoryEngine::new();
    add_building_step(&storage, &inner, "exec-1").await;
    inner.set_log(NS, "exec-1", 0, 0, "L1\nL2").await;
    let engine = Arc::new(FinishingEngine::new(inner, storage.clone()));
    let syncer = LogSyncerBuilder::new(Scope::cluster("local"))
        .with_storage(storage.clone())
        .with_engine(engine.clone())
        .build()
        .unwrap();

    let report = syncer.sync_once().await.report().cloned().unwrap();
    assert_eq!(report.finished, 1);

    let record = storage.get_log_record(NS, "exec-1-0-0").await.unwrap();
    assert!(record.is_finished());
    assert_eq!(record.message, "L1\nL2\nL3");
    assert_eq!(engine.inner.log_fetch_calls(), 2);
}

#[tokio::test]
async fn test_failed_final_fetch_keeps_earlier_text_and_finishes() {
    let storage = enabled_storage().await;
    let inner = InMemoryEngine::new();
    add_building_step(&storage, &inner, "exec-1").await;
    inner.set_log(NS, "exec-1", 0, 0, "L1\nL2").await;
    let engine = Arc::new(FinishingEngine::new(inner, storage.clone()).failing_after_finish());
    let syncer = LogSyncerBuilder::new(Scope::cluster("local"))
        .with_storage(storage.clone())
        .with_engine(engine.clone())
        .build()
        .unwrap();

    let report = syncer.sync_once().await.report().cloned().unwrap();
    assert_eq!(report.synced, 1);
    assert_eq!(report.finished, 1);
    assert_eq!(report.faulted, 0);

    let record = storage.get_log_record(NS, "exec-1-0-0").await.unwrap();
    assert!(record.is_finished());
    assert_eq!(record.message, "L1\nL2");
    assert_eq!(engine.inner.log_fetch_calls(), 1);

    // Finished records leave the selection.
    let report = syncer.sync_once().await.report().cloned().unwrap();
    assert_eq!(report.listed, 0);
}

#[tokio::test]
async fn test_list_failure_fails_cycle() {
    let storage = enabled_storage().await;
    let engine = Arc::new(InMemoryEngine::new());
    add_building_step(&storage, &engine, "exec-1").await;
    let store = Arc::new(FlakyStore::new(storage.clone(), &[]));
    store.fail_lists(true);
    let syncer = syncer_with(
        storage.clone(),
        store.clone(),
        engine.clone(),
        PersistFailurePolicy::Continue,
    );

    let outcome = syncer.sync_once().await;
    assert_eq!(outcome, CycleOutcome::ListFailed);
    assert!(outcome.is_failure());
    assert!(outcome.report().is_none());
    assert_eq!(store.lists.load(Ordering::SeqCst), 1);
    assert_eq!(store.updates.load(Ordering::SeqCst), 0);
    assert_eq!(engine.pre_check_calls(), 1);
    assert_eq!(engine.log_fetch_calls(), 0);

    // The store recovers and the next cycle syncs the record.
    store.fail_lists(false);
    let report = syncer.sync_once().await.report().cloned().unwrap();
    assert_eq!(report.synced, 1);
    assert_eq!(store.updates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_disabled_scope_makes_no_calls() {
    let storage = Arc::new(InMemoryStorage::new());
    storage
        .upsert_cluster_pipeline(ClusterPipeline::new("local", false))
        .await;
    let engine = Arc::new(InMemoryEngine::new());
    add_building_step(&storage, &engine, "exec-1").await;
    let store = Arc::new(FlakyStore::new(storage.clone(), &[]));
    let syncer = syncer_with(
        storage.clone(),
        store.clone(),
        engine.clone(),
        PersistFailurePolicy::Continue,
    );

    assert_eq!(syncer.sync_once().await, CycleOutcome::Disabled);
    assert_eq!(store.lists.load(Ordering::SeqCst), 0);
    assert_eq!(store.updates.load(Ordering::SeqCst), 0);
    assert_eq!(engine.pre_check_calls(), 0);
    assert_eq!(engine.log_fetch_calls(), 0);
}

#[tokio::test]
async fn test_failed_pre_check_reads_no_records() {
    let storage = enabled_storage().await;
    let engine = Arc::new(InMemoryEngine::new());
    add_building_step(&storage, &engine, "exec-1").await;
    engine.set_reachable(false);
    let store = Arc::new(FlakyStore::new(storage.clone(), &[]));
    let syncer = syncer_with(
        storage.clone(),
        store.clone(),
        engine.clone(),
        PersistFailurePolicy::Continue,
    );

    assert_eq!(syncer.sync_once().await, CycleOutcome::EngineUnavailable);
    assert_eq!(store.lists.load(Ordering::SeqCst), 0);
    assert_eq!(store.updates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_mixed_batch() {
    let storage = enabled_storage().await;
    let engine = Arc::new(InMemoryEngine::new());

    // Building
    add_building_step(&storage, &engine, "exec-1").await;

    // Waiting
    storage
        .upsert_execution(
            PipelineExecution::new(NS, "exec-2", "cp-1")
                .with_stage(Stage::new("build", vec![Step::new("make", StepState::Waiting)])),
        )
        .await;
    storage
        .create_log_record(ExecutionLogRecord::for_step(
            NS,
            &PipelineExecutionKey::new("cp-1", "exec-2"),
            0,
            0,
        ))
        .await
        .unwrap();

    // Execution gone
    storage
        .create_log_record(ExecutionLogRecord::for_step(
            NS,
            &PipelineExecutionKey::new("cp-1", "exec-3"),
            0,
            0,
        ))
        .await
        .unwrap();

    // Skipped step in another namespace, outside a namespaced scope
    storage
        .upsert_execution(
            PipelineExecution::new("other", "exec-4", "cp-1")
                .with_stage(Stage::new("build", vec![Step::new("make", StepState::Skipped)])),
        )
        .await;
    storage
        .create_log_record(ExecutionLogRecord::for_step(
            "other",
            &PipelineExecutionKey::new("cp-1", "exec-4"),
            0,
            0,
        ))
        .await
        .unwrap();
    engine.set_log("other", "exec-4", 0, 0, "skipped").await;

    let syncer = LogSyncerBuilder::new(Scope::namespace("local", NS))
        .with_storage(storage.clone())
        .with_engine(engine.clone())
        .build()
        .unwrap();

    let report = syncer.sync_once().await.report().cloned().unwrap();
    assert_eq!(report.listed, 3);
    assert_eq!(report.synced, 1);
    assert_eq!(report.skipped_waiting, 1);
    assert_eq!(report.faulted, 1);
    assert_eq!(report.finished, 1);

    let other = storage.get_log_record("other", "exec-4-0-0").await.unwrap();
    assert!(other.is_in_progress());

    // Second pass: the faulted record is gone from the selection.
    let report = syncer.sync_once().await.report().cloned().unwrap();
    assert_eq!(report.listed, 2);
    assert_eq!(report.faulted, 0);
}
