//! Log sync loop
//!
//! The syncer is responsible for:
//! - Periodically selecting in-progress execution log records
//! - Refreshing their text from the build engine
//! - Marking records finished once their step can no longer change
//! - Backing off while the engine or store is down

mod backoff;
mod builder;
mod reconciler;
mod report;

pub use backoff::CycleBackoff;
pub use builder::LogSyncerBuilder;
pub use reconciler::LogSyncer;
pub use report::{CycleOutcome, CycleReport};
