//! Core curation logic.
//!
//! This module contains:
//! - Policy: replacement rules and thresholds
//! - Reconcile: candidate vs. library decisions
//! - Executor: filesystem mutations
//! - Scan: directory discovery and probing
//! - Curator: the end-to-end run
//! - Sink: action audit trail

pub mod curator;
pub mod executor;
pub mod policy;
pub mod reconcile;
pub mod scan;
pub mod sink;

// Re-export commonly used types
pub use curator::{Curator, RunOptions, RunSummary};
pub use executor::{
    write_text_atomic, ActionFailure, DeleteMode, ExecutionReport, ExecutorOptions,
    MutationExecutor,
};
pub use policy::{decide, Verdict, MAX_DURATION_DELTA_MS, MAX_HEIGHT_DEFICIT, MAX_WIDTH_DEFICIT};
pub use reconcile::{reconcile, ReconcileOptions, Reconciliation};
pub use scan::{scan, ScanOptions};
pub use sink::{ActionEvent, ActionSink, FileActionLog, MemorySink, MultiSink, TracingSink};
