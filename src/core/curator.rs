//! End-to-end curation run.
//!
//! Coordinates the store, reconciliation and the executor: load the library,
//! prune stale records, plan, execute, and persist the records whose asset
//! reached the library. A decision that fails after its asset moved still
//! stores its record; the leftover cleanup is reported as a failure.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::executor::{ActionFailure, ExecutorOptions, MutationExecutor};
use super::reconcile::{reconcile, ReconcileOptions};
use super::sink::ActionSink;
use crate::domain::{LibraryRecord, MetricsMap};
use crate::library::{LibraryView, MetadataStore};

/// Settings for one run
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub library_root: PathBuf,
    pub overwrite: bool,
    pub executor: ExecutorOptions,
}

impl RunOptions {
    pub fn new(library_root: impl Into<PathBuf>) -> Self {
        Self {
            library_root: library_root.into(),
            overwrite: false,
            executor: ExecutorOptions::default(),
        }
    }

    pub fn dry_run(&self) -> bool {
        self.executor.dry_run
    }
}

/// Counts and failures of a finished run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub dry_run: bool,
    pub pruned: usize,
    pub accepted: usize,
    pub skipped: usize,
    pub applied: usize,

    /// Records written to the store
    pub stored: usize,
    pub failures: Vec<String>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Main curation driver
pub struct Curator {
    store: MetadataStore,
    view: Arc<dyn LibraryView>,
    sink: Arc<dyn ActionSink>,
}

impl Curator {
    pub fn new(store: MetadataStore, view: Arc<dyn LibraryView>, sink: Arc<dyn ActionSink>) -> Self {
        Self { store, view, sink }
    }

    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    /// Reconcile `external` against the stored library and apply the result
    #[instrument(skip_all, fields(candidates = external.len(), dry_run = options.dry_run()))]
    pub async fn run(&self, external: &MetricsMap, options: &RunOptions) -> Result<RunSummary> {
        let run_id = Uuid::new_v4();
        info!(%run_id, "Starting curation run");

        let library = self.store.load().await?;
        let (library, pruned) = library.prune(self.view.as_ref());

        let plan = reconcile(
            external,
            &library,
            &ReconcileOptions::new(&options.library_root).with_overwrite(options.overwrite),
            self.view.as_ref(),
            self.sink.as_ref(),
        );
        let accepted = plan.accepted();

        let executor = Arc::new(MutationExecutor::new(options.executor.clone()));
        let report = executor
            .execute(plan.decisions.clone(), Arc::clone(&self.sink))
            .await;

        let mut stored = 0;
        if !options.dry_run() {
            let mut updated = library;
            for record in plan
                .decisions
                .into_iter()
                .filter(|d| report.placed.contains(&d.key))
                .filter_map(|d| d.record)
            {
                updated.upsert(record);
                stored += 1;
            }
            self.store.save(&updated).await?;
        }

        for failure in &report.failures {
            warn!(%run_id, key = failure.action.key(), error = %failure.error, "Action failed");
        }

        let summary = RunSummary {
            run_id,
            dry_run: options.dry_run(),
            pruned: pruned.len(),
            accepted,
            skipped: report.skipped,
            applied: report.applied,
            stored,
            failures: report.failures.iter().map(describe_failure).collect(),
        };
        info!(
            %run_id,
            pruned = summary.pruned,
            accepted = summary.accepted,
            skipped = summary.skipped,
            applied = summary.applied,
            failed = summary.failures.len(),
            "Curation run finished"
        );
        Ok(summary)
    }

    /// Drop records whose file is gone; returns the removed records
    pub async fn prune(&self, dry_run: bool) -> Result<Vec<LibraryRecord>> {
        let library = self.store.load().await?;
        let (library, removed) = library.prune(self.view.as_ref());

        if !dry_run && !removed.is_empty() {
            self.store.save(&library).await?;
        }
        info!(removed = removed.len(), dry_run, "Prune finished");
        Ok(removed)
    }
}

fn describe_failure(failure: &ActionFailure) -> String {
    format!("{}: {}", failure.action, failure.error)
}
