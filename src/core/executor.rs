//! Mutation executor.
//!
//! Applies planned [`Action`]s to the filesystem. Decisions run concurrently
//! on a bounded set of workers; the actions inside one decision run in order
//! and stop at the first failure. Every mutation holds a lock on the path it
//! touches so two decisions never race on the same destination.

use std::collections::{BTreeSet, HashMap};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tokio::fs;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use super::sink::{ActionEvent, ActionSink};
use crate::domain::{Action, Decision, SkipReason};
use crate::error::{CurationError, CurationResult};

/// How deletes are carried out
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeleteMode {
    /// Remove the file
    #[default]
    Permanent,
    /// Move the file into this directory under a timestamped name
    Recycle(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Report actions without touching the filesystem
    pub dry_run: bool,

    /// Create missing destination directories
    pub create_dirs: bool,

    pub delete_mode: DeleteMode,

    /// Maximum number of decisions executed at once
    pub workers: usize,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            create_dirs: true,
            delete_mode: DeleteMode::Permanent,
            workers: 4,
        }
    }
}

/// An action that could not be applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionFailure {
    pub action: Action,
    pub error: String,
}

/// Outcome of executing a batch of decisions
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    pub applied: usize,
    pub skipped: usize,
    pub failures: Vec<ActionFailure>,

    /// Keys whose actions all went through
    pub completed: BTreeSet<String>,

    /// Keys whose asset reached its library path. Includes every completed
    /// key plus those whose cleanup failed after the asset moved; their
    /// records must be stored or the moved file is lost to the library.
    pub placed: BTreeSet<String>,
}

impl ExecutionReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn merge(&mut self, other: ExecutionReport) {
        self.applied += other.applied;
        self.skipped += other.skipped;
        self.failures.extend(other.failures);
        self.completed.extend(other.completed);
        self.placed.extend(other.placed);
    }
}

/// Applies actions to the local filesystem
#[derive(Debug, Default)]
pub struct MutationExecutor {
    options: ExecutorOptions,
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl MutationExecutor {
    pub fn new(options: ExecutorOptions) -> Self {
        Self {
            options,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(path.to_path_buf()).or_default().clone()
    }

    /// Apply a single action. Skip actions are a no-op.
    pub async fn apply(&self, action: &Action) -> CurationResult<()> {
        if action.is_skip() || self.options.dry_run {
            return Ok(());
        }

        let lock = self.lock_for(action.target());
        let _guard = lock.lock().await;

        match action {
            Action::MoveAsset {
                source,
                destination,
                overwrite,
                ..
            }
            | Action::MoveAttachment {
                source,
                destination,
                overwrite,
                ..
            } => move_file(source, destination, *overwrite, self.options.create_dirs).await,
            Action::DeleteAsset { path, .. } | Action::DeleteAttachment { path, .. } => {
                delete(path, &self.options.delete_mode).await
            }
            Action::Skip { .. } => Ok(()),
        }
    }

    /// Execute decisions concurrently and report every outcome to `sink`.
    #[instrument(skip_all, fields(decisions = decisions.len(), dry_run = self.options.dry_run))]
    pub async fn execute(
        self: Arc<Self>,
        decisions: Vec<Decision>,
        sink: Arc<dyn ActionSink>,
    ) -> ExecutionReport {
        let semaphore = Arc::new(Semaphore::new(self.options.workers.max(1)));
        let mut tasks = JoinSet::new();

        for decision in decisions {
            let executor = Arc::clone(&self);
            let sink = Arc::clone(&sink);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                // The semaphore is never closed
                let _permit = semaphore.acquire_owned().await.ok();
                executor.execute_decision(decision, sink.as_ref()).await
            });
        }

        let mut report = ExecutionReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => report.merge(outcome),
                Err(e) => warn!(error = %e, "Decision task aborted"),
            }
        }

        info!(
            applied = report.applied,
            skipped = report.skipped,
            failed = report.failures.len(),
            "Execution finished"
        );
        report
    }

    async fn execute_decision(&self, decision: Decision, sink: &dyn ActionSink) -> ExecutionReport {
        let mut report = ExecutionReport::default();
        let dry_run = self.options.dry_run;
        let accepted = decision.record.is_some();

        for action in decision.actions {
            if let Action::Skip { reason, .. } = &action {
                sink.record(&ActionEvent::Skipped {
                    reason: reason.to_string(),
                    action,
                });
                report.skipped += 1;
                continue;
            }

            match self.apply(&action).await {
                Ok(()) => {
                    if accepted && matches!(action, Action::MoveAsset { .. }) {
                        report.placed.insert(decision.key.clone());
                    }
                    sink.record(&ActionEvent::Applied { action, dry_run });
                    report.applied += 1;
                }
                Err(e) if e.is_skip() => {
                    debug!(key = %decision.key, error = %e, "Action skipped, abandoning decision");
                    sink.record(&ActionEvent::Skipped {
                        action,
                        reason: SkipReason::AlreadyExists.to_string(),
                    });
                    report.skipped += 1;
                    return report;
                }
                Err(e) => {
                    let error = e.to_string();
                    sink.record(&ActionEvent::Failed {
                        action: action.clone(),
                        error: error.clone(),
                    });
                    report.failures.push(ActionFailure { action, error });
                    return report;
                }
            }
        }

        if accepted {
            report.placed.insert(decision.key.clone());
            report.completed.insert(decision.key);
        }
        report
    }
}

/// Move `source` to `destination`.
///
/// Refuses to replace an existing destination unless `overwrite` is set.
/// Falls back to copy-and-remove when the rename crosses filesystems.
pub async fn move_file(
    source: &Path,
    destination: &Path,
    overwrite: bool,
    create_dirs: bool,
) -> CurationResult<()> {
    if source == destination {
        return Ok(());
    }

    let exists = fs::try_exists(destination)
        .await
        .map_err(|e| CurationError::io(destination, e))?;
    if exists && !overwrite {
        return Err(CurationError::AlreadyExists(destination.to_path_buf()));
    }

    if create_dirs {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| CurationError::io(parent, e))?;
        }
    }

    match fs::rename(source, destination).await {
        Ok(()) => {}
        Err(e) if is_cross_device(&e) => copy_across(source, destination).await?,
        Err(e) => return Err(CurationError::io(source, e)),
    }

    debug!(from = %source.display(), to = %destination.display(), "Moved");
    Ok(())
}

async fn copy_across(source: &Path, destination: &Path) -> CurationResult<()> {
    let partial = sibling(destination, "partial");

    if let Err(e) = fs::copy(source, &partial).await {
        let _ = fs::remove_file(&partial).await;
        return Err(CurationError::io(source, e));
    }
    if let Err(e) = fs::rename(&partial, destination).await {
        let _ = fs::remove_file(&partial).await;
        return Err(CurationError::io(destination, e));
    }

    fs::remove_file(source)
        .await
        .map_err(|e| CurationError::io(source, e))
}

/// Delete `path` according to `mode`
pub async fn delete(path: &Path, mode: &DeleteMode) -> CurationResult<()> {
    match mode {
        DeleteMode::Permanent => remove_file(path).await,
        DeleteMode::Recycle(dir) => {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let target = dir.join(format!("{}_{}", Utc::now().format("%Y%m%dT%H%M%S%3f"), name));
            move_file(path, &target, false, true).await
        }
    }
}

async fn remove_file(path: &Path) -> CurationResult<()> {
    let err = match fs::remove_file(path).await {
        Ok(()) => return Ok(()),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => e,
        Err(e) => return Err(CurationError::io(path, e)),
    };

    // Read-only files: clear the flag, retry, and put it back if that fails too
    let original = match fs::metadata(path).await {
        Ok(metadata) if metadata.permissions().readonly() => metadata.permissions(),
        _ => return Err(CurationError::io(path, err)),
    };

    let mut writable = original.clone();
    writable.set_readonly(false);
    fs::set_permissions(path, writable)
        .await
        .map_err(|e| CurationError::io(path, e))?;

    if let Err(e) = fs::remove_file(path).await {
        let _ = fs::set_permissions(path, original).await;
        return Err(CurationError::io(path, e));
    }
    Ok(())
}

/// Write `content` to `path` through a synced temp file in the same directory.
pub async fn write_text_atomic(path: &Path, content: &str) -> CurationResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)
        .await
        .map_err(|e| CurationError::io(&parent, e))?;

    let target = path.to_path_buf();
    let bytes = content.as_bytes().to_vec();
    let result = tokio::task::spawn_blocking(move || -> io::Result<()> {
        let mut temp = tempfile::NamedTempFile::new_in(&parent)?;
        temp.write_all(&bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .unwrap_or_else(|e| Err(io::Error::other(e)));

    result.map_err(|e| CurationError::io(path, e))
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}", name, suffix))
}

fn is_cross_device(e: &io::Error) -> bool {
    #[cfg(unix)]
    const EXDEV: i32 = 18;
    #[cfg(windows)]
    const EXDEV: i32 = 17;
    #[cfg(not(any(unix, windows)))]
    const EXDEV: i32 = -1;

    e.raw_os_error() == Some(EXDEV)
}
