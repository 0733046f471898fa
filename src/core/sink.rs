//! Action audit sinks.
//!
//! Reconciliation and execution report every action through an injected
//! [`ActionSink`]; nothing writes to a process-wide logger on its own.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::domain::Action;

/// Lifecycle of an action as seen by the audit log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionEvent {
    /// Emitted by reconciliation
    Planned(Action),
    /// Executed (or, in dry-run, would have been)
    Applied { action: Action, dry_run: bool },
    /// Not executed; the reason is part of the line
    Skipped { action: Action, reason: String },
    Failed { action: Action, error: String },
}

impl ActionEvent {
    pub fn action(&self) -> &Action {
        match self {
            ActionEvent::Planned(action)
            | ActionEvent::Applied { action, .. }
            | ActionEvent::Skipped { action, .. }
            | ActionEvent::Failed { action, .. } => action,
        }
    }
}

impl fmt::Display for ActionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionEvent::Planned(action) => write!(f, "planned {}", action),
            ActionEvent::Applied {
                action,
                dry_run: true,
            } => write!(f, "dry-run {}", action),
            ActionEvent::Applied { action, .. } => write!(f, "applied {}", action),
            // Skip actions already carry their reason
            ActionEvent::Skipped { action, .. } if action.is_skip() => {
                write!(f, "skipped {}", action)
            }
            ActionEvent::Skipped { action, reason } => {
                write!(f, "skipped {} [{}]", action, reason)
            }
            ActionEvent::Failed { action, error } => write!(f, "failed {} [{}]", action, error),
        }
    }
}

/// Receives action events
pub trait ActionSink: Send + Sync {
    fn record(&self, event: &ActionEvent);
}

/// Routes events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ActionSink for TracingSink {
    fn record(&self, event: &ActionEvent) {
        let key = event.action().key();
        match event {
            ActionEvent::Planned(action) => debug!(%key, "{}", action),
            ActionEvent::Applied { .. } | ActionEvent::Skipped { .. } => info!(%key, "{}", event),
            ActionEvent::Failed { .. } => warn!(%key, "{}", event),
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<ActionEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ActionEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// One rendered line per event
    pub fn lines(&self) -> Vec<String> {
        self.events().iter().map(ToString::to_string).collect()
    }
}

impl ActionSink for MemorySink {
    fn record(&self, event: &ActionEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

/// Appends outcome lines (not plans) to a human-readable log file.
#[derive(Debug)]
pub struct FileActionLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileActionLog {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open action log: {}", path.display()))?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a free-form header line (run boundaries)
    pub fn note(&self, message: &str) {
        self.write_line(message);
    }

    fn write_line(&self, line: &str) {
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        let stamped = format!("{} {}\n", Utc::now().format("%Y-%m-%dT%H:%M:%SZ"), line);
        if let Err(e) = file.write_all(stamped.as_bytes()).and_then(|_| file.flush()) {
            warn!(path = %self.path.display(), error = %e, "Failed to append to action log");
        }
    }
}

impl ActionSink for FileActionLog {
    fn record(&self, event: &ActionEvent) {
        if !matches!(event, ActionEvent::Planned(_)) {
            self.write_line(&event.to_string());
        }
    }
}

/// Forwards each event to several sinks
#[derive(Default)]
pub struct MultiSink {
    sinks: Vec<Arc<dyn ActionSink>>,
}

impl MultiSink {
    pub fn new(sinks: Vec<Arc<dyn ActionSink>>) -> Self {
        Self { sinks }
    }
}

impl ActionSink for MultiSink {
    fn record(&self, event: &ActionEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}
