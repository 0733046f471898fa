//! Reconciliation of external candidates against the library.
//!
//! For every key in the external map, the policy in [`super::policy`] picks a
//! verdict and this module turns it into an ordered [`Decision`]: the moves
//! and deletes to perform and the record to store once they succeed.
//! Nothing here touches the disk beyond the [`LibraryView`] queries.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use super::policy::{decide, Verdict};
use super::sink::{ActionEvent, ActionSink};
use crate::domain::{Action, CandidateAsset, Decision, LibraryRecord, MetricsMap};
use crate::library::{Library, LibraryView};
use crate::naming::{parse, DirectoryName};

/// Reconciliation settings
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Root under which new assets get their canonical directory
    pub library_root: PathBuf,

    /// Allow moves onto existing files
    pub overwrite: bool,
}

impl ReconcileOptions {
    pub fn new(library_root: impl Into<PathBuf>) -> Self {
        Self {
            library_root: library_root.into(),
            overwrite: false,
        }
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

/// Result of a reconciliation pass
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// Library with every accepted record applied
    pub library: Library,

    /// One decision per candidate that needs attention, in key order
    pub decisions: Vec<Decision>,
}

impl Reconciliation {
    /// All actions, flattened in decision order
    pub fn actions(&self) -> Vec<Action> {
        self.decisions
            .iter()
            .flat_map(|d| d.actions.iter().cloned())
            .collect()
    }

    pub fn accepted(&self) -> usize {
        self.decisions.iter().filter(|d| d.is_accepted()).count()
    }

    pub fn skipped(&self) -> usize {
        self.decisions.iter().filter(|d| !d.is_accepted()).count()
    }
}

/// Reconcile every external candidate against `library`.
///
/// Keys are processed in sorted order, so the output is fully determined by
/// the inputs and the view.
#[instrument(skip_all, fields(candidates = external.len(), records = library.len()))]
pub fn reconcile(
    external: &MetricsMap,
    library: &Library,
    options: &ReconcileOptions,
    view: &dyn LibraryView,
    sink: &dyn ActionSink,
) -> Reconciliation {
    let mut updated = library.clone();
    let mut decisions = Vec::new();

    for (key, metrics) in external {
        let candidate = CandidateAsset::new(key.clone(), metrics.clone());
        let Some(decision) = reconcile_candidate(&candidate, library.get(key), options, view) else {
            continue;
        };

        for action in &decision.actions {
            sink.record(&ActionEvent::Planned(action.clone()));
        }
        if let Some(record) = &decision.record {
            updated.upsert(record.clone());
        }
        decisions.push(decision);
    }

    let result = Reconciliation {
        library: updated,
        decisions,
    };
    info!(
        accepted = result.accepted(),
        skipped = result.skipped(),
        "Reconciliation planned"
    );
    result
}

/// Decide a single candidate. `None` means the candidate already is the
/// library entry and nothing needs to happen.
pub fn reconcile_candidate(
    candidate: &CandidateAsset,
    existing: Option<&LibraryRecord>,
    options: &ReconcileOptions,
    view: &dyn LibraryView,
) -> Option<Decision> {
    let verdict = decide(candidate, existing, view);
    debug!(key = %candidate.key, ?verdict, "Policy verdict");

    match verdict {
        Verdict::AlreadyInLibrary => None,
        Verdict::Skip(reason) => Some(Decision::skip(&candidate.key, candidate.path(), reason)),
        Verdict::AcceptNew => Some(place_new(candidate, options, view, "new asset")),
        Verdict::AcceptOrphan => Some(place_new(candidate, options, view, "existing entry orphaned")),
        Verdict::Replace => existing.map(|record| replace(candidate, record, options, view)),
    }
}

/// Canonical directory for a candidate that has no usable incumbent
fn canonical_directory(candidate: &CandidateAsset, options: &ReconcileOptions) -> PathBuf {
    let path = candidate.path();
    let name = file_name(path);

    let directory = match parse(&name) {
        Ok(asset) => DirectoryName::from_asset(&asset).serialize(),
        Err(_) => path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| candidate.key.clone()),
    };
    options.library_root.join(directory)
}

fn place_new(
    candidate: &CandidateAsset,
    options: &ReconcileOptions,
    view: &dyn LibraryView,
    reason: &str,
) -> Decision {
    let source = candidate.path();
    let directory = canonical_directory(candidate, options);
    let destination = directory.join(file_name(source));

    let mut actions = Vec::new();
    if destination != source {
        actions.push(Action::MoveAsset {
            key: candidate.key.clone(),
            source: source.to_path_buf(),
            destination: destination.clone(),
            overwrite: options.overwrite,
            reason: reason.to_string(),
        });

        for sidecar in view.sidecars(source) {
            actions.push(Action::MoveAttachment {
                key: candidate.key.clone(),
                destination: directory.join(file_name(&sidecar)),
                source: sidecar,
                overwrite: options.overwrite,
                reason: format!("attachment of {}", reason),
            });
        }
    }

    Decision {
        key: candidate.key.clone(),
        actions,
        record: Some(LibraryRecord::new(
            candidate.key.clone(),
            candidate.metrics.clone().with_path(destination),
        )),
    }
}

fn replace(
    candidate: &CandidateAsset,
    record: &LibraryRecord,
    options: &ReconcileOptions,
    view: &dyn LibraryView,
) -> Decision {
    let key = &candidate.key;
    let source = candidate.path();
    let existing = record.canonical_path();
    let directory = existing.parent().map(Path::to_path_buf).unwrap_or_default();
    let destination = directory.join(file_name(source));
    let new_stem = stem(&destination);
    let in_place = destination == existing;

    let incoming = sidecars_with_suffix(view, source);
    let current = sidecars_with_suffix(view, existing);

    let mut actions = vec![Action::MoveAsset {
        key: key.clone(),
        source: source.to_path_buf(),
        destination: destination.clone(),
        overwrite: options.overwrite || in_place,
        reason: format!("replaces {}", file_name(existing)),
    }];

    for (sidecar, suffix) in &incoming {
        let target = directory.join(format!("{}{}", new_stem, suffix));
        let replaces_current = current.iter().any(|(path, _)| *path == target);
        actions.push(Action::MoveAttachment {
            key: key.clone(),
            source: sidecar.clone(),
            destination: target,
            overwrite: options.overwrite || replaces_current,
            reason: "attachment of replacement".to_string(),
        });
    }

    if !in_place {
        actions.push(Action::DeleteAsset {
            key: key.clone(),
            path: existing.to_path_buf(),
            reason: format!("superseded by {}", file_name(source)),
        });
    }

    for (sidecar, suffix) in &current {
        let target = directory.join(format!("{}{}", new_stem, suffix));
        if target == *sidecar {
            // Same name: overwritten by the incoming attachment or already correct
            continue;
        }

        let superseded = incoming
            .iter()
            .any(|(_, incoming_suffix)| incoming_suffix.eq_ignore_ascii_case(suffix));
        if superseded {
            actions.push(Action::DeleteAttachment {
                key: key.clone(),
                path: sidecar.clone(),
                reason: "superseded attachment".to_string(),
            });
        } else {
            actions.push(Action::MoveAttachment {
                key: key.clone(),
                source: sidecar.clone(),
                destination: target,
                overwrite: options.overwrite,
                reason: "follows replacement name".to_string(),
            });
        }
    }

    Decision {
        key: key.clone(),
        actions,
        record: Some(LibraryRecord::new(
            key.clone(),
            candidate.metrics.clone().with_path(destination),
        )),
    }
}

/// Sidecars of `video` paired with the part of their name after the video stem
fn sidecars_with_suffix(view: &dyn LibraryView, video: &Path) -> Vec<(PathBuf, String)> {
    let video_stem = stem(video);
    view.sidecars(video)
        .into_iter()
        .filter_map(|sidecar| {
            let name = file_name(&sidecar);
            match suffix_after_stem(&name, &video_stem) {
                Some(suffix) => Some((sidecar.clone(), suffix.to_string())),
                None => {
                    warn!(sidecar = %sidecar.display(), "Sidecar name does not follow its video, left in place");
                    None
                }
            }
        })
        .collect()
}

/// The rest of `name` after a case-insensitive `stem` prefix.
///
/// Folds one char at a time so the cut lands on the original name even when
/// lowercasing changes the byte length.
fn suffix_after_stem<'a>(name: &'a str, stem: &str) -> Option<&'a str> {
    let target = stem.to_lowercase();
    if target.is_empty() {
        return Some(name);
    }

    let mut folded = String::new();
    for (index, c) in name.char_indices() {
        folded.extend(c.to_lowercase());
        if folded == target {
            return Some(&name[index + c.len_utf8()..]);
        }
        if folded.len() >= target.len() {
            return None;
        }
    }
    None
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
