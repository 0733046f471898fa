//! Planned filesystem actions and the decisions that group them.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::metrics::LibraryRecord;

/// Why a candidate (or an action) was not applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    InvalidMetrics,
    ExistingIsBetter,
    LowerResolution,
    DurationMismatch,
    FewerStreams,
    AlreadyExists,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::InvalidMetrics => "invalid metrics",
            SkipReason::ExistingIsBetter => "existing is better version",
            SkipReason::LowerResolution => "lower resolution",
            SkipReason::DurationMismatch => "duration mismatch",
            SkipReason::FewerStreams => "fewer audio or subtitle streams",
            SkipReason::AlreadyExists => "destination already exists",
        };
        f.write_str(text)
    }
}

/// A single filesystem mutation (or a recorded skip).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    MoveAsset {
        key: String,
        source: PathBuf,
        destination: PathBuf,
        overwrite: bool,
        reason: String,
    },
    MoveAttachment {
        key: String,
        source: PathBuf,
        destination: PathBuf,
        overwrite: bool,
        reason: String,
    },
    DeleteAsset {
        key: String,
        path: PathBuf,
        reason: String,
    },
    DeleteAttachment {
        key: String,
        path: PathBuf,
        reason: String,
    },
    Skip {
        key: String,
        path: PathBuf,
        reason: SkipReason,
    },
}

impl Action {
    pub fn skip(key: impl Into<String>, path: impl Into<PathBuf>, reason: SkipReason) -> Self {
        Action::Skip {
            key: key.into(),
            path: path.into(),
            reason,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Action::MoveAsset { key, .. }
            | Action::MoveAttachment { key, .. }
            | Action::DeleteAsset { key, .. }
            | Action::DeleteAttachment { key, .. }
            | Action::Skip { key, .. } => key,
        }
    }

    /// The path this action mutates: the destination of a move, or the deleted file
    pub fn target(&self) -> &Path {
        match self {
            Action::MoveAsset { destination, .. } | Action::MoveAttachment { destination, .. } => {
                destination
            }
            Action::DeleteAsset { path, .. }
            | Action::DeleteAttachment { path, .. }
            | Action::Skip { path, .. } => path,
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Action::Skip { .. })
    }

    /// Short label used in the action log
    pub fn label(&self) -> &'static str {
        match self {
            Action::MoveAsset { .. } => "MOVE",
            Action::MoveAttachment { .. } => "MOVE-ATTACHMENT",
            Action::DeleteAsset { .. } => "DELETE",
            Action::DeleteAttachment { .. } => "DELETE-ATTACHMENT",
            Action::Skip { .. } => "SKIP",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::MoveAsset {
                key,
                source,
                destination,
                reason,
                ..
            }
            | Action::MoveAttachment {
                key,
                source,
                destination,
                reason,
                ..
            } => write!(
                f,
                "{} [{}] {} -> {} ({})",
                self.label(),
                key,
                source.display(),
                destination.display(),
                reason
            ),
            Action::DeleteAsset { key, path, reason }
            | Action::DeleteAttachment { key, path, reason } => {
                write!(f, "{} [{}] {} ({})", self.label(), key, path.display(), reason)
            }
            Action::Skip { key, path, reason } => {
                write!(f, "{} [{}] {}: {}", self.label(), key, path.display(), reason)
            }
        }
    }
}

/// The outcome of reconciling one key: ordered actions plus the record to
/// store once they all succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub key: String,
    pub actions: Vec<Action>,
    pub record: Option<LibraryRecord>,
}

impl Decision {
    pub fn skip(key: impl Into<String>, path: impl Into<PathBuf>, reason: SkipReason) -> Self {
        let key = key.into();
        Self {
            actions: vec![Action::skip(key.clone(), path, reason)],
            key,
            record: None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.record.is_some()
    }

    /// The skip reason, if this decision rejected its candidate
    pub fn skip_reason(&self) -> Option<SkipReason> {
        self.actions.iter().find_map(|a| match a {
            Action::Skip { reason, .. } => Some(*reason),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_display() {
        let action = Action::MoveAsset {
            key: "tt001".to_string(),
            source: PathBuf::from("/ext/a.mkv"),
            destination: PathBuf::from("/lib/a.mkv"),
            overwrite: false,
            reason: "new asset".to_string(),
        };
        assert_eq!(action.to_string(), "MOVE [tt001] /ext/a.mkv -> /lib/a.mkv (new asset)");

        let skip = Action::skip("tt001", "/ext/a.mkv", SkipReason::DurationMismatch);
        assert_eq!(skip.to_string(), "SKIP [tt001] /ext/a.mkv: duration mismatch");
        assert_eq!(skip.target(), Path::new("/ext/a.mkv"));
    }

    #[test]
    fn test_action_serialization() {
        let action = Action::DeleteAsset {
            key: "tt002".to_string(),
            path: PathBuf::from("/lib/old.mkv"),
            reason: "superseded".to_string(),
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["action"], "delete_asset");

        let parsed: Action = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, action);
    }

    #[test]
    fn test_decision_skip() {
        let decision = Decision::skip("tt003", "/ext/x.mkv", SkipReason::LowerResolution);
        assert!(!decision.is_accepted());
        assert_eq!(decision.skip_reason(), Some(SkipReason::LowerResolution));
    }
}
