//! curator - Media library curation
//!
//! Keeps a movie library in canonical shape: every video carries a
//! canonical file name, lives in a canonical directory, and is the best
//! available version of its title.
//!
//! # Architecture
//!
//! Planning is separated from doing:
//! - Reconciliation compares candidates with the stored library and emits
//!   ordered decisions without touching the disk
//! - The executor applies those decisions, concurrently and per-path safely
//! - The store is only updated for decisions that fully succeeded
//!
//! # Modules
//!
//! - `naming`: Canonical file and directory name grammar, classification
//! - `domain`: Metrics, records, actions and decisions
//! - `library`: Metadata store and filesystem view
//! - `core`: Policy, reconciliation, execution, scanning
//! - `adapters`: Media probes (ffprobe)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Check a name
//! curator parse Heat.1995.1080p.BluRay.x264-RARBG.mkv
//!
//! # Probe a download folder
//! curator scan ~/Downloads -o external.json
//!
//! # Preview, then apply
//! curator reconcile external.json --dry-run
//! curator reconcile external.json
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod error;
pub mod library;
pub mod naming;

// Re-export main types at crate root for convenience
pub use crate::core::{reconcile, Curator, MutationExecutor, ReconcileOptions, Reconciliation};
pub use domain::{Action, AssetMetrics, CandidateAsset, Decision, LibraryRecord, MetricsMap, SkipReason};
pub use error::{CurationError, CurationResult, FormatError};
pub use library::{Library, MetadataStore};
pub use naming::{classify, parse, serialize, Classification, DirectoryName, NamedAsset};
