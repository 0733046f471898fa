//! Domain types for the curator.
//!
//! This module contains the core data structures:
//! - Metrics: probe results, library records and candidates
//! - Action: planned filesystem mutations grouped into decisions

pub mod action;
pub mod metrics;

// Re-export commonly used types
pub use action::{Action, Decision, SkipReason};
pub use metrics::{AssetMetrics, CandidateAsset, LibraryRecord, MetricsMap};
