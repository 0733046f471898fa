//! Replacement policy.
//!
//! Rules are evaluated in a fixed order and the first match wins. The order
//! is part of the contract: a `Top`/`Premium` incumbent beats a plain
//! candidate even when the candidate has the better resolution.

use tracing::debug;

use crate::domain::{CandidateAsset, LibraryRecord, SkipReason};
use crate::library::LibraryView;
use crate::naming::{classify_path, Classification};

/// A candidate may be at most this many pixels narrower than the incumbent
pub const MAX_WIDTH_DEFICIT: i64 = 5;

/// A candidate may be at most this many pixels shorter than the incumbent
pub const MAX_HEIGHT_DEFICIT: i64 = 20;

/// Largest tolerated runtime difference; beyond it the cut or language differs
pub const MAX_DURATION_DELTA_MS: i64 = 1100;

/// What to do with one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The candidate is the library entry itself
    AlreadyInLibrary,
    /// No record for the key
    AcceptNew,
    /// The record points at a file that is gone
    AcceptOrphan,
    /// Replace the incumbent
    Replace,
    Skip(SkipReason),
}

/// Evaluate the policy for one candidate against its (optional) incumbent.
pub fn decide(
    candidate: &CandidateAsset,
    existing: Option<&LibraryRecord>,
    view: &dyn LibraryView,
) -> Verdict {
    if let Some(record) = existing {
        if record.canonical_path() == candidate.path() {
            return Verdict::AlreadyInLibrary;
        }
    }

    if let Err(e) = candidate.metrics.validate(&candidate.key) {
        debug!(error = %e, "Candidate rejected");
        return Verdict::Skip(SkipReason::InvalidMetrics);
    }

    let Some(record) = existing else {
        return Verdict::AcceptNew;
    };

    if !view.exists(record.canonical_path()) {
        return Verdict::AcceptOrphan;
    }

    let incumbent_class = classify_path(record.canonical_path());
    let candidate_class = classify_path(candidate.path());
    compare(candidate, record, incumbent_class, candidate_class)
}

/// Rules 3-7: quality comparison against an incumbent that still exists.
pub fn compare(
    candidate: &CandidateAsset,
    record: &LibraryRecord,
    incumbent_class: Classification,
    candidate_class: Classification,
) -> Verdict {
    let new = &candidate.metrics;
    let old = &record.metrics;

    if incumbent_class.is_premium_or_better() && !candidate_class.is_premium_or_better() {
        return Verdict::Skip(SkipReason::ExistingIsBetter);
    }

    // Lower only when short on both axes; a crop changes just one of them
    if new.width < old.width.saturating_sub(MAX_WIDTH_DEFICIT)
        && new.height < old.height.saturating_sub(MAX_HEIGHT_DEFICIT)
    {
        return Verdict::Skip(SkipReason::LowerResolution);
    }

    if new.duration_ms.abs_diff(old.duration_ms) > MAX_DURATION_DELTA_MS as u64 {
        return Verdict::Skip(SkipReason::DurationMismatch);
    }

    if new.audio_streams < old.audio_streams || new.subtitle_streams < old.subtitle_streams {
        return Verdict::Skip(SkipReason::FewerStreams);
    }

    Verdict::Replace
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AssetMetrics;
    use crate::library::MemoryView;
    use std::path::PathBuf;

    fn metrics(path: &str, width: i64, height: i64, duration_ms: i64) -> AssetMetrics {
        AssetMetrics {
            path: PathBuf::from(path),
            width,
            height,
            duration_ms,
            audio_streams: 1,
            audio_bit_rates: vec![192_000],
            subtitle_streams: 0,
        }
    }

    fn pair(old: AssetMetrics, new: AssetMetrics) -> (LibraryRecord, CandidateAsset) {
        (LibraryRecord::new("tt1", old), CandidateAsset::new("tt1", new))
    }

    #[test]
    fn test_thresholds_are_pinned() {
        assert_eq!(MAX_WIDTH_DEFICIT, 5);
        assert_eq!(MAX_HEIGHT_DEFICIT, 20);
        assert_eq!(MAX_DURATION_DELTA_MS, 1100);
    }

    #[test]
    fn test_resolution_boundaries() {
        let plain = Classification::Plain;

        let (old, new) = pair(metrics("/o", 1920, 800, 1000), metrics("/n", 1915, 780, 1000));
        assert_eq!(compare(&new, &old, plain, plain), Verdict::Replace);

        let (old, new) = pair(metrics("/o", 1920, 800, 1000), metrics("/n", 1900, 780, 1000));
        assert_eq!(compare(&new, &old, plain, plain), Verdict::Replace);

        let (old, new) = pair(metrics("/o", 1920, 800, 1000), metrics("/n", 1914, 779, 1000));
        assert_eq!(
            compare(&new, &old, plain, plain),
            Verdict::Skip(SkipReason::LowerResolution)
        );

        let (old, new) = pair(metrics("/o", 1920, 1080, 1000), metrics("/n", 1280, 720, 1000));
        assert_eq!(
            compare(&new, &old, plain, plain),
            Verdict::Skip(SkipReason::LowerResolution)
        );
    }

    #[test]
    fn test_duration_boundaries() {
        let plain = Classification::Plain;

        let (old, new) = pair(metrics("/o", 1920, 800, 7_200_000), metrics("/n", 1920, 800, 7_198_900));
        assert_eq!(compare(&new, &old, plain, plain), Verdict::Replace);

        let (old, new) = pair(metrics("/o", 1920, 800, 7_200_000), metrics("/n", 1920, 800, 7_201_101));
        assert_eq!(
            compare(&new, &old, plain, plain),
            Verdict::Skip(SkipReason::DurationMismatch)
        );
    }

    #[test]
    fn test_duration_extremes_do_not_overflow() {
        let plain = Classification::Plain;
        let (old, new) = pair(metrics("/o", 1920, 800, i64::MIN), metrics("/n", 1920, 800, i64::MAX));
        assert_eq!(
            compare(&new, &old, plain, plain),
            Verdict::Skip(SkipReason::DurationMismatch)
        );

        let (old, new) = pair(metrics("/o", i64::MIN, i64::MIN, 1000), metrics("/n", 1920, 800, 1000));
        assert_eq!(compare(&new, &old, plain, plain), Verdict::Replace);
    }

    #[test]
    fn test_fewer_streams() {
        let plain = Classification::Plain;
        let mut old = metrics("/o", 1920, 800, 1000);
        old.subtitle_streams = 2;
        let mut new = metrics("/n", 1920, 800, 1000);
        new.subtitle_streams = 1;

        let (old, new) = pair(old, new);
        assert_eq!(
            compare(&new, &old, plain, plain),
            Verdict::Skip(SkipReason::FewerStreams)
        );
    }

    #[test]
    fn test_fewer_audio_streams() {
        let plain = Classification::Plain;
        let mut old = metrics("/o", 1920, 800, 1000);
        old.audio_streams = 2;
        old.audio_bit_rates = vec![640_000, 192_000];
        let new = metrics("/n", 1920, 800, 1000);

        let (old, new) = pair(old, new);
        assert_eq!(
            compare(&new, &old, plain, plain),
            Verdict::Skip(SkipReason::FewerStreams)
        );
    }

    #[test]
    fn test_premium_candidate_may_replace_top() {
        let (old, new) = pair(metrics("/o", 1920, 800, 1000), metrics("/n", 1920, 800, 1000));
        assert_eq!(
            compare(&new, &old, Classification::Top, Classification::Premium),
            Verdict::Replace
        );
        assert_eq!(
            compare(&new, &old, Classification::Top, Classification::Preferred),
            Verdict::Skip(SkipReason::ExistingIsBetter)
        );
    }

    #[test]
    fn test_invalid_metrics_checked_before_missing_record() {
        let candidate = CandidateAsset::new("tt1", AssetMetrics::invalid("/ext/a.mkv"));
        let view = MemoryView::new();
        assert_eq!(
            decide(&candidate, None, &view),
            Verdict::Skip(SkipReason::InvalidMetrics)
        );
    }

    #[test]
    fn test_orphaned_record_accepts() {
        let (old, new) = pair(
            metrics("/lib/a.mkv", 3840, 2160, 1000),
            metrics("/ext/a.mkv", 640, 480, 1000),
        );
        let view = MemoryView::with_files(["/ext/a.mkv"]);
        assert_eq!(decide(&new, Some(&old), &view), Verdict::AcceptOrphan);
    }

    #[test]
    fn test_same_path_is_already_in_library() {
        let (old, new) = pair(metrics("/lib/a.mkv", 1, 1, 1), metrics("/lib/a.mkv", 1, 1, 1));
        let view = MemoryView::new();
        assert_eq!(decide(&new, Some(&old), &view), Verdict::AlreadyInLibrary);
    }
}
