//! Read-only view of the filesystem used by reconciliation.
//!
//! Reconciliation only needs to know whether a path exists and which files
//! sit next to a video. Keeping that behind a trait keeps the decision logic
//! free of I/O, and lets plans be computed against an in-memory tree.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Extensions treated as video assets (everything else in a folder is a sidecar candidate)
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "m4v", "mov", "wmv", "ts", "webm", "rmvb",
];

/// Whether a path has a video extension (case-insensitive)
pub fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| VIDEO_EXTENSIONS.iter().any(|v| v.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Minimal filesystem queries
pub trait LibraryView: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    /// Regular files directly inside `dir`, sorted
    fn files_in(&self, dir: &Path) -> Vec<PathBuf>;

    /// Sidecar files of `video`: non-video files in the same directory whose
    /// name starts with the video's stem followed by a dot (case-insensitive).
    fn sidecars(&self, video: &Path) -> Vec<PathBuf> {
        let (Some(dir), Some(stem)) = (video.parent(), video.file_stem().and_then(|s| s.to_str()))
        else {
            return Vec::new();
        };
        let prefix = format!("{}.", stem.to_lowercase());

        self.files_in(dir)
            .into_iter()
            .filter(|file| file != video && !is_video(file))
            .filter(|file| {
                file.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.to_lowercase().starts_with(&prefix))
                    .unwrap_or(false)
            })
            .collect()
    }
}

/// The local disk
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalView;

impl LibraryView for LocalView {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn files_in(&self, dir: &Path) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Vec::new();
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|entry| entry.path())
            .collect();
        files.sort();
        files
    }
}

/// An in-memory file tree, for planning against a snapshot (and for tests)
#[derive(Debug, Clone, Default)]
pub struct MemoryView {
    files: BTreeSet<PathBuf>,
}

impl MemoryView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
        }
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>) {
        self.files.insert(path.into());
    }
}

impl LibraryView for MemoryView {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains(path) || self.files.iter().any(|f| f.starts_with(path))
    }

    fn files_in(&self, dir: &Path) -> Vec<PathBuf> {
        self.files
            .iter()
            .filter(|f| f.parent() == Some(dir))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_video() {
        assert!(is_video(Path::new("a/Heat.1995.MKV")));
        assert!(is_video(Path::new("Heat.1995.mp4")));
        assert!(!is_video(Path::new("Heat.1995.srt")));
        assert!(!is_video(Path::new("Heat")));
    }

    #[test]
    fn test_sidecars_case_insensitive() {
        let view = MemoryView::with_files([
            "/lib/Heat.1995/Heat.1995.1080p.mkv",
            "/lib/Heat.1995/heat.1995.1080p.eng.srt",
            "/lib/Heat.1995/Heat.1995.1080p.jpg",
            "/lib/Heat.1995/Heat.1995.720p.mkv",
            "/lib/Heat.1995/Heat.1995.1080pX.nfo",
            "/lib/Heat.1995/poster.jpg",
        ]);

        let sidecars = view.sidecars(Path::new("/lib/Heat.1995/Heat.1995.1080p.mkv"));
        assert_eq!(
            sidecars,
            vec![
                PathBuf::from("/lib/Heat.1995/Heat.1995.1080p.jpg"),
                PathBuf::from("/lib/Heat.1995/heat.1995.1080p.eng.srt"),
            ]
        );
    }

    #[test]
    fn test_memory_view_directory_exists() {
        let view = MemoryView::with_files(["/lib/Heat.1995/Heat.1995.mkv"]);
        assert!(view.exists(Path::new("/lib/Heat.1995")));
        assert!(!view.exists(Path::new("/lib/Other.2000")));
    }

    #[test]
    fn test_local_view() {
        let temp = TempDir::new().unwrap();
        let video = temp.path().join("Heat.1995.mkv");
        std::fs::write(&video, b"v").unwrap();
        std::fs::write(temp.path().join("Heat.1995.srt"), b"s").unwrap();
        std::fs::create_dir(temp.path().join("Heat.1995.extras")).unwrap();

        let view = LocalView;
        assert!(view.exists(&video));
        assert_eq!(view.files_in(temp.path()).len(), 2);
        assert_eq!(view.sidecars(&video), vec![temp.path().join("Heat.1995.srt")]);
    }
}
