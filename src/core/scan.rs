//! Directory scanning.
//!
//! Walks a download root, resolves a content key for every video and probes
//! it, producing the external metrics map that reconciliation consumes.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};
use walkdir::{DirEntry, WalkDir};

use crate::adapters::ffprobe::DEFAULT_PROBE_TIMEOUT;
use crate::adapters::AssetProbe;
use crate::domain::{AssetMetrics, MetricsMap};
use crate::library::is_video;
use crate::naming::{parse, parse_directory};

fn imdb_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\btt\d{7,8}\b").expect("id pattern is a valid regex"))
}

/// Default worker count: available parallelism, but never fewer than four
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .max(4)
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Concurrent probes
    pub workers: usize,

    pub probe_timeout: Duration,

    /// Files or directories matching any of these (relative to the root, or
    /// by name) are not visited
    pub ignore_patterns: Vec<glob::Pattern>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            ignore_patterns: Vec::new(),
        }
    }
}

impl ScanOptions {
    /// Compile ignore globs
    pub fn with_ignore<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self> {
        for pattern in patterns {
            let pattern = pattern.as_ref();
            self.ignore_patterns.push(
                glob::Pattern::new(pattern)
                    .with_context(|| format!("Invalid ignore pattern: {}", pattern))?,
            );
        }
        Ok(self)
    }

    fn is_ignored(&self, root: &Path, path: &Path) -> bool {
        let relative = path.strip_prefix(root).unwrap_or(path);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.ignore_patterns
            .iter()
            .any(|p| p.matches_path(relative) || p.matches(&name))
    }
}

/// All video files under `root`, sorted. Hidden entries are skipped.
pub async fn discover(root: &Path, options: &ScanOptions) -> Result<Vec<PathBuf>> {
    let root = root.to_path_buf();
    let options = options.clone();
    tokio::task::spawn_blocking(move || walk_videos(&root, &options))
        .await
        .context("Directory walk panicked")?
}

fn walk_videos(root: &Path, options: &ScanOptions) -> Result<Vec<PathBuf>> {
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !(is_hidden(e) || options.is_ignored(root, e.path())));

    let mut videos = Vec::new();
    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk directory: {}", root.display()))?;
        if entry.file_type().is_file() && is_video(entry.path()) {
            videos.push(entry.into_path());
        } else if !entry.file_type().is_dir() {
            debug!(path = %entry.path().display(), "Not a video");
        }
    }

    videos.sort();
    Ok(videos)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

/// Content key for a video.
///
/// An IMDb-style id in the parent directory name or a sibling `.nfo` wins;
/// otherwise the key is derived from the title and year.
pub async fn resolve_key(video: &Path) -> String {
    let parent = video.parent().unwrap_or_else(|| Path::new(""));
    let dir_name = parent
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if let Some(id) = imdb_regex().find(&dir_name) {
        return id.as_str().to_string();
    }

    if let Some(id) = nfo_id(parent).await {
        return id;
    }

    let file_name = video
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let basis = match (parse(&file_name), parse_directory(&dir_name)) {
        (Ok(asset), _) => format!("{}.{}", asset.title, asset.year),
        (Err(_), Ok(dir)) => format!("{}.{}", dir.title, dir.year),
        _ => video
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    content_key(&basis)
}

/// Stable key from a `title.year` basis (case-insensitive)
pub fn content_key(basis: &str) -> String {
    let digest = Sha256::digest(basis.to_lowercase().as_bytes());
    hex::encode(&digest[..8])
}

async fn nfo_id(dir: &Path) -> Option<String> {
    let mut entries = fs::read_dir(dir).await.ok()?;
    let mut nfos = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let is_nfo = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("nfo"))
            .unwrap_or(false);
        if is_nfo {
            nfos.push(path);
        }
    }
    nfos.sort();

    for nfo in nfos {
        let Ok(bytes) = fs::read(&nfo).await else {
            continue;
        };
        let text = String::from_utf8_lossy(&bytes);
        if let Some(id) = imdb_regex().find(&text) {
            return Some(id.as_str().to_string());
        }
    }
    None
}

/// Probe one file. Failures and timeouts yield invalid metrics so the
/// candidate is skipped downstream instead of aborting the scan.
pub async fn probe_with_timeout(
    probe: &dyn AssetProbe,
    path: &Path,
    probe_timeout: Duration,
) -> AssetMetrics {
    match timeout(probe_timeout, probe.probe(path)).await {
        Ok(Ok(metrics)) => metrics.with_path(path),
        Ok(Err(e)) => {
            warn!(path = %path.display(), probe = probe.name(), error = %e, "Probe failed");
            AssetMetrics::invalid(path)
        }
        Err(_) => {
            warn!(path = %path.display(), probe = probe.name(), ?probe_timeout, "Probe timed out");
            AssetMetrics::invalid(path)
        }
    }
}

/// Scan `root` and probe every video found.
///
/// When two videos resolve to the same key, the first in path order with
/// valid metrics wins.
#[instrument(skip_all, fields(root = %root.display(), probe = probe.name()))]
pub async fn scan(
    root: &Path,
    probe: Arc<dyn AssetProbe>,
    options: &ScanOptions,
) -> Result<MetricsMap> {
    let videos = discover(root, options).await?;
    info!(videos = videos.len(), "Discovered videos");

    let semaphore = Arc::new(Semaphore::new(options.workers.max(1)));
    let mut tasks = JoinSet::new();

    for (index, video) in videos.into_iter().enumerate() {
        let probe = Arc::clone(&probe);
        let semaphore = Arc::clone(&semaphore);
        let probe_timeout = options.probe_timeout;
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            let key = resolve_key(&video).await;
            let metrics = probe_with_timeout(probe.as_ref(), &video, probe_timeout).await;
            (index, key, metrics)
        });
    }

    let mut probed = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        probed.push(joined.context("Probe task panicked")?);
    }
    probed.sort_by_key(|(index, _, _)| *index);

    let mut map = MetricsMap::new();
    for (_, key, metrics) in probed {
        if let Some(first) = map.get(&key) {
            let upgrade = first.invalid_reason().is_some() && metrics.invalid_reason().is_none();
            let (kept, dropped) = if upgrade { (&metrics, first) } else { (first, &metrics) };
            warn!(
                %key,
                kept = %kept.path.display(),
                dropped = %dropped.path.display(),
                "Duplicate key in scan"
            );
            if !upgrade {
                continue;
            }
        }
        map.insert(key, metrics);
    }

    info!(keys = map.len(), "Scan finished");
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::StaticProbe;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_default_workers_floor() {
        assert!(default_workers() >= 4);
    }

    #[test]
    fn test_content_key_is_case_insensitive() {
        assert_eq!(content_key("Heat.1995"), content_key("heat.1995"));
        assert_eq!(content_key("Heat.1995").len(), 16);
        assert_ne!(content_key("Heat.1995"), content_key("Heat.1996"));
    }

    #[tokio::test]
    async fn test_discover_filters_and_ignores() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(&root.join("A.2000").join("A.2000.mkv"));
        touch(&root.join("A.2000").join("A.2000.eng.srt"));
        touch(&root.join("Sample").join("sample.mkv"));
        touch(&root.join(".hidden").join("B.2001.mkv"));

        let options = ScanOptions::default().with_ignore(&["Sample"]).unwrap();
        let videos = discover(root, &options).await.unwrap();
        assert_eq!(videos, vec![root.join("A.2000").join("A.2000.mkv")]);
    }

    #[tokio::test]
    async fn test_resolve_key_sources() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        let by_dir = root.join("Heat (1995) tt0113277").join("heat.mkv");
        touch(&by_dir);
        assert_eq!(resolve_key(&by_dir).await, "tt0113277");

        let by_nfo = root.join("Heat").join("heat.mkv");
        touch(&by_nfo);
        std::fs::write(
            root.join("Heat").join("movie.nfo"),
            "https://www.imdb.com/title/tt0113277/",
        )
        .unwrap();
        assert_eq!(resolve_key(&by_nfo).await, "tt0113277");

        let by_name = root.join("dl").join("Heat.1995.1080p.BluRay.x264-RARBG.mkv");
        touch(&by_name);
        assert_eq!(resolve_key(&by_name).await, content_key("Heat.1995"));
    }

    #[tokio::test]
    async fn test_scan_marks_unprobeable_files_invalid() {
        let temp = TempDir::new().unwrap();
        let good = temp.path().join("tt0000001").join("A.2000.mkv");
        let bad = temp.path().join("tt0000002").join("B.2001.mkv");
        touch(&good);
        touch(&bad);

        let mut metrics = AssetMetrics::invalid(&good);
        metrics.width = 1920;
        metrics.height = 1080;
        metrics.duration_ms = 1000;
        metrics.audio_streams = 1;
        let probe: Arc<dyn AssetProbe> = Arc::new(StaticProbe::new().with(metrics));

        let map = scan(temp.path(), probe, &ScanOptions::default()).await.unwrap();
        assert_eq!(map.len(), 2);
        assert!(map["tt0000001"].invalid_reason().is_none());
        assert!(map["tt0000002"].invalid_reason().is_some());
    }

    #[tokio::test]
    async fn test_scan_duplicate_keys_keep_first_path() {
        let temp = TempDir::new().unwrap();
        let first = temp.path().join("tt0000001").join("a.mkv");
        let second = temp.path().join("tt0000001").join("b.mkv");
        touch(&first);
        touch(&second);

        let probe: Arc<dyn AssetProbe> = Arc::new(StaticProbe::new());
        let map = scan(temp.path(), probe, &ScanOptions::default()).await.unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["tt0000001"].path, first);
    }

    #[tokio::test]
    async fn test_scan_duplicate_keys_prefer_valid_metrics() {
        let temp = TempDir::new().unwrap();
        let broken = temp.path().join("tt0000001").join("a.mkv");
        let good = temp.path().join("tt0000001").join("b.mkv");
        touch(&broken);
        touch(&good);

        let mut metrics = AssetMetrics::invalid(&good);
        metrics.width = 1920;
        metrics.height = 1080;
        metrics.duration_ms = 1000;
        metrics.audio_streams = 1;
        let probe: Arc<dyn AssetProbe> = Arc::new(StaticProbe::new().with(metrics));

        let map = scan(temp.path(), probe, &ScanOptions::default()).await.unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["tt0000001"].path, good);
        assert!(map["tt0000001"].invalid_reason().is_none());
    }

    #[tokio::test]
    async fn test_discover_missing_root_fails() {
        let temp = TempDir::new().unwrap();
        let result = discover(&temp.path().join("absent"), &ScanOptions::default()).await;
        assert!(result.is_err());
    }
}
