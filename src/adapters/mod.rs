//! Adapter interfaces for external systems.
//!
//! The only external collaborator of the curation core is the media probe
//! that turns a video file into [`AssetMetrics`].

pub mod ffprobe;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::domain::AssetMetrics;

pub use ffprobe::FfprobeProbe;

/// Reads stream metrics from a media file
#[async_trait]
pub trait AssetProbe: Send + Sync {
    /// Human-readable probe name
    fn name(&self) -> &str;

    /// Probe a single file
    async fn probe(&self, path: &Path) -> Result<AssetMetrics>;
}

/// Probe answering from a fixed table (tests, replays of saved probe output)
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    metrics: HashMap<PathBuf, AssetMetrics>,
}

impl StaticProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register metrics; the table key is the metrics' own `File` path
    pub fn with(mut self, metrics: AssetMetrics) -> Self {
        self.metrics.insert(metrics.path.clone(), metrics);
        self
    }
}

#[async_trait]
impl AssetProbe for StaticProbe {
    fn name(&self) -> &str {
        "static"
    }

    async fn probe(&self, path: &Path) -> Result<AssetMetrics> {
        self.metrics
            .get(path)
            .cloned()
            .with_context(|| format!("No metrics recorded for {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_probe() {
        let probe = StaticProbe::new().with(AssetMetrics::invalid("/a.mkv"));
        assert_eq!(probe.name(), "static");
        assert!(probe.probe(Path::new("/a.mkv")).await.is_ok());
        assert!(probe.probe(Path::new("/b.mkv")).await.is_err());
    }
}
