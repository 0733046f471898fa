//! ffprobe adapter for stream metrics.
//!
//! Spawns `ffprobe` as a subprocess and maps its JSON report onto
//! [`AssetMetrics`].

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tokio::time::timeout;

use super::AssetProbe;
use crate::domain::AssetMetrics;

/// Default time allowed for one probe
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Probe using the `ffprobe` binary
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    /// Path to the ffprobe binary (default: "ffprobe")
    binary_path: String,

    probe_timeout: Duration,
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl FfprobeProbe {
    pub fn new() -> Self {
        Self::with_binary_path("ffprobe")
    }

    /// Use a custom ffprobe binary
    pub fn with_binary_path(binary_path: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    async fn run(&self, path: &Path) -> Result<String> {
        let child = Command::new(&self.binary_path)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_streams",
                "-show_format",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn {} for {}", self.binary_path, path.display()))?;

        let output = timeout(self.probe_timeout, child.wait_with_output())
            .await
            .with_context(|| {
                format!(
                    "Probe of {} timed out after {:?}",
                    path.display(),
                    self.probe_timeout
                )
            })?
            .with_context(|| format!("Failed to wait for {}", self.binary_path))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit_code = output.status.code().unwrap_or(-1);
            anyhow::bail!(
                "ffprobe failed on {} with exit code {}: {}",
                path.display(),
                exit_code,
                stderr.trim()
            );
        }

        String::from_utf8(output.stdout).context("ffprobe output is not valid UTF-8")
    }
}

#[async_trait]
impl AssetProbe for FfprobeProbe {
    fn name(&self) -> &str {
        "ffprobe"
    }

    async fn probe(&self, path: &Path) -> Result<AssetMetrics> {
        let json = self.run(path).await?;
        parse_report(path, &json)
    }
}

#[derive(Debug, Deserialize)]
struct Report {
    #[serde(default)]
    streams: Vec<Stream>,
    format: Option<Format>,
}

#[derive(Debug, Deserialize)]
struct Stream {
    codec_type: Option<String>,
    width: Option<i64>,
    height: Option<i64>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Format {
    duration: Option<String>,
}

/// Map an ffprobe JSON report to metrics for `path`.
///
/// Dimensions come from the first video stream. Missing values stay zero
/// and are caught later by metric validation.
pub fn parse_report(path: &Path, json: &str) -> Result<AssetMetrics> {
    let report: Report = serde_json::from_str(json)
        .with_context(|| format!("Invalid ffprobe report for {}", path.display()))?;

    let mut metrics = AssetMetrics::invalid(path);

    if let Some(video) = report.streams.iter().find(|s| s.kind() == "video") {
        metrics.width = video.width.unwrap_or(0);
        metrics.height = video.height.unwrap_or(0);
    }

    for stream in &report.streams {
        match stream.kind() {
            "audio" => {
                metrics.audio_streams += 1;
                metrics.audio_bit_rates.push(
                    stream
                        .bit_rate
                        .as_deref()
                        .and_then(|b| b.parse().ok())
                        .unwrap_or(0),
                );
            }
            "subtitle" => metrics.subtitle_streams += 1,
            _ => {}
        }
    }

    metrics.duration_ms = report
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .map(|seconds| (seconds * 1000.0).round() as i64)
        .unwrap_or(0);

    Ok(metrics)
}

impl Stream {
    fn kind(&self) -> &str {
        self.codec_type.as_deref().unwrap_or_default()
    }
}
