//! Probe metrics and the records built on them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CurationError, CurationResult};

/// Key → metrics map, the JSON shape of both the external and library inputs.
///
/// `BTreeMap` keeps the serialized order stable.
pub type MetricsMap = BTreeMap<String, AssetMetrics>;

/// Stream metrics of a single video file, as reported by the probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMetrics {
    #[serde(rename = "File")]
    pub path: PathBuf,

    #[serde(rename = "Width")]
    pub width: i64,

    #[serde(rename = "Height")]
    pub height: i64,

    #[serde(rename = "TotalMilliseconds")]
    pub duration_ms: i64,

    #[serde(rename = "Audio")]
    pub audio_streams: i64,

    #[serde(rename = "AudioBitRates", default)]
    pub audio_bit_rates: Vec<i64>,

    #[serde(rename = "Subtitle", default)]
    pub subtitle_streams: i64,
}

impl AssetMetrics {
    /// Metrics for a file the probe could not read
    pub fn invalid(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            width: 0,
            height: 0,
            duration_ms: 0,
            audio_streams: 0,
            audio_bit_rates: Vec::new(),
            subtitle_streams: 0,
        }
    }

    /// Reason these metrics are unusable, if any
    pub fn invalid_reason(&self) -> Option<&'static str> {
        if self.width <= 0 || self.height <= 0 {
            Some("missing video dimensions")
        } else if self.duration_ms <= 0 {
            Some("missing duration")
        } else if self.audio_streams <= 0 {
            Some("no audio streams")
        } else {
            None
        }
    }

    pub fn validate(&self, key: &str) -> CurationResult<()> {
        match self.invalid_reason() {
            Some(reason) => Err(CurationError::InvalidMetrics {
                key: key.to_string(),
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Same metrics, relocated
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }
}

/// A durable library entry. `key` is unique across the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryRecord {
    pub key: String,
    pub metrics: AssetMetrics,
}

impl LibraryRecord {
    pub fn new(key: impl Into<String>, metrics: AssetMetrics) -> Self {
        Self {
            key: key.into(),
            metrics,
        }
    }

    pub fn canonical_path(&self) -> &Path {
        &self.metrics.path
    }
}

/// A video found on external storage, evaluated against the library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateAsset {
    pub key: String,
    pub metrics: AssetMetrics,
}

impl CandidateAsset {
    pub fn new(key: impl Into<String>, metrics: AssetMetrics) -> Self {
        Self {
            key: key.into(),
            metrics,
        }
    }

    pub fn path(&self) -> &Path {
        &self.metrics.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_json_field_names() {
        let json = r#"{
            "File": "/ext/Heat.1995.mkv",
            "Width": 1920,
            "Height": 800,
            "TotalMilliseconds": 10260000,
            "Audio": 2,
            "AudioBitRates": [640000, 192000],
            "Subtitle": 3
        }"#;

        let metrics: AssetMetrics = serde_json::from_str(json).unwrap();
        assert_eq!(metrics.path, PathBuf::from("/ext/Heat.1995.mkv"));
        assert_eq!(metrics.duration_ms, 10_260_000);
        assert_eq!(metrics.audio_bit_rates, vec![640_000, 192_000]);
        assert_eq!(metrics.subtitle_streams, 3);

        let back = serde_json::to_value(&metrics).unwrap();
        assert_eq!(back["TotalMilliseconds"], 10_260_000);
    }

    #[test]
    fn test_optional_fields_default() {
        let json = r#"{"File":"a.mkv","Width":1,"Height":1,"TotalMilliseconds":1,"Audio":1}"#;
        let metrics: AssetMetrics = serde_json::from_str(json).unwrap();
        assert!(metrics.audio_bit_rates.is_empty());
        assert_eq!(metrics.subtitle_streams, 0);
    }

    #[test]
    fn test_invalid_metrics() {
        let metrics = AssetMetrics::invalid("/x.mkv");
        assert!(metrics.invalid_reason().is_some());
        assert!(matches!(
            metrics.validate("tt1"),
            Err(CurationError::InvalidMetrics { .. })
        ));

        let ok = AssetMetrics {
            width: 1920,
            height: 1080,
            duration_ms: 1,
            audio_streams: 1,
            ..metrics
        };
        assert!(ok.validate("tt1").is_ok());
    }

    #[test]
    fn test_missing_audio_alone_is_invalid() {
        let silent = AssetMetrics {
            path: PathBuf::from("/x.mkv"),
            width: 1920,
            height: 1080,
            duration_ms: 7_200_000,
            audio_streams: 0,
            audio_bit_rates: Vec::new(),
            subtitle_streams: 2,
        };
        assert_eq!(silent.invalid_reason(), Some("no audio streams"));

        let err = silent.validate("tt1").unwrap_err();
        assert_eq!(err.to_string(), "Invalid metrics for tt1: no audio streams");
    }
}
