//! Release quality classification.
//!
//! The release-group lists are hard-coded and intentionally literal.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::codec::{parse, NamedAsset};

/// Release groups whose encodes are trusted above everything else
pub const TOP_RELEASE_GROUPS: &[&str] = &["RARBG", "VXT"];

/// Known preferred encoders (bracket-tagged groups are preferred too)
pub const PREFERRED_RELEASE_GROUPS: &[&str] = &["YIFY", "YTS"];

/// Video codecs of the newer (HEVC) family
pub const NEWER_VIDEO_CODECS: &[&str] = &["x265", "x265.10bit", "H265", "H.265", "HEVC"];

/// Priority of a release, ordered `Plain < Preferred < Premium < Top`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Plain,
    Preferred,
    Premium,
    Top,
}

impl Classification {
    /// `Top` or `Premium`
    pub fn is_premium_or_better(self) -> bool {
        self >= Classification::Premium
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Plain => write!(f, "plain"),
            Classification::Preferred => write!(f, "preferred"),
            Classification::Premium => write!(f, "premium"),
            Classification::Top => write!(f, "top"),
        }
    }
}

fn is_one_of(value: &str, list: &[&str]) -> bool {
    list.iter().any(|candidate| candidate.eq_ignore_ascii_case(value))
}

/// Classify a parsed name.
pub fn classify(asset: &NamedAsset) -> Classification {
    let group = asset.release_group.as_str();

    if is_one_of(group, TOP_RELEASE_GROUPS) {
        if is_one_of(&asset.video_codec, NEWER_VIDEO_CODECS) {
            Classification::Top
        } else {
            Classification::Premium
        }
    } else if is_one_of(group, PREFERRED_RELEASE_GROUPS)
        || (group.starts_with('[') && group.ends_with(']'))
    {
        Classification::Preferred
    } else {
        Classification::Plain
    }
}

/// Classify a file by its name. Names outside the grammar are `Plain`.
pub fn classify_path(path: &Path) -> Classification {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return Classification::Plain;
    };

    match parse(name) {
        Ok(asset) => classify(&asset),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Non-canonical name, treating as plain release");
            Classification::Plain
        }
    }
}
