//! Canonical library directory names: `{Title}.{YYYY}[{Definition}]`.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::codec::NamedAsset;
use crate::error::FormatError;

fn directory_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<title>[^.].*?)\.(?P<year>(?:19|20)\d{2})(?:\[(?P<definition>2160p|1080p|720p|480p)\])?$")
            .expect("directory grammar is a valid regex")
    })
}

/// Structured form of a canonical directory name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectoryName {
    pub title: String,
    pub year: u16,
    pub definition: String,
}

impl DirectoryName {
    /// The directory a parsed video belongs in
    pub fn from_asset(asset: &NamedAsset) -> Self {
        Self {
            title: asset.title.clone(),
            year: asset.year,
            definition: asset.definition.clone(),
        }
    }

    pub fn serialize(&self) -> String {
        if self.definition.is_empty() {
            format!("{}.{:04}", self.title, self.year)
        } else {
            format!("{}.{:04}[{}]", self.title, self.year, self.definition)
        }
    }
}

impl fmt::Display for DirectoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

/// Parse a canonical directory name.
pub fn parse_directory(name: &str) -> Result<DirectoryName, FormatError> {
    let caps = directory_regex()
        .captures(name)
        .ok_or_else(|| FormatError::new(name, "expected {Title}.{YYYY}[{Definition}]"))?;

    let year = caps["year"]
        .parse::<u16>()
        .map_err(|e| FormatError::new(name, format!("invalid year: {}", e)))?;

    Ok(DirectoryName {
        title: caps["title"].to_string(),
        year,
        definition: caps
            .name("definition")
            .map(|m| m.as_str().to_string())
            .unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::parse;

    #[test]
    fn test_directory_round_trip() {
        for name in ["Heat.1995", "The.Matrix.1999[1080p]", "Blade.Runner.2049.2017[2160p]"] {
            assert_eq!(parse_directory(name).unwrap().serialize(), name);
        }
    }

    #[test]
    fn test_directory_rejects_file_names() {
        assert!(parse_directory("Heat.1995.mkv").is_err());
        assert!(parse_directory("Heat").is_err());
        assert!(parse_directory("Heat.1995[1080]").is_err());
    }

    #[test]
    fn test_from_asset() {
        let asset = parse("Heat.1995.1080p.BluRay.x264-RARBG.mkv").unwrap();
        assert_eq!(DirectoryName::from_asset(&asset).to_string(), "Heat.1995[1080p]");
    }
}
