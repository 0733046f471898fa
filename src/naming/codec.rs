//! Canonical file name grammar.
//!
//! A canonical video (or sidecar) file name is a fixed sequence of dot
//! separated segments:
//!
//! ```text
//! {Title}.{YYYY}[.3D][.{Edition}][.{Part}][.{Definition}][.{Source}][.{VideoCodec}][.{AudioCodec}]
//!     [-{ReleaseGroup}][.{MultiAudio}][.watermark][.{Encoder}][.{LanguageSubtitle}][.cd{N}].{ext}
//! ```
//!
//! Every accepted name satisfies `serialize(parse(name)) == name`.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::FormatError;

const FILE_PATTERN: &str = concat!(
    r"^(?P<title>[^.].*?)\.(?P<year>(?:19|20)\d{2})",
    r"(?:\.(?P<three_d>3D))?",
    r"(?P<edition>(?:\.(?:EXTENDED|UNRATED|REMASTERED|IMAX|CRITERION|THEATRICAL|DC|Directors\.Cut|Special\.Edition))+)?",
    r"(?:\.(?P<part>Part\.?\d{1,2}))?",
    r"(?:\.(?P<definition>2160p|1080p|720p|480p))?",
    r"(?:\.(?P<source>BluRay|BDRip|WEBRip|WEB-DL|WEB|HDRip|DVDRip|HDTV))?",
    r"(?:\.(?P<video_codec>x265\.10bit|x265|x264|H\.?265|H\.?264|HEVC|AVC))?",
    r"(?:\.(?P<audio_codec>AAC5\.1|AAC2\.0|AAC|DTS-HD|DTS|AC3|DDP5\.1|DD5\.1|TrueHD|FLAC))?",
    r"(?:-(?P<release_group>\[[^\]]+\]|[A-Za-z0-9]+))?",
    r"(?:\.(?P<multi_audio>\d+Audio|DUAL|MULTI))?",
    r"(?P<watermark>\.watermark)?",
    r"(?:\.(?P<encoder>ffmpeg|handbrake))?",
    r"(?:\.(?P<language_subtitle>[a-z]{2,3}(?:&[a-z]{2,3})*))?",
    r"(?:\.(?P<disc>cd\d))?",
    r"\.(?P<extension>[A-Za-z0-9]{2,4})$",
);

fn file_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(FILE_PATTERN).expect("file name grammar is a valid regex"))
}

fn year_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.(?:19|20)\d{2}\.").expect("year pattern is a valid regex"))
}

/// Structured form of a canonical file name.
///
/// Absent optional segments are empty strings (or `false`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedAsset {
    pub title: String,
    pub year: u16,
    pub three_d: bool,
    /// Dot-joined edition markers, e.g. `EXTENDED.REMASTERED`
    pub edition: String,
    pub part: String,
    pub definition: String,
    pub source: String,
    pub video_codec: String,
    pub audio_codec: String,
    /// Group name without the leading `-`; bracket-tagged groups keep their brackets
    pub release_group: String,
    pub multi_audio: String,
    pub watermark: bool,
    pub encoder: String,
    pub language_subtitle: String,
    /// `cdN` part suffix
    pub disc: String,
    pub extension: String,
}

impl NamedAsset {
    /// Name without the extension
    pub fn stem(&self) -> String {
        let full = self.serialize();
        let cut = full.len() - self.extension.len() - 1;
        full[..cut].to_string()
    }

    /// Concatenate all segments in canonical order.
    pub fn serialize(&self) -> String {
        let mut name = format!("{}.{:04}", self.title, self.year);

        if self.three_d {
            name.push_str(".3D");
        }
        for segment in [&self.edition, &self.part, &self.definition, &self.source] {
            push_segment(&mut name, '.', segment);
        }
        push_segment(&mut name, '.', &self.video_codec);
        push_segment(&mut name, '.', &self.audio_codec);
        push_segment(&mut name, '-', &self.release_group);
        push_segment(&mut name, '.', &self.multi_audio);
        if self.watermark {
            name.push_str(".watermark");
        }
        for segment in [&self.encoder, &self.language_subtitle, &self.disc] {
            push_segment(&mut name, '.', segment);
        }

        name.push('.');
        name.push_str(&self.extension);
        name
    }
}

impl fmt::Display for NamedAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

impl std::str::FromStr for NamedAsset {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

fn push_segment(name: &mut String, separator: char, segment: &str) {
    if !segment.is_empty() {
        name.push(separator);
        name.push_str(segment);
    }
}

/// Parse a canonical file name. Never partially accepts.
pub fn parse(name: &str) -> Result<NamedAsset, FormatError> {
    let Some(caps) = file_regex().captures(name) else {
        let reason = if year_regex().is_match(name) {
            "segments after the year do not follow the canonical tag order"
        } else {
            "missing .YYYY. year segment"
        };
        return Err(FormatError::new(name, reason));
    };

    let text = |group: &str| {
        caps.name(group)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    };

    let year = text("year")
        .parse::<u16>()
        .map_err(|e| FormatError::new(name, format!("invalid year: {}", e)))?;

    Ok(NamedAsset {
        title: text("title"),
        year,
        three_d: caps.name("three_d").is_some(),
        // Captured with its leading separator
        edition: text("edition").trim_start_matches('.').to_string(),
        part: text("part"),
        definition: text("definition"),
        source: text("source"),
        video_codec: text("video_codec"),
        audio_codec: text("audio_codec"),
        release_group: text("release_group"),
        multi_audio: text("multi_audio"),
        watermark: caps.name("watermark").is_some(),
        encoder: text("encoder"),
        language_subtitle: text("language_subtitle"),
        disc: text("disc"),
        extension: text("extension"),
    })
}

/// Inverse of [`parse`].
pub fn serialize(asset: &NamedAsset) -> String {
    asset.serialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("The.Matrix.1999.mkv")]
    #[case("The.Matrix.1999.1080p.BluRay.x264-RARBG.mp4")]
    #[case("Blade.Runner.2049.2017.2160p.BluRay.x265.10bit-VXT.mkv")]
    #[case("Avatar.2009.3D.EXTENDED.1080p.BluRay.x264.DTS-[YTS.MX].mkv")]
    #[case("Kill.Bill.2003.Part.1.720p.WEBRip.x264.AAC-YIFY.2Audio.mp4")]
    #[case("Heat.1995.REMASTERED.1080p.BluRay.H264.AAC5.1-RARBG.watermark.ffmpeg.mp4")]
    #[case("Amelie.2001.1080p.BluRay.x264-RARBG.chs&eng.srt")]
    #[case("Lawrence.of.Arabia.1962.1080p.BluRay.x264-RARBG.cd2.avi")]
    fn test_round_trip(#[case] name: &str) {
        let asset = parse(name).unwrap();
        assert_eq!(asset.serialize(), name);
    }

    #[test]
    fn test_parse_fields() {
        let asset = parse("Blade.Runner.2049.2017.2160p.BluRay.x265.10bit-VXT.mkv").unwrap();
        assert_eq!(asset.title, "Blade.Runner.2049");
        assert_eq!(asset.year, 2017);
        assert_eq!(asset.definition, "2160p");
        assert_eq!(asset.source, "BluRay");
        assert_eq!(asset.video_codec, "x265.10bit");
        assert_eq!(asset.release_group, "VXT");
        assert_eq!(asset.extension, "mkv");
        assert!(!asset.three_d);
    }

    #[test]
    fn test_parse_edition_and_markers() {
        let asset =
            parse("Avatar.2009.3D.EXTENDED.REMASTERED.1080p.BluRay.x264-RARBG.DUAL.eng.mkv").unwrap();
        assert!(asset.three_d);
        assert_eq!(asset.edition, "EXTENDED.REMASTERED");
        assert_eq!(asset.multi_audio, "DUAL");
        assert_eq!(asset.language_subtitle, "eng");
    }

    #[test]
    fn test_stem() {
        let asset = parse("Heat.1995.1080p.BluRay.x264-RARBG.mkv").unwrap();
        assert_eq!(asset.stem(), "Heat.1995.1080p.BluRay.x264-RARBG");
    }

    #[test]
    fn test_missing_year_is_format_error() {
        let err = parse("randomfile.mp4").unwrap_err();
        assert_eq!(err.name, "randomfile.mp4");
        assert!(err.reason.contains("year"));
    }

    #[test]
    fn test_out_of_order_tags_rejected() {
        let err = parse("Heat.1995.BluRay.1080p.mkv").unwrap_err();
        assert!(err.reason.contains("order"));
    }

    #[test]
    fn test_from_str() {
        let asset: NamedAsset = "Heat.1995.mkv".parse().unwrap();
        assert_eq!(asset.title, "Heat");
        assert!("Heat.mkv".parse::<NamedAsset>().is_err());
    }
}
