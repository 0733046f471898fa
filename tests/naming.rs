//! Naming Integration Tests
//!
//! Canonical file and directory grammar, as seen from outside the crate.

use std::path::Path;

use rstest::rstest;

use curator::naming::{classify, classify_path, parse, parse_directory, serialize, Classification, DirectoryName};
use curator::{CurationError, FormatError};

#[rstest]
#[case("Heat.1995.mkv")]
#[case("Heat.1995.1080p.BluRay.x264-RARBG.mkv")]
#[case("Heat.1995.1080p.BluRay.x264-RARBG.eng.srt")]
#[case("The.Lord.of.the.Rings.2001.EXTENDED.2160p.BluRay.x265.10bit-VXT.mkv")]
#[case("Avatar.2009.3D.1080p.BluRay.x264-[YTS.AG].mp4")]
#[case("Dune.Part.Two.2024.2160p.WEB-DL.HEVC.DDP5.1-FLUX.mkv")]
fn test_serialize_parse_round_trip(#[case] name: &str) {
    let asset = parse(name).unwrap();
    assert_eq!(serialize(&asset), name);
}

#[test]
fn test_scenario_e_malformed_name() {
    let err: FormatError = parse("randomfile.mp4").unwrap_err();
    assert_eq!(err.name, "randomfile.mp4");

    let wrapped: CurationError = err.into();
    assert!(matches!(wrapped, CurationError::Format(_)));
    assert!(!wrapped.is_skip());
}

#[rstest]
#[case("Heat.1995.1080p.BluRay.x265-RARBG.mkv", Classification::Top)]
#[case("Heat.1995.1080p.BluRay.x264-RARBG.mkv", Classification::Premium)]
#[case("Heat.1995.1080p.BluRay.x264-YIFY.mkv", Classification::Preferred)]
#[case("Heat.1995.1080p.BluRay.x264-[YTS.MX].mkv", Classification::Preferred)]
#[case("Heat.1995.1080p.BluRay.x264-GalaxyRG.mkv", Classification::Plain)]
fn test_classification(#[case] name: &str, #[case] expected: Classification) {
    assert_eq!(classify(&parse(name).unwrap()), expected);
}

#[test]
fn test_classification_order() {
    assert!(Classification::Top > Classification::Premium);
    assert!(Classification::Premium > Classification::Preferred);
    assert!(Classification::Preferred > Classification::Plain);
}

#[test]
fn test_non_canonical_paths_classify_plain() {
    assert_eq!(
        classify_path(Path::new("/downloads/randomfile.mp4")),
        Classification::Plain
    );
}

#[test]
fn test_directory_name_from_file() {
    let asset = parse("Heat.1995.2160p.BluRay.x265-VXT.mkv").unwrap();
    let dir = DirectoryName::from_asset(&asset);
    assert_eq!(dir.serialize(), "Heat.1995[2160p]");
    assert_eq!(parse_directory("Heat.1995[2160p]").unwrap(), dir);
}
