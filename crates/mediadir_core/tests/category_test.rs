//! Tests for category resolution and reference handles.

use mediadir_core::{
    CollectionAddress, ContentLocation, ContentRecord, ContentUri, MediaCategory, StorageMode,
};
use std::str::FromStr;
use strum::IntoEnumIterator;

#[test]
fn test_locate_is_deterministic() {
    for category in MediaCategory::iter() {
        for sub_path in [None, Some(""), Some("trip/day 1"), Some("a//b")] {
            let first = category.locate(sub_path);
            let second = category.locate(sub_path);
            assert_eq!(first, second);
            assert!(first.relative_path().starts_with(category.root()));
        }
    }
}

#[test]
fn test_empty_sub_path_is_category_root() {
    let location = MediaCategory::Downloads.locate(Some(""));
    assert_eq!(location.relative_path(), "Download");
    assert_eq!(*location.address(), CollectionAddress::Downloads);
    assert_eq!(location.segments(), vec!["Download"]);
}

#[test]
fn test_sub_path_is_kept_verbatim() {
    let location = ContentLocation::resolve(MediaCategory::Music, Some("../Ringtones//x"));
    assert_eq!(location.relative_path(), "Music/../Ringtones//x");
    assert_eq!(location.segments(), vec!["Music", "..", "Ringtones", "", "x"]);
}

#[test]
fn test_category_collections() {
    assert_eq!(
        MediaCategory::Camera.collection_address(),
        CollectionAddress::Images
    );
    assert_eq!(
        MediaCategory::Podcasts.collection_address(),
        CollectionAddress::Audio
    );
    assert_eq!(
        MediaCategory::Movies.collection_address(),
        CollectionAddress::Video
    );
    assert_eq!(
        MediaCategory::Documents.collection_address(),
        CollectionAddress::Files
    );
    assert_eq!(CollectionAddress::Files.allowed_roots(), None);
    assert_eq!(
        CollectionAddress::Audio.required_mime_prefix(),
        Some("audio/")
    );
}

#[test]
fn test_category_names_parse() {
    assert_eq!(
        MediaCategory::from_str("DCIM").unwrap(),
        MediaCategory::Camera
    );
    assert_eq!(
        MediaCategory::from_str("documents").unwrap(),
        MediaCategory::Documents
    );
    assert!(MediaCategory::from_str("screenshots").is_err());
    assert_eq!(StorageMode::from_str("legacy").unwrap(), StorageMode::Legacy);
}

#[test]
fn test_mime_inference() {
    assert_eq!(MediaCategory::Music.mime_type_for("song.MP3"), "audio/mpeg");
    assert_eq!(
        MediaCategory::Documents.mime_type_for("archive.tar.qqzz"),
        "application/octet-stream"
    );
    assert_eq!(MediaCategory::Pictures.mime_type_for("scan.TIFF"), "image/tiff");
    assert_eq!(MediaCategory::Movies.mime_type_for("clip"), "video/*");
}

#[test]
fn test_uri_parse_and_display() {
    for address in CollectionAddress::iter() {
        let uri = ContentUri::new(address, 17);
        let parsed: ContentUri = uri.to_string().parse().unwrap();
        assert_eq!(parsed, uri);
    }

    assert!("content://media/external/file/abc".parse::<ContentUri>().is_err());
    assert!("file:///tmp/x".parse::<ContentUri>().is_err());
}

#[test]
fn test_uri_serializes_as_string() {
    let uri = ContentUri::new(CollectionAddress::Downloads, 3);
    let json = serde_json::to_string(&uri).unwrap();
    assert_eq!(json, "\"content://media/external/downloads/3\"");
    let back: ContentUri = serde_json::from_str(&json).unwrap();
    assert_eq!(back, uri);
}

#[test]
fn test_record_builder_takes_id_from_uri() {
    let record = ContentRecord::builder()
        .uri(ContentUri::new(CollectionAddress::Files, 9))
        .display_name("q1.pdf")
        .mime_type("application/pdf")
        .relative_path("Documents/reports")
        .pending(true)
        .build()
        .unwrap();

    assert_eq!(*record.id(), 9);
    assert!(record.is_pending());
    assert_eq!(record.data_path(), &None);
}

#[test]
fn test_record_builder_requires_display_name() {
    let err = ContentRecord::builder()
        .uri(ContentUri::new(CollectionAddress::Files, 1))
        .mime_type("text/plain")
        .relative_path("Documents")
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("display_name"));
}
