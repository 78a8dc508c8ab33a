//! The fixed category table.
//!
//! Each [`MediaCategory`] maps to exactly one store collection and one root
//! path segment. The table is part of the public contract: changing a row is a
//! breaking change for every caller that persisted a location.

use crate::{ContentLocation, OCTET_STREAM, mime_type_for_suffix};
use serde::{Deserialize, Serialize};

/// Logical media category callers address content by.
///
/// # Examples
///
/// ```
/// use mediadir_core::{CollectionAddress, MediaCategory};
///
/// assert_eq!(MediaCategory::Music.root(), "Music");
/// assert_eq!(MediaCategory::Camera.collection_address(), CollectionAddress::Images);
/// assert_eq!("dcim".parse::<MediaCategory>().unwrap(), MediaCategory::Camera);
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    strum::EnumString,
    derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum MediaCategory {
    /// Camera captures (DCIM)
    #[display("camera")]
    #[strum(serialize = "camera", serialize = "dcim")]
    Camera,
    /// Pictures
    #[display("pictures")]
    #[strum(serialize = "pictures")]
    Pictures,
    /// Alarm sounds
    #[display("alarms")]
    #[strum(serialize = "alarms")]
    Alarms,
    /// Music
    #[display("music")]
    #[strum(serialize = "music")]
    Music,
    /// Notification sounds
    #[display("notifications")]
    #[strum(serialize = "notifications")]
    Notifications,
    /// Ringtones
    #[display("ringtones")]
    #[strum(serialize = "ringtones")]
    Ringtones,
    /// Podcasts
    #[display("podcasts")]
    #[strum(serialize = "podcasts")]
    Podcasts,
    /// Movies
    #[display("movies")]
    #[strum(serialize = "movies")]
    Movies,
    /// Documents
    #[display("documents")]
    #[strum(serialize = "documents")]
    Documents,
    /// Downloads
    #[display("downloads")]
    #[strum(serialize = "downloads", serialize = "download")]
    Downloads,
}

impl MediaCategory {
    /// Root path segment every location in this category starts with.
    pub fn root(&self) -> &'static str {
        match self {
            MediaCategory::Camera => "DCIM",
            MediaCategory::Pictures => "Pictures",
            MediaCategory::Alarms => "Alarms",
            MediaCategory::Music => "Music",
            MediaCategory::Notifications => "Notifications",
            MediaCategory::Ringtones => "Ringtones",
            MediaCategory::Podcasts => "Podcasts",
            MediaCategory::Movies => "Movies",
            MediaCategory::Documents => "Documents",
            MediaCategory::Downloads => "Download",
        }
    }

    /// Store collection records of this category live in.
    pub fn collection_address(&self) -> CollectionAddress {
        match self {
            MediaCategory::Camera | MediaCategory::Pictures => CollectionAddress::Images,
            MediaCategory::Alarms
            | MediaCategory::Music
            | MediaCategory::Notifications
            | MediaCategory::Ringtones
            | MediaCategory::Podcasts => CollectionAddress::Audio,
            MediaCategory::Movies => CollectionAddress::Video,
            MediaCategory::Downloads => CollectionAddress::Downloads,
            MediaCategory::Documents => CollectionAddress::Files,
        }
    }

    /// Coarse MIME type used when a display name carries no suffix.
    pub fn default_mime_type(&self) -> &'static str {
        match self.collection_address() {
            CollectionAddress::Images => "image/*",
            CollectionAddress::Audio => "audio/*",
            CollectionAddress::Video => "video/*",
            CollectionAddress::Downloads | CollectionAddress::Files => "*/*",
        }
    }

    /// MIME type inferred from a display name's suffix.
    ///
    /// The suffix is everything after the last `.`. Names without a dot fall
    /// back to [`default_mime_type`](Self::default_mime_type); unknown
    /// suffixes map to `application/octet-stream`.
    ///
    /// ```
    /// use mediadir_core::MediaCategory;
    ///
    /// assert_eq!(MediaCategory::Documents.mime_type_for("q1.pdf"), "application/pdf");
    /// assert_eq!(MediaCategory::Pictures.mime_type_for("holiday"), "image/*");
    /// ```
    pub fn mime_type_for(&self, display_name: &str) -> &'static str {
        match display_name.rsplit_once('.') {
            Some((_, suffix)) => mime_type_for_suffix(suffix).unwrap_or(OCTET_STREAM),
            None => self.default_mime_type(),
        }
    }

    /// Resolve a sub-path under this category into a store location.
    ///
    /// See [`ContentLocation::resolve`].
    pub fn locate(&self, sub_path: Option<&str>) -> ContentLocation {
        ContentLocation::resolve(*self, sub_path)
    }
}

/// Opaque handle of one store collection.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum CollectionAddress {
    /// Image collection
    #[display("content://media/external/images/media")]
    Images,
    /// Audio collection
    #[display("content://media/external/audio/media")]
    Audio,
    /// Video collection
    #[display("content://media/external/video/media")]
    Video,
    /// Downloads collection
    #[display("content://media/external/downloads")]
    Downloads,
    /// Generic files collection (documents and anything else)
    #[display("content://media/external/file")]
    Files,
}

impl CollectionAddress {
    /// Root path segments the store accepts for records in this collection.
    ///
    /// `None` means any root is accepted.
    pub fn allowed_roots(&self) -> Option<&'static [&'static str]> {
        match self {
            CollectionAddress::Images => Some(&["DCIM", "Pictures"]),
            CollectionAddress::Audio => Some(&[
                "Alarms",
                "Music",
                "Notifications",
                "Podcasts",
                "Ringtones",
            ]),
            CollectionAddress::Video => Some(&["DCIM", "Movies", "Pictures"]),
            CollectionAddress::Downloads => Some(&["Download"]),
            CollectionAddress::Files => None,
        }
    }

    /// Top-level MIME type records in this collection must carry.
    pub fn required_mime_prefix(&self) -> Option<&'static str> {
        match self {
            CollectionAddress::Images => Some("image/"),
            CollectionAddress::Audio => Some("audio/"),
            CollectionAddress::Video => Some("video/"),
            CollectionAddress::Downloads | CollectionAddress::Files => None,
        }
    }
}
