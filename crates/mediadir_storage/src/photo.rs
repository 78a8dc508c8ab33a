//! Photo capture metadata read from record bytes.

use crate::{ContentRecordStore, StreamTransfer};
use exif::{Exif, In, Tag, Value};
use mediadir_core::{ContentUri, MediaCategory, PhotoExifInfo};
use mediadir_error::{MediaDirResult, StoreError, StoreErrorKind};
use tracing::{debug, instrument};

/// Textual value of a tag, with stray quotes and backslashes removed.
fn get_tag(exif: &Exif, tag: Tag) -> Option<String> {
    exif.get_field(tag, In::PRIMARY)
        .map(|field| field.display_value().to_string().replace(['\\', '"'], ""))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Degrees, minutes and seconds to signed decimal degrees.
fn coordinate(exif: &Exif, value_tag: Tag, reference_tag: Tag) -> Option<f64> {
    let field = exif.get_field(value_tag, In::PRIMARY)?;
    let Value::Rational(parts) = &field.value else {
        return None;
    };
    if parts.len() != 3 {
        return None;
    }
    let degrees = parts[0].to_f64() + parts[1].to_f64() / 60.0 + parts[2].to_f64() / 3600.0;
    let reference = get_tag(exif, reference_tag).unwrap_or_default();
    if reference.starts_with('S') || reference.starts_with('W') {
        Some(-degrees)
    } else {
        Some(degrees)
    }
}

/// Parse capture metadata out of image bytes.
///
/// Images without EXIF data yield an empty [`PhotoExifInfo`].
///
/// # Errors
///
/// Returns `Metadata` if the bytes are not an image container the reader
/// understands or the EXIF block is corrupt.
///
/// ```
/// use mediadir_storage::parse_photo_exif;
///
/// // A JPEG with no APP1 segment.
/// let info = parse_photo_exif(&[0xFF, 0xD8, 0xFF, 0xD9]).unwrap();
/// assert_eq!(info.make(), &None);
/// assert!(!info.has_location());
/// ```
pub fn parse_photo_exif(bytes: &[u8]) -> MediaDirResult<PhotoExifInfo> {
    let exif = match exif::Reader::new().read_from_container(&mut std::io::Cursor::new(bytes)) {
        Ok(exif) => exif,
        Err(
            exif::Error::NotFound(_)
            | exif::Error::NotSupported(_)
            | exif::Error::BlankValue(_),
        ) => {
            debug!("No EXIF data");
            return Ok(PhotoExifInfo::default());
        }
        Err(e) => {
            return Err(StoreError::new(StoreErrorKind::Metadata(e.to_string())).into());
        }
    };

    let mut builder = PhotoExifInfo::builder();
    if let Some(value) = get_tag(&exif, Tag::FNumber) {
        builder.aperture(value);
    }
    if let Some(value) =
        get_tag(&exif, Tag::DateTimeOriginal).or_else(|| get_tag(&exif, Tag::DateTime))
    {
        builder.date_time(value);
    }
    if let Some(value) = get_tag(&exif, Tag::ExposureTime) {
        builder.exposure_time(value);
    }
    if let Some(value) = get_tag(&exif, Tag::Flash) {
        builder.flash(value);
    }
    if let Some(value) = get_tag(&exif, Tag::FocalLength) {
        builder.focal_length(value);
    }
    if let Some(value) =
        get_tag(&exif, Tag::ImageLength).or_else(|| get_tag(&exif, Tag::PixelYDimension))
    {
        builder.image_length(value);
    }
    if let Some(value) =
        get_tag(&exif, Tag::ImageWidth).or_else(|| get_tag(&exif, Tag::PixelXDimension))
    {
        builder.image_width(value);
    }
    if let Some(value) = get_tag(&exif, Tag::PhotographicSensitivity) {
        builder.iso(value);
    }
    if let Some(value) = get_tag(&exif, Tag::Make) {
        builder.make(value);
    }
    if let Some(value) = get_tag(&exif, Tag::Model) {
        builder.model(value);
    }
    if let Some(value) = get_tag(&exif, Tag::Orientation) {
        builder.orientation(value);
    }
    if let Some(value) = get_tag(&exif, Tag::WhiteBalance) {
        builder.white_balance(value);
    }

    let latitude = coordinate(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef);
    let longitude = coordinate(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef);
    if let (Some(latitude), Some(longitude)) = (latitude, longitude) {
        builder.latitude(latitude).longitude(longitude);
    }

    builder.build().map_err(|e| {
        StoreError::new(StoreErrorKind::Metadata(format!(
            "assembling photo metadata: {}",
            e
        )))
        .into()
    })
}

/// Reads capture metadata of photo records.
#[derive(Debug, Clone)]
pub struct PhotoMetadataReader {
    transfer: StreamTransfer,
}

impl PhotoMetadataReader {
    /// Reader over `store`.
    pub fn new(store: ContentRecordStore) -> Self {
        Self {
            transfer: StreamTransfer::new(store),
        }
    }

    /// Capture metadata of one record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the record's bytes cannot be opened and
    /// `Metadata` if they cannot be parsed.
    #[instrument(skip(self), fields(uri = %uri))]
    pub async fn read(&self, uri: &ContentUri) -> MediaDirResult<PhotoExifInfo> {
        if !self.transfer.store().exists(uri).await {
            return Err(StoreError::new(StoreErrorKind::NotFound(uri.to_string())).into());
        }
        let bytes = self.transfer.read_to_vec(uri).await?;
        parse_photo_exif(&bytes)
    }

    /// Capture metadata of the newest record with this display name.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record matches.
    #[instrument(skip(self))]
    pub async fn read_by_display_name(
        &self,
        category: MediaCategory,
        display_name: &str,
        sub_path: Option<&str>,
    ) -> MediaDirResult<PhotoExifInfo> {
        let uri = self
            .transfer
            .store()
            .find_by_display_name(category, display_name, sub_path)
            .await?
            .ok_or_else(|| {
                StoreError::new(StoreErrorKind::NotFound(format!(
                    "{} in {}",
                    display_name,
                    category.locate(sub_path).relative_path()
                )))
            })?;
        self.read(&uri).await
    }
}
