//! Photo capture metadata.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Snapshot of a photo's capture metadata.
///
/// Values are kept in the textual form the metadata reader reports them in.
/// This is a projection of a record's bytes and is never stored. Missing
/// coordinates read as `(0.0, 0.0)`.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Default,
    Serialize,
    Deserialize,
    Getters,
    derive_builder::Builder,
)]
#[builder(setter(into), default)]
pub struct PhotoExifInfo {
    /// Aperture (f-number)
    #[builder(setter(into, strip_option))]
    aperture: Option<String>,
    /// Capture time as set on the device
    #[builder(setter(into, strip_option))]
    date_time: Option<String>,
    /// Exposure time
    #[builder(setter(into, strip_option))]
    exposure_time: Option<String>,
    /// Flash state
    #[builder(setter(into, strip_option))]
    flash: Option<String>,
    /// Focal length
    #[builder(setter(into, strip_option))]
    focal_length: Option<String>,
    /// Image height in pixels
    #[builder(setter(into, strip_option))]
    image_length: Option<String>,
    /// Image width in pixels
    #[builder(setter(into, strip_option))]
    image_width: Option<String>,
    /// ISO sensitivity
    #[builder(setter(into, strip_option))]
    iso: Option<String>,
    /// Device make
    #[builder(setter(into, strip_option))]
    make: Option<String>,
    /// Device model
    #[builder(setter(into, strip_option))]
    model: Option<String>,
    /// Orientation
    #[builder(setter(into, strip_option))]
    orientation: Option<String>,
    /// White balance
    #[builder(setter(into, strip_option))]
    white_balance: Option<String>,
    /// Latitude in decimal degrees (WGS84)
    latitude: f64,
    /// Longitude in decimal degrees (WGS84)
    longitude: f64,
}

impl PhotoExifInfo {
    /// Creates a new builder.
    pub fn builder() -> PhotoExifInfoBuilder {
        PhotoExifInfoBuilder::default()
    }

    /// Whether the photo carried GPS coordinates.
    pub fn has_location(&self) -> bool {
        self.latitude != 0.0 || self.longitude != 0.0
    }
}

impl std::fmt::Display for PhotoExifInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields = [
            ("aperture", &self.aperture),
            ("date_time", &self.date_time),
            ("exposure_time", &self.exposure_time),
            ("flash", &self.flash),
            ("focal_length", &self.focal_length),
            ("image_length", &self.image_length),
            ("image_width", &self.image_width),
            ("iso", &self.iso),
            ("make", &self.make),
            ("model", &self.model),
            ("orientation", &self.orientation),
            ("white_balance", &self.white_balance),
        ];
        for (name, value) in fields {
            writeln!(f, "{}: {}", name, value.as_deref().unwrap_or("-"))?;
        }
        write!(f, "location: {}, {}", self.latitude, self.longitude)
    }
}
