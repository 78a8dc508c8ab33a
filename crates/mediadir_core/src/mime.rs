//! Suffix to MIME type inference.

/// MIME type for content with an unrecognised suffix.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Look up the MIME type for a file suffix (without the dot), ignoring case.
///
/// ```
/// use mediadir_core::mime_type_for_suffix;
///
/// assert_eq!(mime_type_for_suffix("PNG"), Some("image/png"));
/// assert_eq!(mime_type_for_suffix("tiff"), Some("image/tiff"));
/// assert_eq!(mime_type_for_suffix("qqzz"), None);
/// ```
pub fn mime_type_for_suffix(suffix: &str) -> Option<&'static str> {
    if suffix.is_empty() {
        return None;
    }
    mime_guess::from_ext(suffix).first_raw()
}
