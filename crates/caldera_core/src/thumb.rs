//! Thumbnail specification and width snapping.

use caldera_error::{CalderaResult, RequestError, RequestErrorKind};

/// Canonical name of the full-HD thumbnail variant.
pub const FULLHD_NAME: &str = "fullhd";

/// Longest edge of the full-HD thumbnail variant, in pixels.
pub const FULLHD_EDGE: u32 = 1920;

/// Requested thumbnail variant, before canonicalization.
///
/// Width values stay raw strings until resolve time so that the parser never
/// fails; a zero, negative, or non-numeric width is rejected there as a
/// validation error instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ThumbSpec {
    /// Width-based variant, snapped to a power of two at resolve time
    Width(String),
    /// Named variant (currently only `fullhd`)
    Name(String),
}

impl ThumbSpec {
    /// Parse a raw width value, rejecting non-numeric or non-positive input.
    pub fn parse_width(raw: &str) -> CalderaResult<u32> {
        match raw.parse::<u32>() {
            Ok(width) if width > 0 => Ok(width),
            _ => Err(RequestError::new(RequestErrorKind::InvalidThumbWidth(
                raw.to_string(),
            )))?,
        }
    }
}

/// Snap a requested thumbnail width to its canonical size.
///
/// The width is clamped to the original's width, then rounded down to the
/// nearest power of two, floored at `2^min_log`. This bounds the number of
/// distinct variants any single original can ever produce.
///
/// # Examples
///
/// ```
/// use caldera_core::snap_thumb_width;
///
/// // Nearby requests collapse into the same variant: 130 and 140 both
/// // round down to 128, while 100 lands in the 64 bucket.
/// assert_eq!(snap_thumb_width(100, 1000, 5), 64);
/// assert_eq!(snap_thumb_width(130, 1000, 5), 128);
/// assert_eq!(snap_thumb_width(140, 1000, 5), 128);
/// // Tiny requests are floored at 2^5.
/// assert_eq!(snap_thumb_width(3, 1000, 5), 32);
/// ```
pub fn snap_thumb_width(requested: u32, original_width: u32, min_log: u32) -> u32 {
    let clamped = requested.min(original_width).max(1);
    let log = min_log.max(clamped.ilog2());
    2u32.pow(log)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snaps_down_to_power_of_two() {
        assert_eq!(snap_thumb_width(200, 1000, 5), 128);
        assert_eq!(snap_thumb_width(256, 1000, 5), 256);
        assert_eq!(snap_thumb_width(511, 1000, 5), 256);
    }

    #[test]
    fn clamps_to_original_width() {
        // Requested wider than the original: clamp first, then snap.
        assert_eq!(snap_thumb_width(4000, 1000, 5), 512);
        assert_eq!(snap_thumb_width(4000, 4096, 5), 2048);
        // An exact power of two within the original passes through.
        assert_eq!(snap_thumb_width(4096, 4096, 5), 4096);
    }

    #[test]
    fn floors_at_min_log() {
        assert_eq!(snap_thumb_width(1, 1000, 5), 32);
        assert_eq!(snap_thumb_width(40, 20, 5), 32);
    }

    #[test]
    fn width_validation_rejects_bad_input() {
        assert!(ThumbSpec::parse_width("0").is_err());
        assert!(ThumbSpec::parse_width("-5").is_err());
        assert!(ThumbSpec::parse_width("abc").is_err());
        assert_eq!(ThumbSpec::parse_width("200").unwrap(), 200);
    }
}
