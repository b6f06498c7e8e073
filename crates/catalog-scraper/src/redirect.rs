// Copyright 2026 Cortex Contributors
// SPDX-License-Identifier: Apache-2.0

//! Redirect-wrapped link decoding.
//!
//! Ad-tracked catalog links point at a click-tracking endpoint and carry
//! the real destination percent-encoded after an `r=` marker.

/// Marker preceding the wrapped destination.
pub const REDIRECT_MARKER: &str = "r=";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RedirectError {
    #[error("malformed percent escape at byte {0}")]
    MalformedEscape(usize),

    #[error("decoded destination is not valid UTF-8")]
    InvalidUtf8,
}

/// True when `link` is wrapped by a redirect endpoint.
pub fn is_wrapped(link: &str) -> bool {
    link.contains(REDIRECT_MARKER)
}

/// Recover the destination of a redirect-wrapped link.
///
/// Links without the marker are returned unchanged.
pub fn unwrap_link(link: &str) -> Result<String, RedirectError> {
    match link.find(REDIRECT_MARKER) {
        Some(idx) => query_unescape(&link[idx + REDIRECT_MARKER.len()..]),
        None => Ok(link.to_string()),
    }
}

/// Decode a query component: `+` is a space, `%XX` is a byte.
pub fn query_unescape(encoded: &str) -> Result<String, RedirectError> {
    let bytes = encoded.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return Err(RedirectError::MalformedEscape(i));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let spaced = encoded.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .map_err(|_| RedirectError::InvalidUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwraps_tracking_link() {
        let link = "https://ta.tokopedia.com/promo/v1/clicks/p/foo?r=https%3A%2F%2Fexample.com%2Fbar";
        assert!(is_wrapped(link));
        assert_eq!(unwrap_link(link).unwrap(), "https://example.com/bar");
    }

    #[test]
    fn test_plain_link_is_unchanged() {
        let link = "https://www.tokopedia.com/shop/phone-x";
        assert!(!is_wrapped(link));
        assert_eq!(unwrap_link(link).unwrap(), link);
        // decoding twice is a no-op once the marker is gone
        let once = unwrap_link(link).unwrap();
        assert_eq!(unwrap_link(&once).unwrap(), once);
    }

    #[test]
    fn test_plus_decodes_to_space() {
        assert_eq!(query_unescape("a+b%20c").unwrap(), "a b c");
    }

    #[test]
    fn test_everything_after_first_marker_is_decoded() {
        let link = "https://t.example/c?r=https%3A%2F%2Fshop.example%2Fp%3Fid%3D7&src=ad";
        assert_eq!(
            unwrap_link(link).unwrap(),
            "https://shop.example/p?id=7&src=ad"
        );
    }

    #[test]
    fn test_malformed_escape_is_rejected() {
        assert_eq!(
            query_unescape("https%3A%2").unwrap_err(),
            RedirectError::MalformedEscape(8)
        );
        assert_eq!(
            query_unescape("%zz").unwrap_err(),
            RedirectError::MalformedEscape(0)
        );
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        assert_eq!(query_unescape("%ff%fe").unwrap_err(), RedirectError::InvalidUtf8);
    }
}
