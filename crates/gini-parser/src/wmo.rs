//! WMO bulletin framing and zlib stream detection.
//!
//! GINI products travel as WMO bulletins: an abbreviated heading line
//! issued by `KNES` (NESDIS) or `CHIZ` (Unidata composites), terminated by
//! `CR CR LF`, followed by the product description block.

use crate::{DecodeError, Result};

/// Originating centres that issue GINI products.
pub const WMO_MARKERS: [&[u8]; 2] = [b"KNES", b"CHIZ"];

/// WMO line terminator.
pub const LINE_END: &[u8] = b"\r\r\n";

/// Offset of the first occurrence of `needle` in `haystack`.
pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Locate the byte just past the WMO heading.
///
/// Returns `Ok(None)` when no marker is present, and `Format` when a marker
/// is found without a line terminator after it.
pub fn find_header_start(buf: &[u8]) -> Result<Option<usize>> {
    let Some(marker) = WMO_MARKERS.iter().find_map(|m| find(buf, m)) else {
        return Ok(None);
    };

    match find(&buf[marker..], LINE_END) {
        Some(end) => Ok(Some(marker + end + LINE_END.len())),
        None => Err(DecodeError::Format(format!(
            "WMO heading at offset {} is not terminated",
            marker
        ))),
    }
}

/// Check whether two bytes form a valid zlib stream header (RFC 1950).
pub fn is_zlib_header(b0: u8, b1: u8) -> bool {
    let cmf = b0 as u32;
    let flg = b1 as u32;
    (cmf & 0x0F) == 8 && (cmf >> 4) + 8 <= 15 && ((cmf << 8) + flg) % 31 == 0
}

/// Same as [`is_zlib_header`] for the start of a slice.
pub fn starts_with_zlib_header(buf: &[u8]) -> bool {
    matches!(buf, [b0, b1, ..] if is_zlib_header(*b0, *b1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_start_after_heading() {
        let buf = b"TIGE01 KNES 011200\r\r\nPDB";
        assert_eq!(find_header_start(buf).unwrap(), Some(21));
    }

    #[test]
    fn test_header_start_skips_sbn_prefix() {
        // Sequence line before the heading also ends in CR CR LF
        let buf = b"\x01\r\r\n123 \r\r\nTICZ99 CHIZ 011200\r\r\nPDB";
        let start = find_header_start(buf).unwrap().unwrap();
        assert_eq!(&buf[start..], b"PDB");
    }

    #[test]
    fn test_no_marker() {
        assert_eq!(find_header_start(b"no heading here").unwrap(), None);
    }

    #[test]
    fn test_unterminated_heading() {
        assert!(matches!(
            find_header_start(b"TIGE01 KNES 011200"),
            Err(DecodeError::Format(_))
        ));
    }

    #[test]
    fn test_zlib_header_detection() {
        // Default, best-speed and best-compression zlib headers
        assert!(is_zlib_header(0x78, 0x9C));
        assert!(is_zlib_header(0x78, 0x01));
        assert!(is_zlib_header(0x78, 0xDA));
        // Wrong method, bad check bits, window too large
        assert!(!is_zlib_header(0x79, 0x9C));
        assert!(!is_zlib_header(0x78, 0x9D));
        assert!(!is_zlib_header(0x88, 0x1C));
        assert!(!starts_with_zlib_header(&[0x78]));
    }
}
