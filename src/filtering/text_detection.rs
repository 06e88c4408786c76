// src/filtering/text_detection.rs

use content_inspector::ContentType;
use std::str;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Decodes file bytes into text, or returns `None` for binary or non-UTF-8 content.
///
/// A leading UTF-8 byte order mark is stripped.
///
/// # Examples
/// ```
/// use repocrawl::filtering::decode_text;
///
/// assert_eq!(decode_text(b"fn main() {}").as_deref(), Some("fn main() {}"));
/// assert_eq!(decode_text(b"\xEF\xBB\xBFhi").as_deref(), Some("hi"));
/// assert!(decode_text(b"binary\0data").is_none());
/// assert!(decode_text(&[0x48, 0x65, 0x80]).is_none());
/// ```
pub fn decode_text(bytes: &[u8]) -> Option<String> {
    match content_inspector::inspect(bytes) {
        ContentType::UTF_8_BOM => {
            let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
            str::from_utf8(body).ok().map(str::to_owned)
        }
        ContentType::UTF_8 => str::from_utf8(bytes).ok().map(str::to_owned),
        _ => None,
    }
}
