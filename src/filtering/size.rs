// src/filtering/size.rs

/// Checks a byte count against the per-file ceiling. Equal to the limit passes.
#[inline]
pub fn passes_size_filter(size: u64, max_file_size: u64) -> bool {
    size <= max_file_size
}

/// Estimates the decoded size of a base64 payload without decoding it.
///
/// Whitespace (GitHub wraps the payload every 60 characters) is not counted.
pub fn estimated_decoded_len(encoded: &str) -> u64 {
    let significant = encoded.bytes().filter(|b| !b.is_ascii_whitespace()).count() as u64;
    significant / 4 * 3 + (significant % 4) * 3 / 4
}
