// src/config/parsing.rs

use anyhow::{Context, Result};
use byte_unit::Byte;
use std::str::FromStr;

/// Parses a human-readable size ("100k", "1MiB", "2048") into bytes.
pub fn parse_max_size(max_size_str: Option<&str>) -> Result<Option<u64>> {
    max_size_str
        .map(|s| {
            let bytes = Byte::from_str(s)
                .map(|b| b.as_u128())
                .with_context(|| format!("Invalid size format: '{}'", s))?;
            u64::try_from(bytes).with_context(|| format!("Size too large: '{}'", s))
        })
        .transpose()
}
