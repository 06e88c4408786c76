// src/filtering/mod.rs

//! The Pattern Filter and size gate shared by every retrieval branch.
//!
//! The same compiled filter is applied to directories (to prune traversal before
//! any request is issued for their contents) and to files (before download).

mod patterns;
mod size;
mod text_detection;

pub use patterns::PatternFilter;
pub use size::{estimated_decoded_len, passes_size_filter};
pub use text_detection::decode_text;
