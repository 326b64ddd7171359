//! Core library modules for rangefetch
//!
//! This module contains the internal implementation details of the rangefetch library.

pub mod coordinator;
pub mod downloader;
pub mod error;
pub mod fetch;
pub mod merge;
pub mod plan;
pub mod probe;
pub mod progress;
pub mod sink;
pub mod source;
pub mod stream;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export main types for internal use
pub use source::{resolve_output_filename, resolve_url};
