#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for I/O operations.
///
/// Defines [`IoError`] variants for file access and PNG encoding/decoding failures.
pub mod error;

/// PNG image decoding and encoding.
///
/// Any PNG color type and bit depth is decoded to 8-bit RGB, which is what
/// the rendered stereo frames are compared on.
pub mod png;

pub use crate::error::IoError;
