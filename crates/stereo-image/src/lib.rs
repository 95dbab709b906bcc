#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// image container and size types.
pub mod image;

/// error types for the image module.
pub mod error;

/// basic operations on images.
pub mod ops;

pub use crate::error::ImageError;
pub use crate::image::{Image, ImageSize};
