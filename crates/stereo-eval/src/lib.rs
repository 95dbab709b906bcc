#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for the evaluation pipeline.
pub mod error;

/// Ratio-test filtered correspondences between two images.
pub mod correspondences;

/// Validation outcomes and their presentation.
pub mod report;

/// Frame discovery and batch validation of stereo sequences.
pub mod sequence;

/// Summary statistics of epipolar residuals.
pub mod stats;

/// The epipolar rectification validator.
pub mod validator;

/// Rectification quality classes.
pub mod verdict;

pub use crate::error::EvalError;
