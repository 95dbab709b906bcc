//! # Two-view epipolar geometry
//!
//! - [`fundamental_8point`] : normalized 8-point fundamental matrix solver
//! - [`ransac_fundamental`] : outlier tolerant estimation on top of the 8-point solver
//! - [`epipolar_lines`] : lines induced in the other image by a set of points
//! - [`epipolar_residuals`] : point to epipolar line distances of correspondences

mod epipolar;
pub use epipolar::*;

mod fundamental;
pub use fundamental::*;

mod ransac;
pub use ransac::*;

#[cfg(test)]
pub(crate) mod test_utils;
