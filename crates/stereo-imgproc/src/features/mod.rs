//! Feature detection, description and matching.
//!
//! - [`SiftDetector`] : scale and rotation invariant keypoints with 128-float descriptors
//! - [`knn_match`] : brute-force k-nearest-neighbour descriptor matching
//! - [`ratio_test`] : Lowe's ratio filter over k-NN matches

mod keypoint;
pub use keypoint::*;

mod matching;
pub use matching::*;

mod sift;
pub use sift::*;
