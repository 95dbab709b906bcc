#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Perspective camera records and pinhole intrinsics.
pub mod camera;

/// Two-view epipolar geometry: fundamental matrix, RANSAC and epipolar residuals.
pub mod pose;

/// Rectified stereo rig placement and rig trajectories.
pub mod rig;

pub(crate) mod serde_utils;
