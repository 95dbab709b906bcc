//! # Rectified stereo rig
//!
//! A rectified stereo rig is two cameras that share one orientation and sit
//! `baseline` apart along the lateral axis of the look-at frame.
//!
//! The camera convention is given as an `(up, front)` pair in the camera's
//! local frame; `right = up x front` completes a right handed basis. The rig
//! orientation maps that local basis onto the world look-at basis built from
//! the rig center, its target and the world up axis (`+Z`).

mod trajectory;
pub use trajectory::*;

use glam::{DMat3, DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::camera::{PerspectiveCamera, RectifiedStereoPair};

/// World up axis of the look-at frame.
pub const WORLD_UP: DVec3 = DVec3::Z;

/// Vectors shorter than this cannot be normalized.
const MIN_NORM: f64 = 1e-12;

/// Below this norm of `world_up x look_front` the look direction is treated as vertical.
const MIN_LATERAL_NORM: f64 = 1e-9;

// numpy.allclose tolerances
const RTOL: f64 = 1e-5;
const ATOL: f64 = 1e-8;

/// Errors raised while placing a stereo rig.
///
/// All of them are configuration errors: no pose or camera is built when one is returned.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RigError {
    /// An input vector has (close to) zero length.
    #[error("The {0} vector has zero length")]
    ZeroLengthVector(&'static str),

    /// An input vector has a NaN or infinite component.
    #[error("The {0} vector is not finite")]
    NonFiniteVector(&'static str),

    /// The camera convention is not an orthogonal right handed basis.
    #[error("Basis vectors are not orthogonal: right x up = {right_cross_up:?}, front = {front:?}")]
    NonOrthogonalBasis {
        /// The normalized `right x up`.
        right_cross_up: [f64; 3],
        /// The normalized front vector.
        front: [f64; 3],
    },

    /// The look direction is parallel to the world up axis.
    #[error("Look direction {0:?} is parallel to the world up axis")]
    DegenerateLookDirection([f64; 3]),

    /// The baseline is not a positive finite number.
    #[error("Baseline must be positive and finite, got {0}")]
    InvalidBaseline(f64),

    /// The camera optics are not positive finite numbers.
    #[error("Invalid optics: focal length {focal_length} mm, sensor width {sensor_width} mm")]
    InvalidOptics {
        /// Focal length in millimetres.
        focal_length: f64,
        /// Sensor width in millimetres.
        sensor_width: f64,
    },

    /// The placed cameras do not reproduce the requested baseline.
    #[error("Baseline distance does not match: expected {expected}, got {actual}")]
    BaselineMismatch {
        /// Requested baseline.
        expected: f64,
        /// Distance between the placed cameras.
        actual: f64,
    },

    /// The two cameras of a pair do not share their orientation.
    #[error("Left and right camera quaternions do not match")]
    OrientationMismatch,
}

/// Placement and optics of a stereo rig.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RigConfig {
    /// Rig center in world coordinates.
    pub center: DVec3,
    /// Point the rig looks at.
    pub target: DVec3,
    /// Up axis of the camera convention.
    pub up: DVec3,
    /// Viewing axis of the camera convention.
    pub front: DVec3,
    /// Distance between both cameras.
    pub baseline: f64,
    /// Focal length in millimetres.
    pub focal_length: f64,
    /// Sensor width in millimetres.
    pub sensor_width: f64,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            center: DVec3::new(2.0, 2.0, 2.0),
            target: DVec3::ZERO,
            up: DVec3::Y,
            front: DVec3::NEG_Z,
            baseline: 0.54,
            focal_length: 35.0,
            sensor_width: 32.0,
        }
    }
}

/// Extrinsics of a rectified stereo rig.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StereoRigPose {
    /// Orientation shared by both cameras, serialized as `[w, x, y, z]` with `w >= 0`.
    #[serde(with = "crate::serde_utils::quat_wxyz")]
    pub quaternion: DQuat,
    /// Position of the left camera.
    pub left_position: DVec3,
    /// Position of the right camera.
    pub right_position: DVec3,
    /// Lateral axis of the look-at frame the cameras are offset along.
    pub look_right: DVec3,
    /// Rig center, midpoint of both cameras.
    pub center: DVec3,
    /// Requested distance between both cameras.
    pub baseline: f64,
}

impl StereoRigPose {
    /// The shared orientation as `[w, x, y, z]`.
    pub fn quaternion_wxyz(&self) -> [f64; 4] {
        let q = self.quaternion;
        [q.w, q.x, q.y, q.z]
    }

    /// Distance between the two camera positions.
    pub fn camera_distance(&self) -> f64 {
        self.left_position.distance(self.right_position)
    }

    /// The same rig moved to a new center, orientation and lateral axis unchanged.
    ///
    /// This is how a pure translation sequence advances between frames.
    ///
    /// # Errors
    ///
    /// [`RigError::NonFiniteVector`] if `center` has a NaN or infinite component.
    pub fn translated(&self, center: DVec3) -> Result<Self, RigError> {
        let center = finite(center, "center")?;
        let (left_position, right_position) =
            stereo_camera_positions(center, self.baseline, self.look_right);
        Ok(Self {
            quaternion: self.quaternion,
            left_position,
            right_position,
            look_right: self.look_right,
            center,
            baseline: self.baseline,
        })
    }
}

/// Positions of the left and right camera around a rig center.
///
/// The cameras are placed at `center -/+ baseline / 2 * look_right`, with
/// `look_right` normalized first.
pub fn stereo_camera_positions(center: DVec3, baseline: f64, look_right: DVec3) -> (DVec3, DVec3) {
    let offset = look_right.normalize_or_zero() * (0.5 * baseline);
    (center - offset, center + offset)
}

/// Computes the shared orientation and camera positions of a rectified stereo rig.
///
/// # Arguments
///
/// * `center` - The rig center in world coordinates.
/// * `target` - The point the rig looks at.
/// * `up` - Up axis of the camera convention, e.g. `+Y`.
/// * `front` - Viewing axis of the camera convention, e.g. `-Z`.
/// * `baseline` - Distance between both cameras.
///
/// # Errors
///
/// A [`RigError`] when an input vector cannot be normalized, when
/// `(up, front)` is not an orthogonal basis, when the look direction is
/// vertical or when the baseline is not positive.
///
/// # Example
///
/// ```
/// use glam::DVec3;
/// use stereo_3d::rig::stereo_camera_pose;
///
/// let pose = stereo_camera_pose(
///     DVec3::new(5.0, 0.0, 3.0),
///     DVec3::ZERO,
///     DVec3::Y,
///     DVec3::NEG_Z,
///     0.54,
/// ).unwrap();
///
/// assert!((pose.camera_distance() - 0.54).abs() < 1e-9);
/// ```
pub fn stereo_camera_pose(
    center: DVec3,
    target: DVec3,
    up: DVec3,
    front: DVec3,
    baseline: f64,
) -> Result<StereoRigPose, RigError> {
    if !baseline.is_finite() || baseline <= 0.0 {
        return Err(RigError::InvalidBaseline(baseline));
    }

    // local camera convention
    let up = normalized(up, "up")?;
    let front = normalized(front, "front")?;
    let right = up.cross(front);
    if right.length() < MIN_NORM {
        return Err(RigError::NonOrthogonalBasis {
            right_cross_up: [0.0; 3],
            front: front.to_array(),
        });
    }
    let right = right.normalize();
    let right_cross_up = right.cross(up);
    if !all_close(right_cross_up, front) {
        return Err(RigError::NonOrthogonalBasis {
            right_cross_up: right_cross_up.to_array(),
            front: front.to_array(),
        });
    }

    // world look-at frame
    let center = finite(center, "center")?;
    let target = finite(target, "target")?;
    let look_front = normalized(target - center, "look direction")?;
    let look_right = WORLD_UP.cross(look_front);
    if look_right.length() < MIN_LATERAL_NORM {
        return Err(RigError::DegenerateLookDirection(look_front.to_array()));
    }
    let look_right = look_right.normalize();
    let look_up = look_front.cross(look_right).normalize();

    // rotation taking the local basis onto the look-at basis
    let look_basis = DMat3::from_cols(look_right, look_up, look_front);
    let local_basis = DMat3::from_cols(right, up, front).transpose();
    let quaternion = canonical(DQuat::from_mat3(&(look_basis * local_basis)));

    let (left_position, right_position) = stereo_camera_positions(center, baseline, look_right);
    let pose = StereoRigPose {
        quaternion,
        left_position,
        right_position,
        look_right,
        center,
        baseline,
    };
    check_baseline(pose.camera_distance(), baseline)?;

    Ok(pose)
}

/// Places a rectified stereo rig from a [`RigConfig`].
///
/// # Example
///
/// ```
/// use stereo_3d::rig::{RectifiedStereoRigBuilder, RigConfig};
///
/// let pair = RectifiedStereoRigBuilder::new(RigConfig::default())
///     .baseline(0.3)
///     .build()
///     .unwrap();
///
/// assert_eq!(pair.left_camera.quaternion, pair.right_camera.quaternion);
/// assert!((pair.left_camera.position.distance(pair.right_camera.position) - 0.3).abs() < 1e-9);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RectifiedStereoRigBuilder {
    config: RigConfig,
}

impl RectifiedStereoRigBuilder {
    /// Create a builder starting from the given configuration.
    pub fn new(config: RigConfig) -> Self {
        Self { config }
    }

    /// Set the rig center.
    pub fn center(mut self, center: DVec3) -> Self {
        self.config.center = center;
        self
    }

    /// Set the look-at target.
    pub fn target(mut self, target: DVec3) -> Self {
        self.config.target = target;
        self
    }

    /// Set the camera convention.
    pub fn convention(mut self, up: DVec3, front: DVec3) -> Self {
        self.config.up = up;
        self.config.front = front;
        self
    }

    /// Set the distance between both cameras.
    pub fn baseline(mut self, baseline: f64) -> Self {
        self.config.baseline = baseline;
        self
    }

    /// Set the lens focal length and sensor width, in millimetres.
    pub fn optics(mut self, focal_length: f64, sensor_width: f64) -> Self {
        self.config.focal_length = focal_length;
        self.config.sensor_width = sensor_width;
        self
    }

    /// The current configuration.
    pub fn config(&self) -> &RigConfig {
        &self.config
    }

    /// Compute the rig extrinsics.
    pub fn compute_pose(&self) -> Result<StereoRigPose, RigError> {
        let c = &self.config;
        stereo_camera_pose(c.center, c.target, c.up, c.front, c.baseline)
    }

    /// Compute the rig extrinsics and build the two named cameras.
    pub fn build(&self) -> Result<RectifiedStereoPair, RigError> {
        let c = &self.config;
        check_optics(c.focal_length, c.sensor_width)?;
        let pose = self.compute_pose()?;
        RectifiedStereoPair::from_pose(&pose, c.focal_length, c.sensor_width)
    }
}

/// Builds the left and right cameras of a rectified stereo rig.
///
/// Shorthand for [`RectifiedStereoRigBuilder::build`].
pub fn create_rectified_stereo_pair(config: &RigConfig) -> Result<RectifiedStereoPair, RigError> {
    RectifiedStereoRigBuilder::new(config.clone()).build()
}

impl RectifiedStereoPair {
    /// Build the camera pair of a placed rig, re-checking the rectification invariants.
    pub fn from_pose(
        pose: &StereoRigPose,
        focal_length: f64,
        sensor_width: f64,
    ) -> Result<Self, RigError> {
        check_optics(focal_length, sensor_width)?;
        finite(pose.left_position, "left position")?;
        finite(pose.right_position, "right position")?;

        let left_camera = PerspectiveCamera {
            name: "left_camera".to_string(),
            position: pose.left_position,
            quaternion: pose.quaternion,
            focal_length,
            sensor_width,
        };
        let right_camera = PerspectiveCamera {
            name: "right_camera".to_string(),
            position: pose.right_position,
            quaternion: pose.quaternion,
            focal_length,
            sensor_width,
        };

        if !left_camera.quaternion.abs_diff_eq(right_camera.quaternion, 1e-12) {
            return Err(RigError::OrientationMismatch);
        }
        check_baseline(left_camera.position.distance(right_camera.position), pose.baseline)?;

        Ok(Self {
            left_camera,
            right_camera,
            quaternion: pose.quaternion,
            look_right: pose.look_right,
        })
    }
}

fn finite(v: DVec3, name: &'static str) -> Result<DVec3, RigError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(RigError::NonFiniteVector(name))
    }
}

fn normalized(v: DVec3, name: &'static str) -> Result<DVec3, RigError> {
    let v = finite(v, name)?;
    let norm = v.length();
    if norm < MIN_NORM {
        return Err(RigError::ZeroLengthVector(name));
    }
    Ok(v / norm)
}

fn all_close(a: DVec3, b: DVec3) -> bool {
    (a - b)
        .abs()
        .cmple(DVec3::splat(ATOL) + b.abs() * RTOL)
        .all()
}

fn check_baseline(actual: f64, expected: f64) -> Result<(), RigError> {
    // written so that a NaN distance fails
    if !((actual - expected).abs() <= ATOL + RTOL * expected.abs()) {
        return Err(RigError::BaselineMismatch { expected, actual });
    }
    Ok(())
}

fn check_optics(focal_length: f64, sensor_width: f64) -> Result<(), RigError> {
    let valid = |v: f64| v.is_finite() && v > 0.0;
    if !valid(focal_length) || !valid(sensor_width) {
        return Err(RigError::InvalidOptics {
            focal_length,
            sensor_width,
        });
    }
    Ok(())
}

// q and -q are the same rotation; report the one with a non negative scalar part
fn canonical(q: DQuat) -> DQuat {
    let q = q.normalize();
    if q.w < 0.0 {
        -q
    } else {
        q
    }
}
