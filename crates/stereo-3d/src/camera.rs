use glam::{DMat3, DQuat, DVec3};
use serde::{Deserialize, Serialize};

/// A struct representing the intrinsic parameters of a pinhole camera.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PinholeCameraIntrinsic {
    /// Focal length along x, in pixels.
    pub fx: f64,
    /// Focal length along y, in pixels.
    pub fy: f64,
    /// Principal point x coordinate, in pixels.
    pub cx: f64,
    /// Principal point y coordinate, in pixels.
    pub cy: f64,
}

impl PinholeCameraIntrinsic {
    /// Returns the camera matrix `K`.
    pub fn camera_matrix(&self) -> DMat3 {
        DMat3::from_cols(
            DVec3::new(self.fx, 0.0, 0.0),
            DVec3::new(0.0, self.fy, 0.0),
            DVec3::new(self.cx, self.cy, 1.0),
        )
    }
}

/// A named perspective camera placed in the world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerspectiveCamera {
    /// Camera name, e.g. `left_camera`.
    pub name: String,
    /// Camera center in world coordinates.
    pub position: DVec3,
    /// Camera orientation, serialized as `[w, x, y, z]`.
    #[serde(with = "crate::serde_utils::quat_wxyz")]
    pub quaternion: DQuat,
    /// Focal length in millimetres.
    pub focal_length: f64,
    /// Sensor width in millimetres.
    pub sensor_width: f64,
}

impl PerspectiveCamera {
    /// Horizontal field of view in radians.
    pub fn field_of_view(&self) -> f64 {
        2.0 * (0.5 * self.sensor_width / self.focal_length).atan()
    }

    /// Pinhole intrinsics for an image of `width x height` pixels.
    ///
    /// Pixels are square and the principal point lies at the image center.
    pub fn intrinsics(&self, width: usize, height: usize) -> PinholeCameraIntrinsic {
        let f = self.focal_length / self.sensor_width * width as f64;
        PinholeCameraIntrinsic {
            fx: f,
            fy: f,
            cx: 0.5 * width as f64,
            cy: 0.5 * height as f64,
        }
    }

    /// Rotation matrix from the camera frame to the world frame.
    pub fn rotation(&self) -> DMat3 {
        DMat3::from_quat(self.quaternion)
    }
}

/// The two cameras of a rectified stereo rig.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RectifiedStereoPair {
    /// The camera at `center - baseline / 2 * look_right`.
    pub left_camera: PerspectiveCamera,
    /// The camera at `center + baseline / 2 * look_right`.
    pub right_camera: PerspectiveCamera,
    /// Orientation shared by both cameras for the whole sequence.
    #[serde(with = "crate::serde_utils::quat_wxyz")]
    pub quaternion: DQuat,
    /// Lateral axis used to place the cameras while the rig moves.
    pub look_right: DVec3,
}

impl RectifiedStereoPair {
    /// Distance between both cameras.
    pub fn baseline(&self) -> f64 {
        self.left_camera.position.distance(self.right_camera.position)
    }
}
