/// Length of a SIFT descriptor (4x4 spatial cells, 8 orientation bins).
pub const SIFT_DESCRIPTOR_SIZE: usize = 128;

/// A SIFT descriptor, unit L2 norm.
pub type SiftDescriptor = [f32; SIFT_DESCRIPTOR_SIZE];

/// A detected keypoint in image coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint {
    /// Column coordinate in pixels.
    pub x: f32,
    /// Row coordinate in pixels.
    pub y: f32,
    /// Diameter of the meaningful neighbourhood in pixels.
    pub size: f32,
    /// Dominant orientation in degrees, in `[0, 360)`.
    pub angle: f32,
    /// Absolute difference-of-Gaussian response after interpolation.
    pub response: f32,
    /// Octave index the keypoint was detected in, counted from the base image.
    pub octave: usize,
}
