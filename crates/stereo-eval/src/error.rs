use std::path::PathBuf;

/// An error type for the evaluation pipeline.
///
/// Running out of features or inliers is not an error; see [`crate::report::Validation`].
#[derive(thiserror::Error, Debug)]
pub enum EvalError {
    /// Error from an image operation.
    #[error(transparent)]
    Image(#[from] stereo_image::ImageError),

    /// Error reading a frame.
    #[error(transparent)]
    Io(#[from] stereo_io::IoError),

    /// Error measuring epipolar residuals.
    #[error(transparent)]
    Epipolar(#[from] stereo_3d::pose::EpipolarError),

    /// The sequence directory does not exist.
    #[error("Sequence directory does not exist: {0}")]
    SequenceNotFound(PathBuf),

    /// A look-at orbit sequence was requested without its camera movement.
    #[error("Sequences of type {0} need a camera movement")]
    MissingCameraMovement(crate::sequence::StereoType),

    /// The camera movement does not apply to look-at orbit sequences.
    #[error("Camera movement {0} is not a look-at orbit movement")]
    InvalidCameraMovement(stereo_3d::rig::CameraMotion),

    /// Error listing the frames of a sequence.
    #[error("Failed to list frames. {0}")]
    WalkDir(#[from] walkdir::Error),
}
