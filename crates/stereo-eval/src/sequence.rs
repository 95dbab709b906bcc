use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use stereo_3d::rig::CameraMotion;

use crate::{
    error::EvalError,
    report::{InsufficientData, Validation},
    validator::EpipolarValidator,
    verdict::RectificationQuality,
};

const FRAME_PREFIX: &str = "rgba_";
const FRAME_EXTENSION: &str = "png";

/// How the stereo rig of a sequence was placed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StereoType {
    /// The rig keeps its orientation and translates.
    PureTranslation,
    /// The rig is re-aimed at a target every frame.
    LookatOrbit,
}

impl StereoType {
    /// Name of the stereo type in the dataset directory layout.
    pub fn as_str(&self) -> &'static str {
        match self {
            StereoType::PureTranslation => "pure_translation",
            StereoType::LookatOrbit => "lookat_orbit",
        }
    }
}

impl fmt::Display for StereoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StereoType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pure_translation" => Ok(StereoType::PureTranslation),
            "lookat_orbit" => Ok(StereoType::LookatOrbit),
            other => Err(format!(
                "unknown stereo type '{other}', expected pure_translation or lookat_orbit"
            )),
        }
    }
}

/// Directory of a rendered sequence under a dataset root.
///
/// Pure translation sequences live in `<root>/pure_translation/<seq>`, look-at
/// orbits in `<root>/lookat_orbit/<camera_movement>/<seq>`.
///
/// # Errors
///
/// [`EvalError::MissingCameraMovement`] for a look-at orbit without
/// `camera_movement`, [`EvalError::InvalidCameraMovement`] when it is
/// [`CameraMotion::PureTranslation`].
pub fn sequence_dir(
    root: impl AsRef<Path>,
    stereo_type: StereoType,
    camera_movement: Option<CameraMotion>,
    seq_name: &str,
) -> Result<PathBuf, EvalError> {
    let dir = root.as_ref().join(stereo_type.as_str());
    match stereo_type {
        StereoType::PureTranslation => Ok(dir.join(seq_name)),
        StereoType::LookatOrbit => match camera_movement {
            None => Err(EvalError::MissingCameraMovement(stereo_type)),
            Some(movement @ CameraMotion::PureTranslation) => {
                Err(EvalError::InvalidCameraMovement(movement))
            }
            Some(movement) => Ok(dir.join(movement.as_str()).join(seq_name)),
        },
    }
}

/// A left and right frame rendered at the same time step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FramePair {
    /// File name of the left frame.
    pub name: String,
    /// Path to the left frame.
    pub left: PathBuf,
    /// Path to the right frame.
    pub right: PathBuf,
}

/// Lists the `rgba_*.png` frames of a sequence and pairs them.
///
/// Frames are read from `left_camera/rgba` and `right_camera/rgba`, sorted by
/// name and paired by position. Surplus frames on the longer side are ignored.
///
/// # Errors
///
/// [`EvalError::SequenceNotFound`] if `dir` is not a directory.
pub fn discover_frames(dir: impl AsRef<Path>) -> Result<Vec<FramePair>, EvalError> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(EvalError::SequenceNotFound(dir.to_path_buf()));
    }

    let left = list_frames(&dir.join("left_camera").join("rgba"))?;
    let right = list_frames(&dir.join("right_camera").join("rgba"))?;
    if left.len() != right.len() {
        log::warn!(
            "{}: {} left frames but {} right frames, pairing the first {}",
            dir.display(),
            left.len(),
            right.len(),
            left.len().min(right.len())
        );
    }

    Ok(left
        .into_iter()
        .zip(right)
        .map(|(left, right)| FramePair {
            name: left
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            left,
            right,
        })
        .collect())
}

fn list_frames(dir: &Path) -> Result<Vec<PathBuf>, EvalError> {
    if !dir.is_dir() {
        log::warn!("missing frame directory {}", dir.display());
        return Ok(Vec::new());
    }

    let mut frames = Vec::new();
    for entry in walkdir::WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        let is_frame = entry.file_type().is_file()
            && entry
                .file_name()
                .to_str()
                .map(|name| name.starts_with(FRAME_PREFIX))
                .unwrap_or(false)
            && entry
                .path()
                .extension()
                .map(|ext| ext == FRAME_EXTENSION)
                .unwrap_or(false);
        if is_frame {
            frames.push(entry.into_path());
        }
    }
    frames.sort();
    Ok(frames)
}

/// Result of validating one frame of a sequence.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameOutcome {
    /// The frame pair was read and validated.
    Validated(Validation),
    /// The frame pair could not be read or processed.
    Error(String),
}

/// A frame and its outcome.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameResult {
    /// File name of the left frame.
    pub frame: String,
    /// What validating the frame produced.
    pub outcome: FrameOutcome,
}

/// Validates every frame pair in parallel.
///
/// Frames that fail are reported in their [`FrameOutcome`] and do not stop the
/// others. Results come back in the order of `frames`.
pub fn validate_sequence(validator: &EpipolarValidator, frames: &[FramePair]) -> Vec<FrameResult> {
    frames
        .par_iter()
        .map(|pair| {
            let outcome = match validator.validate_files(&pair.left, &pair.right) {
                Ok(validation) => {
                    if !matches!(validation, Validation::Ok(_)) {
                        log::warn!("skipping frame {}: {}", pair.name, validation);
                    }
                    FrameOutcome::Validated(validation)
                }
                Err(err) => {
                    log::warn!("failed to process frame {}: {}", pair.name, err);
                    FrameOutcome::Error(err.to_string())
                }
            };
            FrameResult {
                frame: pair.name.clone(),
                outcome,
            }
        })
        .collect()
}

/// Frames that produced no verdict, by reason.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFrames {
    /// An image had no descriptors.
    pub no_descriptors: usize,
    /// Too few matches survived the ratio test.
    pub not_enough_matches: usize,
    /// Too few RANSAC inliers.
    pub too_few_inliers: usize,
    /// An inlier had a degenerate epipolar line.
    pub degenerate_epipolar_line: usize,
    /// The fundamental matrix could not be estimated.
    pub estimation_failed: usize,
    /// The frame could not be read or processed.
    pub errors: usize,
}

impl SkippedFrames {
    /// Total number of skipped frames.
    pub fn total(&self) -> usize {
        self.no_descriptors
            + self.not_enough_matches
            + self.too_few_inliers
            + self.degenerate_epipolar_line
            + self.estimation_failed
            + self.errors
    }
}

/// Aggregate of a validated sequence.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SequenceSummary {
    /// Frames that went through the validator.
    pub frames_processed: usize,
    /// Frames graded [`RectificationQuality::Excellent`].
    pub excellent: usize,
    /// Frames graded [`RectificationQuality::Good`].
    pub good: usize,
    /// Frames graded [`RectificationQuality::Poor`].
    pub poor: usize,
    /// Frames without a verdict.
    pub skipped: SkippedFrames,
    /// Mean of the per-frame mean epipolar errors, over graded frames.
    pub mean_of_means: Option<f64>,
}

impl SequenceSummary {
    /// Summarizes the results of [`validate_sequence`].
    pub fn from_results(results: &[FrameResult]) -> Self {
        let mut summary = Self {
            frames_processed: results.len(),
            ..Default::default()
        };

        let mut sum_of_means = 0.0;
        for result in results {
            let validation = match &result.outcome {
                FrameOutcome::Validated(validation) => validation,
                FrameOutcome::Error(_) => {
                    summary.skipped.errors += 1;
                    continue;
                }
            };
            match validation {
                Validation::Ok(report) => {
                    sum_of_means += report.stats.mean;
                    match report.verdict {
                        RectificationQuality::Excellent => summary.excellent += 1,
                        RectificationQuality::Good => summary.good += 1,
                        RectificationQuality::Poor => summary.poor += 1,
                    }
                }
                Validation::Insufficient(reason) => {
                    let counter = match reason {
                        InsufficientData::NoDescriptors { .. } => &mut summary.skipped.no_descriptors,
                        InsufficientData::Matches { .. } => &mut summary.skipped.not_enough_matches,
                        InsufficientData::Inliers { .. } => &mut summary.skipped.too_few_inliers,
                        InsufficientData::DegenerateEpipolarLine { .. } => {
                            &mut summary.skipped.degenerate_epipolar_line
                        }
                    };
                    *counter += 1;
                }
                Validation::EstimationFailed => summary.skipped.estimation_failed += 1,
            }
        }

        let graded = summary.graded();
        if graded > 0 {
            summary.mean_of_means = Some(sum_of_means / graded as f64);
        }
        summary
    }

    /// Frames that received a verdict.
    pub fn graded(&self) -> usize {
        self.excellent + self.good + self.poor
    }
}

impl fmt::Display for SequenceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Frames processed: {}", self.frames_processed)?;
        writeln!(
            f,
            "EXCELLENT: {}, GOOD: {}, POOR: {}",
            self.excellent, self.good, self.poor
        )?;
        writeln!(f, "Skipped: {}", self.skipped.total())?;
        match self.mean_of_means {
            Some(mean) => write!(f, "Mean epipolar error over frames: {mean:.4} px"),
            None => write!(f, "Mean epipolar error over frames: n/a"),
        }
    }
}

/// Discovers, validates and summarizes the frames of a sequence directory.
///
/// # Errors
///
/// Errors of [`discover_frames`]. Per-frame failures end up in the results.
pub fn evaluate_sequence(
    validator: &EpipolarValidator,
    dir: impl AsRef<Path>,
) -> Result<(Vec<FrameResult>, SequenceSummary), EvalError> {
    let dir = dir.as_ref();
    let frames = discover_frames(dir)?;
    log::info!("{}: {} frames to process", dir.display(), frames.len());

    let results = validate_sequence(validator, &frames);
    let summary = SequenceSummary::from_results(&results);
    log::info!(
        "{}: {} graded, {} skipped",
        dir.display(),
        summary.graded(),
        summary.skipped.total()
    );
    Ok((results, summary))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use stereo_image::Image;
    use stereo_io::png::write_image_png_rgb8;

    use super::*;
    use crate::report::RectificationReport;

    fn touch(path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, b"")
    }

    fn graded(frame: &str, residuals: Vec<f64>) -> FrameResult {
        let report = RectificationReport::from_residuals(residuals.len(), residuals)
            .expect("residuals are not empty");
        FrameResult {
            frame: frame.to_string(),
            outcome: FrameOutcome::Validated(Validation::Ok(report)),
        }
    }

    fn skipped(frame: &str, validation: Validation) -> FrameResult {
        FrameResult {
            frame: frame.to_string(),
            outcome: FrameOutcome::Validated(validation),
        }
    }

    #[test]
    fn sequence_layout() -> Result<(), EvalError> {
        let root = Path::new("/data/movi_e");
        assert_eq!(
            sequence_dir(root, StereoType::PureTranslation, None, "0007")?,
            root.join("pure_translation").join("0007")
        );
        assert_eq!(
            sequence_dir(
                root,
                StereoType::LookatOrbit,
                Some(CameraMotion::LinearLookAt),
                "0007"
            )?,
            root.join("lookat_orbit")
                .join("linear_movement_linear_lookat")
                .join("0007")
        );
        assert!(matches!(
            sequence_dir(root, StereoType::LookatOrbit, None, "0007"),
            Err(EvalError::MissingCameraMovement(StereoType::LookatOrbit))
        ));
        assert!(matches!(
            sequence_dir(
                root,
                StereoType::LookatOrbit,
                Some(CameraMotion::PureTranslation),
                "0007"
            ),
            Err(EvalError::InvalidCameraMovement(CameraMotion::PureTranslation))
        ));
        assert_eq!(
            sequence_dir(
                root,
                StereoType::LookatOrbit,
                Some(CameraMotion::LookAtOrbit),
                "0007"
            )?,
            root.join("lookat_orbit").join("linear_movement").join("0007")
        );
        Ok(())
    }

    #[test]
    fn parse_stereo_type() {
        assert_eq!(
            "pure_translation".parse::<StereoType>(),
            Ok(StereoType::PureTranslation)
        );
        assert_eq!(
            "lookat_orbit".parse::<StereoType>(),
            Ok(StereoType::LookatOrbit)
        );
        assert!("orbit".parse::<StereoType>().is_err());
        assert_eq!(StereoType::LookatOrbit.to_string(), "lookat_orbit");
    }

    #[test]
    fn discover_pairs_sorted_frames() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let left = tmp.path().join("left_camera").join("rgba");
        let right = tmp.path().join("right_camera").join("rgba");
        for name in ["rgba_00002.png", "rgba_00000.png", "rgba_00001.png"] {
            touch(&left.join(name))?;
        }
        for name in ["rgba_00001.png", "rgba_00000.png"] {
            touch(&right.join(name))?;
        }
        // not frames
        touch(&left.join("depth_00000.png"))?;
        touch(&left.join("rgba_00003.jpg"))?;
        touch(&left.join("sub").join("rgba_00004.png"))?;

        let frames = discover_frames(tmp.path())?;
        let names: Vec<&str> = frames.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["rgba_00000.png", "rgba_00001.png"]);
        assert_eq!(frames[1].left, left.join("rgba_00001.png"));
        assert_eq!(frames[1].right, right.join("rgba_00001.png"));
        Ok(())
    }

    #[test]
    fn discover_missing_sequence() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("0042");
        assert!(matches!(
            discover_frames(&missing),
            Err(EvalError::SequenceNotFound(path)) if path == missing
        ));
    }

    #[test]
    fn discover_without_camera_dirs() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        assert!(discover_frames(tmp.path())?.is_empty());
        Ok(())
    }

    #[test]
    fn summary_counts() {
        let results = vec![
            graded("rgba_00000.png", vec![0.1, 0.2, 0.3]),
            graded("rgba_00001.png", vec![0.5, 0.5, 0.5]),
            graded("rgba_00002.png", vec![3.0, 3.0]),
            skipped(
                "rgba_00003.png",
                Validation::Insufficient(InsufficientData::Matches {
                    found: 12,
                    required: 50,
                }),
            ),
            skipped("rgba_00004.png", Validation::EstimationFailed),
            FrameResult {
                frame: "rgba_00005.png".to_string(),
                outcome: FrameOutcome::Error("corrupt".to_string()),
            },
        ];

        let summary = SequenceSummary::from_results(&results);
        assert_eq!(summary.frames_processed, 6);
        assert_eq!(
            (summary.excellent, summary.good, summary.poor),
            (1, 1, 1)
        );
        assert_eq!(summary.skipped.not_enough_matches, 1);
        assert_eq!(summary.skipped.estimation_failed, 1);
        assert_eq!(summary.skipped.errors, 1);
        assert_eq!(summary.skipped.total(), 3);
        approx::assert_relative_eq!(summary.mean_of_means.unwrap(), 3.7 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn summary_without_graded_frames() {
        let summary = SequenceSummary::from_results(&[]);
        assert_eq!(summary.mean_of_means, None);
        assert!(summary.to_string().ends_with("n/a"));
    }

    #[test]
    fn flat_and_corrupt_frames_are_skipped() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let left = tmp.path().join("left_camera").join("rgba");
        let right = tmp.path().join("right_camera").join("rgba");
        fs::create_dir_all(&left)?;
        fs::create_dir_all(&right)?;

        let flat = Image::<u8, 3>::from_size_val([40, 30].into(), 128)?;
        for dir in [&left, &right] {
            write_image_png_rgb8(dir.join("rgba_00000.png"), &flat)?;
            fs::write(dir.join("rgba_00001.png"), b"not a png")?;
        }

        let (results, summary) = evaluate_sequence(&EpipolarValidator::default(), tmp.path())?;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].frame, "rgba_00000.png");
        assert_eq!(
            results[0].outcome,
            FrameOutcome::Validated(Validation::Insufficient(
                InsufficientData::NoDescriptors { left: 0, right: 0 }
            ))
        );
        assert!(matches!(results[1].outcome, FrameOutcome::Error(_)));
        assert_eq!(summary.skipped.no_descriptors, 1);
        assert_eq!(summary.skipped.errors, 1);
        assert_eq!(summary.graded(), 0);
        Ok(())
    }
}
