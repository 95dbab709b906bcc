use std::path::Path;

use stereo_3d::pose::{
    epipolar_residuals, EpipolarError, FundamentalEstimator, RansacFundamental, RansacParams,
};
use stereo_image::{ops::cast_and_scale, Image, ImageError};
use stereo_imgproc::{
    color::gray_from_rgb,
    features::{Keypoint, SiftDescriptor, SiftDetector},
};
use stereo_io::png::read_image_png_rgb8;

use crate::{
    correspondences::{CorrespondenceSet, LOWE_RATIO},
    error::EvalError,
    report::{InsufficientData, RectificationReport, Validation},
};

/// Detects keypoints and computes their descriptors.
pub trait FeatureDetector: Send + Sync {
    /// Keypoints and descriptors of a grayscale image with values in `[0, 1]`,
    /// in matching order.
    fn detect_and_describe(
        &self,
        image: &Image<f32, 1>,
    ) -> Result<(Vec<Keypoint>, Vec<SiftDescriptor>), ImageError>;
}

impl FeatureDetector for SiftDetector {
    fn detect_and_describe(
        &self,
        image: &Image<f32, 1>,
    ) -> Result<(Vec<Keypoint>, Vec<SiftDescriptor>), ImageError> {
        SiftDetector::detect_and_describe(self, image)
    }
}

/// Parameters of the epipolar validator.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidationParams {
    /// Minimum number of ratio-test matches and of RANSAC inliers.
    pub min_matches: usize,
    /// RANSAC inlier threshold in pixels.
    pub ransac_threshold_px: f64,
    /// RANSAC confidence.
    pub confidence: f64,
    /// Upper bound on RANSAC iterations.
    pub max_iterations: usize,
    /// Seed of the RANSAC sampler, `None` draws one from the OS.
    pub random_seed: Option<u64>,
}

impl Default for ValidationParams {
    fn default() -> Self {
        Self {
            min_matches: 50,
            ransac_threshold_px: 1.0,
            confidence: 0.999,
            max_iterations: 2000,
            random_seed: Some(0),
        }
    }
}

impl ValidationParams {
    /// RANSAC settings derived from these parameters.
    pub fn ransac_params(&self) -> RansacParams {
        RansacParams {
            max_iterations: self.max_iterations,
            threshold: self.ransac_threshold_px,
            confidence: self.confidence,
            random_seed: self.random_seed,
            ..Default::default()
        }
    }
}

/// Checks the rectification of a stereo pair through its epipolar geometry.
///
/// Features are matched between both images, a fundamental matrix is fit
/// robustly and every inlier is scored by its distance to the epipolar line of
/// its match. For a rectified pair those lines are the image rows, and the
/// distances stay well below a pixel.
pub struct EpipolarValidator {
    params: ValidationParams,
    detector: Box<dyn FeatureDetector>,
    estimator: Box<dyn FundamentalEstimator>,
}

impl Default for EpipolarValidator {
    fn default() -> Self {
        Self::new(ValidationParams::default())
    }
}

impl EpipolarValidator {
    /// Creates a validator with the SIFT detector and a RANSAC estimator.
    pub fn new(params: ValidationParams) -> Self {
        let estimator = RansacFundamental::new(params.ransac_params());
        Self::with_components(params, Box::new(SiftDetector::default()), Box::new(estimator))
    }

    /// Creates a validator with a custom detector and estimator.
    ///
    /// Only `params.min_matches` is read from `params` here. The RANSAC fields
    /// (`ransac_threshold_px`, `confidence`, `max_iterations`, `random_seed`)
    /// configure the estimator built by [`EpipolarValidator::new`] and have no
    /// effect on `estimator`; build it from [`ValidationParams::ransac_params`]
    /// to keep both in step.
    pub fn with_components(
        params: ValidationParams,
        detector: Box<dyn FeatureDetector>,
        estimator: Box<dyn FundamentalEstimator>,
    ) -> Self {
        Self {
            params,
            detector,
            estimator,
        }
    }

    /// The validator parameters.
    pub fn params(&self) -> &ValidationParams {
        &self.params
    }

    /// Validates a pair of grayscale images with values in `[0, 1]`.
    ///
    /// Running out of descriptors, matches or inliers, or failing to estimate
    /// the fundamental matrix, is reported in the returned [`Validation`].
    ///
    /// # Errors
    ///
    /// [`EvalError`] when the feature detector rejects an image.
    pub fn validate(
        &self,
        left: &Image<f32, 1>,
        right: &Image<f32, 1>,
    ) -> Result<Validation, EvalError> {
        let min_matches = self.params.min_matches;

        let (left_features, right_features) = rayon::join(
            || self.detector.detect_and_describe(left),
            || self.detector.detect_and_describe(right),
        );
        let (left_kps, left_desc) = left_features?;
        let (right_kps, right_desc) = right_features?;
        log::debug!(
            "descriptors: {} left, {} right",
            left_desc.len(),
            right_desc.len()
        );

        if left_desc.is_empty() || right_desc.is_empty() {
            return Ok(Validation::Insufficient(InsufficientData::NoDescriptors {
                left: left_desc.len(),
                right: right_desc.len(),
            }));
        }

        let matches =
            CorrespondenceSet::from_features(&left_kps, &left_desc, &right_kps, &right_desc, LOWE_RATIO);
        log::debug!("ratio test matches: {}", matches.len());
        if matches.len() < min_matches {
            return Ok(Validation::Insufficient(InsufficientData::Matches {
                found: matches.len(),
                required: min_matches,
            }));
        }

        let Some(estimate) = self.estimator.estimate(&matches.left, &matches.right) else {
            log::debug!("fundamental matrix estimation failed");
            return Ok(Validation::EstimationFailed);
        };

        let inliers = matches.select(&estimate.inliers);
        log::debug!("ransac inliers: {} of {}", inliers.len(), matches.len());
        if inliers.len() < min_matches || inliers.is_empty() {
            return Ok(Validation::Insufficient(InsufficientData::Inliers {
                found: inliers.len(),
                required: min_matches,
            }));
        }

        let residuals = match epipolar_residuals(&inliers.left, &inliers.right, &estimate.matrix) {
            Ok(residuals) => residuals,
            Err(EpipolarError::DegenerateLine { index }) => {
                log::debug!("degenerate epipolar line for inlier {index}");
                return Ok(Validation::Insufficient(
                    InsufficientData::DegenerateEpipolarLine { index },
                ));
            }
            Err(err) => return Err(err.into()),
        };

        let report = RectificationReport::from_residuals(matches.len(), residuals);
        Ok(match report {
            Some(report) => {
                log::debug!(
                    "mean {:.4} px, p95 {:.4} px: {}",
                    report.stats.mean,
                    report.stats.p95,
                    report.verdict
                );
                Validation::Ok(report)
            }
            None => Validation::Insufficient(InsufficientData::Inliers {
                found: 0,
                required: min_matches,
            }),
        })
    }

    /// Validates a pair of 8-bit RGB images.
    pub fn validate_rgb(
        &self,
        left: &Image<u8, 3>,
        right: &Image<u8, 3>,
    ) -> Result<Validation, EvalError> {
        self.validate(&to_gray_f32(left)?, &to_gray_f32(right)?)
    }

    /// Reads and validates a pair of PNG frames.
    pub fn validate_files(
        &self,
        left: impl AsRef<Path>,
        right: impl AsRef<Path>,
    ) -> Result<Validation, EvalError> {
        let left = read_image_png_rgb8(left)?;
        let right = read_image_png_rgb8(right)?;
        self.validate_rgb(&left, &right)
    }
}

/// Converts an 8-bit RGB image to grayscale with values in `[0, 1]`.
pub fn to_gray_f32(image: &Image<u8, 3>) -> Result<Image<f32, 1>, ImageError> {
    let mut rgb = Image::<f32, 3>::from_size_val(image.size(), 0.0)?;
    cast_and_scale(image, &mut rgb, 1.0 / 255.0)?;

    let mut gray = Image::<f32, 1>::from_size_val(image.size(), 0.0)?;
    gray_from_rgb(&rgb, &mut gray)?;
    Ok(gray)
}
