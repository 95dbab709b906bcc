mod descriptor;
mod extrema;
mod orientation;
mod pyramid;

pub use pyramid::{gaussian_sigmas, number_of_octaves};

use rayon::prelude::*;
use stereo_image::{Image, ImageError};

use super::keypoint::{Keypoint, SiftDescriptor};
use descriptor::compute_descriptor;
use extrema::{find_scale_space_extrema, ScaleSpacePoint};
use orientation::keypoint_orientations;
use pyramid::{base_image, build_scale_space};

/// Parameters of the SIFT detector.
#[derive(Clone, Debug, PartialEq)]
pub struct SiftConfig {
    /// Scale-space layers searched per octave.
    pub n_octave_layers: usize,
    /// Minimum interpolated contrast, divided by `n_octave_layers` when applied.
    pub contrast_threshold: f64,
    /// Maximum ratio of principal curvatures of an accepted extremum.
    pub edge_threshold: f64,
    /// Blur of the base level of each octave.
    pub sigma: f64,
    /// Blur assumed to be already present in the input image.
    pub assumed_blur: f64,
    /// Pixels near the octave border that are never searched.
    pub image_border_width: usize,
    /// Whether the input is upsampled 2x before building the scale space.
    pub upsample: bool,
    /// Keep only the strongest keypoints, by response.
    pub max_features: Option<usize>,
}

impl Default for SiftConfig {
    fn default() -> Self {
        Self {
            n_octave_layers: 3,
            contrast_threshold: 0.04,
            edge_threshold: 10.0,
            sigma: 1.6,
            assumed_blur: 0.5,
            image_border_width: 5,
            upsample: true,
            max_features: None,
        }
    }
}

/// Scale-invariant keypoint detector and descriptor extractor.
///
/// # Example
///
/// ```
/// use stereo_image::Image;
/// use stereo_imgproc::features::SiftDetector;
///
/// let img = Image::<f32, 1>::from_size_val([64, 64].into(), 0.5).unwrap();
/// let (keypoints, descriptors) = SiftDetector::default().detect_and_describe(&img).unwrap();
/// assert!(keypoints.is_empty());
/// assert_eq!(keypoints.len(), descriptors.len());
/// ```
#[derive(Clone, Debug, Default)]
pub struct SiftDetector {
    config: SiftConfig,
}

impl SiftDetector {
    /// Create a detector with the given parameters.
    pub fn new(config: SiftConfig) -> Self {
        Self { config }
    }

    /// The detector parameters.
    pub fn config(&self) -> &SiftConfig {
        &self.config
    }

    /// Detect keypoints in a grayscale image with values in `[0, 1]` and
    /// compute one descriptor per keypoint.
    ///
    /// Keypoints and descriptors are returned in the same order. A keypoint
    /// with several dominant orientations is reported once per orientation.
    pub fn detect_and_describe(
        &self,
        src: &Image<f32, 1>,
    ) -> Result<(Vec<Keypoint>, Vec<SiftDescriptor>), ImageError> {
        if src.width() == 0 || src.height() == 0 {
            return Err(ImageError::EmptyImage);
        }
        let config = &self.config;

        let base = base_image(src, config)?;
        let num_octaves = self.usable_octaves(base.height(), base.width());
        if num_octaves == 0 {
            return Ok((Vec::new(), Vec::new()));
        }

        let sigmas = gaussian_sigmas(config.sigma, config.n_octave_layers);
        let space = build_scale_space(base, num_octaves, &sigmas)?;
        let points = find_scale_space_extrema(&space, config);

        let mut oriented: Vec<(ScaleSpacePoint, Keypoint)> = points
            .par_iter()
            .flat_map_iter(|point| {
                let img = &space.gaussians[point.octave][point.layer];
                let scale = point.octave_scale(config);
                keypoint_orientations(img, point.row, point.col, scale)
                    .into_iter()
                    .map(|angle| (*point, self.to_keypoint(point, angle)))
                    .collect::<Vec<_>>()
            })
            .collect();

        oriented.sort_by(|(_, a), (_, b)| {
            a.x.total_cmp(&b.x)
                .then(a.y.total_cmp(&b.y))
                .then(b.size.total_cmp(&a.size))
                .then(a.angle.total_cmp(&b.angle))
        });
        oriented.dedup_by(|(_, a), (_, b)| {
            a.x == b.x && a.y == b.y && a.size == b.size && a.angle == b.angle
        });

        if let Some(max_features) = config.max_features {
            if oriented.len() > max_features {
                // stable sort keeps the spatial order among equal responses
                oriented.sort_by(|(_, a), (_, b)| b.response.total_cmp(&a.response));
                oriented.truncate(max_features);
            }
        }

        let descriptors = oriented
            .par_iter()
            .map(|(point, kp)| {
                let img = &space.gaussians[point.octave][point.layer];
                let (x, y) = point.octave_point();
                compute_descriptor(img, x, y, kp.angle, point.octave_scale(config))
            })
            .collect();
        let keypoints = oriented.into_iter().map(|(_, kp)| kp).collect();

        Ok((keypoints, descriptors))
    }

    /// Octaves whose images are still large enough to hold a searchable interior.
    fn usable_octaves(&self, height: usize, width: usize) -> usize {
        let min_dim = height.min(width);
        let min_size = 2 * self.config.image_border_width + 3;
        let mut octaves = number_of_octaves(height, width);
        while octaves > 0 && (min_dim >> (octaves - 1)) < min_size {
            octaves -= 1;
        }
        octaves
    }

    /// Map a scale-space point to input image coordinates.
    fn to_keypoint(&self, point: &ScaleSpacePoint, angle: f32) -> Keypoint {
        let octave_factor = (1usize << point.octave) as f32;
        let input_factor = if self.config.upsample { 0.5 } else { 1.0 };
        let (x, y) = point.octave_point();
        let size = point.octave_scale(&self.config) * octave_factor * 2.0;

        Keypoint {
            x: x * octave_factor * input_factor,
            y: y * octave_factor * input_factor,
            size: size * input_factor,
            angle,
            response: point.response,
            octave: point.octave,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn blob_texture(width: usize, height: usize, num_blobs: usize, seed: u64) -> Image<f32, 1> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut data = vec![0.0f32; width * height];
        for _ in 0..num_blobs {
            let cx = rng.random_range(8.0..width as f32 - 8.0);
            let cy = rng.random_range(8.0..height as f32 - 8.0);
            let sigma = rng.random_range(1.5..4.0f32);
            let amplitude = rng.random_range(0.3..1.0f32);
            for (i, v) in data.iter_mut().enumerate() {
                let dx = (i % width) as f32 - cx;
                let dy = (i / width) as f32 - cy;
                *v += amplitude * (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp();
            }
        }
        let max = data.iter().cloned().fold(f32::MIN, f32::max).max(1e-6);
        data.iter_mut().for_each(|v| *v /= max);
        Image::new([width, height].into(), data).unwrap()
    }

    #[test]
    fn empty_image_is_rejected() {
        let img = Image::<f32, 1>::new([0, 0].into(), vec![]).unwrap();
        let res = SiftDetector::default().detect_and_describe(&img);
        assert_eq!(res.unwrap_err(), ImageError::EmptyImage);
    }

    #[test]
    fn flat_image_has_no_keypoints() -> Result<(), ImageError> {
        let img = Image::<f32, 1>::from_size_val([96, 64].into(), 0.7)?;
        let (kps, descs) = SiftDetector::default().detect_and_describe(&img)?;
        assert!(kps.is_empty());
        assert!(descs.is_empty());
        Ok(())
    }

    #[test]
    fn tiny_image_has_no_keypoints() -> Result<(), ImageError> {
        let img = Image::<f32, 1>::from_size_val([4, 4].into(), 0.1)?;
        let (kps, _) = SiftDetector::default().detect_and_describe(&img)?;
        assert!(kps.is_empty());
        Ok(())
    }

    #[test]
    fn textured_image_has_described_keypoints() -> Result<(), ImageError> {
        let img = blob_texture(128, 96, 40, 7);
        let (kps, descs) = SiftDetector::default().detect_and_describe(&img)?;

        assert!(kps.len() >= 10, "only {} keypoints", kps.len());
        assert_eq!(kps.len(), descs.len());
        for (kp, desc) in kps.iter().zip(&descs) {
            assert!(kp.x >= 0.0 && kp.x < 128.0);
            assert!(kp.y >= 0.0 && kp.y < 96.0);
            assert!(kp.size > 0.0);
            assert!((0.0..360.0).contains(&kp.angle));
            let norm = desc.iter().map(|v| v * v).sum::<f32>().sqrt();
            approx::assert_relative_eq!(norm, 1.0, epsilon = 1e-3);
        }
        Ok(())
    }

    #[test]
    fn detection_is_deterministic() -> Result<(), ImageError> {
        let img = blob_texture(96, 96, 25, 3);
        let detector = SiftDetector::default();
        let (kps_a, descs_a) = detector.detect_and_describe(&img)?;
        let (kps_b, descs_b) = detector.detect_and_describe(&img)?;
        assert_eq!(kps_a, kps_b);
        assert_eq!(descs_a, descs_b);
        Ok(())
    }

    #[test]
    fn max_features_keeps_strongest() -> Result<(), ImageError> {
        let img = blob_texture(128, 96, 40, 11);
        let (all, _) = SiftDetector::default().detect_and_describe(&img)?;
        assert!(all.len() > 5);

        let detector = SiftDetector::new(SiftConfig {
            max_features: Some(5),
            ..Default::default()
        });
        let (best, descs) = detector.detect_and_describe(&img)?;
        assert_eq!(best.len(), 5);
        assert_eq!(descs.len(), 5);

        let mut responses: Vec<f32> = all.iter().map(|kp| kp.response).collect();
        responses.sort_by(|a, b| b.total_cmp(a));
        let weakest_kept = best.iter().map(|kp| kp.response).fold(f32::MAX, f32::min);
        assert!(weakest_kept >= responses[4]);
        Ok(())
    }
}
