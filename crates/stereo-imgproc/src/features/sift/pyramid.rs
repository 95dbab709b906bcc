use stereo_image::{Image, ImageError, ImageSize};

use super::SiftConfig;
use crate::{
    filter::gaussian_blur,
    resize::{downsample_half_nearest, resize_bilinear},
};

/// Incremental gaussian blurs that take each scale-space level to the next one.
///
/// The first entry is the absolute sigma of the octave base image; entry `i`
/// is the extra blur applied to level `i - 1` to reach `sigma * k^i`, with
/// `k = 2^(1 / num_intervals)`.
///
/// # Example
///
/// ```
/// use stereo_imgproc::features::gaussian_sigmas;
///
/// let sigmas = gaussian_sigmas(1.6, 3);
/// assert_eq!(sigmas.len(), 6);
/// assert!((sigmas[1] - 1.2262735).abs() < 1e-6);
/// ```
pub fn gaussian_sigmas(sigma: f64, num_intervals: usize) -> Vec<f64> {
    let images_per_octave = num_intervals + 3;
    let k = 2.0f64.powf(1.0 / num_intervals as f64);
    let mut sigmas = vec![0.0; images_per_octave];

    sigmas[0] = sigma;
    for (idx, item) in sigmas.iter_mut().enumerate().skip(1) {
        let sigma_previous = k.powf(idx as f64 - 1.0) * sigma;
        let sigma_total = k * sigma_previous;
        *item = (sigma_total * sigma_total - sigma_previous * sigma_previous).sqrt();
    }

    sigmas
}

/// Number of octaves of the scale space for a base image of the given size.
pub fn number_of_octaves(height: usize, width: usize) -> usize {
    let min_dim = height.min(width).max(1) as f64;
    (min_dim.log2() - 1.0).round().max(0.0) as usize
}

/// Upsample (optionally) and blur the input so that it carries `config.sigma` of blur.
pub(crate) fn base_image(
    src: &Image<f32, 1>,
    config: &SiftConfig,
) -> Result<Image<f32, 1>, ImageError> {
    let sigma = config.sigma as f32;
    let assumed_blur = config.assumed_blur as f32;

    let (resized, blur_in) = if config.upsample {
        let size = ImageSize {
            width: src.width() * 2,
            height: src.height() * 2,
        };
        let mut up = Image::from_size_val(size, 0.0f32)?;
        resize_bilinear(src, &mut up)?;
        (up, 2.0 * assumed_blur)
    } else {
        (src.clone(), assumed_blur)
    };

    let sigma_diff = (sigma * sigma - blur_in * blur_in).max(0.01).sqrt();
    let mut base = Image::from_size_val(resized.size(), 0.0f32)?;
    gaussian_blur(&resized, &mut base, sigma_diff)?;

    Ok(base)
}

/// Gaussian and difference-of-gaussian images, indexed `[octave][level]`.
pub(crate) struct ScaleSpace {
    pub gaussians: Vec<Vec<Image<f32, 1>>>,
    pub dogs: Vec<Vec<Image<f32, 1>>>,
}

/// Build the gaussian pyramid and its difference-of-gaussians from a base image.
pub(crate) fn build_scale_space(
    base: Image<f32, 1>,
    num_octaves: usize,
    sigmas: &[f64],
) -> Result<ScaleSpace, ImageError> {
    let num_intervals = sigmas.len() - 3;
    let mut gaussians: Vec<Vec<Image<f32, 1>>> = Vec::with_capacity(num_octaves);
    let mut octave_base = base;

    for octave in 0..num_octaves {
        if octave > 0 {
            let prev: &Image<f32, 1> = &gaussians[octave - 1][num_intervals];
            let size = ImageSize {
                width: prev.width() / 2,
                height: prev.height() / 2,
            };
            let mut down = Image::from_size_val(size, 0.0f32)?;
            downsample_half_nearest(prev, &mut down)?;
            octave_base = down;
        }

        let mut levels = Vec::with_capacity(sigmas.len());
        levels.push(octave_base.clone());
        for &sigma in sigmas.iter().skip(1) {
            let mut blurred = Image::from_size_val(octave_base.size(), 0.0f32)?;
            if let Some(prev) = levels.last() {
                gaussian_blur(prev, &mut blurred, sigma as f32)?;
            }
            levels.push(blurred);
        }
        gaussians.push(levels);
    }

    let dogs = gaussians
        .iter()
        .map(|levels| {
            levels
                .windows(2)
                .map(|pair| {
                    let data = pair[1]
                        .as_slice()
                        .iter()
                        .zip(pair[0].as_slice())
                        .map(|(b, a)| b - a)
                        .collect();
                    Image::new(pair[0].size(), data)
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ScaleSpace { gaussians, dogs })
}
