use rayon::prelude::*;
use stereo_image::{Image, ImageError};

use super::{gaussian_kernel_1d, gaussian_kernel_size};

/// Reflect an out-of-range index back into `[0, len)` without repeating the edge
/// pixel (`gfedcb|abcdefgh|gfedcba`).
#[inline]
pub(crate) fn reflect_101(idx: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let n = len as isize;
    let mut i = idx;
    loop {
        if i < 0 {
            i = -i;
        } else if i >= n {
            i = 2 * n - 2 - i;
        } else {
            return i as usize;
        }
    }
}

/// A separable 2D filter that applies horizontal and vertical 1D convolutions sequentially.
struct SeparableFilter {
    kernel_x: Vec<f32>,
    kernel_y: Vec<f32>,
}

impl SeparableFilter {
    fn new(kernel_x: &[f32], kernel_y: &[f32]) -> Self {
        Self {
            kernel_x: kernel_x.to_vec(),
            kernel_y: kernel_y.to_vec(),
        }
    }

    /// Performs horizontal filtering followed by vertical filtering using a temporary buffer.
    fn apply<const C: usize>(
        &self,
        src: &Image<f32, C>,
        dst: &mut Image<f32, C>,
    ) -> Result<(), ImageError> {
        if src.size() != dst.size() {
            return Err(ImageError::InvalidImageSize(
                src.cols(),
                src.rows(),
                dst.cols(),
                dst.rows(),
            ));
        }

        let rows = src.rows();
        let cols = src.cols();
        if rows == 0 || cols == 0 {
            return Ok(());
        }

        let row_stride = cols * C;
        let half_x = (self.kernel_x.len() / 2) as isize;
        let half_y = (self.kernel_y.len() / 2) as isize;

        let src_data = src.as_slice();
        let mut temp = vec![0.0f32; src_data.len()];

        // horizontal pass
        temp.par_chunks_exact_mut(row_stride)
            .zip(src_data.par_chunks_exact(row_stride))
            .for_each(|(temp_row, src_row)| {
                for c in 0..cols {
                    for ch in 0..C {
                        let mut acc = 0.0f32;
                        for (k, w) in self.kernel_x.iter().enumerate() {
                            let x = reflect_101(c as isize + k as isize - half_x, cols);
                            acc += w * src_row[x * C + ch];
                        }
                        temp_row[c * C + ch] = acc;
                    }
                }
            });

        // vertical pass
        dst.as_slice_mut()
            .par_chunks_exact_mut(row_stride)
            .enumerate()
            .for_each(|(r, dst_row)| {
                dst_row.iter_mut().for_each(|v| *v = 0.0);
                for (k, w) in self.kernel_y.iter().enumerate() {
                    let y = reflect_101(r as isize + k as isize - half_y, rows);
                    let temp_row = &temp[y * row_stride..(y + 1) * row_stride];
                    dst_row
                        .iter_mut()
                        .zip(temp_row.iter())
                        .for_each(|(d, t)| *d += w * t);
                }
            });

        Ok(())
    }
}

/// Apply a separable filter to an image.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `dst` - The destination image, same size as the source.
/// * `kernel_x` - The horizontal kernel.
/// * `kernel_y` - The vertical kernel.
pub fn separable_filter<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    kernel_x: &[f32],
    kernel_y: &[f32],
) -> Result<(), ImageError> {
    SeparableFilter::new(kernel_x, kernel_y).apply(src, dst)
}

/// Blur an image using a gaussian filter.
///
/// The kernel size is derived from `sigma` (see [`gaussian_kernel_size`]) and
/// borders are handled by reflection.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `dst` - The destination image, same size as the source.
/// * `sigma` - The standard deviation of the gaussian, in pixels.
pub fn gaussian_blur<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    sigma: f32,
) -> Result<(), ImageError> {
    let kernel = gaussian_kernel_1d(gaussian_kernel_size(sigma), sigma);
    separable_filter(src, dst, &kernel, &kernel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflect_101() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(-2, 5), 2);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(6, 5), 2);
        assert_eq!(reflect_101(3, 1), 0);
        assert_eq!(reflect_101(-3, 2), 1);
    }

    #[test]
    fn test_gaussian_blur_constant() -> Result<(), ImageError> {
        let src = Image::<f32, 1>::from_size_val([7, 5].into(), 0.25)?;
        let mut dst = Image::<f32, 1>::from_size_val(src.size(), 0.0)?;
        gaussian_blur(&src, &mut dst, 1.6)?;
        for v in dst.as_slice() {
            approx::assert_relative_eq!(*v, 0.25, epsilon = 1e-5);
        }
        Ok(())
    }

    #[test]
    fn test_gaussian_blur_impulse() -> Result<(), ImageError> {
        let mut src = Image::<f32, 1>::from_size_val([9, 9].into(), 0.0)?;
        src.set_pixel(4, 4, 0, 1.0)?;
        let mut dst = Image::<f32, 1>::from_size_val(src.size(), 0.0)?;
        gaussian_blur(&src, &mut dst, 0.8)?;

        // mass is preserved away from the borders and the peak stays centered
        let total = dst.as_slice().iter().sum::<f32>();
        approx::assert_relative_eq!(total, 1.0, epsilon = 1e-4);
        let peak = dst.get_pixel(4, 4, 0)?;
        assert!(dst.as_slice().iter().all(|v| v <= peak));
        approx::assert_relative_eq!(dst.get_pixel(3, 4, 0)?, dst.get_pixel(5, 4, 0)?);
        Ok(())
    }

    #[test]
    fn test_separable_filter_size_mismatch() -> Result<(), ImageError> {
        let src = Image::<f32, 1>::from_size_val([4, 4].into(), 0.0)?;
        let mut dst = Image::<f32, 1>::from_size_val([5, 4].into(), 0.0)?;
        assert!(separable_filter(&src, &mut dst, &[1.0], &[1.0]).is_err());
        Ok(())
    }
}
