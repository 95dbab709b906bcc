use rayon::prelude::*;
use stereo_image::{Image, ImageError};

/// Resize an image using bilinear interpolation.
///
/// Pixel centers are aligned (`src = (dst + 0.5) * scale - 0.5`) and samples
/// outside the source are clamped to the border.
///
/// # Arguments
///
/// * `src` - The input image.
/// * `dst` - The output image, its size defines the target size.
///
/// # Example
///
/// ```
/// use stereo_image::Image;
/// use stereo_imgproc::resize::resize_bilinear;
///
/// let src = Image::<f32, 1>::from_size_val([4, 4].into(), 1.0).unwrap();
/// let mut dst = Image::<f32, 1>::from_size_val([8, 8].into(), 0.0).unwrap();
///
/// resize_bilinear(&src, &mut dst).unwrap();
/// assert!(dst.as_slice().iter().all(|&v| (v - 1.0).abs() < 1e-6));
/// ```
pub fn resize_bilinear<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
) -> Result<(), ImageError> {
    if src.width() == 0 || src.height() == 0 {
        return Err(ImageError::EmptyImage);
    }
    if dst.width() == 0 || dst.height() == 0 {
        return Ok(());
    }

    let (src_w, src_h) = (src.width(), src.height());
    let dst_w = dst.width();
    let scale_x = src_w as f32 / dst_w as f32;
    let scale_y = src_h as f32 / dst.height() as f32;
    let src_data = src.as_slice();

    dst.as_slice_mut()
        .par_chunks_exact_mut(dst_w * C)
        .enumerate()
        .for_each(|(y, dst_row)| {
            let sy = ((y as f32 + 0.5) * scale_y - 0.5).clamp(0.0, (src_h - 1) as f32);
            let y0 = sy.floor() as usize;
            let y1 = (y0 + 1).min(src_h - 1);
            let fy = sy - y0 as f32;

            for x in 0..dst_w {
                let sx = ((x as f32 + 0.5) * scale_x - 0.5).clamp(0.0, (src_w - 1) as f32);
                let x0 = sx.floor() as usize;
                let x1 = (x0 + 1).min(src_w - 1);
                let fx = sx - x0 as f32;

                for ch in 0..C {
                    let p00 = src_data[(y0 * src_w + x0) * C + ch];
                    let p01 = src_data[(y0 * src_w + x1) * C + ch];
                    let p10 = src_data[(y1 * src_w + x0) * C + ch];
                    let p11 = src_data[(y1 * src_w + x1) * C + ch];
                    let top = p00 + (p01 - p00) * fx;
                    let bottom = p10 + (p11 - p10) * fx;
                    dst_row[x * C + ch] = top + (bottom - top) * fy;
                }
            }
        });

    Ok(())
}

/// Downsample an image by a factor of two keeping every other pixel.
///
/// The destination must have size `(src.width / 2, src.height / 2)`.
pub fn downsample_half_nearest<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
) -> Result<(), ImageError> {
    if dst.width() != src.width() / 2 || dst.height() != src.height() / 2 {
        return Err(ImageError::InvalidImageSize(
            src.width() / 2,
            src.height() / 2,
            dst.width(),
            dst.height(),
        ));
    }
    if dst.width() == 0 || dst.height() == 0 {
        return Ok(());
    }

    let src_w = src.width();
    let dst_w = dst.width();
    let src_data = src.as_slice();

    dst.as_slice_mut()
        .par_chunks_exact_mut(dst_w * C)
        .enumerate()
        .for_each(|(y, dst_row)| {
            let src_row = &src_data[(2 * y) * src_w * C..(2 * y + 1) * src_w * C];
            for x in 0..dst_w {
                dst_row[x * C..(x + 1) * C].copy_from_slice(&src_row[2 * x * C..(2 * x + 1) * C]);
            }
        });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_bilinear_upsample_ramp() -> Result<(), ImageError> {
        let src = Image::<f32, 1>::new([2, 1].into(), vec![0.0, 1.0])?;
        let mut dst = Image::<f32, 1>::from_size_val([4, 1].into(), 0.0)?;
        resize_bilinear(&src, &mut dst)?;
        let expected = [0.0, 0.25, 0.75, 1.0];
        for (v, e) in dst.as_slice().iter().zip(expected.iter()) {
            approx::assert_relative_eq!(v, e, epsilon = 1e-6);
        }
        Ok(())
    }

    #[test]
    fn downsample_half_keeps_even_pixels() -> Result<(), ImageError> {
        let src = Image::<f32, 1>::new([4, 3].into(), (0..12).map(|v| v as f32).collect())?;
        let mut dst = Image::<f32, 1>::from_size_val([2, 1].into(), 0.0)?;
        downsample_half_nearest(&src, &mut dst)?;
        assert_eq!(dst.as_slice(), &[0.0, 2.0]);
        Ok(())
    }

    #[test]
    fn downsample_half_wrong_size() -> Result<(), ImageError> {
        let src = Image::<f32, 1>::from_size_val([4, 4].into(), 0.0)?;
        let mut dst = Image::<f32, 1>::from_size_val([3, 2].into(), 0.0)?;
        assert!(downsample_half_nearest(&src, &mut dst).is_err());
        Ok(())
    }
}
