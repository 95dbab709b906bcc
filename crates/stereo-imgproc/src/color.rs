use rayon::prelude::*;
use stereo_image::{Image, ImageError};

/// Define the RGB weights for the grayscale conversion.
const RW: f64 = 0.299;
const GW: f64 = 0.587;
const BW: f64 = 0.114;

/// Convert an RGB image to grayscale using the formula:
///
/// Y = 0.299 * R + 0.587 * G + 0.114 * B
///
/// # Arguments
///
/// * `src` - The input RGB image.
/// * `dst` - The output grayscale image.
///
/// Precondition: the input and output images must have the same size.
///
/// # Example
///
/// ```
/// use stereo_image::{Image, ImageSize};
/// use stereo_imgproc::color::gray_from_rgb;
///
/// let image = Image::<f32, 3>::new(
///     ImageSize {
///         width: 4,
///         height: 5,
///     },
///     vec![0f32; 4 * 5 * 3],
/// )
/// .unwrap();
///
/// let mut gray = Image::<f32, 1>::from_size_val(image.size(), 0.0).unwrap();
///
/// gray_from_rgb(&image, &mut gray).unwrap();
/// assert_eq!(gray.num_channels(), 1);
/// assert_eq!(gray.size().width, 4);
/// assert_eq!(gray.size().height, 5);
/// ```
pub fn gray_from_rgb<T>(src: &Image<T, 3>, dst: &mut Image<T, 1>) -> Result<(), ImageError>
where
    T: Send + Sync + num_traits::Float,
{
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    let cast = || ImageError::CastError(std::any::type_name::<T>().to_string());
    let rw = T::from(RW).ok_or_else(cast)?;
    let gw = T::from(GW).ok_or_else(cast)?;
    let bw = T::from(BW).ok_or_else(cast)?;

    let cols = src.cols();
    if cols == 0 {
        return Ok(());
    }

    // parallelize the grayscale conversion by rows
    src.as_slice()
        .par_chunks_exact(3 * cols)
        .zip(dst.as_slice_mut().par_chunks_exact_mut(cols))
        .for_each(|(src_row, dst_row)| {
            src_row
                .chunks_exact(3)
                .zip(dst_row.iter_mut())
                .for_each(|(px, out)| *out = rw * px[0] + gw * px[1] + bw * px[2]);
        });

    Ok(())
}
