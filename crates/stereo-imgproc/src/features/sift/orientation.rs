use stereo_image::Image;

/// Number of bins of the orientation histogram.
const ORI_HIST_BINS: usize = 36;
/// Gaussian weighting sigma relative to the keypoint scale.
const ORI_SIG_FCTR: f32 = 1.5;
/// Sampling radius relative to the weighting sigma.
const ORI_RADIUS: f32 = 3.0 * ORI_SIG_FCTR;
/// Orientation peaks within this ratio of the maximum generate a keypoint.
const ORI_PEAK_RATIO: f32 = 0.8;

/// Gradient orientation histogram around a sample, smoothed.
fn orientation_histogram(img: &Image<f32, 1>, row: usize, col: usize, scale: f32) -> [f32; ORI_HIST_BINS] {
    let n = ORI_HIST_BINS;
    let radius = (ORI_RADIUS * scale).round() as isize;
    let sigma = ORI_SIG_FCTR * scale;
    let exp_scale = -1.0 / (2.0 * sigma * sigma);
    let (rows, cols) = (img.height() as isize, img.width() as isize);
    let data = img.as_slice();
    let px = |r: isize, c: isize| data[(r * cols + c) as usize];

    let mut raw = [0.0f32; ORI_HIST_BINS];
    for i in -radius..=radius {
        let y = row as isize + i;
        if y <= 0 || y >= rows - 1 {
            continue;
        }
        for j in -radius..=radius {
            let x = col as isize + j;
            if x <= 0 || x >= cols - 1 {
                continue;
            }

            let dx = px(y, x + 1) - px(y, x - 1);
            let dy = px(y - 1, x) - px(y + 1, x);
            let weight = (((i * i + j * j) as f32) * exp_scale).exp();
            let magnitude = (dx * dx + dy * dy).sqrt();
            let mut angle = dy.atan2(dx).to_degrees();
            if angle < 0.0 {
                angle += 360.0;
            }

            let bin = ((angle * n as f32 / 360.0).round() as usize) % n;
            raw[bin] += weight * magnitude;
        }
    }

    let mut hist = [0.0f32; ORI_HIST_BINS];
    for (i, h) in hist.iter_mut().enumerate() {
        let at = |offset: isize| raw[(i as isize + offset).rem_euclid(n as isize) as usize];
        *h = (at(-2) + at(2)) * (1.0 / 16.0) + (at(-1) + at(1)) * (4.0 / 16.0) + at(0) * (6.0 / 16.0);
    }
    hist
}

/// Dominant gradient orientations, in degrees, of a keypoint.
///
/// Every local histogram peak above 80% of the global maximum yields one
/// orientation, interpolated with a parabola over the neighbouring bins.
pub(crate) fn keypoint_orientations(
    img: &Image<f32, 1>,
    row: usize,
    col: usize,
    scale: f32,
) -> Vec<f32> {
    let n = ORI_HIST_BINS;
    let hist = orientation_histogram(img, row, col, scale);
    let max_val = hist.iter().cloned().fold(0.0f32, f32::max);
    if max_val <= 0.0 {
        return Vec::new();
    }
    let threshold = max_val * ORI_PEAK_RATIO;

    let mut angles = Vec::new();
    for j in 0..n {
        let left = hist[(j + n - 1) % n];
        let right = hist[(j + 1) % n];
        let center = hist[j];
        if center > left && center > right && center >= threshold {
            let mut bin = j as f32 + 0.5 * (left - right) / (left - 2.0 * center + right);
            if bin < 0.0 {
                bin += n as f32;
            } else if bin >= n as f32 {
                bin -= n as f32;
            }
            let mut angle = 360.0 - (360.0 / n as f32) * bin;
            if (angle - 360.0).abs() < f32::EPSILON {
                angle = 0.0;
            }
            angles.push(angle);
        }
    }
    angles
}
