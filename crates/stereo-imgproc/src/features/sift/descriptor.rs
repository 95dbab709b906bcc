use super::super::keypoint::{SiftDescriptor, SIFT_DESCRIPTOR_SIZE};
use stereo_image::Image;

/// Width of the spatial grid of the descriptor.
const DESCR_WIDTH: usize = 4;
/// Orientation bins per spatial cell.
const DESCR_HIST_BINS: usize = 8;
/// Size of a spatial cell relative to the keypoint scale.
const DESCR_SCL_FCTR: f32 = 3.0;
/// Threshold on the normalized descriptor entries.
const DESCR_MAG_THR: f32 = 0.2;

/// Computes the 128-d gradient histogram descriptor of a keypoint.
///
/// `x` and `y` are expressed in the coordinates of `img` (the octave image the
/// keypoint was found in), `angle` is the keypoint orientation in degrees and
/// `scale` is half of the keypoint size in octave coordinates.
///
/// Gradients in a rotated `4x4` grid around the keypoint are accumulated into
/// `8` orientation bins per cell with trilinear interpolation. The result is
/// normalized to unit length, clipped at `0.2` and normalized again.
pub(crate) fn compute_descriptor(
    img: &Image<f32, 1>,
    x: f32,
    y: f32,
    angle: f32,
    scale: f32,
) -> SiftDescriptor {
    let d = DESCR_WIDTH;
    let n = DESCR_HIST_BINS;
    let (rows, cols) = (img.height() as isize, img.width() as isize);
    let data = img.as_slice();
    let px = |r: isize, c: isize| data[(r * cols + c) as usize];

    let (ptx, pty) = (x.round() as isize, y.round() as isize);
    let ori = 360.0 - angle;
    let (sin_o, cos_o) = ori.to_radians().sin_cos();
    let bins_per_deg = n as f32 / 360.0;
    let exp_scale = -1.0 / (d as f32 * d as f32 * 0.5);
    let hist_width = DESCR_SCL_FCTR * scale;
    let max_radius = ((rows * rows + cols * cols) as f32).sqrt();
    let radius = (hist_width * std::f32::consts::SQRT_2 * (d as f32 + 1.0) * 0.5)
        .round()
        .min(max_radius) as isize;
    let cos_t = cos_o / hist_width;
    let sin_t = sin_o / hist_width;

    // histogram padded by one cell/bin on every side for the interpolation
    let stride_o = n + 2;
    let stride_c = (d + 2) * stride_o;
    let mut hist = vec![0.0f32; (d + 2) * stride_c];

    for i in -radius..=radius {
        for j in -radius..=radius {
            let c_rot = j as f32 * cos_t - i as f32 * sin_t;
            let r_rot = j as f32 * sin_t + i as f32 * cos_t;
            let rbin = r_rot + d as f32 / 2.0 - 0.5;
            let cbin = c_rot + d as f32 / 2.0 - 0.5;
            let r = pty + i;
            let c = ptx + j;

            if rbin <= -1.0
                || rbin >= d as f32
                || cbin <= -1.0
                || cbin >= d as f32
                || r <= 0
                || r >= rows - 1
                || c <= 0
                || c >= cols - 1
            {
                continue;
            }

            let dx = px(r, c + 1) - px(r, c - 1);
            let dy = px(r - 1, c) - px(r + 1, c);
            let weight = ((c_rot * c_rot + r_rot * r_rot) * exp_scale).exp();
            let mag = (dx * dx + dy * dy).sqrt() * weight;
            let mut grad_ori = dy.atan2(dx).to_degrees();
            if grad_ori < 0.0 {
                grad_ori += 360.0;
            }
            let obin = (grad_ori - ori) * bins_per_deg;

            let (r0, c0, o0) = (rbin.floor(), cbin.floor(), obin.floor());
            let (rf, cf, of) = (rbin - r0, cbin - c0, obin - o0);
            let mut o0 = o0 as isize;
            if o0 < 0 {
                o0 += n as isize;
            }
            if o0 >= n as isize {
                o0 -= n as isize;
            }
            let (r0, c0, o0) = ((r0 as isize + 1) as usize, (c0 as isize + 1) as usize, o0 as usize);

            let v_r1 = mag * rf;
            let v_r0 = mag - v_r1;
            let v_rc11 = v_r1 * cf;
            let v_rc10 = v_r1 - v_rc11;
            let v_rc01 = v_r0 * cf;
            let v_rc00 = v_r0 - v_rc01;

            let idx = r0 * stride_c + c0 * stride_o + o0;
            for (offset, v) in [
                (0, v_rc00),
                (stride_o, v_rc01),
                (stride_c, v_rc10),
                (stride_c + stride_o, v_rc11),
            ] {
                let v1 = v * of;
                hist[idx + offset] += v - v1;
                hist[idx + offset + 1] += v1;
            }
        }
    }

    let mut descriptor = [0.0f32; SIFT_DESCRIPTOR_SIZE];
    for i in 0..d {
        for j in 0..d {
            let idx = (i + 1) * stride_c + (j + 1) * stride_o;
            // fold the circular orientation padding back in
            hist[idx] += hist[idx + n];
            hist[idx + 1] += hist[idx + n + 1];
            let dst = (i * d + j) * n;
            descriptor[dst..dst + n].copy_from_slice(&hist[idx..idx + n]);
        }
    }

    normalize_and_clip(&mut descriptor);
    descriptor
}

fn normalize_and_clip(descriptor: &mut SiftDescriptor) {
    let norm = descriptor.iter().map(|v| v * v).sum::<f32>().sqrt();
    let threshold = norm * DESCR_MAG_THR;
    descriptor.iter_mut().for_each(|v| *v = v.min(threshold));

    let norm = descriptor.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        descriptor.iter_mut().for_each(|v| *v /= norm);
    }
}
