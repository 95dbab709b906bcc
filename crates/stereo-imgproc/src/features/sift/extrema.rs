use glam::{DMat3, DVec3};
use stereo_image::Image;

use super::{pyramid::ScaleSpace, SiftConfig};

/// Maximum number of steps of the sub-pixel refinement.
const MAX_INTERP_STEPS: usize = 5;

/// A refined difference-of-gaussian extremum.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ScaleSpacePoint {
    pub octave: usize,
    pub layer: usize,
    pub row: usize,
    pub col: usize,
    /// Sub-pixel offset as (column, row, layer).
    pub offset: [f32; 3],
    pub response: f32,
}

impl ScaleSpacePoint {
    /// Scale of the point relative to its octave image.
    pub fn octave_scale(&self, config: &SiftConfig) -> f32 {
        let n = config.n_octave_layers as f32;
        config.sigma as f32 * 2f32.powf((self.layer as f32 + self.offset[2]) / n)
    }

    /// Sub-pixel location as (x, y) in octave image coordinates.
    pub fn octave_point(&self) -> (f32, f32) {
        (
            self.col as f32 + self.offset[0],
            self.row as f32 + self.offset[1],
        )
    }
}

#[inline]
fn at(img: &Image<f32, 1>, row: usize, col: usize) -> f32 {
    img.as_slice()[row * img.width() + col]
}

fn is_extremum(prev: &Image<f32, 1>, cur: &Image<f32, 1>, next: &Image<f32, 1>, r: usize, c: usize) -> bool {
    let val = at(cur, r, c);
    let mut is_max = true;
    let mut is_min = true;
    for (li, layer) in [prev, cur, next].iter().enumerate() {
        for rr in r - 1..=r + 1 {
            for cc in c - 1..=c + 1 {
                if li == 1 && rr == r && cc == c {
                    continue;
                }
                let v = at(layer, rr, cc);
                is_max &= val >= v;
                is_min &= val <= v;
            }
        }
    }
    (val > 0.0 && is_max) || (val < 0.0 && is_min)
}

/// Gradient (dx, dy, ds) and hessian of the difference-of-gaussian at a sample.
fn derivatives(dogs: &[Image<f32, 1>], layer: usize, r: usize, c: usize) -> (DVec3, DMat3) {
    let prev = &dogs[layer - 1];
    let cur = &dogs[layer];
    let next = &dogs[layer + 1];
    let v = |img: &Image<f32, 1>, rr: usize, cc: usize| at(img, rr, cc) as f64;

    let grad = DVec3::new(
        (v(cur, r, c + 1) - v(cur, r, c - 1)) * 0.5,
        (v(cur, r + 1, c) - v(cur, r - 1, c)) * 0.5,
        (v(next, r, c) - v(prev, r, c)) * 0.5,
    );

    let v2 = v(cur, r, c) * 2.0;
    let dxx = v(cur, r, c + 1) + v(cur, r, c - 1) - v2;
    let dyy = v(cur, r + 1, c) + v(cur, r - 1, c) - v2;
    let dss = v(next, r, c) + v(prev, r, c) - v2;
    let dxy = (v(cur, r + 1, c + 1) - v(cur, r + 1, c - 1) - v(cur, r - 1, c + 1)
        + v(cur, r - 1, c - 1))
        * 0.25;
    let dxs = (v(next, r, c + 1) - v(next, r, c - 1) - v(prev, r, c + 1) + v(prev, r, c - 1))
        * 0.25;
    let dys = (v(next, r + 1, c) - v(next, r - 1, c) - v(prev, r + 1, c) + v(prev, r - 1, c))
        * 0.25;

    let hessian = DMat3::from_cols(
        DVec3::new(dxx, dxy, dxs),
        DVec3::new(dxy, dyy, dys),
        DVec3::new(dxs, dys, dss),
    );

    (grad, hessian)
}

/// Refine an extremum with a quadratic fit and reject low contrast and edge responses.
fn localize(
    dogs: &[Image<f32, 1>],
    octave: usize,
    layer: usize,
    row: usize,
    col: usize,
    config: &SiftConfig,
) -> Option<ScaleSpacePoint> {
    let n = config.n_octave_layers;
    let border = config.image_border_width.max(1) as isize;
    let width = dogs[0].width() as isize;
    let height = dogs[0].height() as isize;

    let (mut layer, mut r, mut c) = (layer as isize, row as isize, col as isize);
    let mut offset = DVec3::ZERO;
    let mut converged = false;

    for _ in 0..MAX_INTERP_STEPS {
        let (grad, hessian) = derivatives(dogs, layer as usize, r as usize, c as usize);
        if hessian.determinant().abs() < f64::EPSILON {
            return None;
        }
        offset = -(hessian.inverse() * grad);

        if offset.abs().max_element() < 0.5 {
            converged = true;
            break;
        }
        if offset.abs().max_element() > (i32::MAX / 3) as f64 {
            return None;
        }

        c += offset.x.round() as isize;
        r += offset.y.round() as isize;
        layer += offset.z.round() as isize;

        if layer < 1
            || layer > n as isize
            || c < border
            || c >= width - border
            || r < border
            || r >= height - border
        {
            return None;
        }
    }

    if !converged {
        return None;
    }

    let (layer, r, c) = (layer as usize, r as usize, c as usize);
    let (grad, hessian) = derivatives(dogs, layer, r, c);
    let contrast = at(&dogs[layer], r, c) as f64 + 0.5 * grad.dot(offset);
    if contrast.abs() * (n as f64) < config.contrast_threshold {
        return None;
    }

    // principal curvature ratio test on the 2x2 spatial hessian
    let dxx = hessian.x_axis.x;
    let dyy = hessian.y_axis.y;
    let dxy = hessian.y_axis.x;
    let trace = dxx + dyy;
    let det = dxx * dyy - dxy * dxy;
    let edge = config.edge_threshold;
    if det <= 0.0 || trace * trace * edge >= (edge + 1.0) * (edge + 1.0) * det {
        return None;
    }

    Some(ScaleSpacePoint {
        octave,
        layer,
        row: r,
        col: c,
        offset: [offset.x as f32, offset.y as f32, offset.z as f32],
        response: contrast.abs() as f32,
    })
}

/// Find the refined extrema of the difference-of-gaussian scale space.
pub(crate) fn find_scale_space_extrema(
    space: &ScaleSpace,
    config: &SiftConfig,
) -> Vec<ScaleSpacePoint> {
    let n = config.n_octave_layers;
    let border = config.image_border_width.max(1);
    let threshold = (0.5 * config.contrast_threshold / n as f64) as f32;
    let mut points = Vec::new();

    for (octave, dogs) in space.dogs.iter().enumerate() {
        let width = dogs[0].width();
        let height = dogs[0].height();
        if width <= 2 * border || height <= 2 * border {
            continue;
        }

        for layer in 1..=n {
            let (prev, cur, next) = (&dogs[layer - 1], &dogs[layer], &dogs[layer + 1]);
            for r in border..height - border {
                for c in border..width - border {
                    if at(cur, r, c).abs() <= threshold || !is_extremum(prev, cur, next, r, c) {
                        continue;
                    }
                    if let Some(point) = localize(dogs, octave, layer, r, c, config) {
                        points.push(point);
                    }
                }
            }
        }
    }

    points
}
