use glam::{DMat3, DVec2, DVec3};

/// Lines with `a^2 + b^2` below this have no defined point distance.
const MIN_LINE_NORM: f64 = 1e-12;

/// Errors returned while measuring epipolar residuals.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EpipolarError {
    /// Both point sets must have the same length.
    #[error("Point sets have different lengths: {0} and {1}")]
    LengthMismatch(usize, usize),

    /// The epipolar line of a correspondence has `a = b = 0`.
    #[error("Epipolar line of correspondence {index} is degenerate")]
    DegenerateLine {
        /// Index of the correspondence.
        index: usize,
    },
}

/// The image a set of points belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewIndex {
    /// Points of the first (left) image; their lines live in the second image.
    First,
    /// Points of the second (right) image; their lines live in the first image.
    Second,
}

/// Computes the epipolar lines induced in the other image by a set of points.
///
/// For points of the first image the lines are `F x`, for points of the
/// second image `F^T x`. Each line `(a, b, c)` is scaled so that
/// `a^2 + b^2 = 1` unless it is degenerate, in which case it is returned as is.
///
/// # Example
///
/// ```
/// use glam::{DMat3, DVec2, DVec3};
/// use stereo_3d::pose::{epipolar_lines, ViewIndex};
///
/// // rectified pair: every point maps to the horizontal line through it
/// let f = DMat3::from_cols(DVec3::ZERO, DVec3::new(0.0, 0.0, 1.0), DVec3::new(0.0, -1.0, 0.0));
/// let lines = epipolar_lines(&[DVec2::new(10.0, 20.0)], ViewIndex::First, &f);
/// assert_eq!(lines[0], DVec3::new(0.0, -1.0, 20.0));
/// ```
pub fn epipolar_lines(points: &[DVec2], which: ViewIndex, f: &DMat3) -> Vec<DVec3> {
    let m = match which {
        ViewIndex::First => *f,
        ViewIndex::Second => f.transpose(),
    };

    points
        .iter()
        .map(|p| {
            let line = m * p.extend(1.0);
            let norm = line.truncate().length();
            if norm > MIN_LINE_NORM {
                line / norm
            } else {
                line
            }
        })
        .collect()
}

/// Perpendicular distance from a point to the line `a x + b y + c = 0`.
///
/// Returns `None` when the line is degenerate (`a = b = 0`).
pub fn point_line_distance(line: DVec3, point: DVec2) -> Option<f64> {
    let norm = line.truncate().length();
    if norm <= MIN_LINE_NORM {
        return None;
    }
    Some((line.x * point.x + line.y * point.y + line.z).abs() / norm)
}

/// Distance from each second-image point to the epipolar line of its first-image match.
///
/// # Errors
///
/// [`EpipolarError::DegenerateLine`] for the first correspondence whose line
/// has no direction, [`EpipolarError::LengthMismatch`] when the sets differ in length.
pub fn epipolar_residuals(x1: &[DVec2], x2: &[DVec2], f: &DMat3) -> Result<Vec<f64>, EpipolarError> {
    if x1.len() != x2.len() {
        return Err(EpipolarError::LengthMismatch(x1.len(), x2.len()));
    }

    epipolar_lines(x1, ViewIndex::First, f)
        .into_iter()
        .zip(x2)
        .enumerate()
        .map(|(index, (line, p))| {
            point_line_distance(line, *p).ok_or(EpipolarError::DegenerateLine { index })
        })
        .collect()
}
