use glam::{DMat3, DVec2, DVec3};

/// Minimum number of correspondences of the 8-point solver.
pub const FUNDAMENTAL_SAMPLE_SIZE: usize = 8;

/// Error types for the fundamental matrix solvers.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FundamentalError {
    /// Input correspondences are invalid or insufficient.
    #[error("Need at least 8 correspondences and equal lengths, got {0} and {1}")]
    InvalidInput(usize, usize),

    /// A correspondence has a NaN or infinite coordinate.
    #[error("Correspondence {0} has a non finite coordinate")]
    NonFinitePoint(usize),

    /// The correspondences do not constrain a fundamental matrix.
    #[error("Correspondences are degenerate")]
    Degenerate,
}

/// Estimate the fundamental matrix using the normalized 8-point algorithm.
///
/// The returned matrix satisfies `x2^T F x1 = 0`, has rank 2 and unit
/// Frobenius norm.
///
/// # Arguments
///
/// * `x1` - Points in the first (left) image.
/// * `x2` - Corresponding points in the second (right) image.
///
/// # Errors
///
/// [`FundamentalError`] when fewer than 8 correspondences are given, the
/// lengths differ, a coordinate is not finite or all points coincide.
pub fn fundamental_8point(x1: &[DVec2], x2: &[DVec2]) -> Result<DMat3, FundamentalError> {
    if x1.len() != x2.len() || x1.len() < FUNDAMENTAL_SAMPLE_SIZE {
        return Err(FundamentalError::InvalidInput(x1.len(), x2.len()));
    }
    if let Some(i) = x1
        .iter()
        .zip(x2)
        .position(|(a, b)| !a.is_finite() || !b.is_finite())
    {
        return Err(FundamentalError::NonFinitePoint(i));
    }

    // Normalize points with similarity transforms T1, T2 to have zero mean and avg sqrt(2) distance
    let (x1n, t1) = normalize_points(x1).ok_or(FundamentalError::Degenerate)?;
    let (x2n, t2) = normalize_points(x2).ok_or(FundamentalError::Degenerate)?;

    // Build design matrix A (N x 9) for x2' * F * x1 = 0
    let n = x1n.len();
    let mut a = faer::Mat::<f64>::zeros(n, 9);
    for (i, (p1, p2)) in x1n.iter().zip(&x2n).enumerate() {
        let (x, y) = (p1.x, p1.y);
        let (xp, yp) = (p2.x, p2.y);
        a.write(i, 0, xp * x);
        a.write(i, 1, xp * y);
        a.write(i, 2, xp);
        a.write(i, 3, yp * x);
        a.write(i, 4, yp * y);
        a.write(i, 5, yp);
        a.write(i, 6, x);
        a.write(i, 7, y);
        a.write(i, 8, 1.0);
    }

    // Solve Af = 0 via SVD: take last column of V
    let svd = a.svd();
    let v = svd.v();
    let f = faer::Mat::<f64>::from_fn(3, 3, |i, j| v.read(3 * i + j, 8));

    // Enforce rank-2 constraint on F by dropping its smallest singular value
    let svd = f.svd();
    let (u, s, v) = (svd.u(), svd.s_diagonal(), svd.v());
    let f_rank2 = faer::Mat::<f64>::from_fn(3, 3, |i, j| {
        (0..2).map(|k| u.read(i, k) * s.read(k) * v.read(j, k)).sum()
    });

    // Denormalize: F = T2^T * F * T1
    let f = t2.transpose() * to_dmat3(&f_rank2) * t1;

    let norm = frobenius_norm(&f);
    if !norm.is_finite() || norm < f64::EPSILON {
        return Err(FundamentalError::Degenerate);
    }

    Ok(f * (1.0 / norm))
}

/// Symmetric squared epipolar distance of a correspondence.
///
/// The larger of the squared distances from `x2` to the line `F x1` and from
/// `x1` to the line `F^T x2`. Returns infinity when either line is degenerate.
pub fn symmetric_epipolar_error(f: &DMat3, x1: DVec2, x2: DVec2) -> f64 {
    let p1 = x1.extend(1.0);
    let p2 = x2.extend(1.0);

    let l2 = *f * p1;
    let l1 = f.transpose() * p2;
    let d = p2.dot(l2);

    let s2 = l2.x * l2.x + l2.y * l2.y;
    let s1 = l1.x * l1.x + l1.y * l1.y;
    if s1 < f64::MIN_POSITIVE || s2 < f64::MIN_POSITIVE {
        return f64::INFINITY;
    }

    (d * d / s1).max(d * d / s2)
}

// similarity transform T = [[s,0,-s*mx],[0,s,-s*my],[0,0,1]] and the transformed points
fn normalize_points(x: &[DVec2]) -> Option<(Vec<DVec2>, DMat3)> {
    let n = x.len() as f64;
    let mean = x.iter().copied().sum::<DVec2>() / n;
    let mean_dist = x.iter().map(|p| p.distance(mean)).sum::<f64>() / n;
    if mean_dist < 1e-12 {
        return None;
    }
    let scale = std::f64::consts::SQRT_2 / mean_dist;

    let xn = x.iter().map(|p| (*p - mean) * scale).collect();
    let t = DMat3::from_cols(
        DVec3::new(scale, 0.0, 0.0),
        DVec3::new(0.0, scale, 0.0),
        DVec3::new(-scale * mean.x, -scale * mean.y, 1.0),
    );
    Some((xn, t))
}

fn to_dmat3(m: &faer::Mat<f64>) -> DMat3 {
    DMat3::from_cols(
        DVec3::new(m.read(0, 0), m.read(1, 0), m.read(2, 0)),
        DVec3::new(m.read(0, 1), m.read(1, 1), m.read(2, 1)),
        DVec3::new(m.read(0, 2), m.read(1, 2), m.read(2, 2)),
    )
}

fn frobenius_norm(m: &DMat3) -> f64 {
    (m.x_axis.length_squared() + m.y_axis.length_squared() + m.z_axis.length_squared()).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::test_utils::two_view_scene;

    #[test]
    fn recovers_true_fundamental() -> Result<(), FundamentalError> {
        let scene = two_view_scene(20, 1);
        let f = fundamental_8point(&scene.x1, &scene.x2)?;

        let f_true = scene.fundamental * (1.0 / frobenius_norm(&scene.fundamental));
        // F is only defined up to sign
        let dot = f.x_axis.dot(f_true.x_axis) + f.y_axis.dot(f_true.y_axis) + f.z_axis.dot(f_true.z_axis);
        let sign = dot.signum();
        assert!((f * sign).abs_diff_eq(f_true, 1e-6));

        for (p1, p2) in scene.x1.iter().zip(&scene.x2) {
            assert!(symmetric_epipolar_error(&f, *p1, *p2) < 1e-12);
        }
        Ok(())
    }

    #[test]
    fn minimal_sample() -> Result<(), FundamentalError> {
        let scene = two_view_scene(8, 5);
        let f = fundamental_8point(&scene.x1, &scene.x2)?;
        assert!(f.determinant().abs() < 1e-9);
        for (p1, p2) in scene.x1.iter().zip(&scene.x2) {
            assert!(symmetric_epipolar_error(&f, *p1, *p2) < 1e-10);
        }
        Ok(())
    }

    #[test]
    fn result_is_rank_two_and_unit_norm() -> Result<(), FundamentalError> {
        let scene = two_view_scene(30, 2);
        let f = fundamental_8point(&scene.x1, &scene.x2)?;
        approx::assert_relative_eq!(frobenius_norm(&f), 1.0, epsilon = 1e-12);
        assert!(f.determinant().abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn identical_views() -> Result<(), FundamentalError> {
        let scene = two_view_scene(25, 3);
        let f = fundamental_8point(&scene.x1, &scene.x1)?;
        for p in &scene.x1 {
            assert!(symmetric_epipolar_error(&f, *p, *p) < 1e-12);
        }
        Ok(())
    }

    #[test]
    fn invalid_input() {
        let scene = two_view_scene(8, 4);
        assert_eq!(
            fundamental_8point(&scene.x1[..7], &scene.x2[..7]),
            Err(FundamentalError::InvalidInput(7, 7))
        );
        assert_eq!(
            fundamental_8point(&scene.x1, &scene.x2[..7]),
            Err(FundamentalError::InvalidInput(8, 7))
        );
    }

    #[test]
    fn coincident_points() {
        let x1 = vec![DVec2::new(3.0, 4.0); 10];
        let x2 = vec![DVec2::new(1.0, 2.0); 10];
        assert_eq!(fundamental_8point(&x1, &x2), Err(FundamentalError::Degenerate));
    }

    #[test]
    fn non_finite_point() {
        let mut scene = two_view_scene(10, 6);
        scene.x2[4].y = f64::NAN;
        assert_eq!(
            fundamental_8point(&scene.x1, &scene.x2),
            Err(FundamentalError::NonFinitePoint(4))
        );
    }

    #[test]
    fn symmetric_error_of_offset_point() {
        // rectified pair: F maps points to horizontal lines y' = y
        let f = DMat3::from_cols(
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(0.0, 0.0, 1.0),
            DVec3::new(0.0, -1.0, 0.0),
        );
        let err = symmetric_epipolar_error(&f, DVec2::new(10.0, 20.0), DVec2::new(4.0, 22.5));
        approx::assert_relative_eq!(err, 6.25, epsilon = 1e-12);
    }
}
