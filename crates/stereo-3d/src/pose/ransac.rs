use glam::{DMat3, DVec2};
use rand::{rngs::StdRng, SeedableRng};

use super::fundamental::{fundamental_8point, symmetric_epipolar_error, FUNDAMENTAL_SAMPLE_SIZE};

/// Errors returned by the robust estimators.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RansacError {
    /// Input correspondences are invalid or insufficient.
    #[error("Need at least {required} correspondences and equal lengths")]
    InvalidInput {
        /// Minimum required correspondences for the model.
        required: usize,
    },

    /// RANSAC failed to find a valid model.
    #[error("RANSAC failed to find a valid model")]
    RansacFailure,
}

/// Parameters for RANSAC model estimation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RansacParams {
    /// Maximum number of RANSAC iterations.
    pub max_iterations: usize,
    /// Inlier threshold in pixels, compared against the epipolar distance.
    pub threshold: f64,
    /// Probability that at least one sample is outlier free; drives early termination.
    pub confidence: f64,
    /// Minimum number of inliers required for acceptance.
    pub min_inliers: usize,
    /// Optional RNG seed for deterministic runs.
    pub random_seed: Option<u64>,
    /// Refit the model on all inliers of the best sample.
    pub refine: bool,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            threshold: 1.0,
            confidence: 0.999,
            min_inliers: FUNDAMENTAL_SAMPLE_SIZE,
            random_seed: Some(0),
            refine: true,
        }
    }
}

/// Result of a RANSAC model fit.
#[derive(Clone, Debug)]
pub struct RansacResult<M> {
    /// Estimated model.
    pub model: M,
    /// Per-point inlier mask.
    pub inliers: Vec<bool>,
    /// Total inlier count.
    pub inlier_count: usize,
    /// Sum of inlier errors (lower is better).
    pub score: f64,
    /// Number of hypotheses evaluated.
    pub iterations: usize,
}

/// Estimate a fundamental matrix with RANSAC using the 8-point solver.
///
/// A correspondence is an inlier when its symmetric epipolar distance is
/// within `params.threshold` pixels. The number of iterations shrinks as
/// better models are found, so that an outlier free sample is drawn with
/// probability `params.confidence`.
///
/// # Errors
///
/// [`RansacError::InvalidInput`] with fewer than 8 correspondences or
/// unequal lengths, [`RansacError::RansacFailure`] when no model reaches
/// `params.min_inliers`.
pub fn ransac_fundamental(
    x1: &[DVec2],
    x2: &[DVec2],
    params: &RansacParams,
) -> Result<RansacResult<DMat3>, RansacError> {
    const SAMPLE_SIZE: usize = FUNDAMENTAL_SAMPLE_SIZE;
    if x1.len() != x2.len() || x1.len() < SAMPLE_SIZE {
        return Err(RansacError::InvalidInput {
            required: SAMPLE_SIZE,
        });
    }

    let mut rng = match params.random_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => {
            let mut tr = rand::rng();
            StdRng::from_rng(&mut tr)
        }
    };

    let n = x1.len();
    let threshold_sq = params.threshold * params.threshold;
    let mut best: Option<(DMat3, ModelScore)> = None;
    let mut num_iterations = params.max_iterations;
    let mut iteration = 0;
    let mut s1 = Vec::with_capacity(SAMPLE_SIZE);
    let mut s2 = Vec::with_capacity(SAMPLE_SIZE);

    while iteration < num_iterations {
        iteration += 1;

        let sample = rand::seq::index::sample(&mut rng, n, SAMPLE_SIZE);
        s1.clear();
        s2.clear();
        for idx in sample.iter() {
            s1.push(x1[idx]);
            s2.push(x2[idx]);
        }
        let f = match fundamental_8point(&s1, &s2) {
            Ok(f) => f,
            Err(_) => continue,
        };

        let candidate = ModelScore::evaluate(&f, x1, x2, threshold_sq);
        let improves = best
            .as_ref()
            .map_or(true, |(_, score)| candidate.is_better_than(score));
        if improves {
            num_iterations = update_num_iterations(
                params.confidence,
                candidate.count as f64 / n as f64,
                SAMPLE_SIZE,
                num_iterations,
            );
            best = Some((f, candidate));
        }
    }

    let (mut model, mut score) = best.ok_or(RansacError::RansacFailure)?;

    if params.refine && score.count > SAMPLE_SIZE {
        let (r1, r2): (Vec<DVec2>, Vec<DVec2>) = score
            .inliers
            .iter()
            .zip(x1.iter().zip(x2))
            .filter(|(inlier, _)| **inlier)
            .map(|(_, (a, b))| (*a, *b))
            .unzip();
        if let Ok(refined) = fundamental_8point(&r1, &r2) {
            let refined_score = ModelScore::evaluate(&refined, x1, x2, threshold_sq);
            if refined_score.count >= score.count {
                model = refined;
                score = refined_score;
            }
        }
    }

    if score.count < params.min_inliers.max(SAMPLE_SIZE) {
        log::debug!(
            "ransac: best model has {} inliers, {} required",
            score.count,
            params.min_inliers.max(SAMPLE_SIZE)
        );
        return Err(RansacError::RansacFailure);
    }

    Ok(RansacResult {
        model,
        inliers: score.inliers,
        inlier_count: score.count,
        score: score.error_sum,
        iterations: iteration,
    })
}

/// Inliers of a model hypothesis.
struct ModelScore {
    inliers: Vec<bool>,
    count: usize,
    error_sum: f64,
}

impl ModelScore {
    fn evaluate(f: &DMat3, x1: &[DVec2], x2: &[DVec2], threshold_sq: f64) -> Self {
        let mut inliers = vec![false; x1.len()];
        let mut count = 0usize;
        let mut error_sum = 0.0f64;
        for (i, (p1, p2)) in x1.iter().zip(x2).enumerate() {
            let d = symmetric_epipolar_error(f, *p1, *p2);
            if d <= threshold_sq {
                inliers[i] = true;
                count += 1;
                error_sum += d;
            }
        }
        Self {
            inliers,
            count,
            error_sum,
        }
    }

    fn is_better_than(&self, other: &Self) -> bool {
        self.count > other.count || (self.count == other.count && self.error_sum < other.error_sum)
    }
}

/// Iterations needed to draw an outlier free sample with probability `confidence`.
///
/// Never exceeds `max_iterations`; returns 0 once every point is an inlier.
pub fn update_num_iterations(
    confidence: f64,
    inlier_ratio: f64,
    sample_size: usize,
    max_iterations: usize,
) -> usize {
    let confidence = confidence.clamp(0.0, 1.0);
    let inlier_ratio = inlier_ratio.clamp(0.0, 1.0);

    let num = (1.0 - confidence).max(f64::MIN_POSITIVE).ln();
    let denom = 1.0 - inlier_ratio.powi(sample_size as i32);
    if denom < f64::MIN_POSITIVE {
        return 0;
    }
    let denom = denom.ln();

    // avoid inf/NaN when the sample is (almost) never outlier free
    if denom >= 0.0 || -num >= max_iterations as f64 * -denom {
        return max_iterations;
    }

    (num / denom).round() as usize
}

/// The result of a robust fundamental matrix estimation.
#[derive(Clone, Debug, PartialEq)]
pub struct FundamentalEstimate {
    /// The fundamental matrix, `x2^T F x1 = 0`.
    pub matrix: DMat3,
    /// Inlier mask aligned with the input correspondences.
    pub inliers: Vec<bool>,
}

impl FundamentalEstimate {
    /// Number of inliers.
    pub fn inlier_count(&self) -> usize {
        self.inliers.iter().filter(|inlier| **inlier).count()
    }
}

/// A robust fundamental matrix estimator.
///
/// Returns `None` when the correspondences do not support a model.
pub trait FundamentalEstimator: Send + Sync {
    /// Estimate the fundamental matrix relating `x1` (first image) and `x2` (second image).
    fn estimate(&self, x1: &[DVec2], x2: &[DVec2]) -> Option<FundamentalEstimate>;
}

/// [`FundamentalEstimator`] running [`ransac_fundamental`].
#[derive(Clone, Debug, Default)]
pub struct RansacFundamental {
    /// RANSAC settings.
    pub params: RansacParams,
}

impl RansacFundamental {
    /// Create an estimator with the given settings.
    pub fn new(params: RansacParams) -> Self {
        Self { params }
    }
}

impl FundamentalEstimator for RansacFundamental {
    fn estimate(&self, x1: &[DVec2], x2: &[DVec2]) -> Option<FundamentalEstimate> {
        match ransac_fundamental(x1, x2, &self.params) {
            Ok(result) => Some(FundamentalEstimate {
                matrix: result.model,
                inliers: result.inliers,
            }),
            Err(err) => {
                log::debug!("fundamental estimation failed: {err}");
                None
            }
        }
    }
}
