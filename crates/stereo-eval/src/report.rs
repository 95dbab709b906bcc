use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{stats::ResidualStats, verdict::RectificationQuality};

/// Epipolar residuals of a validated pair and their classification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RectificationReport {
    /// Ratio-test survivors fed to the fundamental matrix estimator.
    pub match_count: usize,
    /// Correspondences consistent with the estimated fundamental matrix.
    pub inlier_count: usize,
    /// Statistics of the inlier residuals.
    pub stats: ResidualStats,
    /// Quality class derived from `stats`.
    pub verdict: RectificationQuality,
    /// Distance, in pixels, from each right inlier to the epipolar line of its left match.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub residuals: Vec<f64>,
}

impl RectificationReport {
    /// Builds a report from inlier residuals.
    ///
    /// Returns `None` when there are no residuals.
    pub fn from_residuals(match_count: usize, residuals: Vec<f64>) -> Option<Self> {
        let stats = ResidualStats::from_residuals(&residuals)?;
        Some(Self {
            match_count,
            inlier_count: residuals.len(),
            stats,
            verdict: RectificationQuality::classify(stats.mean, stats.p95),
            residuals,
        })
    }
}

impl fmt::Display for RectificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Inlier matches: {}", self.inlier_count)?;
        writeln!(f, "Mean epipolar error: {:.4} px", self.stats.mean)?;
        writeln!(f, "Std dev: {:.4} px", self.stats.std_dev)?;
        writeln!(f, "95th percentile: {:.4} px", self.stats.p95)?;
        write!(f, "Status: {} RECTIFICATION", self.verdict)
    }
}

/// Why a pair could not be graded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum InsufficientData {
    /// At least one image has no descriptors.
    NoDescriptors {
        /// Descriptors found in the left image.
        left: usize,
        /// Descriptors found in the right image.
        right: usize,
    },
    /// Too few matches survived the ratio test.
    Matches {
        /// Surviving matches.
        found: usize,
        /// Required matches.
        required: usize,
    },
    /// Too few matches are consistent with the fundamental matrix.
    Inliers {
        /// Inlier matches.
        found: usize,
        /// Required inliers.
        required: usize,
    },
    /// The epipolar line of an inlier has no direction.
    DegenerateEpipolarLine {
        /// Index of the inlier.
        index: usize,
    },
}

impl fmt::Display for InsufficientData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsufficientData::NoDescriptors { .. } => write!(f, "No descriptors found."),
            InsufficientData::Matches { found, .. } => {
                write!(f, "Not enough good matches: {found}")
            }
            InsufficientData::Inliers { found, .. } => {
                write!(f, "Too few inliers after RANSAC: {found}")
            }
            InsufficientData::DegenerateEpipolarLine { index } => {
                write!(f, "Degenerate epipolar line for inlier {index}.")
            }
        }
    }
}

/// Outcome of validating one stereo pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Validation {
    /// The pair was graded.
    Ok(RectificationReport),
    /// The pair does not carry enough data to be graded.
    Insufficient(InsufficientData),
    /// The fundamental matrix could not be estimated.
    EstimationFailed,
}

impl Validation {
    /// The report of a graded pair.
    pub fn report(&self) -> Option<&RectificationReport> {
        match self {
            Validation::Ok(report) => Some(report),
            _ => None,
        }
    }

    /// The quality class of a graded pair.
    pub fn verdict(&self) -> Option<RectificationQuality> {
        self.report().map(|r| r.verdict)
    }
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validation::Ok(report) => report.fmt(f),
            Validation::Insufficient(reason) => reason.fmt(f),
            Validation::EstimationFailed => write!(f, "Fundamental matrix estimation failed."),
        }
    }
}
