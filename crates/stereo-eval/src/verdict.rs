use std::fmt;

use serde::{Deserialize, Serialize};

/// Largest mean residual, in pixels, of an excellent rectification.
pub const EXCELLENT_MEAN_PX: f64 = 0.3;
/// Largest 95th percentile residual, in pixels, of an excellent rectification.
pub const EXCELLENT_P95_PX: f64 = 1.0;
/// Largest mean residual, in pixels, of a good rectification.
pub const GOOD_MEAN_PX: f64 = 0.6;
/// Largest 95th percentile residual, in pixels, of a good rectification.
pub const GOOD_P95_PX: f64 = 2.0;

/// Quality class of a rectified stereo pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RectificationQuality {
    /// Mean below 0.3 px and 95th percentile below 1 px.
    Excellent,
    /// Mean below 0.6 px and 95th percentile below 2 px.
    Good,
    /// Anything else.
    Poor,
}

impl RectificationQuality {
    /// Classifies a pair from its mean and 95th percentile epipolar error.
    ///
    /// Bounds are strict and checked from the best class down.
    ///
    /// # Example
    ///
    /// ```
    /// use stereo_eval::verdict::RectificationQuality;
    ///
    /// assert_eq!(RectificationQuality::classify(0.29, 0.99), RectificationQuality::Excellent);
    /// assert_eq!(RectificationQuality::classify(0.31, 0.99), RectificationQuality::Good);
    /// assert_eq!(RectificationQuality::classify(0.61, 2.5), RectificationQuality::Poor);
    /// ```
    pub fn classify(mean: f64, p95: f64) -> Self {
        if mean < EXCELLENT_MEAN_PX && p95 < EXCELLENT_P95_PX {
            RectificationQuality::Excellent
        } else if mean < GOOD_MEAN_PX && p95 < GOOD_P95_PX {
            RectificationQuality::Good
        } else {
            RectificationQuality::Poor
        }
    }

    /// Upper case name of the class.
    pub fn as_str(&self) -> &'static str {
        match self {
            RectificationQuality::Excellent => "EXCELLENT",
            RectificationQuality::Good => "GOOD",
            RectificationQuality::Poor => "POOR",
        }
    }
}

impl fmt::Display for RectificationQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
