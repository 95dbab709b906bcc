use glam::DVec2;
use stereo_imgproc::features::{knn_match, ratio_test, Keypoint, SiftDescriptor};

/// Lowe's ratio: a match is kept when its distance is below this fraction of
/// the distance to the second nearest neighbour.
pub const LOWE_RATIO: f32 = 0.7;

/// Corresponding keypoint locations in the left and right image.
///
/// `left[i]` and `right[i]` are the locations of the `i`-th match.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CorrespondenceSet {
    /// Locations in the left image.
    pub left: Vec<DVec2>,
    /// Locations in the right image.
    pub right: Vec<DVec2>,
}

impl CorrespondenceSet {
    /// Matches two sets of keypoints by their descriptors.
    ///
    /// Every left descriptor looks up its two nearest right descriptors and
    /// the pair survives when it passes the ratio test with `ratio`.
    pub fn from_features(
        left_keypoints: &[Keypoint],
        left_descriptors: &[SiftDescriptor],
        right_keypoints: &[Keypoint],
        right_descriptors: &[SiftDescriptor],
        ratio: f32,
    ) -> Self {
        let knn = knn_match(left_descriptors, right_descriptors, 2);
        let (left, right) = ratio_test(&knn, ratio)
            .into_iter()
            .filter_map(|m| {
                let l = left_keypoints.get(m.query_idx)?;
                let r = right_keypoints.get(m.train_idx)?;
                Some((to_dvec2(l), to_dvec2(r)))
            })
            .unzip();
        Self { left, right }
    }

    /// Number of correspondences.
    pub fn len(&self) -> usize {
        self.left.len()
    }

    /// Whether the set has no correspondences.
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// The correspondences flagged in `mask`.
    pub fn select(&self, mask: &[bool]) -> Self {
        let (left, right) = self
            .left
            .iter()
            .zip(&self.right)
            .zip(mask)
            .filter(|(_, keep)| **keep)
            .map(|((l, r), _)| (*l, *r))
            .unzip();
        Self { left, right }
    }
}

fn to_dvec2(kp: &Keypoint) -> DVec2 {
    DVec2::new(kp.x as f64, kp.y as f64)
}
