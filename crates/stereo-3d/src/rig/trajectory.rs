use std::{fmt, str::FromStr};

use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::{finite, stereo_camera_pose, RigConfig, RigError, StereoRigPose};

/// How a stereo rig moves over a sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraMotion {
    /// The rig keeps its first orientation and slides along a line.
    PureTranslation,
    /// The rig slides along a line and is re-aimed at a fixed target every frame.
    LookAtOrbit,
    /// Both the rig center and its target move along lines.
    LinearLookAt,
}

impl CameraMotion {
    /// Name of the motion in the dataset directory layout.
    pub fn as_str(&self) -> &'static str {
        match self {
            CameraMotion::PureTranslation => "pure_translation",
            CameraMotion::LookAtOrbit => "linear_movement",
            CameraMotion::LinearLookAt => "linear_movement_linear_lookat",
        }
    }
}

impl fmt::Display for CameraMotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CameraMotion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pure_translation" => Ok(CameraMotion::PureTranslation),
            "linear_movement" | "lookat_orbit" => Ok(CameraMotion::LookAtOrbit),
            "linear_movement_linear_lookat" | "linear_lookat" => Ok(CameraMotion::LinearLookAt),
            other => Err(format!(
                "unknown camera motion '{other}', expected one of: pure_translation, \
                 linear_movement, linear_movement_linear_lookat"
            )),
        }
    }
}

/// Per-frame rig poses of a sequence.
///
/// The rig starts at `config.center` looking at `config.target` and reaches
/// `end_center` on the last frame; `end_target` only applies to
/// [`CameraMotion::LinearLookAt`] and defaults to `config.target`. Frames are
/// evenly spaced, a single frame sits at the start.
///
/// # Errors
///
/// [`RigError::NonFiniteVector`] for a non-finite `end_center` or `end_target`,
/// otherwise the first [`RigError`] met while placing a frame. A
/// [`CameraMotion::PureTranslation`] sequence only aims its first frame, the
/// following ones reuse its orientation.
///
/// # Example
///
/// ```
/// use glam::DVec3;
/// use stereo_3d::rig::{rig_trajectory, CameraMotion, RigConfig};
///
/// let config = RigConfig::default();
/// let poses = rig_trajectory(
///     &config,
///     CameraMotion::PureTranslation,
///     4,
///     DVec3::new(2.0, -1.0, 2.0),
///     None,
/// ).unwrap();
///
/// assert_eq!(poses.len(), 4);
/// assert!(poses.iter().all(|p| p.quaternion == poses[0].quaternion));
/// ```
pub fn rig_trajectory(
    config: &RigConfig,
    motion: CameraMotion,
    num_frames: usize,
    end_center: DVec3,
    end_target: Option<DVec3>,
) -> Result<Vec<StereoRigPose>, RigError> {
    let end_center = finite(end_center, "end center")?;
    let end_target = finite(end_target.unwrap_or(config.target), "end target")?;
    if num_frames == 0 {
        return Ok(Vec::new());
    }

    let step = |i: usize| {
        if num_frames > 1 {
            i as f64 / (num_frames - 1) as f64
        } else {
            0.0
        }
    };
    let place = |center: DVec3, target: DVec3| {
        stereo_camera_pose(center, target, config.up, config.front, config.baseline)
    };

    match motion {
        CameraMotion::PureTranslation => {
            let first = place(config.center, config.target)?;
            (0..num_frames)
                .map(|i| first.translated(config.center.lerp(end_center, step(i))))
                .collect()
        }
        CameraMotion::LookAtOrbit => (0..num_frames)
            .map(|i| place(config.center.lerp(end_center, step(i)), config.target))
            .collect(),
        CameraMotion::LinearLookAt => (0..num_frames)
            .map(|i| {
                let t = step(i);
                place(
                    config.center.lerp(end_center, t),
                    config.target.lerp(end_target, t),
                )
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn parse_motion() {
        assert_eq!(
            "pure_translation".parse::<CameraMotion>(),
            Ok(CameraMotion::PureTranslation)
        );
        assert_eq!(
            "linear_movement".parse::<CameraMotion>(),
            Ok(CameraMotion::LookAtOrbit)
        );
        assert_eq!(
            "linear_movement_linear_lookat".parse::<CameraMotion>(),
            Ok(CameraMotion::LinearLookAt)
        );
        assert!("spiral".parse::<CameraMotion>().is_err());

        for motion in [
            CameraMotion::PureTranslation,
            CameraMotion::LookAtOrbit,
            CameraMotion::LinearLookAt,
        ] {
            assert_eq!(motion.to_string().parse::<CameraMotion>(), Ok(motion));
        }
    }

    #[test]
    fn pure_translation_keeps_orientation() -> Result<(), RigError> {
        let config = RigConfig::default();
        let end = DVec3::new(3.0, 0.0, 2.0);
        let poses = rig_trajectory(&config, CameraMotion::PureTranslation, 5, end, None)?;

        assert_eq!(poses.len(), 5);
        assert!(poses[0].center.abs_diff_eq(config.center, 1e-12));
        assert!(poses[4].center.abs_diff_eq(end, 1e-12));
        for pose in &poses {
            assert_eq!(pose.quaternion, poses[0].quaternion);
            assert_eq!(pose.look_right, poses[0].look_right);
            assert_relative_eq!(pose.camera_distance(), config.baseline, max_relative = 1e-9);
        }
        Ok(())
    }

    #[test]
    fn orbit_reaims_every_frame() -> Result<(), RigError> {
        let config = RigConfig::default();
        let end = DVec3::new(-2.0, 2.0, 2.0);
        let poses = rig_trajectory(&config, CameraMotion::LookAtOrbit, 3, end, None)?;

        assert_ne!(poses[0].quaternion, poses[2].quaternion);
        for pose in &poses {
            let look = pose.quaternion * config.front;
            let expected = (config.target - pose.center).normalize();
            assert!(look.abs_diff_eq(expected, 1e-9));
            assert_relative_eq!(pose.camera_distance(), config.baseline, max_relative = 1e-9);
        }
        Ok(())
    }

    #[test]
    fn linear_look_at_moves_target() -> Result<(), RigError> {
        let config = RigConfig::default();
        let end_target = DVec3::new(1.0, 0.0, 0.0);
        let poses = rig_trajectory(
            &config,
            CameraMotion::LinearLookAt,
            3,
            config.center,
            Some(end_target),
        )?;

        let look = poses[2].quaternion * config.front;
        let expected = (end_target - config.center).normalize();
        assert!(look.abs_diff_eq(expected, 1e-9));

        let mid_target = config.target.lerp(end_target, 0.5);
        let look = poses[1].quaternion * config.front;
        assert!(look.abs_diff_eq((mid_target - config.center).normalize(), 1e-9));
        Ok(())
    }

    #[test]
    fn degenerate_frame_is_reported() {
        // passes straight above the target half way
        let config = RigConfig {
            center: DVec3::new(-1.0, 0.0, 3.0),
            ..Default::default()
        };
        let res = rig_trajectory(
            &config,
            CameraMotion::LookAtOrbit,
            3,
            DVec3::new(1.0, 0.0, 3.0),
            None,
        );
        assert!(matches!(res, Err(RigError::DegenerateLookDirection(_))));
    }

    #[test]
    fn empty_and_single_frame() -> Result<(), RigError> {
        let config = RigConfig::default();
        let end = DVec3::ZERO;
        assert!(rig_trajectory(&config, CameraMotion::LookAtOrbit, 0, end, None)?.is_empty());

        let poses = rig_trajectory(&config, CameraMotion::LookAtOrbit, 1, end, None)?;
        assert_eq!(poses.len(), 1);
        assert!(poses[0].center.abs_diff_eq(config.center, 1e-12));
        Ok(())
    }

    #[test]
    fn non_finite_end_points_are_rejected() {
        let config = RigConfig::default();
        for motion in [
            CameraMotion::PureTranslation,
            CameraMotion::LookAtOrbit,
            CameraMotion::LinearLookAt,
        ] {
            let res = rig_trajectory(&config, motion, 3, DVec3::new(f64::NAN, 0.0, 1.0), None);
            assert_eq!(res, Err(RigError::NonFiniteVector("end center")));

            let res = rig_trajectory(
                &config,
                motion,
                3,
                config.center,
                Some(DVec3::new(0.0, f64::INFINITY, 0.0)),
            );
            assert_eq!(res, Err(RigError::NonFiniteVector("end target")));
        }
    }
}
