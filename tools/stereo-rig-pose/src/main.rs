use argh::FromArgs;
use glam::DVec3;

use stereo::k3d::rig::{rig_trajectory, CameraMotion, RectifiedStereoRigBuilder, RigConfig};

#[derive(FromArgs, Debug)]
/// Place a rectified stereo rig and print its cameras as JSON.
struct Args {
    /// rig center as x,y,z
    #[argh(option, from_str_fn(parse_vec3))]
    center: Option<DVec3>,

    /// point the rig looks at as x,y,z
    #[argh(option, from_str_fn(parse_vec3))]
    target: Option<DVec3>,

    /// up axis of the camera convention as x,y,z
    #[argh(option, from_str_fn(parse_vec3))]
    up: Option<DVec3>,

    /// viewing axis of the camera convention as x,y,z
    #[argh(option, from_str_fn(parse_vec3))]
    front: Option<DVec3>,

    /// distance between both cameras
    #[argh(option)]
    baseline: Option<f64>,

    /// focal length in millimetres
    #[argh(option)]
    focal_length: Option<f64>,

    /// sensor width in millimetres
    #[argh(option)]
    sensor_width: Option<f64>,

    /// number of frames of a trajectory
    #[argh(option)]
    frames: Option<usize>,

    /// how the rig moves: pure_translation, linear_movement or
    /// linear_movement_linear_lookat
    #[argh(option, default = "CameraMotion::PureTranslation")]
    motion: CameraMotion,

    /// rig center on the last frame as x,y,z
    #[argh(option, from_str_fn(parse_vec3))]
    end_center: Option<DVec3>,

    /// target on the last frame as x,y,z
    #[argh(option, from_str_fn(parse_vec3))]
    end_target: Option<DVec3>,
}

fn parse_vec3(value: &str) -> Result<DVec3, String> {
    let coords = value
        .split(',')
        .map(|c| c.trim().parse::<f64>().map_err(|e| format!("'{c}': {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    match coords[..] {
        [x, y, z] => Ok(DVec3::new(x, y, z)),
        _ => Err(format!("expected x,y,z, got '{value}'")),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let defaults = RigConfig::default();
    let config = RigConfig {
        center: args.center.unwrap_or(defaults.center),
        target: args.target.unwrap_or(defaults.target),
        up: args.up.unwrap_or(defaults.up),
        front: args.front.unwrap_or(defaults.front),
        baseline: args.baseline.unwrap_or(defaults.baseline),
        focal_length: args.focal_length.unwrap_or(defaults.focal_length),
        sensor_width: args.sensor_width.unwrap_or(defaults.sensor_width),
    };

    let output = match args.frames {
        Some(num_frames) => {
            let end_center = args
                .end_center
                .ok_or("--frames needs --end-center")?;
            log::info!("{num_frames} frames of {} motion", args.motion);
            let poses = rig_trajectory(&config, args.motion, num_frames, end_center, args.end_target)?;
            serde_json::json!({
                "motion": args.motion,
                "frames": poses,
            })
        }
        None => {
            let builder = RectifiedStereoRigBuilder::new(config);
            serde_json::json!({
                "pose": builder.compute_pose()?,
                "pair": builder.build()?,
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_vectors() {
        assert_eq!(parse_vec3("1,2,3"), Ok(DVec3::new(1.0, 2.0, 3.0)));
        assert_eq!(parse_vec3(" -0.5, 0 ,1e1"), Ok(DVec3::new(-0.5, 0.0, 10.0)));
        assert!(parse_vec3("1,2").is_err());
        assert!(parse_vec3("1,2,3,4").is_err());
        assert!(parse_vec3("a,b,c").is_err());
    }
}
