use argh::FromArgs;
use std::path::PathBuf;

use stereo::{
    eval::{
        sequence::{evaluate_sequence, sequence_dir, FrameOutcome, StereoType},
        validator::{EpipolarValidator, ValidationParams},
    },
    k3d::rig::CameraMotion,
};

#[derive(FromArgs, Debug)]
/// SIFT-based epipolar geometry validation of stereo rectification.
///
/// Validates a single pair with -l/-r, or a whole rendered sequence with
/// --dataset-root, --stereo-type and --seq-name.
struct Args {
    /// path to the left image
    #[argh(option, short = 'l')]
    left_image: Option<PathBuf>,

    /// path to the right image
    #[argh(option, short = 'r')]
    right_image: Option<PathBuf>,

    /// root directory of the rendered datasets
    #[argh(option)]
    dataset_root: Option<PathBuf>,

    /// type of stereo setup: pure_translation or lookat_orbit
    #[argh(option)]
    stereo_type: Option<StereoType>,

    /// camera movement of lookat_orbit sequences: linear_movement or
    /// linear_movement_linear_lookat
    #[argh(option)]
    camera_movement: Option<CameraMotion>,

    /// sequence name
    #[argh(option)]
    seq_name: Option<String>,

    /// print JSON instead of text
    #[argh(switch)]
    json: bool,

    /// minimum number of matches and inliers
    #[argh(option, default = "50")]
    min_matches: usize,

    /// the RANSAC inlier threshold in pixels
    #[argh(option, default = "1.0")]
    ransac_threshold: f64,

    /// the seed of the RANSAC sampler
    #[argh(option, default = "0")]
    seed: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let validator = EpipolarValidator::new(ValidationParams {
        min_matches: args.min_matches,
        ransac_threshold_px: args.ransac_threshold,
        random_seed: Some(args.seed),
        ..Default::default()
    });

    if let (Some(left), Some(right)) = (&args.left_image, &args.right_image) {
        let validation = validator.validate_files(left, right)?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&validation)?);
        } else {
            println!("{validation}");
        }
        return Ok(());
    }

    let (Some(root), Some(stereo_type), Some(seq_name)) =
        (&args.dataset_root, args.stereo_type, &args.seq_name)
    else {
        return Err("pass -l/-r, or --dataset-root with --stereo-type and --seq-name".into());
    };

    let dir = sequence_dir(root, stereo_type, args.camera_movement, seq_name)?;
    log::info!("validating sequence {}", dir.display());
    let (results, summary) = evaluate_sequence(&validator, &dir)?;

    if args.json {
        let report = serde_json::json!({
            "sequence": dir,
            "frames": results,
            "summary": summary,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Total Frames to Process: {}", results.len());
    for result in &results {
        println!("Processing Frame: {}", result.frame);
        match &result.outcome {
            FrameOutcome::Validated(validation) => println!("{validation}"),
            FrameOutcome::Error(err) => println!("Failed to process frame: {err}"),
        }
        println!("{}", "-".repeat(50));
    }
    println!("{summary}");

    Ok(())
}
